//! Configuration for a model cache

use crate::cache::invalidation::SignatureFailurePolicy;
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Attribute reference tables are conventionally looked up by
pub const DEFAULT_ACCESSOR_KEY: &str = "name";

/// Longest a snapshot is served before its signature is checked again
pub const MAX_CACHE_LIFE: Duration = Duration::from_secs(60);

/// Configuration for one cached table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Attributes addressing a record, outermost index level first
    pub accessor_keys: Vec<String>,

    /// Attributes ordering `keys()` and `values()`; `None` uses `accessor_keys`
    pub sort_keys: Option<Vec<String>>,

    /// Staleness window before the signature is re-checked
    pub max_cache_life: Duration,

    /// Share of the window that may be cut off at random (0.0 - 1.0)
    /// Spreads the signature queries of many processes that loaded together
    pub revalidation_jitter: f64,

    /// What a failed signature re-check does to the current snapshot
    pub signature_failure_policy: SignatureFailurePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            accessor_keys: vec![DEFAULT_ACCESSOR_KEY.to_string()],
            sort_keys: None,
            max_cache_life: MAX_CACHE_LIFE,
            revalidation_jitter: 0.0,
            signature_failure_policy: SignatureFailurePolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Default configuration addressed by `keys`
    pub fn keyed_by<S: AsRef<str>>(keys: &[S]) -> Self {
        Self {
            accessor_keys: keys.iter().map(|k| k.as_ref().to_string()).collect(),
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.accessor_keys.is_empty() {
            return Err(CacheError::InvalidConfiguration(
                "accessor_keys must not be empty".to_string(),
            ));
        }

        if let Some(sort_keys) = &self.sort_keys {
            if sort_keys.is_empty() {
                return Err(CacheError::InvalidConfiguration(
                    "sort_keys must not be empty when set".to_string(),
                ));
            }
        }

        let all_keys = self
            .accessor_keys
            .iter()
            .chain(self.sort_keys.iter().flatten());
        for key in all_keys {
            if key.trim().is_empty() {
                return Err(CacheError::InvalidConfiguration(
                    "key attribute names must not be blank".to_string(),
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.revalidation_jitter) {
            return Err(CacheError::InvalidConfiguration(
                "revalidation_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Sort keys in effect
    pub fn effective_sort_keys(&self) -> &[String] {
        self.sort_keys.as_deref().unwrap_or(&self.accessor_keys)
    }

    /// Number of index levels
    pub fn depth(&self) -> usize {
        self.accessor_keys.len()
    }

    /// Staleness window with jitter applied
    ///
    /// Jitter only shortens the window, so `max_cache_life` stays an upper
    /// bound on staleness.
    pub fn max_cache_life_with_jitter(&self) -> Duration {
        if self.revalidation_jitter == 0.0 {
            return self.max_cache_life;
        }

        let factor = 1.0 - self.revalidation_jitter * rand::random::<f64>();
        self.max_cache_life.mul_f64(factor.max(0.0))
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    accessor_keys: Option<Vec<String>>,
    sort_keys: Option<Vec<String>>,
    max_cache_life: Option<Duration>,
    revalidation_jitter: Option<f64>,
    signature_failure_policy: Option<SignatureFailurePolicy>,
}

impl CacheConfigBuilder {
    /// Set the attributes records are looked up by
    pub fn accessor_keys<S: AsRef<str>>(mut self, keys: &[S]) -> Self {
        self.accessor_keys = Some(keys.iter().map(|k| k.as_ref().to_string()).collect());
        self
    }

    /// Set the attributes `keys()` and `values()` are ordered by
    pub fn sort_keys<S: AsRef<str>>(mut self, keys: &[S]) -> Self {
        self.sort_keys = Some(keys.iter().map(|k| k.as_ref().to_string()).collect());
        self
    }

    pub fn max_cache_life(mut self, life: Duration) -> Self {
        self.max_cache_life = Some(life);
        self
    }

    pub fn revalidation_jitter(mut self, jitter: f64) -> Self {
        self.revalidation_jitter = Some(jitter);
        self
    }

    pub fn signature_failure_policy(mut self, policy: SignatureFailurePolicy) -> Self {
        self.signature_failure_policy = Some(policy);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<CacheConfig> {
        let defaults = CacheConfig::default();

        let config = CacheConfig {
            accessor_keys: self.accessor_keys.unwrap_or(defaults.accessor_keys),
            sort_keys: self.sort_keys.or(defaults.sort_keys),
            max_cache_life: self.max_cache_life.unwrap_or(defaults.max_cache_life),
            revalidation_jitter: self
                .revalidation_jitter
                .unwrap_or(defaults.revalidation_jitter),
            signature_failure_policy: self
                .signature_failure_policy
                .unwrap_or(defaults.signature_failure_policy),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Preset configurations
impl CacheConfig {
    /// Short window for tables edited from other processes during normal operation
    pub fn realtime() -> Self {
        Self {
            max_cache_life: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Long window with jitter for tables changed only by deployments
    pub fn static_content() -> Self {
        Self {
            max_cache_life: Duration::from_secs(15 * 60),
            revalidation_jitter: 0.10,
            ..Default::default()
        }
    }
}
