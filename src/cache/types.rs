//! Statistics for cache monitoring

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters describing how a model cache has been used
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookup calls (all kinds)
    pub lookups: u64,

    /// Lenient lookups that found nothing
    pub misses: u64,

    /// Lookups rejected with `BadCacheKey`
    pub key_errors: u64,

    /// Accesses served from the current snapshot without any query
    pub reuses: u64,

    /// Snapshots built and installed
    pub loads: u64,

    /// Load attempts that failed (source error or bad values)
    pub failed_loads: u64,

    /// Signature queries issued by scheduled re-checks
    pub signature_checks: u64,

    /// Re-checks that found the signature unchanged
    pub signatures_unchanged: u64,

    /// Re-checks that found a different signature
    pub reloads: u64,

    /// Snapshots dropped for any reason
    pub invalidations: u64,
}

impl CacheStats {
    /// Share of accesses answered without a query, as a percentage
    pub fn reuse_rate(&self) -> f64 {
        let total = self.reuses + self.signature_checks + self.loads + self.failed_loads;
        if total == 0 {
            0.0
        } else {
            (self.reuses as f64 / total as f64) * 100.0
        }
    }

    /// Lenient misses as a percentage of lookups
    pub fn miss_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            (self.misses as f64 / self.lookups as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ lookups: {}, misses: {}, key_errors: {}, reuse_rate: {:.2}%, loads: {}, reloads: {}, invalidations: {} }}",
            self.lookups,
            self.misses,
            self.key_errors,
            self.reuse_rate(),
            self.loads,
            self.reloads,
            self.invalidations
        )
    }
}
