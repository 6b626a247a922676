//! Lookup keys and ordered key paths

use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a lookup reacts when a key component is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// The key must resolve; a miss is a `BadCacheKey` error
    Strict,
    /// A miss yields an empty result
    Lenient,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Strict => "strict",
            KeyKind::Lenient => "lenient",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(KeyKind::Strict),
            "lenient" => Ok(KeyKind::Lenient),
            other => Err(CacheError::InvalidConfiguration(format!(
                "Unknown kind of cache key '{}'",
                other
            ))),
        }
    }
}

/// One component of a lookup
///
/// The value is normalized to its string form on construction, matching the
/// canonical form the index is built with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: KeyKind,
    value: String,
}

impl CacheKey {
    pub fn new(kind: KeyKind, value: impl ToString) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }

    pub fn strict(value: impl ToString) -> Self {
        Self::new(KeyKind::Strict, value)
    }

    pub fn lenient(value: impl ToString) -> Self {
        Self::new(KeyKind::Lenient, value)
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn is_strict(&self) -> bool {
        self.kind == KeyKind::Strict
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Full key of one cached record, in accessor-key order
///
/// Single-attribute caches yield atomic keys rather than one-element tuples.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPath {
    Single(String),
    Composite(Vec<String>),
}

impl KeyPath {
    pub fn from_components(mut components: Vec<String>) -> Self {
        if components.len() == 1 {
            KeyPath::Single(components.remove(0))
        } else {
            KeyPath::Composite(components)
        }
    }

    pub fn components(&self) -> Vec<&str> {
        match self {
            KeyPath::Single(key) => vec![key.as_str()],
            KeyPath::Composite(keys) => keys.iter().map(String::as_str).collect(),
        }
    }

    /// Strict lookup keys addressing this path
    pub fn to_strict_keys(&self) -> Vec<CacheKey> {
        self.components().into_iter().map(CacheKey::strict).collect()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPath::Single(key) => f.write_str(key),
            KeyPath::Composite(keys) => write!(f, "[{}]", keys.join(", ")),
        }
    }
}
