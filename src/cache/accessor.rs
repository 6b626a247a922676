//! Multi-key lookup against a snapshot's index
//!
//! The kind of the last supplied key decides what a miss means for the whole
//! call, at whatever level the miss happens.

use crate::cache::index::IndexNode;
use crate::cache::key::CacheKey;
use crate::error::{CacheError, Result};
use std::sync::Arc;

/// Resolve `keys` against an index of `depth` levels
///
/// * `Err(BadCacheKey)` if `keys.len() != depth`, or a component is missing
///   and the last component is strict.
/// * `Ok(None)` if a component is missing and the last component is lenient.
/// * `Ok(Some(record))` if every component resolves.
pub fn lookup<R>(index: &IndexNode<R>, keys: &[CacheKey], depth: usize) -> Result<Option<Arc<R>>> {
    let last = match keys.last() {
        Some(last) if keys.len() == depth => last,
        _ => {
            return Err(CacheError::BadCacheKey(format!(
                "Cache accessed by {} keys, expected {}",
                keys.len(),
                depth
            )))
        }
    };

    let mut node = index;
    for key in keys {
        match node.child(key.as_str()) {
            Some(child) => node = child,
            None if last.is_strict() => {
                return Err(CacheError::BadCacheKey(key.as_str().to_string()));
            }
            None => return Ok(None),
        }
    }

    Ok(node.as_record().cloned())
}
