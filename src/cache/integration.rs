//! Helpers for resolving reference values coming from user input
//!
//! Forms and imports usually carry a reference as its name rather than as a
//! record. These helpers turn such a value into a cached record before it is
//! handed to a caller-supplied setter.

use crate::cache::store::ModelCache;
use crate::error::Result;
use crate::source::{RecordSource, SignatureSource};
use std::sync::Arc;

/// Resolve an optional input value against `cache`
///
/// Blank input (absent, empty or whitespace only) resolves to `None` without
/// touching the cache. Anything else is a lenient lookup of the value as
/// given, so unknown values also resolve to `None`.
pub async fn resolve_reference<S>(
    cache: &ModelCache<S>,
    value: Option<&str>,
) -> Result<Option<Arc<S::Record>>>
where
    S: RecordSource + SignatureSource,
{
    match value {
        Some(value) if !value.trim().is_empty() => cache.find(&[value]).await,
        _ => Ok(None),
    }
}

/// Resolve `value` and pass the result to `assign`
///
/// `assign` is not called when the lookup itself fails.
pub async fn assign_reference<S, F>(
    cache: &ModelCache<S>,
    value: Option<&str>,
    assign: F,
) -> Result<()>
where
    S: RecordSource + SignatureSource,
    F: FnOnce(Option<Arc<S::Record>>),
{
    let record = resolve_reference(cache, value).await?;
    assign(record);
    Ok(())
}
