//! Deterministic iteration order for cached keys and values
//!
//! Index maps have no stable order, so `keys()` and `values()` are served from
//! lists computed once per snapshot.

use crate::cache::key::KeyPath;
use crate::error::Result;
use crate::record::Record;
use std::sync::Arc;

/// Sort records by the concatenated string forms of `sort_keys`
///
/// Comparison is byte-wise on the composite string. The sort is stable, so
/// records with equal composites keep their fetch order.
pub fn ordered_values<R: Record>(records: &[Arc<R>], sort_keys: &[String]) -> Result<Vec<Arc<R>>> {
    let mut keyed = records
        .iter()
        .map(|record| -> Result<(String, Arc<R>)> {
            Ok((composite_sort_key(record.as_ref(), sort_keys)?, Arc::clone(record)))
        })
        .collect::<Result<Vec<_>>>()?;

    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));

    Ok(keyed.into_iter().map(|(_, record)| record).collect())
}

/// Key path of every record, in the order of `values`
pub fn ordered_keys<R: Record>(values: &[Arc<R>], accessor_keys: &[String]) -> Result<Vec<KeyPath>> {
    values
        .iter()
        .map(|record| -> Result<KeyPath> {
            let components = accessor_keys
                .iter()
                .map(|attribute| record.key_fragment(attribute))
                .collect::<Result<Vec<_>>>()?;
            Ok(KeyPath::from_components(components))
        })
        .collect()
}

fn composite_sort_key<R: Record>(record: &R, sort_keys: &[String]) -> Result<String> {
    let mut composite = String::new();
    for attribute in sort_keys {
        composite.push_str(&record.key_fragment(attribute)?);
    }
    Ok(composite)
}
