//! Hierarchical index over a flat record set
//!
//! One level per accessor attribute. Records are bucketed by the canonical
//! string form of the level's attribute and the buckets are indexed
//! recursively; once the attributes run out each bucket must hold exactly one
//! record.

use crate::error::{CacheError, Result};
use crate::record::Record;
use std::collections::HashMap;
use std::sync::Arc;

/// A node of the index: either a further level or the single record at a full key path
#[derive(Debug)]
pub enum IndexNode<R> {
    Branch(HashMap<String, IndexNode<R>>),
    Leaf(Arc<R>),
}

impl<R: Record> IndexNode<R> {
    /// Build the index for `records` keyed by `attributes` in order
    ///
    /// Fails with `BadCacheValues` if any full key path matches zero or more
    /// than one record, or a record lacks one of the attributes.
    pub fn build(records: &[Arc<R>], attributes: &[String]) -> Result<Self> {
        let bucket: Vec<&Arc<R>> = records.iter().collect();
        let mut path = Vec::with_capacity(attributes.len());
        Self::build_level(bucket, attributes, &mut path)
    }

    fn build_level(
        bucket: Vec<&Arc<R>>,
        attributes: &[String],
        path: &mut Vec<String>,
    ) -> Result<Self> {
        let Some((attribute, rest)) = attributes.split_first() else {
            return match bucket.as_slice() {
                [record] => Ok(IndexNode::Leaf(Arc::clone(*record))),
                [] => Err(CacheError::BadCacheValues(format!(
                    "No cache entry found for key [{}]",
                    path.join(", ")
                ))),
                many => Err(CacheError::BadCacheValues(format!(
                    "Non deterministic search result, {} cache entries found for key [{}]",
                    many.len(),
                    path.join(", ")
                ))),
            };
        };

        let mut buckets: HashMap<String, Vec<&Arc<R>>> = HashMap::new();
        for record in bucket {
            buckets
                .entry(record.key_fragment(attribute)?)
                .or_default()
                .push(record);
        }

        let mut children = HashMap::with_capacity(buckets.len());
        for (fragment, bucket) in buckets {
            path.push(fragment.clone());
            let child = Self::build_level(bucket, rest, path)?;
            path.pop();
            children.insert(fragment, child);
        }

        Ok(IndexNode::Branch(children))
    }
}

impl<R> IndexNode<R> {
    /// Child node for a key fragment; leaves have no children
    pub fn child(&self, fragment: &str) -> Option<&IndexNode<R>> {
        match self {
            IndexNode::Branch(children) => children.get(fragment),
            IndexNode::Leaf(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&Arc<R>> {
        match self {
            IndexNode::Leaf(record) => Some(record),
            IndexNode::Branch(_) => None,
        }
    }

    /// Number of direct children (zero for a leaf)
    pub fn len(&self) -> usize {
        match self {
            IndexNode::Branch(children) => children.len(),
            IndexNode::Leaf(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records reachable from this node
    pub fn record_count(&self) -> usize {
        match self {
            IndexNode::Branch(children) => children.values().map(IndexNode::record_count).sum(),
            IndexNode::Leaf(_) => 1,
        }
    }
}
