//! One fully-built, immutable cache generation

use crate::cache::config::CacheConfig;
use crate::cache::index::IndexNode;
use crate::cache::key::KeyPath;
use crate::cache::ordering::{ordered_keys, ordered_values};
use crate::error::Result;
use crate::record::Record;
use crate::source::Signature;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Index, orderings and the signature the records were fetched under
///
/// Never mutated after construction; a reload replaces the whole value.
#[derive(Debug)]
pub struct Snapshot<R> {
    id: Uuid,
    index: IndexNode<R>,
    keys: Vec<KeyPath>,
    values: Vec<Arc<R>>,
    signature: Signature,
    built_at: DateTime<Utc>,
}

impl<R: Record> Snapshot<R> {
    /// Build a snapshot from a freshly fetched record set
    pub fn build(records: Vec<R>, signature: Signature, config: &CacheConfig) -> Result<Self> {
        let records: Vec<Arc<R>> = records.into_iter().map(Arc::new).collect();

        let index = IndexNode::build(&records, &config.accessor_keys)?;
        let values = ordered_values(&records, config.effective_sort_keys())?;
        let keys = ordered_keys(&values, &config.accessor_keys)?;

        Ok(Self {
            id: Uuid::new_v4(),
            index,
            keys,
            values,
            signature,
            built_at: Utc::now(),
        })
    }
}

impl<R> Snapshot<R> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn index(&self) -> &IndexNode<R> {
        &self.index
    }

    /// Key paths in sort order
    pub fn keys(&self) -> &[KeyPath] {
        &self.keys
    }

    /// Records in sort order
    pub fn values(&self) -> &[Arc<R>] {
        &self.values
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
