//! Process-wide lookup of model caches by table

use crate::cache::store::ModelCache;
use crate::error::{CacheError, Result};
use crate::source::{RecordSource, SignatureSource};
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

static GLOBAL: Lazy<CacheRegistry> = Lazy::new(CacheRegistry::new);

/// Slot identity: the source type and the table it reads
type SlotKey = (TypeId, String);

fn slot<S: 'static>(table: &str) -> SlotKey {
    (TypeId::of::<S>(), table.to_string())
}

/// One `ModelCache` per table
///
/// Slots are keyed by the table name together with the source type, so
/// several tables read through the same source implementation (one Neo4j
/// label each, say) never share a cache. Caches are created on first request
/// and live as long as the registry.
#[derive(Default)]
pub struct CacheRegistry {
    caches: RwLock<HashMap<SlotKey, Arc<dyn Any + Send + Sync>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry shared by the whole process
    pub fn global() -> &'static CacheRegistry {
        &GLOBAL
    }

    /// Cache registered for `table` with source type `S`, if any
    pub async fn get<S>(&self, table: &str) -> Option<Arc<ModelCache<S>>>
    where
        S: RecordSource + SignatureSource + 'static,
    {
        let caches = self.caches.read().await;
        caches
            .get(&slot::<S>(table))
            .cloned()
            .and_then(|cache| cache.downcast::<ModelCache<S>>().ok())
    }

    /// Cache for `table`, creating it with `init` on first use
    ///
    /// `init` runs at most once per table; it only constructs the cache,
    /// records are fetched on first access.
    pub async fn get_or_init<S, F>(&self, table: &str, init: F) -> Result<Arc<ModelCache<S>>>
    where
        S: RecordSource + SignatureSource + 'static,
        F: FnOnce() -> Result<ModelCache<S>>,
    {
        if table.trim().is_empty() {
            return Err(CacheError::InvalidConfiguration(
                "table name must not be blank".to_string(),
            ));
        }

        if let Some(cache) = self.get::<S>(table).await {
            return Ok(cache);
        }

        let key = slot::<S>(table);
        let mut caches = self.caches.write().await;
        if let Some(cache) = caches
            .get(&key)
            .cloned()
            .and_then(|cache| cache.downcast::<ModelCache<S>>().ok())
        {
            return Ok(cache);
        }

        let cache = Arc::new(init()?);
        caches.insert(key, cache.clone());
        debug!(
            table,
            source = std::any::type_name::<S>(),
            "Registered model cache"
        );
        Ok(cache)
    }

    /// Forward a write notification to the cache for `table`
    ///
    /// Returns `false` when no cache is registered, in which case there is
    /// nothing to invalidate.
    pub async fn notify_write<S>(&self, table: &str) -> bool
    where
        S: RecordSource + SignatureSource + 'static,
    {
        match self.get::<S>(table).await {
            Some(cache) => {
                cache.invalidate().await;
                true
            }
            None => false,
        }
    }

    pub async fn contains<S: 'static>(&self, table: &str) -> bool {
        self.caches.read().await.contains_key(&slot::<S>(table))
    }

    pub async fn len(&self) -> usize {
        self.caches.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.caches.read().await.is_empty()
    }
}
