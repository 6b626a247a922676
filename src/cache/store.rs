//! Per-table model cache with signature-driven revalidation

use crate::cache::{
    accessor,
    config::CacheConfig,
    invalidation::{InvalidationEvent, InvalidationReason, SignatureFailurePolicy},
    key::{CacheKey, KeyPath},
    snapshot::Snapshot,
    types::CacheStats,
};
use crate::error::{CacheError, Result};
use crate::source::{RecordSource, Signature, SignatureSource};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

type RecordOf<S> = <S as RecordSource>::Record;

/// Cache of one reference table, shared by every accessor in the process
///
/// The cache holds at most one snapshot of the table. A snapshot is served
/// without any query until `max_cache_life` has passed since it was last
/// validated; after that the next access compares the table's signature
/// with the snapshot's and either keeps serving it or rebuilds from scratch.
///
/// Loads and signature checks run single-flight: concurrent callers that
/// find the snapshot stale wait for the one doing the work and reuse its
/// result.
pub struct ModelCache<S: RecordSource + SignatureSource> {
    config: CacheConfig,
    source: S,
    state: RwLock<CacheState<RecordOf<S>>>,
    reload_lock: Mutex<()>,
    stats: Mutex<CacheStats>,
}

struct CacheState<R> {
    snapshot: Option<Arc<Snapshot<R>>>,

    /// Instant after which the snapshot must be re-checked
    valid_until: Option<Instant>,

    /// Bumped on every write notification
    generation: u64,

    last_invalidation: Option<InvalidationEvent>,
}

impl<R> Default for CacheState<R> {
    fn default() -> Self {
        Self {
            snapshot: None,
            valid_until: None,
            generation: 0,
            last_invalidation: None,
        }
    }
}

impl<R> CacheState<R> {
    fn fresh_snapshot(&self, now: Instant) -> Option<Arc<Snapshot<R>>> {
        match (&self.snapshot, self.valid_until) {
            (Some(snapshot), Some(valid_until)) if now < valid_until => Some(snapshot.clone()),
            _ => None,
        }
    }
}

impl<S: RecordSource + SignatureSource> ModelCache<S> {
    /// Create an empty cache; nothing is fetched until the first access
    pub fn new(source: S, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        info!(
            accessor_keys = ?config.accessor_keys,
            max_cache_life = ?config.max_cache_life,
            "Initializing model cache"
        );

        Ok(Self {
            config,
            source,
            state: RwLock::new(CacheState::default()),
            reload_lock: Mutex::new(()),
            stats: Mutex::new(CacheStats::default()),
        })
    }

    /// Look up one record by a full key path
    pub async fn lookup(&self, keys: &[CacheKey]) -> Result<Option<Arc<RecordOf<S>>>> {
        if keys.len() != self.config.depth() {
            let mut stats = self.stats.lock().await;
            stats.lookups += 1;
            stats.key_errors += 1;
            drop(stats);
            return Err(CacheError::BadCacheKey(format!(
                "Cache accessed by {} keys, expected {}",
                keys.len(),
                self.config.depth()
            )));
        }

        let snapshot = self.snapshot().await?;
        let result = accessor::lookup(snapshot.index(), keys, self.config.depth());

        let mut stats = self.stats.lock().await;
        stats.lookups += 1;
        match &result {
            Ok(None) => stats.misses += 1,
            Err(e) if e.is_key_error() => stats.key_errors += 1,
            _ => {}
        }
        drop(stats);

        if let Err(e) = &result {
            debug!("Strict cache lookup failed: {}", e);
        }
        result
    }

    /// Strict lookup: a missing key is an error
    pub async fn get<K: AsRef<str>>(&self, keys: &[K]) -> Result<Arc<RecordOf<S>>> {
        let keys: Vec<CacheKey> = keys.iter().map(|k| CacheKey::strict(k.as_ref())).collect();
        match self.lookup(&keys).await? {
            Some(record) => Ok(record),
            None => Err(CacheError::BadCacheKey(
                KeyPath::from_components(keys.iter().map(|k| k.as_str().to_string()).collect())
                    .to_string(),
            )),
        }
    }

    /// Lenient lookup: a missing key yields `None`
    pub async fn find<K: AsRef<str>>(&self, keys: &[K]) -> Result<Option<Arc<RecordOf<S>>>> {
        let keys: Vec<CacheKey> = keys.iter().map(|k| CacheKey::lenient(k.as_ref())).collect();
        self.lookup(&keys).await
    }

    /// Key paths of all records, in sort order
    pub async fn keys(&self) -> Result<Vec<KeyPath>> {
        Ok(self.snapshot().await?.keys().to_vec())
    }

    /// All records, in sort order
    pub async fn values(&self) -> Result<Vec<Arc<RecordOf<S>>>> {
        Ok(self.snapshot().await?.values().to_vec())
    }

    /// Current valid snapshot, loading or revalidating it first if needed
    pub async fn snapshot(&self) -> Result<Arc<Snapshot<RecordOf<S>>>> {
        if let Some(snapshot) = self.fresh_snapshot().await {
            self.stats.lock().await.reuses += 1;
            return Ok(snapshot);
        }

        let _reload = self.reload_lock.lock().await;

        // another caller may have finished the work while we waited
        if let Some(snapshot) = self.fresh_snapshot().await {
            self.stats.lock().await.reuses += 1;
            return Ok(snapshot);
        }

        let (current, generation) = {
            let state = self.state.read().await;
            (state.snapshot.clone(), state.generation)
        };

        let signature = match current {
            Some(current) => match self.revalidate(current, generation).await? {
                Revalidation::Unchanged(snapshot) => return Ok(snapshot),
                Revalidation::Changed(signature) => Some(signature),
            },
            None => None,
        };

        self.load(signature, generation).await
    }

    /// Drop the snapshot after a write to the table by this process
    ///
    /// Snapshots already handed out stay usable by their holders. A load that
    /// is in flight when this runs does not install its result.
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        let dropped = state.snapshot.take();
        state.valid_until = None;
        state.generation += 1;
        state.last_invalidation = Some(InvalidationEvent::new(
            InvalidationReason::WriteNotification,
            dropped.as_ref().map(|s| s.signature().clone()),
        ));
        drop(state);

        if dropped.is_some() {
            info!("Model cache invalidated by write notification");
        } else {
            debug!("Write notification on an empty model cache");
        }
        self.stats.lock().await.invalidations += 1;
    }

    /// Whether a snapshot is currently held, fresh or not
    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.snapshot.is_some()
    }

    pub async fn stats(&self) -> CacheStats {
        self.stats.lock().await.clone()
    }

    pub async fn last_invalidation(&self) -> Option<InvalidationEvent> {
        self.state.read().await.last_invalidation.clone()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    async fn fresh_snapshot(&self) -> Option<Arc<Snapshot<RecordOf<S>>>> {
        self.state.read().await.fresh_snapshot(Instant::now())
    }

    fn next_deadline(&self) -> Instant {
        Instant::now() + self.config.max_cache_life_with_jitter()
    }

    /// Compare the table's signature with a stale snapshot's
    async fn revalidate(
        &self,
        current: Arc<Snapshot<RecordOf<S>>>,
        generation: u64,
    ) -> Result<Revalidation<RecordOf<S>>> {
        self.stats.lock().await.signature_checks += 1;

        let signature = match self.source.fetch_signature().await {
            Ok(signature) => signature,
            Err(e) => {
                warn!("Signature check failed: {}", e);
                if self.config.signature_failure_policy == SignatureFailurePolicy::Discard {
                    let event = InvalidationEvent::new(
                        InvalidationReason::SignatureUnavailable,
                        Some(current.signature().clone()),
                    )
                    .with_context(e.to_string());
                    self.discard(generation, event).await;
                }
                return Err(e);
            }
        };

        if &signature == current.signature() {
            debug!(%signature, "Signature unchanged, keeping snapshot");
            let mut state = self.state.write().await;
            if state.generation == generation {
                state.valid_until = Some(self.next_deadline());
            }
            drop(state);
            self.stats.lock().await.signatures_unchanged += 1;
            return Ok(Revalidation::Unchanged(current));
        }

        info!(old = %current.signature(), new = %signature, "Signature changed, reloading");
        self.stats.lock().await.reloads += 1;
        let event = InvalidationEvent::new(
            InvalidationReason::SignatureChanged,
            Some(current.signature().clone()),
        )
        .with_context(format!("{} -> {}", current.signature(), signature));
        self.discard(generation, event).await;

        Ok(Revalidation::Changed(signature))
    }

    /// Drop the snapshot unless a write notification already did
    async fn discard(&self, generation: u64, event: InvalidationEvent) {
        let mut state = self.state.write().await;
        if state.generation != generation {
            return;
        }
        state.snapshot = None;
        state.valid_until = None;
        state.last_invalidation = Some(event);
        drop(state);

        self.stats.lock().await.invalidations += 1;
    }

    /// Fetch and build a new snapshot, installing it if no write intervened
    async fn load(
        &self,
        signature: Option<Signature>,
        generation: u64,
    ) -> Result<Arc<Snapshot<RecordOf<S>>>> {
        let snapshot = match self.build(signature).await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                warn!("Model cache load failed: {}", e);
                self.stats.lock().await.failed_loads += 1;
                return Err(e);
            }
        };

        let mut state = self.state.write().await;
        let installed = state.generation == generation;
        if installed {
            state.snapshot = Some(snapshot.clone());
            state.valid_until = Some(self.next_deadline());
        }
        drop(state);

        if installed {
            info!(
                records = snapshot.len(),
                signature = %snapshot.signature(),
                "Model cache loaded"
            );
            self.stats.lock().await.loads += 1;
        } else {
            debug!("Write notification during load, not installing snapshot");
        }
        Ok(snapshot)
    }

    async fn build(&self, signature: Option<Signature>) -> Result<Snapshot<RecordOf<S>>> {
        // the signature is taken before the records so that a concurrent
        // write can only make the snapshot look older than it is
        let signature = match signature {
            Some(signature) => signature,
            None => self.source.fetch_signature().await?,
        };
        let records = self.source.fetch_all().await?;
        debug!(count = records.len(), "Fetched records");

        Snapshot::build(records, signature, &self.config)
    }
}

enum Revalidation<R> {
    Unchanged(Arc<Snapshot<R>>),
    Changed(Signature),
}
