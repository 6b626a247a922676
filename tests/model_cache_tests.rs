//! Integration tests for the model cache lifecycle
//!
//! Time is paused so the staleness window can be crossed without waiting.

use refcache::{
    CacheConfig, CacheError, CacheKey, InvalidationReason, KeyPath, ModelCache, Record,
    RecordSource, Result, Row, Signature, SignatureFailurePolicy, SignatureSource,
};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PAST_WINDOW: Duration = Duration::from_secs(61);

fn row(name: &str) -> Row {
    Row::new()
        .with("name", name)
        .with("key1", format!("{name}1"))
        .with("key2", format!("{name}2"))
        .with("reversed_name", name.chars().rev().collect::<String>())
}

/// In-memory table that counts the queries made against it
#[derive(Default)]
struct MockTable {
    rows: Mutex<Vec<Row>>,
    version: AtomicI64,
    record_calls: AtomicUsize,
    signature_calls: AtomicUsize,
    signature_down: AtomicBool,
    fetch_delay: Duration,
}

impl MockTable {
    fn with_names(names: &[&str]) -> Self {
        let table = Self::default();
        table.write(names);
        table
    }

    fn slow(names: &[&str], fetch_delay: Duration) -> Self {
        Self {
            fetch_delay,
            ..Self::with_names(names)
        }
    }

    /// Replace the table contents, as another process would
    fn write(&self, names: &[&str]) {
        *self.rows.lock().unwrap() = names.iter().map(|n| row(n)).collect();
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }

    fn signature_calls(&self) -> usize {
        self.signature_calls.load(Ordering::SeqCst)
    }

    fn set_signature_down(&self, down: bool) {
        self.signature_down.store(down, Ordering::SeqCst);
    }
}

impl RecordSource for MockTable {
    type Record = Row;

    async fn fetch_all(&self) -> Result<Vec<Row>> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().unwrap().clone();
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        Ok(rows)
    }
}

impl SignatureSource for MockTable {
    async fn fetch_signature(&self) -> Result<Signature> {
        self.signature_calls.fetch_add(1, Ordering::SeqCst);
        if self.signature_down.load(Ordering::SeqCst) {
            return Err(CacheError::SourceUnavailable(
                "signature query timed out".to_string(),
            ));
        }
        let count = self.rows.lock().unwrap().len() as i64;
        Ok(Signature::new(None, Some(self.version.load(Ordering::SeqCst)), count))
    }
}

fn name_cache(names: &[&str]) -> ModelCache<MockTable> {
    ModelCache::new(MockTable::with_names(names), CacheConfig::default()).unwrap()
}

fn composite_cache() -> ModelCache<MockTable> {
    ModelCache::new(
        MockTable::with_names(&["foo", "bar"]),
        CacheConfig::keyed_by(&["key1", "key2"]),
    )
    .unwrap()
}

fn name(record: &Row) -> String {
    record.key_fragment("name").unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_repeated_lookups_within_window_query_once() {
    let cache = name_cache(&["foo", "bar"]);

    for _ in 0..100 {
        cache.get(&["foo"]).await.unwrap();
        cache.find(&["nope"]).await.unwrap();
        cache.values().await.unwrap();
        tokio::time::advance(Duration::from_millis(500)).await;
    }

    assert_eq!(cache.source().signature_calls(), 1);
    assert_eq!(cache.source().record_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_changes_within_window_are_not_seen() {
    let cache = name_cache(&["foo"]);
    assert!(cache.find(&["bar"]).await.unwrap().is_none());

    cache.source().write(&["foo", "bar"]);
    tokio::time::advance(Duration::from_secs(30)).await;
    assert!(cache.find(&["bar"]).await.unwrap().is_none());

    tokio::time::advance(Duration::from_secs(31)).await;
    assert!(cache.find(&["bar"]).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_signature_skips_record_fetch() {
    let cache = name_cache(&["foo", "bar"]);
    let before = cache.values().await.unwrap();

    tokio::time::advance(PAST_WINDOW).await;
    let after = cache.values().await.unwrap();

    assert_eq!(cache.source().signature_calls(), 2);
    assert_eq!(cache.source().record_calls(), 1);
    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(&after) {
        assert!(Arc::ptr_eq(a, b));
    }

    // the check restarted the window
    tokio::time::advance(Duration::from_secs(30)).await;
    cache.values().await.unwrap();
    assert_eq!(cache.source().signature_calls(), 2);

    let stats = cache.stats().await;
    assert_eq!(stats.signatures_unchanged, 1);
    assert_eq!(stats.reloads, 0);
}

#[tokio::test(start_paused = true)]
async fn test_changed_signature_reloads_once() {
    let cache = name_cache(&["foo"]);
    let old_snapshot = cache.snapshot().await.unwrap();

    cache.source().write(&["foo", "bar"]);
    tokio::time::advance(PAST_WINDOW).await;

    let bar = cache.get(&["bar"]).await.unwrap();
    assert_eq!(name(&bar), "bar");

    // one signature query per load or check, never a second one for the reload
    assert_eq!(cache.source().signature_calls(), 2);
    assert_eq!(cache.source().record_calls(), 2);

    let new_snapshot = cache.snapshot().await.unwrap();
    assert_ne!(old_snapshot.id(), new_snapshot.id());
    assert_eq!(new_snapshot.signature().count, 2);

    let event = cache.last_invalidation().await.unwrap();
    assert_eq!(event.reason, InvalidationReason::SignatureChanged);
    assert_eq!(event.signature.as_ref(), Some(old_snapshot.signature()));
}

#[tokio::test(start_paused = true)]
async fn test_wrong_arity_is_bad_key() {
    let cache = name_cache(&["foo", "bar"]);
    let no_keys: [&str; 0] = [];

    assert!(cache.get(&no_keys).await.unwrap_err().is_key_error());
    assert!(cache.find(&no_keys).await.unwrap_err().is_key_error());
    assert!(cache.get(&["foo", "bar"]).await.unwrap_err().is_key_error());
    assert!(cache.find(&["foo", "bar"]).await.unwrap_err().is_key_error());

    let cache = composite_cache();
    assert!(cache.get(&["foo1"]).await.unwrap_err().is_key_error());
    assert!(cache.find(&["foo1"]).await.unwrap_err().is_key_error());
    assert!(cache
        .find(&["foo1", "foo2", "foo3"])
        .await
        .unwrap_err()
        .is_key_error());
}

#[tokio::test(start_paused = true)]
async fn test_miss_depends_on_key_kind() {
    let cache = name_cache(&["foo", "bar"]);

    assert_eq!(name(&cache.get(&["foo"]).await.unwrap()), "foo");
    assert_eq!(name(&cache.find(&["bar"]).await.unwrap().unwrap()), "bar");

    let err = cache.get(&["nondef"]).await.unwrap_err();
    assert!(matches!(err, CacheError::BadCacheKey(ref key) if key == "nondef"));
    assert!(cache.find(&["nondef"]).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_composite_keys() {
    let cache = composite_cache();

    assert_eq!(name(&cache.get(&["foo1", "foo2"]).await.unwrap()), "foo");
    assert_eq!(name(&cache.find(&["bar1", "bar2"]).await.unwrap().unwrap()), "bar");

    assert!(cache.get(&["undef", "foo2"]).await.unwrap_err().is_key_error());
    assert!(cache.get(&["foo1", "nondef"]).await.unwrap_err().is_key_error());
    assert!(cache.find(&["nondef", "foo2"]).await.unwrap().is_none());
    assert!(cache.find(&["foo1", "nondef"]).await.unwrap().is_none());

    // the last component decides
    assert!(cache
        .lookup(&[CacheKey::strict("nondef"), CacheKey::lenient("foo2")])
        .await
        .unwrap()
        .is_none());
    assert!(cache
        .lookup(&[CacheKey::lenient("nondef"), CacheKey::strict("foo2")])
        .await
        .unwrap_err()
        .is_key_error());
}

#[tokio::test(start_paused = true)]
async fn test_ordering_is_deterministic() {
    let cache = name_cache(&["foo", "bar", "baz"]);

    let first: Vec<String> = cache.values().await.unwrap().iter().map(|r| name(r)).collect();
    let second: Vec<String> = cache.values().await.unwrap().iter().map(|r| name(r)).collect();
    assert_eq!(first, vec!["bar", "baz", "foo"]);
    assert_eq!(first, second);

    assert_eq!(
        cache.keys().await.unwrap(),
        vec![
            KeyPath::Single("bar".into()),
            KeyPath::Single("baz".into()),
            KeyPath::Single("foo".into()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_custom_sort_keys() {
    let config = CacheConfig::builder()
        .accessor_keys(&["name"])
        .sort_keys(&["reversed_name"])
        .build()
        .unwrap();
    let cache = ModelCache::new(MockTable::with_names(&["bar", "foo"]), config).unwrap();

    // "oof" < "rab"
    let values: Vec<String> = cache.values().await.unwrap().iter().map(|r| name(r)).collect();
    assert_eq!(values, vec!["foo", "bar"]);
    assert_eq!(
        cache.keys().await.unwrap(),
        vec![KeyPath::Single("foo".into()), KeyPath::Single("bar".into())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_composite_keys_are_tuples() {
    let cache = composite_cache();
    assert_eq!(
        cache.keys().await.unwrap(),
        vec![
            KeyPath::Composite(vec!["bar1".into(), "bar2".into()]),
            KeyPath::Composite(vec!["foo1".into(), "foo2".into()]),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_keys_fail_the_load() {
    let cache = name_cache(&["foo", "foo"]);

    let err = cache.find(&["foo"]).await.unwrap_err();
    assert!(matches!(err, CacheError::BadCacheValues(_)));
    assert!(!cache.is_loaded().await);

    // nothing was installed, so the next access tries again
    cache.find(&["foo"]).await.unwrap_err();
    assert_eq!(cache.source().record_calls(), 2);
    assert_eq!(cache.stats().await.failed_loads, 2);
}

#[tokio::test(start_paused = true)]
async fn test_bad_reload_leaves_cache_empty() {
    let cache = name_cache(&["foo"]);
    cache.get(&["foo"]).await.unwrap();

    cache.source().write(&["foo", "foo"]);
    tokio::time::advance(PAST_WINDOW).await;

    let err = cache.get(&["foo"]).await.unwrap_err();
    assert!(matches!(err, CacheError::BadCacheValues(_)));
    assert!(!cache.is_loaded().await);

    cache.source().write(&["foo", "bar"]);
    assert_eq!(name(&cache.get(&["bar"]).await.unwrap()), "bar");
}

#[tokio::test(start_paused = true)]
async fn test_signature_failure_retains_snapshot() {
    let cache = name_cache(&["foo"]);
    let before = cache.get(&["foo"]).await.unwrap();

    cache.source().set_signature_down(true);
    tokio::time::advance(PAST_WINDOW).await;

    let err = cache.get(&["foo"]).await.unwrap_err();
    assert!(matches!(err, CacheError::SourceUnavailable(_)));
    assert!(cache.is_loaded().await);

    // the next access retries the check and keeps the same records
    cache.source().set_signature_down(false);
    let after = cache.get(&["foo"]).await.unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(cache.source().signature_calls(), 3);
    assert_eq!(cache.source().record_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_signature_failure_can_discard_snapshot() {
    let config = CacheConfig::builder()
        .signature_failure_policy(SignatureFailurePolicy::Discard)
        .build()
        .unwrap();
    let cache = ModelCache::new(MockTable::with_names(&["foo"]), config).unwrap();
    cache.get(&["foo"]).await.unwrap();

    cache.source().set_signature_down(true);
    tokio::time::advance(PAST_WINDOW).await;

    let err = cache.get(&["foo"]).await.unwrap_err();
    assert!(matches!(err, CacheError::SourceUnavailable(_)));
    assert!(!cache.is_loaded().await);

    let event = cache.last_invalidation().await.unwrap();
    assert_eq!(event.reason, InvalidationReason::SignatureUnavailable);

    cache.source().set_signature_down(false);
    cache.get(&["foo"]).await.unwrap();
    assert_eq!(cache.source().record_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_first_access_loads_once() {
    let cache = ModelCache::new(
        MockTable::slow(&["foo", "bar"], Duration::from_millis(50)),
        CacheConfig::default(),
    )
    .unwrap();

    let lookups = (0..20).map(|i| {
        let cache = &cache;
        async move {
            let key = if i % 2 == 0 { "foo" } else { "bar" };
            cache.get(&[key]).await
        }
    });
    let results = futures::future::join_all(lookups).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(cache.source().record_calls(), 1);
    assert_eq!(cache.source().signature_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_revalidation_checks_once() {
    let cache = name_cache(&["foo"]);
    cache.get(&["foo"]).await.unwrap();
    tokio::time::advance(PAST_WINDOW).await;

    let results = futures::future::join_all((0..10).map(|_| cache.get(&["foo"]))).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(cache.source().signature_calls(), 2);
    assert_eq!(cache.source().record_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_during_load_is_not_lost() {
    let cache = ModelCache::new(
        MockTable::slow(&["foo"], Duration::from_millis(50)),
        CacheConfig::default(),
    )
    .unwrap();

    let (loaded, _) = tokio::join!(cache.values(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.source().write(&["foo", "bar"]);
        cache.invalidate().await;
    });

    // the caller still gets the records it waited for, but they are not kept
    assert_eq!(loaded.unwrap().len(), 1);
    assert!(!cache.is_loaded().await);

    assert_eq!(cache.values().await.unwrap().len(), 2);
    assert_eq!(cache.source().record_calls(), 2);

    // only the installed snapshot counts as a load
    let stats = cache.stats().await;
    assert_eq!(stats.loads, 1);
    assert_eq!(stats.invalidations, 1);
}

#[tokio::test(start_paused = true)]
async fn test_handed_out_snapshots_survive_invalidation() {
    let cache = name_cache(&["foo"]);
    let snapshot = cache.snapshot().await.unwrap();

    cache.invalidate().await;

    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.index().child("foo").is_some());
    assert_eq!(
        cache.last_invalidation().await.unwrap().reason,
        InvalidationReason::WriteNotification
    );
}

#[tokio::test(start_paused = true)]
async fn test_every_listed_key_resolves() {
    let cache = composite_cache();

    let keys = cache.keys().await.unwrap();
    let values = cache.values().await.unwrap();
    for (key, value) in keys.iter().zip(&values) {
        let found = cache.lookup(&key.to_strict_keys()).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&found, value));
    }
}

#[tokio::test(start_paused = true)]
async fn test_jitter_never_extends_the_window() {
    let config = CacheConfig::builder()
        .revalidation_jitter(0.5)
        .build()
        .unwrap();
    let cache = ModelCache::new(MockTable::with_names(&["foo"]), config).unwrap();

    for round in 1..=20 {
        cache.get(&["foo"]).await.unwrap();
        tokio::time::advance(refcache::cache::MAX_CACHE_LIFE).await;
        cache.get(&["foo"]).await.unwrap();
        assert_eq!(cache.source().signature_calls(), round + 1);
    }
}
