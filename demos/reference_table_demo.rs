//! Reference Table Cache Demo
//!
//! Walks through the cache lifecycle against an in-memory table: first load,
//! reuse inside the staleness window, signature checks, reloads after a
//! change made "elsewhere", and write notifications.
//!
//! Usage:
//!   RUST_LOG=refcache=debug cargo run --example reference_table_demo

use refcache::cache::resolve_reference;
use refcache::{
    CacheConfig, CacheKey, ModelCache, Record, RecordSource, Result, Row, Signature,
    SignatureSource,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Currencies per country, keyed by (country, currency)
struct CurrencyTable {
    rows: Mutex<Vec<Row>>,
    version: AtomicI64,
}

impl CurrencyTable {
    fn new() -> Self {
        let table = Self {
            rows: Mutex::new(Vec::new()),
            version: AtomicI64::new(0),
        };
        table.insert("CH", "CHF", "Swiss franc");
        table.insert("DE", "EUR", "Euro");
        table.insert("US", "USD", "US dollar");
        table
    }

    fn insert(&self, country: &str, code: &str, name: &str) {
        if let Ok(mut rows) = self.rows.lock() {
            rows.push(
                Row::new()
                    .with("country", country)
                    .with("code", code)
                    .with("name", name),
            );
        }
        self.version.fetch_add(1, Ordering::SeqCst);
    }
}

impl RecordSource for CurrencyTable {
    type Record = Row;

    async fn fetch_all(&self) -> Result<Vec<Row>> {
        info!("  (query) fetching all currencies");
        let rows = self.rows.lock().map_err(|e| e.to_string())?.clone();
        Ok(rows)
    }
}

impl SignatureSource for CurrencyTable {
    async fn fetch_signature(&self) -> Result<Signature> {
        info!("  (query) fetching currency table signature");
        let count = self.rows.lock().map_err(|e| e.to_string())?.len() as i64;
        Ok(Signature::new(None, Some(self.version.load(Ordering::SeqCst)), count))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("=== Reference Table Cache Demo ===");

    let config = CacheConfig::builder()
        .accessor_keys(&["country", "code"])
        .sort_keys(&["name"])
        .max_cache_life(Duration::from_secs(2))
        .build()?;
    let currencies = ModelCache::new(CurrencyTable::new(), config)?;

    info!("\n--- First access loads the table ---");
    let euro = currencies.get(&["DE", "EUR"]).await?;
    info!("DE/EUR -> {}", euro.key_fragment("name")?);

    info!("\n--- Lookups inside the window issue no queries ---");
    for key in ["CH", "US"] {
        let found = currencies.find(&[key, "USD"]).await?;
        info!("{}/USD -> {:?}", key, found.map(|r| r.key_fragment("name")));
    }

    info!("\n--- Strict and lenient misses ---");
    match currencies.get(&["FR", "FRF"]).await {
        Ok(_) => info!("unexpected hit"),
        Err(e) => info!("strict miss: {}", e),
    }
    let lenient = currencies
        .lookup(&[CacheKey::strict("FR"), CacheKey::lenient("FRF")])
        .await?;
    info!("lenient miss: {:?}", lenient);

    info!("\n--- Ordered by name ---");
    for key in currencies.keys().await? {
        info!("  {}", key);
    }

    info!("\n--- Window passes, table unchanged: one signature query ---");
    tokio::time::sleep(Duration::from_millis(2100)).await;
    currencies.get(&["US", "USD"]).await?;

    info!("\n--- Another process adds a row ---");
    currencies.source().insert("JP", "JPY", "Yen");
    info!("JP/JPY before the window passes: {:?}", currencies.find(&["JP", "JPY"]).await?.is_some());
    tokio::time::sleep(Duration::from_millis(2100)).await;
    info!("JP/JPY after the window passes: {:?}", currencies.find(&["JP", "JPY"]).await?.is_some());

    info!("\n--- This process writes and notifies ---");
    currencies.source().insert("GB", "GBP", "Pound sterling");
    currencies.invalidate().await;
    info!("GB/GBP right after the write: {:?}", currencies.find(&["GB", "GBP"]).await?.is_some());

    info!("\n--- Resolving form input ---");
    let names = ModelCache::new(CurrencyTable::new(), CacheConfig::keyed_by(&["code"]))?;
    for input in [Some("CHF"), Some(""), None, Some("XXX")] {
        let resolved = resolve_reference(&names, input).await?;
        info!("{:?} -> {:?}", input, resolved.map(|r| r.key_fragment("name")));
    }

    info!("\n{}", currencies.stats().await);
    info!("=== Demo Complete ===");

    Ok(())
}
