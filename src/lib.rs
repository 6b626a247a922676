//! # refcache
//!
//! In-process caching of small reference tables (countries, statuses,
//! categories) that are read constantly and written rarely.
//!
//! ## Features
//!
//! - Whole-table snapshots, never partially refreshed
//! - Staleness window with a signature check instead of a full re-read
//! - Multi-level key index with strict and lenient lookups
//! - Deterministic iteration order
//! - Async-first design using tokio
//! - Neo4j-backed table sources
//!
//! ## Loading and lookup
//!
//! Nothing is read until the first access. After that, the snapshot is served
//! without any query for `max_cache_life` (60 seconds by default), then the
//! table's signature is compared and the table is re-read only if it changed.
//!
//! ```no_run
//! use refcache::{CacheConfig, CacheKey, ModelCache, Neo4jClient, Neo4jSettings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Neo4jClient::connect(&Neo4jSettings::from_env()).await?;
//!     let source = client.table_source("Rate", &["currency", "period", "value"])?;
//!     let rates = ModelCache::new(source, CacheConfig::keyed_by(&["currency", "period"]))?;
//!
//!     let rate = rates.get(&["EUR", "2024-Q1"]).await?;
//!     println!("{:?}", rate);
//!
//!     // mixed kinds: the last key decides what a miss means
//!     let maybe = rates
//!         .lookup(&[CacheKey::strict("EUR"), CacheKey::lenient("1999-Q4")])
//!         .await?;
//!     assert!(maybe.is_none());
//!     Ok(())
//! }
//! ```
//!
//! ## Process-wide caches
//!
//! One cache per table is kept in the [`CacheRegistry`]; writers notify it
//! after changing the table. Slots are named, so tables read through the same
//! source type stay apart.
//!
//! ```no_run
//! use refcache::{CacheConfig, CacheRegistry, ModelCache, Neo4jClient, Neo4jTableSource};
//!
//! # async fn example(client: Neo4jClient) -> anyhow::Result<()> {
//! let statuses = CacheRegistry::global()
//!     .get_or_init("Status", || {
//!         let source = client.table_source("Status", &["name"])?;
//!         ModelCache::new(source, CacheConfig::default())
//!     })
//!     .await?;
//! statuses.find(&["active"]).await?;
//!
//! // ... write to the Status table ...
//! CacheRegistry::global()
//!     .notify_write::<Neo4jTableSource>("Status")
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod connection;
pub mod error;
pub mod record;
pub mod source;

// Re-export main types for convenience
pub use cache::{
    CacheConfig, CacheConfigBuilder, CacheKey, CacheRegistry, CacheStats, InvalidationEvent,
    InvalidationReason, KeyKind, KeyPath, ModelCache, SignatureFailurePolicy, Snapshot,
};
pub use connection::{Neo4jClient, Neo4jSettings};
pub use error::{CacheError, Result};
pub use record::{AttrValue, Record, Row};
pub use source::{Neo4jTableSource, RecordSource, Signature, SignatureSource};
