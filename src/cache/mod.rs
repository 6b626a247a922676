//! # Reference-Table Cache
//!
//! Keeps one whole small table per process in memory, indexed by one or more
//! attributes, and decides when that copy has to be rebuilt.
//!
//! ## Features
//!
//! - **Signature Revalidation**: after `max_cache_life` a cheap aggregate over
//!   the table is compared with the one the snapshot was built under; an
//!   unchanged table is never re-read
//! - **Hierarchical Index**: records are addressed by a path of attribute
//!   values, one level per accessor key
//! - **Strict/Lenient Lookups**: the kind of the last key decides whether a
//!   miss is an error or an empty result
//! - **Deterministic Ordering**: `keys()` and `values()` come back in the same
//!   order on every call
//! - **Write Notifications**: the owning process drops the snapshot as soon as
//!   it writes to the table
//!
//! ## Example
//!
//! ```no_run
//! use refcache::cache::{CacheConfig, ModelCache};
//! use refcache::Neo4jClient;
//! use refcache::connection::Neo4jSettings;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = Neo4jClient::connect(&Neo4jSettings::from_env()).await?;
//! let source = client.table_source("Country", &["code", "name"])?;
//!
//! let countries = ModelCache::new(source, CacheConfig::keyed_by(&["code"]))?;
//!
//! // strict: unknown codes are an error
//! let germany = countries.get(&["DE"]).await?;
//!
//! // lenient: unknown codes are `None`
//! if countries.find(&["XX"]).await?.is_none() {
//!     println!("no such country");
//! }
//!
//! // after writing to the table from this process
//! countries.invalidate().await;
//! # Ok(())
//! # }
//! ```

pub mod accessor;
pub mod config;
pub mod index;
pub mod integration;
pub mod invalidation;
pub mod key;
pub mod ordering;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder, DEFAULT_ACCESSOR_KEY, MAX_CACHE_LIFE};
pub use index::IndexNode;
pub use integration::{assign_reference, resolve_reference};
pub use invalidation::{InvalidationEvent, InvalidationReason, SignatureFailurePolicy};
pub use key::{CacheKey, KeyKind, KeyPath};
pub use ordering::{ordered_keys, ordered_values};
pub use registry::CacheRegistry;
pub use snapshot::Snapshot;
pub use store::ModelCache;
pub use types::CacheStats;
