//! Collaborators the cache consumes
//!
//! A cached table is reached through two collaborators: one that returns
//! every row, and one that answers a small aggregate query whose result
//! changes whenever the table does.

pub mod neo4j;

use crate::error::Result;
use crate::record::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

pub use neo4j::Neo4jTableSource;

/// Fingerprint of a table's current state
///
/// Two equal signatures are treated as "no observable change". This is a
/// heuristic: a write that moves neither the maxima nor the row count stays
/// invisible until the next change that does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// Latest modification timestamp in the table
    pub max_updated_at: Option<DateTime<Utc>>,

    /// Highest identity value in the table
    pub max_id: Option<i64>,

    /// Number of rows
    pub count: i64,
}

impl Signature {
    pub fn new(max_updated_at: Option<DateTime<Utc>>, max_id: Option<i64>, count: i64) -> Self {
        Self {
            max_updated_at,
            max_id,
            count,
        }
    }

    /// Signature of a table with no rows
    pub fn empty() -> Self {
        Self::new(None, None, 0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let updated = self
            .max_updated_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        let max_id = self
            .max_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "Signature {{ max_updated_at: {}, max_id: {}, count: {} }}",
            updated, max_id, self.count
        )
    }
}

/// Returns the complete current record set of a table
///
/// No pagination and no filtering: the cache indexes whatever comes back.
pub trait RecordSource: Send + Sync {
    type Record: Record;

    fn fetch_all(&self) -> impl Future<Output = Result<Vec<Self::Record>>> + Send;
}

/// Computes the table's current [`Signature`]
pub trait SignatureSource: Send + Sync {
    fn fetch_signature(&self) -> impl Future<Output = Result<Signature>> + Send;
}
