//! Reference tables stored as labelled Neo4j nodes
//!
//! Every node carrying the configured label is one row. Attribute values are
//! read back through `toString()` so the rows already hold the canonical key
//! form the cache indexes by.

use crate::error::{CacheError, Result};
use crate::record::{AttrValue, Row};
use crate::source::{RecordSource, Signature, SignatureSource};
use chrono::{DateTime, Utc};
use neo4rs::{query, Graph};
use tracing::debug;

/// Record and signature source for one node label
#[derive(Clone)]
pub struct Neo4jTableSource {
    graph: Graph,
    label: String,
    attributes: Vec<String>,
}

impl Neo4jTableSource {
    /// Create a source reading `attributes` from every `(:label)` node
    ///
    /// The label and attribute names are interpolated into Cypher, so they
    /// must be plain identifiers.
    pub fn new(graph: Graph, label: impl Into<String>, attributes: Vec<String>) -> Result<Self> {
        let label = label.into();
        validate_identifier("label", &label)?;

        if attributes.is_empty() {
            return Err(CacheError::InvalidConfiguration(
                "at least one attribute must be selected".to_string(),
            ));
        }
        for attribute in &attributes {
            validate_identifier("attribute", attribute)?;
        }

        Ok(Self {
            graph,
            label,
            attributes,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    fn records_query(&self) -> String {
        records_cypher(&self.label, &self.attributes)
    }

    fn signature_query(&self) -> String {
        signature_cypher(&self.label)
    }
}

impl RecordSource for Neo4jTableSource {
    type Record = Row;

    async fn fetch_all(&self) -> Result<Vec<Row>> {
        debug!("Fetching all :{} nodes", self.label);

        let mut result = self
            .graph
            .execute(query(&self.records_query()))
            .await
            .map_err(|e| {
                CacheError::SourceUnavailable(format!("Failed to fetch :{} nodes: {}", self.label, e))
            })?;

        let mut rows = Vec::new();
        while let Some(row) = result.next().await.map_err(|e| {
            CacheError::SourceUnavailable(format!("Failed to read :{} row: {}", self.label, e))
        })? {
            let mut record = Row::new();
            for attribute in &self.attributes {
                let value: Option<String> = row.get(attribute).map_err(|e| {
                    CacheError::SourceUnavailable(format!(
                        "Failed to read attribute '{}': {}",
                        attribute, e
                    ))
                })?;
                record.insert(attribute.clone(), AttrValue::from(value));
            }
            rows.push(record);
        }

        debug!("Fetched {} :{} nodes", rows.len(), self.label);
        Ok(rows)
    }
}

impl SignatureSource for Neo4jTableSource {
    async fn fetch_signature(&self) -> Result<Signature> {
        let mut result = self
            .graph
            .execute(query(&self.signature_query()))
            .await
            .map_err(|e| {
                CacheError::SourceUnavailable(format!(
                    "Failed to query :{} signature: {}",
                    self.label, e
                ))
            })?;

        let row = result
            .next()
            .await
            .map_err(|e| {
                CacheError::SourceUnavailable(format!("Failed to read signature row: {}", e))
            })?
            .ok_or_else(|| {
                CacheError::SourceUnavailable("Signature query returned no rows".to_string())
            })?;

        let max_updated_at: Option<i64> = row.get("max_updated_at").map_err(|e| {
            CacheError::SourceUnavailable(format!("Failed to read max_updated_at: {}", e))
        })?;
        let max_id: Option<i64> = row
            .get("max_id")
            .map_err(|e| CacheError::SourceUnavailable(format!("Failed to read max_id: {}", e)))?;
        let count: i64 = row
            .get("count")
            .map_err(|e| CacheError::SourceUnavailable(format!("Failed to read count: {}", e)))?;

        let signature = Signature::new(
            max_updated_at.and_then(DateTime::<Utc>::from_timestamp_millis),
            max_id,
            count,
        );
        debug!(":{} signature: {}", self.label, signature);
        Ok(signature)
    }
}

fn records_cypher(label: &str, attributes: &[String]) -> String {
    let columns: Vec<String> = attributes
        .iter()
        .map(|a| format!("toString(n.`{a}`) AS `{a}`"))
        .collect();
    format!("MATCH (n:`{}`) RETURN {}", label, columns.join(", "))
}

// `updated_at` must be a temporal property for `.epochMillis` to resolve.
fn signature_cypher(label: &str) -> String {
    format!(
        "MATCH (n:`{}`) RETURN max(n.updated_at).epochMillis AS max_updated_at, \
         max(id(n)) AS max_id, count(n) AS count",
        label
    )
}

fn validate_identifier(what: &str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidConfiguration(format!(
            "{} '{}' is not a plain identifier",
            what, name
        )))
    }
}
