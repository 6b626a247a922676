//! Neo4j connection management
//!
//! Connection settings come from the environment (a `.env` file is honoured),
//! and the client hands out table sources bound to its connection pool.

use crate::error::{CacheError, Result};
use crate::source::Neo4jTableSource;
use neo4rs::{query, ConfigBuilder, Graph};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, info};

/// Connection settings for a Neo4j database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neo4jSettings {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Rows fetched per round trip when loading a table
    pub fetch_size: usize,
    pub max_connections: usize,
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            database: "neo4j".to_string(),
            fetch_size: 500,
            max_connections: 16,
        }
    }
}

impl Neo4jSettings {
    /// Read `NEO4J_URI`, `NEO4J_USER`, `NEO4J_PASSWORD` and `NEO4J_DATABASE`
    ///
    /// A `.env` file in the working directory is loaded first; unset
    /// variables fall back to the defaults.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        Self {
            uri: env::var("NEO4J_URI").unwrap_or(defaults.uri),
            user: env::var("NEO4J_USER").unwrap_or(defaults.user),
            password: env::var("NEO4J_PASSWORD").unwrap_or(defaults.password),
            database: env::var("NEO4J_DATABASE").unwrap_or(defaults.database),
            ..defaults
        }
    }
}

/// Neo4j client with connection pooling
pub struct Neo4jClient {
    graph: Graph,
}

impl Neo4jClient {
    /// Create a new Neo4j client
    ///
    /// # Example
    /// ```no_run
    /// use refcache::{Neo4jClient, Neo4jSettings};
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let client = Neo4jClient::connect(&Neo4jSettings::from_env()).await?;
    ///     client.health_check().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(settings: &Neo4jSettings) -> Result<Self> {
        info!(
            "Connecting to Neo4j at {} (database: {})",
            settings.uri, settings.database
        );

        let config = ConfigBuilder::default()
            .uri(settings.uri.as_str())
            .user(settings.user.as_str())
            .password(settings.password.as_str())
            .db(settings.database.as_str())
            .fetch_size(settings.fetch_size)
            .max_connections(settings.max_connections)
            .build()
            .map_err(|e| CacheError::InvalidConfiguration(e.to_string()))?;

        let graph = Graph::connect(config)
            .await
            .map_err(|e| CacheError::SourceUnavailable(e.to_string()))?;

        info!("Successfully connected to Neo4j");

        Ok(Self { graph })
    }

    /// Round trip with `RETURN 1`
    pub async fn health_check(&self) -> Result<bool> {
        debug!("Executing health check (RETURN 1)");

        self.graph.run(query("RETURN 1")).await?;

        Ok(true)
    }

    /// Source for the nodes labelled `label`, reading `attributes` from each
    pub fn table_source(&self, label: &str, attributes: &[&str]) -> Result<Neo4jTableSource> {
        Neo4jTableSource::new(
            self.graph.clone(),
            label,
            attributes.iter().map(|a| a.to_string()).collect(),
        )
    }

    /// Get a reference to the underlying Neo4j Graph instance
    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}
