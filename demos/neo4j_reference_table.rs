//! Neo4j Reference Table Demo
//!
//! Seeds a small `DemoStatus` table in Neo4j, caches it and shows a write
//! notification after an update.
//!
//! Usage:
//!   cargo run --example neo4j_reference_table
//!
//! Environment variables (a `.env` file is honoured):
//!   NEO4J_URI      - Neo4j connection URI (default: bolt://localhost:7687)
//!   NEO4J_USER     - Neo4j username (default: neo4j)
//!   NEO4J_PASSWORD - Neo4j password (default: password)
//!   NEO4J_DATABASE - Neo4j database name (default: neo4j)

use neo4rs::query;
use refcache::{CacheConfig, CacheRegistry, ModelCache, Neo4jClient, Neo4jSettings, Neo4jTableSource, Record};
use tracing::{info, Level};

const LABEL: &str = "DemoStatus";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("=== Neo4j Reference Table Demo ===");

    let settings = Neo4jSettings::from_env();
    let client = Neo4jClient::connect(&settings).await?;
    client.health_check().await?;

    client
        .graph()
        .run(query("MATCH (n:DemoStatus) DETACH DELETE n"))
        .await?;
    for (position, name) in ["open", "in_progress", "closed"].iter().enumerate() {
        client
            .graph()
            .run(
                query("CREATE (:DemoStatus {name: $name, position: $position, updated_at: datetime()})")
                    .param("name", *name)
                    .param("position", position as i64),
            )
            .await?;
    }

    let statuses = CacheRegistry::global()
        .get_or_init(LABEL, || {
            let source = client.table_source(LABEL, &["name", "position"])?;
            let config = CacheConfig::builder()
                .sort_keys(&["position"])
                .build()?;
            ModelCache::new(source, config)
        })
        .await?;

    info!("\n--- Statuses in position order ---");
    for status in statuses.values().await? {
        info!("  {}", status.key_fragment("name")?);
    }

    let snapshot = statuses.snapshot().await?;
    info!("Loaded under signature {}", snapshot.signature());

    info!("\n--- Adding a status and notifying the registry ---");
    client
        .graph()
        .run(
            query("CREATE (:DemoStatus {name: 'rejected', position: 3, updated_at: datetime()})"),
        )
        .await?;
    CacheRegistry::global()
        .notify_write::<Neo4jTableSource>(LABEL)
        .await;

    match statuses.find(&["rejected"]).await? {
        Some(status) => info!("Found new status: {}", status.key_fragment("name")?),
        None => info!("New status not visible yet"),
    }

    info!("\n{}", statuses.stats().await);

    client
        .graph()
        .run(query("MATCH (n:DemoStatus) DETACH DELETE n"))
        .await?;

    info!("=== Demo Complete ===");
    Ok(())
}
