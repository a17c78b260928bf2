use neo4rs::query;
use tracing::{info, warn};

use crate::GraphClient;

/// Run idempotent schema migrations: uniqueness constraints, indexes.
/// Safe to call on every start.
pub async fn migrate(client: &GraphClient) -> Result<(), neo4rs::Error> {
    let g = &client.graph;

    info!("Running schema migrations...");

    // --- Natural-key uniqueness constraints ---
    let constraints = [
        "CREATE CONSTRAINT post_id_unique IF NOT EXISTS FOR (n:Post) REQUIRE n.post_id IS UNIQUE",
        "CREATE CONSTRAINT author_id_unique IF NOT EXISTS FOR (n:Author) REQUIRE n.author_id IS UNIQUE",
        "CREATE CONSTRAINT tag_name_unique IF NOT EXISTS FOR (n:Tag) REQUIRE n.name IS UNIQUE",
    ];

    for c in &constraints {
        run_ignoring_exists(g, c).await?;
    }
    info!("Natural-key uniqueness constraints created");

    // --- Property indexes for reference lookups and time-range queries ---
    let indexes = [
        "CREATE INDEX post_created_at IF NOT EXISTS FOR (n:Post) ON (n.created_at)",
        "CREATE INDEX post_author_id IF NOT EXISTS FOR (n:Post) ON (n.author_id)",
        "CREATE INDEX post_retweet_of IF NOT EXISTS FOR (n:Post) ON (n.retweet_of)",
        "CREATE INDEX post_reply_to IF NOT EXISTS FOR (n:Post) ON (n.reply_to)",
        "CREATE INDEX post_quote_of IF NOT EXISTS FOR (n:Post) ON (n.quote_of)",
        "CREATE INDEX author_screen_name IF NOT EXISTS FOR (n:Author) ON (n.screen_name)",
    ];

    for idx in &indexes {
        run_ignoring_exists(g, idx).await?;
    }
    info!("Property indexes created");

    Ok(())
}

/// Run a Cypher statement, ignoring errors that indicate the constraint/index already exists.
async fn run_ignoring_exists(
    g: &neo4rs::Graph,
    cypher: &str,
) -> Result<(), neo4rs::Error> {
    match g.run(query(cypher)).await {
        Ok(_) => Ok(()),
        Err(e) => {
            let msg = e.to_string().to_lowercase();
            if msg.contains("already exists") || msg.contains("equivalent") {
                warn!("Already exists (skipped): {}", cypher.chars().take(80).collect::<String>());
                Ok(())
            } else {
                Err(e)
            }
        }
    }
}
