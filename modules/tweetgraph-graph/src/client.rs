use neo4rs::{ConfigBuilder, Graph};
use tweetgraph_common::{GraphConfig, StoreError};

use crate::writer::map_neo4j_error;

/// Thin wrapper around neo4rs::Graph providing connection setup.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given credentials and default pool settings.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, StoreError> {
        Self::connect_with(uri, user, password, &GraphConfig::default()).await
    }

    /// Connect using the pool settings from the file config.
    pub async fn connect_with(
        uri: &str,
        user: &str,
        password: &str,
        settings: &GraphConfig,
    ) -> Result<Self, StoreError> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .fetch_size(settings.fetch_size)
            .max_connections(settings.max_connections)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("invalid Neo4j config: {e}")))?;
        let graph = Graph::connect(config)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { graph })
    }

    /// Get a reference to the underlying neo4rs Graph.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }

    /// Round-trip a trivial query to confirm the connection is usable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut stream = self
            .graph
            .execute(neo4rs::query("RETURN 1 AS ping"))
            .await
            .map_err(map_neo4j_error)?;
        while stream.next().await.map_err(map_neo4j_error)?.is_some() {}
        Ok(())
    }
}
