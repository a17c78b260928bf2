//! Entity resolver: idempotent upsert by natural key.

use tracing::debug;

use tweetgraph_common::{StoreError, Vertex, VertexKey};
use tweetgraph_graph::GraphStore;

/// Result of resolving one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub key: VertexKey,
    pub created: bool,
}

/// Looks up a vertex by natural key and creates it from `defaults` only when
/// absent. Existing vertices are never overwritten.
pub struct EntityResolver<'a, S: GraphStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: GraphStore + ?Sized> EntityResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// `defaults` carries the kind and natural key; its other properties only
    /// apply on first creation.
    pub async fn resolve(&self, defaults: &Vertex) -> Result<Resolved, StoreError> {
        let key = defaults.key();
        if self.store.find_vertex(&key).await?.is_some() {
            return Ok(Resolved {
                key,
                created: false,
            });
        }

        // Conditional create: if someone else created the key since the
        // lookup, the store reports it as found instead of failing.
        let (key, created) = self.store.merge_vertex(defaults).await?;
        if created {
            debug!(%key, "Created vertex");
        } else {
            debug!(%key, "Vertex appeared concurrently, using existing");
        }
        Ok(Resolved { key, created })
    }

    /// Existing vertex for `key`, if any.
    pub async fn lookup(&self, key: &VertexKey) -> Result<Option<Vertex>, StoreError> {
        self.store.find_vertex(key).await
    }

    pub async fn exists(&self, key: &VertexKey) -> Result<bool, StoreError> {
        Ok(self.store.find_vertex(key).await?.is_some())
    }
}
