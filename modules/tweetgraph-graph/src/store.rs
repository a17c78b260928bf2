// The capability surface the ingestion engine needs from a graph backend.
//
// GraphWriter (Neo4j) is the production implementation. MemoryGraphStore
// backs dry runs and tests: no database, no Docker.

use async_trait::async_trait;
use tracing::debug;

use tweetgraph_common::{EdgeKind, PostId, ReferenceField, StoreError, Vertex, VertexKey};

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Point lookup by natural key.
    async fn find_vertex(&self, key: &VertexKey) -> Result<Option<Vertex>, StoreError>;

    /// Create a vertex. Fails with `DuplicateKey` if the key is taken.
    async fn create_vertex(&self, vertex: &Vertex) -> Result<VertexKey, StoreError>;

    /// Create the vertex unless its key already exists. Returns whether it
    /// was created. Existing vertices are left untouched.
    ///
    /// The default is check-then-create with a lost race reported as "found";
    /// backends with a native conditional create should override it.
    async fn merge_vertex(&self, vertex: &Vertex) -> Result<(VertexKey, bool), StoreError> {
        let key = vertex.key();
        if self.find_vertex(&key).await?.is_some() {
            return Ok((key, false));
        }
        match self.create_vertex(vertex).await {
            Ok(key) => Ok((key, true)),
            Err(StoreError::DuplicateKey(key)) => {
                debug!(%key, "Vertex appeared between lookup and create");
                Ok((key, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Overwrite one reference property on a Post.
    async fn update_scalar(
        &self,
        key: &VertexKey,
        field: ReferenceField,
        value: Option<PostId>,
    ) -> Result<(), StoreError>;

    /// Create a directed edge. Both endpoints must exist.
    async fn create_edge(
        &self,
        kind: EdgeKind,
        from: &VertexKey,
        to: &VertexKey,
    ) -> Result<(), StoreError>;

    /// Whether at least one edge of `kind` runs from `from` to `to`.
    async fn find_edge(
        &self,
        kind: EdgeKind,
        from: &VertexKey,
        to: &VertexKey,
    ) -> Result<bool, StoreError>;

    /// One-time idempotent schema bootstrap.
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Reject edges whose endpoint kinds don't match the edge kind.
pub fn validate_edge(kind: EdgeKind, from: &VertexKey, to: &VertexKey) -> Result<(), StoreError> {
    let (from_kind, to_kind) = kind.endpoints();
    if from.kind() != from_kind || to.kind() != to_kind {
        return Err(StoreError::InvalidEdge {
            kind,
            from: from.kind(),
            to: to.kind(),
        });
    }
    Ok(())
}

// Lets callers hand out a shared store (e.g. keep an Arc for assertions).
#[async_trait]
impl<S: GraphStore + ?Sized> GraphStore for std::sync::Arc<S> {
    async fn find_vertex(&self, key: &VertexKey) -> Result<Option<Vertex>, StoreError> {
        (**self).find_vertex(key).await
    }

    async fn create_vertex(&self, vertex: &Vertex) -> Result<VertexKey, StoreError> {
        (**self).create_vertex(vertex).await
    }

    async fn merge_vertex(&self, vertex: &Vertex) -> Result<(VertexKey, bool), StoreError> {
        (**self).merge_vertex(vertex).await
    }

    async fn update_scalar(
        &self,
        key: &VertexKey,
        field: ReferenceField,
        value: Option<PostId>,
    ) -> Result<(), StoreError> {
        (**self).update_scalar(key, field, value).await
    }

    async fn create_edge(
        &self,
        kind: EdgeKind,
        from: &VertexKey,
        to: &VertexKey,
    ) -> Result<(), StoreError> {
        (**self).create_edge(kind, from, to).await
    }

    async fn find_edge(
        &self,
        kind: EdgeKind,
        from: &VertexKey,
        to: &VertexKey,
    ) -> Result<bool, StoreError> {
        (**self).find_edge(kind, from, to).await
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        (**self).ensure_schema().await
    }
}
