//! In-memory graph store. Backs `--dry-run` and the engine tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use tweetgraph_common::{
    AuthorId, AuthorVertex, EdgeKind, PostId, PostVertex, ReferenceField, StoreError, TagKey,
    TagVertex, Vertex, VertexKey, VertexKind,
};

use crate::store::{validate_edge, GraphStore};

#[derive(Default)]
struct MemoryGraphInner {
    posts: HashMap<PostId, PostVertex>,
    authors: HashMap<AuthorId, AuthorVertex>,
    tags: HashMap<TagKey, TagVertex>,
    /// (kind, from, to) → number of times the edge was created
    edges: HashMap<(EdgeKind, VertexKey, VertexKey), u32>,
}

impl MemoryGraphInner {
    fn contains(&self, key: &VertexKey) -> bool {
        match key {
            VertexKey::Post(id) => self.posts.contains_key(id),
            VertexKey::Author(id) => self.authors.contains_key(id),
            VertexKey::Tag(tag) => self.tags.contains_key(tag),
        }
    }

    fn insert(&mut self, vertex: &Vertex) {
        match vertex {
            Vertex::Post(p) => {
                self.posts.insert(p.post_id, p.clone());
            }
            Vertex::Author(a) => {
                self.authors.insert(a.author_id, a.clone());
            }
            Vertex::Tag(t) => {
                self.tags.insert(t.name.clone(), t.clone());
            }
        }
    }
}

/// Mutex-guarded property graph with the same semantics as the Neo4j store.
/// Edge multiplicity is tracked so duplicate creations stay observable.
#[derive(Default)]
pub struct MemoryGraphStore {
    inner: Mutex<MemoryGraphInner>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryGraphInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn post(&self, id: PostId) -> Option<PostVertex> {
        self.lock().posts.get(&id).cloned()
    }

    pub fn author(&self, id: AuthorId) -> Option<AuthorVertex> {
        self.lock().authors.get(&id).cloned()
    }

    pub fn tag(&self, name: &str) -> Option<TagVertex> {
        let key = TagKey::new(name)?;
        self.lock().tags.get(&key).cloned()
    }

    pub fn vertex_count(&self, kind: VertexKind) -> usize {
        let inner = self.lock();
        match kind {
            VertexKind::Post => inner.posts.len(),
            VertexKind::Author => inner.authors.len(),
            VertexKind::Tag => inner.tags.len(),
        }
    }

    /// How many times this exact edge was created.
    pub fn edge_count(&self, kind: EdgeKind, from: &VertexKey, to: &VertexKey) -> u32 {
        self.lock()
            .edges
            .get(&(kind, from.clone(), to.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Total edges of one kind, counting duplicates.
    pub fn edges_of_kind(&self, kind: EdgeKind) -> u32 {
        self.lock()
            .edges
            .iter()
            .filter(|((k, _, _), _)| *k == kind)
            .map(|(_, n)| *n)
            .sum()
    }

    /// Distinct edges as sorted (kind, from, to) triples.
    pub fn edge_set(&self) -> Vec<(EdgeKind, VertexKey, VertexKey)> {
        let mut edges: Vec<_> = self.lock().edges.keys().cloned().collect();
        edges.sort_by(|a, b| {
            (a.0.index(), &a.1, &a.2).cmp(&(b.0.index(), &b.1, &b.2))
        });
        edges
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn find_vertex(&self, key: &VertexKey) -> Result<Option<Vertex>, StoreError> {
        let inner = self.lock();
        Ok(match key {
            VertexKey::Post(id) => inner.posts.get(id).cloned().map(Vertex::Post),
            VertexKey::Author(id) => inner.authors.get(id).cloned().map(Vertex::Author),
            VertexKey::Tag(tag) => inner.tags.get(tag).cloned().map(Vertex::Tag),
        })
    }

    async fn create_vertex(&self, vertex: &Vertex) -> Result<VertexKey, StoreError> {
        let key = vertex.key();
        let mut inner = self.lock();
        if inner.contains(&key) {
            return Err(StoreError::DuplicateKey(key));
        }
        inner.insert(vertex);
        Ok(key)
    }

    // Atomic under the mutex, so no lookup/create race.
    async fn merge_vertex(&self, vertex: &Vertex) -> Result<(VertexKey, bool), StoreError> {
        let key = vertex.key();
        let mut inner = self.lock();
        if inner.contains(&key) {
            return Ok((key, false));
        }
        inner.insert(vertex);
        Ok((key, true))
    }

    async fn update_scalar(
        &self,
        key: &VertexKey,
        field: ReferenceField,
        value: Option<PostId>,
    ) -> Result<(), StoreError> {
        let VertexKey::Post(id) = key else {
            return Err(StoreError::NotAPost(key.clone()));
        };
        let mut inner = self.lock();
        let post = inner
            .posts
            .get_mut(id)
            .ok_or_else(|| StoreError::OperationFailed(format!("no vertex for {key}")))?;
        post.set_reference(field, value);
        Ok(())
    }

    async fn create_edge(
        &self,
        kind: EdgeKind,
        from: &VertexKey,
        to: &VertexKey,
    ) -> Result<(), StoreError> {
        validate_edge(kind, from, to)?;
        let mut inner = self.lock();
        for key in [from, to] {
            if !inner.contains(key) {
                return Err(StoreError::MissingEndpoint {
                    kind,
                    key: key.clone(),
                });
            }
        }
        *inner
            .edges
            .entry((kind, from.clone(), to.clone()))
            .or_insert(0) += 1;
        Ok(())
    }

    async fn find_edge(
        &self,
        kind: EdgeKind,
        from: &VertexKey,
        to: &VertexKey,
    ) -> Result<bool, StoreError> {
        Ok(self.edge_count(kind, from, to) > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn post(id: i64) -> Vertex {
        Vertex::Post(PostVertex {
            post_id: PostId(id),
            created_at: NaiveDate::from_ymd_opt(2019, 5, 18)
                .unwrap()
                .and_hms_opt(21, 5, 2)
                .unwrap(),
            text: format!("post {id}"),
            author_id: AuthorId(7),
            geo: None,
            retweet_of: None,
            reply_to: None,
            quote_of: None,
        })
    }

    #[tokio::test]
    async fn create_rejects_duplicate_key() {
        let store = MemoryGraphStore::new();
        store.create_vertex(&post(1)).await.unwrap();
        let err = store.create_vertex(&post(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(VertexKey::Post(PostId(1)))));
        assert_eq!(store.vertex_count(VertexKind::Post), 1);
    }

    #[tokio::test]
    async fn merge_keeps_first_properties() {
        let store = MemoryGraphStore::new();
        let (_, created) = store.merge_vertex(&post(1)).await.unwrap();
        assert!(created);

        let mut changed = post(1);
        if let Vertex::Post(p) = &mut changed {
            p.text = "rewritten".into();
        }
        let (_, created) = store.merge_vertex(&changed).await.unwrap();
        assert!(!created);
        assert_eq!(store.post(PostId(1)).unwrap().text, "post 1");
    }

    #[tokio::test]
    async fn edge_requires_matching_kinds_and_endpoints() {
        let store = MemoryGraphStore::new();
        store.create_vertex(&post(1)).await.unwrap();
        let p1 = VertexKey::Post(PostId(1));
        let p2 = VertexKey::Post(PostId(2));

        let err = store
            .create_edge(EdgeKind::Authored, &p1, &p1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidEdge { .. }));

        let err = store
            .create_edge(EdgeKind::RepliesTo, &p1, &p2)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingEndpoint { .. }));

        store.create_vertex(&post(2)).await.unwrap();
        store.create_edge(EdgeKind::RepliesTo, &p1, &p2).await.unwrap();
        assert!(store.find_edge(EdgeKind::RepliesTo, &p1, &p2).await.unwrap());
        assert!(!store.find_edge(EdgeKind::RepliesTo, &p2, &p1).await.unwrap());
    }

    #[tokio::test]
    async fn update_scalar_only_touches_posts() {
        let store = MemoryGraphStore::new();
        store.create_vertex(&post(1)).await.unwrap();
        store
            .update_scalar(
                &VertexKey::Post(PostId(1)),
                ReferenceField::QuoteOf,
                Some(PostId(9)),
            )
            .await
            .unwrap();
        assert_eq!(store.post(PostId(1)).unwrap().quote_of, Some(PostId(9)));

        let err = store
            .update_scalar(&VertexKey::Author(AuthorId(7)), ReferenceField::ReplyTo, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotAPost(_)));
    }
}
