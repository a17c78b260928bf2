//! Relationship linker: turns a normalized record into vertices and edges.
//!
//! Per record, in order:
//!   1. embedded original (retweets): ingested first if absent, otherwise the
//!      outer post's `retweets` edge is ensured
//!   2. known outer post: reconcile `reply_to` / `quote_of`, then stop
//!   3. new outer post: vertex, author, `authored`, resolvable references
//!   4. tags, only for newly created posts
//!
//! A reference whose target is not in the graph yet is stored as `None` and
//! gets no edge. It is only picked up again if the referring post itself is
//! re-observed; arriving targets do not trigger a backfill.

use tracing::{debug, info};

use tweetgraph_common::{
    EdgeKind, ParsedPost, ParsedRecord, PostVertex, ReferenceField, StoreError, TagVertex, Vertex,
    VertexKey, VertexKind,
};
use tweetgraph_graph::GraphStore;

use crate::resolver::EntityResolver;

/// Reference fields a known post may have corrected after creation.
const RECONCILABLE: [ReferenceField; 2] = [ReferenceField::ReplyTo, ReferenceField::QuoteOf];

const ALL_REFERENCES: [ReferenceField; 3] = [
    ReferenceField::RetweetOf,
    ReferenceField::ReplyTo,
    ReferenceField::QuoteOf,
];

/// What happened to the outer post of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostDisposition {
    Created,
    Reconciled,
}

/// Graph changes made while linking, for run statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// Indexed by `VertexKind::index()`
    pub vertices_created: [u32; 3],
    /// Indexed by `EdgeKind::index()`
    pub edges_created: [u32; 5],
    /// References left unlinked because the target was absent
    pub references_deferred: u32,
    /// Stored references corrected on a known post
    pub references_reconciled: u32,
}

impl LinkReport {
    fn vertex_created(&mut self, kind: VertexKind) {
        self.vertices_created[kind.index()] += 1;
    }

    fn edge_created(&mut self, kind: EdgeKind) {
        self.edges_created[kind.index()] += 1;
    }
}

pub struct RelationshipLinker<'a, S: GraphStore + ?Sized> {
    store: &'a S,
    resolver: EntityResolver<'a, S>,
}

impl<'a, S: GraphStore + ?Sized> RelationshipLinker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            resolver: EntityResolver::new(store),
        }
    }

    /// Link one record. Partial progress is kept if a store call fails.
    pub async fn link(
        &self,
        record: &ParsedRecord,
        report: &mut LinkReport,
    ) -> Result<PostDisposition, StoreError> {
        let post_key = VertexKey::Post(record.post.post_id);

        if let Some(original) = &record.original {
            let original_key = VertexKey::Post(original.post_id);
            if self.resolver.exists(&original_key).await? {
                if self.resolver.exists(&post_key).await? {
                    self.ensure_edge(EdgeKind::Retweets, &post_key, &original_key, report)
                        .await?;
                }
            } else {
                debug!(post_id = %original.post_id, "Ingesting embedded original");
                self.create_post(original, report).await?;
            }
        }

        match self.resolver.lookup(&post_key).await? {
            Some(Vertex::Post(existing)) => {
                self.reconcile(&existing, &record.post, report).await?;
                Ok(PostDisposition::Reconciled)
            }
            Some(other) => Err(StoreError::OperationFailed(format!(
                "{post_key} resolved to a {} vertex",
                other.kind()
            ))),
            None => {
                self.create_post(&record.post, report).await?;
                Ok(PostDisposition::Created)
            }
        }
    }

    /// Ensure the `reply_to` / `quote_of` edges of a known post whose targets
    /// now exist, correcting the stored value when the record differs.
    async fn reconcile(
        &self,
        existing: &PostVertex,
        fresh: &ParsedPost,
        report: &mut LinkReport,
    ) -> Result<(), StoreError> {
        let post_key = VertexKey::Post(existing.post_id);

        for field in RECONCILABLE {
            let Some(target) = fresh.reference(field) else {
                continue;
            };
            let target_key = VertexKey::Post(target);
            if !self.resolver.exists(&target_key).await? {
                debug!(post_id = %existing.post_id, field = field.property(), %target, "Reference target still absent");
                report.references_deferred += 1;
                continue;
            }

            // The edge can be missing while the scalar matches, after a
            // partially failed earlier attempt.
            self.ensure_edge(field.edge(), &post_key, &target_key, report)
                .await?;
            if existing.reference(field) == Some(target) {
                continue;
            }
            self.store
                .update_scalar(&post_key, field, Some(target))
                .await?;
            report.references_reconciled += 1;
            info!(
                post_id = %existing.post_id,
                field = field.property(),
                previous = ?existing.reference(field),
                %target,
                "Reconciled post reference"
            );
        }

        Ok(())
    }

    /// New-post path: vertex with resolvable references, author, edges, tags.
    async fn create_post(
        &self,
        post: &ParsedPost,
        report: &mut LinkReport,
    ) -> Result<(), StoreError> {
        let post_key = VertexKey::Post(post.post_id);

        let mut vertex = PostVertex {
            post_id: post.post_id,
            created_at: post.created_at,
            text: post.text.clone(),
            author_id: post.author.author_id,
            geo: post.geo.clone(),
            retweet_of: None,
            reply_to: None,
            quote_of: None,
        };
        let mut resolvable = Vec::new();
        for field in ALL_REFERENCES {
            let Some(target) = post.reference(field) else {
                continue;
            };
            if self.resolver.exists(&VertexKey::Post(target)).await? {
                vertex.set_reference(field, Some(target));
                resolvable.push((field, target));
            } else {
                debug!(post_id = %post.post_id, field = field.property(), %target, "Deferring forward reference");
                report.references_deferred += 1;
            }
        }

        if self.resolver.resolve(&Vertex::Post(vertex)).await?.created {
            report.vertex_created(VertexKind::Post);
        }

        let author = self
            .resolver
            .resolve(&Vertex::Author(post.author.to_vertex()))
            .await?;
        if author.created {
            report.vertex_created(VertexKind::Author);
        }
        self.ensure_edge(EdgeKind::Authored, &author.key, &post_key, report)
            .await?;

        for (field, target) in resolvable {
            self.ensure_edge(field.edge(), &post_key, &VertexKey::Post(target), report)
                .await?;
        }

        for tag in &post.tags {
            let resolved = self
                .resolver
                .resolve(&Vertex::Tag(TagVertex { name: tag.clone() }))
                .await?;
            if resolved.created {
                report.vertex_created(VertexKind::Tag);
            }
            self.ensure_edge(EdgeKind::Tags, &post_key, &resolved.key, report)
                .await?;
        }

        Ok(())
    }

    /// Create the edge unless an identical one exists. Returns whether it was created.
    async fn ensure_edge(
        &self,
        kind: EdgeKind,
        from: &VertexKey,
        to: &VertexKey,
        report: &mut LinkReport,
    ) -> Result<bool, StoreError> {
        if self.store.find_edge(kind, from, to).await? {
            return Ok(false);
        }
        self.store.create_edge(kind, from, to).await?;
        report.edge_created(kind);
        Ok(true)
    }
}
