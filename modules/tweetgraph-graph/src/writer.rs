use async_trait::async_trait;
use chrono::NaiveDateTime;
use neo4rs::{query, Query, Row};
use tracing::debug;

use tweetgraph_common::{
    AuthorId, AuthorVertex, EdgeKind, PostId, PostVertex, ReferenceField, StoreError, TagKey,
    TagVertex, Vertex, VertexKey,
};

use crate::store::{validate_edge, GraphStore};
use crate::GraphClient;

/// Stored in place of an absent post reference. Never leaves this module.
pub(crate) const NO_REFERENCE: i64 = -1;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Neo4j-backed graph store. All values are bound as parameters; labels,
/// relationship types and property names only come from static enums.
pub struct GraphWriter {
    client: GraphClient,
}

impl GraphWriter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }

    /// Execute a query and return its first row, draining the rest.
    async fn first_row(&self, q: Query) -> Result<Option<Row>, StoreError> {
        let mut stream = self.client.graph.execute(q).await.map_err(map_neo4j_error)?;
        let first = stream.next().await.map_err(map_neo4j_error)?;
        while stream.next().await.map_err(map_neo4j_error)?.is_some() {}
        Ok(first)
    }

    async fn count(&self, q: Query, column: &str) -> Result<i64, StoreError> {
        match self.first_row(q).await? {
            Some(row) => row.get::<i64>(column).map_err(|e| decode_error(column, e)),
            None => Ok(0),
        }
    }

    async fn find_post(&self, id: PostId) -> Result<Option<PostVertex>, StoreError> {
        let q = query(
            "MATCH (p:Post {post_id: $key})
             RETURN p.post_id AS post_id,
                    toString(p.created_at) AS created_at,
                    p.text AS text,
                    p.author_id AS author_id,
                    coalesce(p.geo, '') AS geo,
                    coalesce(p.retweet_of, $none) AS retweet_of,
                    coalesce(p.reply_to, $none) AS reply_to,
                    coalesce(p.quote_of, $none) AS quote_of
             LIMIT 1",
        )
        .param("key", id.0)
        .param("none", NO_REFERENCE);

        let Some(row) = self.first_row(q).await? else {
            return Ok(None);
        };

        let created_at: String = column(&row, "created_at")?;
        Ok(Some(PostVertex {
            post_id: PostId(column(&row, "post_id")?),
            created_at: parse_stored_datetime(&created_at)?,
            text: column(&row, "text")?,
            author_id: AuthorId(column(&row, "author_id")?),
            geo: non_empty(column(&row, "geo")?),
            retweet_of: decode_reference(column(&row, "retweet_of")?),
            reply_to: decode_reference(column(&row, "reply_to")?),
            quote_of: decode_reference(column(&row, "quote_of")?),
        }))
    }

    async fn find_author(&self, id: AuthorId) -> Result<Option<AuthorVertex>, StoreError> {
        let q = query(
            "MATCH (a:Author {author_id: $key})
             RETURN a.author_id AS author_id,
                    coalesce(a.screen_name, '') AS screen_name,
                    coalesce(a.country, '') AS country,
                    coalesce(a.verified, false) AS verified
             LIMIT 1",
        )
        .param("key", id.0);

        Ok(self.first_row(q).await?.map(|row| AuthorVertex {
            author_id: id,
            screen_name: row.get("screen_name").unwrap_or_default(),
            country: non_empty(row.get("country").unwrap_or_default()),
            verified: row.get("verified").unwrap_or(false),
        }))
    }

    async fn find_tag(&self, name: &TagKey) -> Result<Option<TagVertex>, StoreError> {
        let q = query("MATCH (t:Tag {name: $key}) RETURN t.name AS name LIMIT 1")
            .param("key", name.as_str());
        Ok(self
            .first_row(q)
            .await?
            .map(|_| TagVertex { name: name.clone() }))
    }
}

#[async_trait]
impl GraphStore for GraphWriter {
    async fn find_vertex(&self, key: &VertexKey) -> Result<Option<Vertex>, StoreError> {
        match key {
            VertexKey::Post(id) => Ok(self.find_post(*id).await?.map(Vertex::Post)),
            VertexKey::Author(id) => Ok(self.find_author(*id).await?.map(Vertex::Author)),
            VertexKey::Tag(name) => Ok(self.find_tag(name).await?.map(Vertex::Tag)),
        }
    }

    async fn create_vertex(&self, vertex: &Vertex) -> Result<VertexKey, StoreError> {
        let key = vertex.key();
        let cypher = format!(
            "CREATE (n:{label}) SET {props} RETURN count(n) AS created",
            label = vertex.kind().label(),
            props = set_clause("n", vertex),
        );
        let q = vertex_params(query(&cypher), vertex);
        match self.count(q, "created").await {
            Ok(_) => Ok(key),
            Err(StoreError::OperationFailed(msg)) if is_constraint_violation(&msg) => {
                Err(StoreError::DuplicateKey(key))
            }
            Err(e) => Err(e),
        }
    }

    // Single MERGE, so concurrent writers can't both create the same key.
    async fn merge_vertex(&self, vertex: &Vertex) -> Result<(VertexKey, bool), StoreError> {
        let key = vertex.key();
        let kind = vertex.kind();
        let cypher = format!(
            "MERGE (n:{label} {{{key_prop}: $key}})
             ON CREATE SET {props}, n._created = true
             WITH n, coalesce(n._created, false) AS created
             REMOVE n._created
             RETURN created",
            label = kind.label(),
            key_prop = kind.key_property(),
            props = set_clause("n", vertex),
        );
        let q = key_param(vertex_params(query(&cypher), vertex), "key", &key);

        match self.first_row(q).await {
            Ok(Some(row)) => {
                let created: bool = row.get("created").unwrap_or(false);
                Ok((key, created))
            }
            Ok(None) => Err(StoreError::OperationFailed(format!(
                "merge of {key} returned no row"
            ))),
            // Two MERGEs racing on a unique constraint: the loser sees the
            // violation, and the vertex now exists.
            Err(StoreError::OperationFailed(msg)) if is_constraint_violation(&msg) => {
                debug!(%key, "Lost merge race, treating as found");
                Ok((key, false))
            }
            Err(e) => Err(e),
        }
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
        let cypher = format!(
            "MATCH (p:Post {{post_id: $key}}) SET p.{prop} = $value RETURN count(p) AS updated",
            prop = field.property(),
        );
        let q = query(&cypher)
            .param("key", id.0)
            .param("value", encode_reference(value));
        if self.count(q, "updated").await? == 0 {
            return Err(StoreError::OperationFailed(format!("no vertex for {key}")));
        }
        Ok(())
    }

    async fn create_edge(
        &self,
        kind: EdgeKind,
        from: &VertexKey,
        to: &VertexKey,
    ) -> Result<(), StoreError> {
        validate_edge(kind, from, to)?;
        let cypher = format!(
            "MATCH (a:{from_label} {{{from_prop}: $from}})
             MATCH (b:{to_label} {{{to_prop}: $to}})
             CREATE (a)-[:{rel}]->(b)
             RETURN count(*) AS created",
            from_label = from.kind().label(),
            from_prop = from.kind().key_property(),
            to_label = to.kind().label(),
            to_prop = to.kind().key_property(),
            rel = kind.rel_type(),
        );
        let q = key_param(key_param(query(&cypher), "from", from), "to", to);
        if self.count(q, "created").await? > 0 {
            return Ok(());
        }

        for key in [from, to] {
            if self.find_vertex(key).await?.is_none() {
                return Err(StoreError::MissingEndpoint {
                    kind,
                    key: key.clone(),
                });
            }
        }
        Err(StoreError::OperationFailed(format!(
            "{kind} edge {from} -> {to} was not created"
        )))
    }

    async fn find_edge(
        &self,
        kind: EdgeKind,
        from: &VertexKey,
        to: &VertexKey,
    ) -> Result<bool, StoreError> {
        let cypher = format!(
            "MATCH (a:{from_label} {{{from_prop}: $from}})-[r:{rel}]->(b:{to_label} {{{to_prop}: $to}})
             RETURN count(r) AS edges",
            from_label = from.kind().label(),
            from_prop = from.kind().key_property(),
            to_label = to.kind().label(),
            to_prop = to.kind().key_property(),
            rel = kind.rel_type(),
        );
        let q = key_param(key_param(query(&cypher), "from", from), "to", to);
        Ok(self.count(q, "edges").await? > 0)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        crate::migrate::migrate(&self.client)
            .await
            .map_err(map_neo4j_error)
    }
}

// --- Parameter helpers ---

fn key_param(q: Query, name: &str, key: &VertexKey) -> Query {
    match key {
        VertexKey::Post(id) => q.param(name, id.0),
        VertexKey::Author(id) => q.param(name, id.0),
        VertexKey::Tag(tag) => q.param(name, tag.as_str()),
    }
}

/// Property assignments for a vertex, e.g. `n.text = $text, ...`.
fn set_clause(var: &str, vertex: &Vertex) -> String {
    let assignments: &[(&str, &str)] = match vertex {
        Vertex::Post(_) => &[
            ("post_id", "$post_id"),
            ("created_at", "localdatetime($created_at)"),
            ("text", "$text"),
            ("author_id", "$author_id"),
            ("geo", "CASE WHEN $geo = '' THEN null ELSE $geo END"),
            ("retweet_of", "$retweet_of"),
            ("reply_to", "$reply_to"),
            ("quote_of", "$quote_of"),
        ],
        Vertex::Author(_) => &[
            ("author_id", "$author_id"),
            ("screen_name", "$screen_name"),
            ("country", "CASE WHEN $country = '' THEN null ELSE $country END"),
            ("verified", "$verified"),
        ],
        Vertex::Tag(_) => &[("name", "$name")],
    };
    assignments
        .iter()
        .map(|(prop, expr)| format!("{var}.{prop} = {expr}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn vertex_params(q: Query, vertex: &Vertex) -> Query {
    match vertex {
        Vertex::Post(p) => q
            .param("post_id", p.post_id.0)
            .param("created_at", p.created_at.format(DATETIME_FORMAT).to_string())
            .param("text", p.text.as_str())
            .param("author_id", p.author_id.0)
            .param("geo", p.geo.as_deref().unwrap_or(""))
            .param("retweet_of", encode_reference(p.retweet_of))
            .param("reply_to", encode_reference(p.reply_to))
            .param("quote_of", encode_reference(p.quote_of)),
        Vertex::Author(a) => q
            .param("author_id", a.author_id.0)
            .param("screen_name", a.screen_name.as_str())
            .param("country", a.country.as_deref().unwrap_or(""))
            .param("verified", a.verified),
        Vertex::Tag(t) => q.param("name", t.name.as_str()),
    }
}

// --- Encoding helpers ---

pub(crate) fn encode_reference(value: Option<PostId>) -> i64 {
    value.map(|id| id.0).unwrap_or(NO_REFERENCE)
}

pub(crate) fn decode_reference(raw: i64) -> Option<PostId> {
    if raw == NO_REFERENCE {
        None
    } else {
        Some(PostId(raw))
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Neo4j renders a LocalDateTime without seconds when they are zero, and
/// with a fraction when one is present.
pub(crate) fn parse_stored_datetime(s: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|e| StoreError::OperationFailed(format!("bad stored created_at {s:?}: {e}")))
}

/// Typed column read; a missing or mistyped value is an error, never a default.
fn column<T: serde::de::DeserializeOwned>(row: &Row, name: &str) -> Result<T, StoreError> {
    row.get(name).map_err(|e| decode_error(name, e))
}

fn decode_error(column: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::OperationFailed(format!("failed to decode column {column}: {e}"))
}

fn is_constraint_violation(msg: &str) -> bool {
    let msg = msg.to_lowercase();
    msg.contains("already exists") || msg.contains("constraintvalidationfailed")
}

/// Classify a driver error. Connection-level failures become `Unavailable`
/// so the orchestrator can tell an outage from a bad statement.
pub(crate) fn map_neo4j_error(e: neo4rs::Error) -> StoreError {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    let unavailable = [
        "connection",
        "broken pipe",
        "io error",
        "timed out",
        "unavailable",
        "pool",
    ];
    if unavailable.iter().any(|needle| lower.contains(needle)) {
        StoreError::Unavailable(msg)
    } else {
        StoreError::OperationFailed(msg)
    }
}
