#![cfg(feature = "test-utils")]

// Neo4j adapter contract tests.
//
// Checks that GraphWriter honours the same store semantics as
// MemoryGraphStore: natural-key uniqueness, conditional create, the
// reference sentinel, and edge endpoint validation.
//
// Requirements: Docker (for Neo4j via testcontainers)
//
// Run with: cargo test -p tweetgraph-graph --features test-utils --test writer_contract_test

use chrono::NaiveDate;
use tweetgraph_common::{
    AuthorId, AuthorVertex, EdgeKind, PostId, PostVertex, ReferenceField, StoreError, TagKey,
    TagVertex, Vertex, VertexKey,
};
use tweetgraph_graph::testutil::neo4j_writer;
use tweetgraph_graph::{query, GraphStore};

fn post(id: i64, reply_to: Option<i64>) -> Vertex {
    Vertex::Post(PostVertex {
        post_id: PostId(id),
        created_at: NaiveDate::from_ymd_opt(2019, 5, 18)
            .unwrap()
            .and_hms_opt(21, 5, 2)
            .unwrap(),
        text: format!("post {id}"),
        author_id: AuthorId(7),
        geo: Some("Israel".into()),
        retweet_of: None,
        reply_to: reply_to.map(PostId),
        quote_of: None,
    })
}

fn author(id: i64) -> Vertex {
    Vertex::Author(AuthorVertex {
        author_id: AuthorId(id),
        screen_name: "ada".into(),
        country: None,
        verified: true,
    })
}

fn tag(name: &str) -> Vertex {
    Vertex::Tag(TagVertex {
        name: TagKey::new(name).unwrap(),
    })
}

#[tokio::test]
async fn post_round_trips_with_none_references() {
    let (_container, writer) = neo4j_writer().await;

    writer.create_vertex(&post(0, None)).await.unwrap();
    writer.create_vertex(&post(1, Some(0))).await.unwrap();

    let Some(Vertex::Post(stored)) = writer.find_vertex(&VertexKey::Post(PostId(1))).await.unwrap()
    else {
        panic!("post 1 not found");
    };
    assert_eq!(stored, post(1, Some(0)).into_post().unwrap());

    let Some(Vertex::Post(root)) = writer.find_vertex(&VertexKey::Post(PostId(0))).await.unwrap()
    else {
        panic!("post 0 not found");
    };
    assert_eq!(root.reply_to, None);
    assert_eq!(root.retweet_of, None);
    assert_eq!(root.quote_of, None);

    // Stored as the sentinel, never as a real id.
    let mut rows = writer
        .client()
        .inner()
        .execute(query("MATCH (p:Post {post_id: 0}) RETURN p.reply_to AS r"))
        .await
        .unwrap();
    let raw: i64 = rows.next().await.unwrap().unwrap().get("r").unwrap();
    assert_eq!(raw, -1);
}

#[tokio::test]
async fn duplicate_create_is_rejected_and_merge_reports_found() {
    let (_container, writer) = neo4j_writer().await;

    writer.create_vertex(&author(7)).await.unwrap();
    let err = writer.create_vertex(&author(7)).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey(VertexKey::Author(AuthorId(7)))));

    let (_, created) = writer.merge_vertex(&tag("cafe")).await.unwrap();
    assert!(created);
    let (_, created) = writer.merge_vertex(&tag("cafe")).await.unwrap();
    assert!(!created);
}

#[tokio::test]
async fn concurrent_merges_create_one_vertex() {
    let (_container, writer) = neo4j_writer().await;

    let results = tokio::join!(
        writer.merge_vertex(&author(42)),
        writer.merge_vertex(&author(42)),
        writer.merge_vertex(&author(42)),
    );
    let created = [results.0, results.1, results.2]
        .into_iter()
        .filter(|r| r.as_ref().unwrap().1)
        .count();
    assert_eq!(created, 1);

    let mut rows = writer
        .client()
        .inner()
        .execute(query("MATCH (a:Author {author_id: 42}) RETURN count(a) AS n"))
        .await
        .unwrap();
    let n: i64 = rows.next().await.unwrap().unwrap().get("n").unwrap();
    assert_eq!(n, 1);
}

#[tokio::test]
async fn edges_and_scalar_updates() {
    let (_container, writer) = neo4j_writer().await;
    let p1 = VertexKey::Post(PostId(1));
    let p2 = VertexKey::Post(PostId(2));

    writer.create_vertex(&post(1, None)).await.unwrap();
    writer.create_vertex(&post(2, None)).await.unwrap();

    assert!(!writer.find_edge(EdgeKind::RepliesTo, &p2, &p1).await.unwrap());
    writer.create_edge(EdgeKind::RepliesTo, &p2, &p1).await.unwrap();
    assert!(writer.find_edge(EdgeKind::RepliesTo, &p2, &p1).await.unwrap());
    assert!(!writer.find_edge(EdgeKind::RepliesTo, &p1, &p2).await.unwrap());

    writer
        .update_scalar(&p2, ReferenceField::ReplyTo, Some(PostId(1)))
        .await
        .unwrap();
    let stored = writer.find_vertex(&p2).await.unwrap().unwrap().into_post().unwrap();
    assert_eq!(stored.reply_to, Some(PostId(1)));

    let err = writer
        .create_edge(EdgeKind::Quotes, &p1, &VertexKey::Post(PostId(99)))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingEndpoint { .. }));

    let err = writer
        .create_edge(EdgeKind::Tags, &p1, &p2)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidEdge { .. }));
}

#[tokio::test]
async fn schema_bootstrap_is_idempotent() {
    let (_container, writer) = neo4j_writer().await;
    writer.ensure_schema().await.unwrap();
    writer.ensure_schema().await.unwrap();
}

#[tokio::test]
async fn mistyped_stored_reference_is_an_error_not_none() {
    let (_container, writer) = neo4j_writer().await;
    writer.create_vertex(&post(1, None)).await.unwrap();

    writer
        .client()
        .inner()
        .run(query("MATCH (p:Post {post_id: 1}) SET p.reply_to = 'garbage'"))
        .await
        .unwrap();

    let err = writer
        .find_vertex(&VertexKey::Post(PostId(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::OperationFailed(msg) if msg.contains("reply_to")));
}
