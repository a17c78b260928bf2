//! Disposable Neo4j for contract tests (requires Docker).

use testcontainers::{
    core::{ContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use crate::{GraphClient, GraphStore, GraphWriter};

const PASSWORD: &str = "testpassword";

/// Start Neo4j and connect. Keep the container handle alive for the whole
/// test; dropping it stops the database.
pub async fn neo4j_container() -> (ContainerAsync<GenericImage>, GraphClient) {
    let container = GenericImage::new("neo4j", "5.25.1-community")
        .with_exposed_port(ContainerPort::Tcp(7687))
        .with_wait_for(WaitFor::message_on_stdout("Started."))
        .with_env_var("NEO4J_AUTH", format!("neo4j/{PASSWORD}"))
        .start()
        .await
        .expect("Failed to start Neo4j container");

    let port = container
        .get_host_port_ipv4(7687)
        .await
        .expect("Failed to get Neo4j bolt port");

    let client = GraphClient::connect(&format!("bolt://127.0.0.1:{port}"), "neo4j", PASSWORD)
        .await
        .expect("Failed to connect to Neo4j");

    (container, client)
}

/// Same as `neo4j_container`, with constraints and indexes already in place.
pub async fn neo4j_writer() -> (ContainerAsync<GenericImage>, GraphWriter) {
    let (container, client) = neo4j_container().await;
    let writer = GraphWriter::new(client);
    writer
        .ensure_schema()
        .await
        .expect("Failed to bootstrap schema");
    (container, writer)
}
