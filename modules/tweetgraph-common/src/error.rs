//! Typed errors for normalization, storage, sources, and ingestion.

use thiserror::Error;

use crate::types::{EdgeKind, VertexKey, VertexKind};

/// A raw record that could not be turned into a `ParsedPost`.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Required field absent or null
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field had the wrong JSON shape
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors surfaced by a graph store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached
    #[error("graph store unavailable: {0}")]
    Unavailable(String),

    /// The store was reachable but the operation failed
    #[error("graph store operation failed: {0}")]
    OperationFailed(String),

    /// A vertex with this natural key already exists
    #[error("duplicate key: {0}")]
    DuplicateKey(VertexKey),

    /// Endpoint kinds do not match the edge kind
    #[error("invalid {kind} edge: {from} -> {to}")]
    InvalidEdge {
        kind: EdgeKind,
        from: VertexKind,
        to: VertexKind,
    },

    /// An edge endpoint does not exist
    #[error("missing endpoint for {kind} edge: {key}")]
    MissingEndpoint { kind: EdgeKind, key: VertexKey },

    /// Scalar update targeted a vertex that is not a Post
    #[error("not a post: {0}")]
    NotAPost(VertexKey),
}

impl StoreError {
    /// Unavailable errors mean the store itself is down, not just this call.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Errors from a raw-record source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Reading the underlying input failed. Fatal for the run.
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// One framed record was not valid JSON. Counted, not fatal.
    #[error("undecodable record at line {line}: {source}")]
    Decode {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from ingesting a single record or a whole run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Source(#[from] SourceError),

    /// Too many consecutive records failed against the store
    #[error("aborting run after {consecutive} consecutive store failures")]
    StoreFailureLimit { consecutive: u32 },
}

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingEnv(&'static str),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
