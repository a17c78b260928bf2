use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

/// Feed-level keys that mark a record as a control message rather than a post.
pub const DEFAULT_CONTROL_MARKERS: [&str; 7] = [
    "limit",
    "delete",
    "scrub_geo",
    "status_withheld",
    "user_withheld",
    "disconnect",
    "warning",
];

/// TOML-backed ingestion settings. Every field has a default, so an absent
/// file and an empty file mean the same thing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FileConfig {
    pub ingest: IngestConfig,
    pub graph: GraphConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct IngestConfig {
    pub control_markers: Vec<String>,
    pub lowercase_tags: bool,
    /// 0 disables the limit.
    pub abort_after_consecutive_store_errors: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            control_markers: DEFAULT_CONTROL_MARKERS.iter().map(|m| m.to_string()).collect(),
            lowercase_tags: true,
            abort_after_consecutive_store_errors: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GraphConfig {
    pub fetch_size: usize,
    pub max_connections: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            fetch_size: 500,
            max_connections: 10,
        }
    }
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}
