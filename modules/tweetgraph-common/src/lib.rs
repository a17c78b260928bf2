pub mod config;
pub mod error;
pub mod file_config;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, IngestError, NormalizeError, SourceError, StoreError};
pub use file_config::{load_config, FileConfig, GraphConfig, IngestConfig};
pub use types::*;
