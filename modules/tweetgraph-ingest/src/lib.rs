pub mod linker;
pub mod normalizer;
pub mod orchestrator;
pub mod resolver;
pub mod run_log;
pub mod source;
pub mod stats;

pub use linker::{LinkReport, PostDisposition, RelationshipLinker};
pub use normalizer::{Normalized, RecordNormalizer};
pub use orchestrator::{Disposition, Ingestor};
pub use resolver::{EntityResolver, Resolved};
pub use run_log::RunLog;
pub use source::{IterSource, JsonLinesSource, RecordSource};
pub use stats::IngestStats;
