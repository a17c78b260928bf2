pub mod client;
pub mod memory;
pub mod migrate;
pub mod store;
#[cfg(feature = "test-utils")]
pub mod testutil;
pub mod writer;

pub use client::GraphClient;
pub use memory::MemoryGraphStore;
pub use neo4rs::query;
pub use store::GraphStore;
pub use writer::GraphWriter;
