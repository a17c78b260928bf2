use serde::Serialize;

use tweetgraph_common::{DataQuality, EdgeKind, VertexKind};

use crate::linker::LinkReport;

/// Counters for one ingestion run. Every observed record lands in exactly one
/// of `created`, `reconciled`, `skipped`, or `errored`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub processed: u32,
    pub created: u32,
    pub reconciled: u32,
    pub skipped: u32,
    pub errored: u32,
    pub timestamp_fallbacks: u32,
    pub dropped_tags: u32,
    pub vertices_created: [u32; 3], // Post, Author, Tag
    pub edges_created: [u32; 5],    // Authored, Retweets, RepliesTo, Quotes, Tags
    pub references_deferred: u32,
    pub references_reconciled: u32,
}

impl IngestStats {
    pub(crate) fn record_quality(&mut self, quality: &DataQuality) {
        self.timestamp_fallbacks += quality.timestamp_fallbacks;
        self.dropped_tags += quality.dropped_tags;
    }

    pub(crate) fn record_links(&mut self, report: &LinkReport) {
        for (a, b) in self.vertices_created.iter_mut().zip(report.vertices_created) {
            *a += b;
        }
        for (a, b) in self.edges_created.iter_mut().zip(report.edges_created) {
            *a += b;
        }
        self.references_deferred += report.references_deferred;
        self.references_reconciled += report.references_reconciled;
    }

    pub fn vertices(&self, kind: VertexKind) -> u32 {
        self.vertices_created[kind.index()]
    }

    pub fn edges(&self, kind: EdgeKind) -> u32 {
        self.edges_created[kind.index()]
    }

    /// True when the four dispositions account for every processed record.
    pub fn is_balanced(&self) -> bool {
        self.created + self.reconciled + self.skipped + self.errored == self.processed
    }
}

impl std::fmt::Display for IngestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Ingest Run Complete ===")?;
        writeln!(f, "Records processed:  {}", self.processed)?;
        writeln!(f, "Posts created:      {}", self.created)?;
        writeln!(f, "Posts reconciled:   {}", self.reconciled)?;
        writeln!(f, "Records skipped:    {}", self.skipped)?;
        writeln!(f, "Records errored:    {}", self.errored)?;
        writeln!(f, "\nVertices created:")?;
        for kind in VertexKind::ALL {
            writeln!(f, "  {:<8} {}", format!("{kind}:"), self.vertices(kind))?;
        }
        writeln!(f, "\nEdges created:")?;
        for kind in EdgeKind::ALL {
            writeln!(f, "  {:<11} {}", format!("{kind}:"), self.edges(kind))?;
        }
        writeln!(f, "\nReferences deferred:   {}", self.references_deferred)?;
        writeln!(f, "References reconciled: {}", self.references_reconciled)?;
        writeln!(f, "\nData quality:")?;
        writeln!(f, "  Timestamp fallbacks: {}", self.timestamp_fallbacks)?;
        writeln!(f, "  Dropped tags:        {}", self.dropped_tags)?;
        Ok(())
    }
}
