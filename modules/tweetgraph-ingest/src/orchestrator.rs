//! Ingestion orchestrator: pulls records in order and routes each one through
//! normalize → resolve/link, counting exactly one disposition per record.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use tweetgraph_common::{IngestConfig, IngestError, SourceError};
use tweetgraph_graph::GraphStore;

use crate::linker::{LinkReport, PostDisposition, RelationshipLinker};
use crate::normalizer::{Normalized, RecordNormalizer};
use crate::run_log::{EventKind, RunLog};
use crate::source::RecordSource;
use crate::stats::IngestStats;

/// Outcome of one raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Created,
    Reconciled,
    Skipped,
    Errored,
}

pub struct Ingestor<'a, S: GraphStore + ?Sized> {
    store: &'a S,
    normalizer: RecordNormalizer,
    abort_after: u32,
    consecutive_store_failures: u32,
    stats: IngestStats,
    run_log: Option<RunLog>,
}

impl<'a, S: GraphStore + ?Sized> Ingestor<'a, S> {
    pub fn new(store: &'a S, config: &IngestConfig) -> Self {
        Self {
            store,
            normalizer: RecordNormalizer::new(config),
            abort_after: config.abort_after_consecutive_store_errors,
            consecutive_store_failures: 0,
            stats: IngestStats::default(),
            run_log: None,
        }
    }

    /// Record skip, failure, and abort events into `log`.
    pub fn with_run_log(mut self, log: RunLog) -> Self {
        self.run_log = Some(log);
        self
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn into_parts(self) -> (IngestStats, Option<RunLog>) {
        (self.stats, self.run_log)
    }

    /// Drain `source`. Per-record failures are counted and the run continues;
    /// only a source I/O error or the store-failure limit ends it early. The
    /// stats gathered so far stay available through `stats()` either way.
    pub async fn run(&mut self, source: &mut dyn RecordSource) -> Result<IngestStats, IngestError> {
        info!(abort_after = self.abort_after, "Starting ingest run");

        while let Some(next) = source.next_record().await {
            let index = u64::from(self.stats.processed);
            match next {
                Ok(raw) => {
                    self.ingest_record(index, raw).await;
                }
                Err(SourceError::Io(e)) => {
                    error!(index, error = %e, "Record source failed, stopping run");
                    self.log_event(EventKind::RunAborted {
                        index,
                        reason: e.to_string(),
                    });
                    return Err(SourceError::Io(e).into());
                }
                Err(e @ SourceError::Decode { .. }) => {
                    self.stats.processed += 1;
                    self.fail(index, e.into());
                }
            }

            if self.abort_after > 0 && self.consecutive_store_failures >= self.abort_after {
                let consecutive = self.consecutive_store_failures;
                error!(consecutive, "Too many consecutive store failures, aborting run");
                error!("Partial results. {}", self.stats);
                self.log_event(EventKind::RunAborted {
                    index,
                    reason: format!("{consecutive} consecutive store failures"),
                });
                return Err(IngestError::StoreFailureLimit { consecutive });
            }
        }

        info!(
            processed = self.stats.processed,
            created = self.stats.created,
            reconciled = self.stats.reconciled,
            skipped = self.stats.skipped,
            errored = self.stats.errored,
            "Ingest run finished"
        );
        Ok(self.stats.clone())
    }

    /// Process one raw record. Never fails; the outcome is counted.
    pub async fn ingest_record(&mut self, index: u64, raw: Value) -> Disposition {
        self.stats.processed += 1;

        let record = match self.normalizer.normalize(raw) {
            Ok(Normalized::Post(record)) => record,
            Ok(Normalized::Control(marker)) => {
                debug!(index, %marker, "Skipping control message");
                self.stats.skipped += 1;
                self.log_event(EventKind::RecordSkipped { index, marker });
                return Disposition::Skipped;
            }
            Err(e) => return self.fail(index, e.into()),
        };
        self.stats.record_quality(&record.quality);

        let mut report = LinkReport::default();
        let linked = RelationshipLinker::new(self.store)
            .link(&record, &mut report)
            .await;
        // Completed sub-steps stay in the graph even when a later one failed.
        self.stats.record_links(&report);

        match linked {
            Ok(PostDisposition::Created) => {
                self.consecutive_store_failures = 0;
                self.stats.created += 1;
                Disposition::Created
            }
            Ok(PostDisposition::Reconciled) => {
                self.consecutive_store_failures = 0;
                self.stats.reconciled += 1;
                Disposition::Reconciled
            }
            Err(e) => {
                debug!(index, post_id = %record.post.post_id, "Linking stopped part way");
                self.fail(index, e.into())
            }
        }
    }

    fn fail(&mut self, index: u64, err: IngestError) -> Disposition {
        self.stats.errored += 1;
        match &err {
            IngestError::Store(e) if e.is_unavailable() => {
                self.consecutive_store_failures += 1;
                error!(index, error = %e, streak = self.consecutive_store_failures, "Graph store unavailable");
            }
            IngestError::Store(e) => {
                self.consecutive_store_failures += 1;
                warn!(index, error = %e, "Failed to link record");
            }
            _ => warn!(index, error = %err, "Dropping malformed record"),
        }
        self.log_event(EventKind::RecordFailed {
            index,
            error: err.to_string(),
        });
        Disposition::Errored
    }

    fn log_event(&mut self, kind: EventKind) {
        if let Some(log) = self.run_log.as_mut() {
            log.log(kind);
        }
    }
}
