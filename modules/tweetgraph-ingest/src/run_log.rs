//! Ingest run log: persisted JSON timeline of the records a run did not store.
//!
//! Each run produces a single `{DATA_DIR}/ingest-runs/{run_id}.json` file
//! containing the final stats and an ordered list of skip/failure events.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::stats::IngestStats;

/// Root data directory, controlled by `DATA_DIR` env var (default: `"data"`).
pub fn data_dir() -> PathBuf {
    PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()))
}

pub struct RunLog {
    pub run_id: String,
    pub input: String,
    pub started_at: DateTime<Utc>,
    events: Vec<RunEvent>,
    seq: u32,
}

#[derive(Serialize)]
struct RunEvent {
    seq: u32,
    ts: DateTime<Utc>,
    #[serde(flatten)]
    kind: EventKind,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    RecordSkipped {
        index: u64,
        marker: String,
    },
    RecordFailed {
        index: u64,
        error: String,
    },
    RunAborted {
        index: u64,
        reason: String,
    },
}

impl RunLog {
    pub fn new(run_id: String, input: String) -> Self {
        Self {
            run_id,
            input,
            started_at: Utc::now(),
            events: Vec::new(),
            seq: 0,
        }
    }

    pub fn log(&mut self, kind: EventKind) {
        self.events.push(RunEvent {
            seq: self.seq,
            ts: Utc::now(),
            kind,
        });
        self.seq += 1;
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Write under `data_dir()`. Returns the file path on success.
    pub fn save(&self, stats: &IngestStats) -> Result<PathBuf> {
        self.save_in(&data_dir(), stats)
    }

    pub fn save_in(&self, root: &Path, stats: &IngestStats) -> Result<PathBuf> {
        let dir = root.join("ingest-runs");
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.json", self.run_id));

        let output = SerializedRunLog {
            run_id: &self.run_id,
            input: &self.input,
            started_at: self.started_at,
            finished_at: Utc::now(),
            stats,
            events: &self.events,
        };

        std::fs::write(&path, serde_json::to_string_pretty(&output)?)?;
        info!(path = %path.display(), events = self.events.len(), "Ingest run log saved");

        Ok(path)
    }
}

#[derive(Serialize)]
struct SerializedRunLog<'a> {
    run_id: &'a str,
    input: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    stats: &'a IngestStats,
    events: &'a [RunEvent],
}
