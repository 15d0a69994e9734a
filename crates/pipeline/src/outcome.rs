//! Per-well results and the run summary.

use std::path::PathBuf;

use cardiomotion_plate_model::stats::PlateTable;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened to one well in the signal stage.
///
/// `Skipped` (nothing usable to analyse) is distinct from a `Completed` well
/// whose signal simply had no peaks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum WellOutcome {
    /// Signal extracted and written.
    Completed { frames: usize, dropped: usize },
    /// The well had no loadable frames.
    Skipped(String),
    /// A signal file from an earlier run already exists.
    AlreadyDone,
    /// An unexpected error; sibling wells are unaffected.
    Failed(String),
}

impl WellOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellReport {
    pub plate: String,
    pub well: String,
    pub outcome: WellOutcome,
}

/// Everything a run did, written as JSON next to the outputs.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub fps: f64,
    pub scale_nm_per_px: f64,
    pub wells: Vec<WellReport>,
    #[serde(skip)]
    pub tables: Vec<PlateTable>,
}

impl RunSummary {
    pub fn count(&self, predicate: impl Fn(&WellOutcome) -> bool) -> usize {
        self.wells.iter().filter(|r| predicate(&r.outcome)).count()
    }

    pub fn completed(&self) -> usize {
        self.count(WellOutcome::is_completed)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, WellOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, WellOutcome::Skipped(_)))
    }

    pub fn already_done(&self) -> usize {
        self.count(|o| matches!(o, WellOutcome::AlreadyDone))
    }

    pub fn report(&self, plate: &str, well: &str) -> Option<&WellOutcome> {
        self.wells
            .iter()
            .find(|r| r.plate == plate && r.well == well)
            .map(|r| &r.outcome)
    }
}
