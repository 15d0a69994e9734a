//! CardioMotion Pipeline
//!
//! Drives a source directory through both stages:
//! - **Signal stage:** per well, load frames, extract the motion signal, and
//!   write `Raw Well level data/<plate>_<well>.csv` (wells already written
//!   are skipped, so an interrupted run resumes where it stopped)
//! - **Peak stage:** group the raw CSVs by plate and write the per-plate raw
//!   and peak statistics tables
//!
//! One bounded worker pool is created per run and shared by frame loading and
//! optical flow across all wells.

pub mod config;
pub mod diagnostics;
pub mod layout;
pub mod orchestrator;
pub mod outcome;
pub mod peak_stage;

pub use config::PipelineConfig;
pub use layout::OutputLayout;
pub use orchestrator::Pipeline;
pub use outcome::{RunSummary, WellOutcome, WellReport};
pub use peak_stage::run_peak_stage;
