//! CardioMotion Analysis Core
//!
//! Turns frame stacks into contraction metrics:
//! - **Reference:** Per-pixel median frame of a well's stack
//! - **Flow:** Farnebäck dense optical flow via OpenCV
//! - **Extraction:** De-biased mean displacement magnitude per frame
//! - **Peaks:** Prominence/width peak detection with sub-sample boundaries
//! - **Statistics:** Median amplitude, width, spacing and beat frequency
//!
//! This crate is pure computation: no file or network I/O.
//! All inputs are data; all outputs are data.

pub mod extractor;
pub mod flow;
pub mod interp;
pub mod peaks;
pub mod reference;
pub mod stats;

pub use extractor::MotionSignalExtractor;
pub use flow::{FlowEstimator, FlowField, Plane};
pub use interp::IndexTimeMap;
pub use peaks::{find_peaks, Peak, PeakCriteria};
pub use reference::median_frame;
pub use stats::{calc_peakstats, PeakAnalysis, PeakStatsParams};
