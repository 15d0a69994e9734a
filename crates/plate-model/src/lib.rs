//! CardioMotion Plate Model
//!
//! Defines the core data contracts shared by every CardioMotion stage:
//! - **Wells:** Plate/well identifiers (`B07` → row `B`, row number 2, column `07`)
//! - **Frames:** Immutable stacks of uniformly sized 8-bit grayscale frames
//! - **Series:** Time-ordered `(seconds, magnitude)` signal samples
//! - **Statistics:** Per-well peak metrics and per-plate tables
//! - **Tables:** CSV persistence in the column layout downstream tools expect

pub mod error;
pub mod frames;
pub mod series;
pub mod stats;
pub mod table;
pub mod well;

pub use error::*;
pub use frames::*;
pub use series::*;
pub use stats::*;
pub use table::*;
pub use well::*;
