//! CardioMotion Image Source
//!
//! Everything between the imager's output directory and a [`FrameStack`]:
//! - **Discovery:** Match CV8000 file names to plate, well, and frame time
//! - **Metadata:** Read frame rate and pixel scale from the `.mes` file
//! - **Loading:** Decode 8/16-bit frames in parallel and contrast-stretch them
//!
//! [`FrameStack`]: cardiomotion_plate_model::frames::FrameStack

pub mod discovery;
pub mod error;
pub mod loader;
pub mod metadata;

pub use discovery::{find_images, parse_image_name, ImageCatalog, ImageEntry, PlateImages, WellImages};
pub use error::SourceError;
pub use loader::{load_well, normalise_frames, LoadedWell, RawFrame};
pub use metadata::{load_metadata, parse_mes, ImagerMetadata};
