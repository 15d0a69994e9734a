//! Frame loading and contrast normalisation.
//!
//! Every frame of a well is decoded (8- or 16-bit grayscale), then all frames
//! are stretched with one shared min/max so intensity changes between frames
//! survive normalisation:
//!
//! ```text
//! out = clamp(256 * (v - min) / max(1, max - min), 0, 255)
//! ```
//!
//! Frames that fail to decode, or whose size differs from the first good
//! frame, are logged and dropped together with their timestamps.

use std::path::Path;

use cardiomotion_common::cancel::CancelToken;
use cardiomotion_plate_model::frames::FrameStack;
use image::{ColorType, DynamicImage};
use rayon::prelude::*;

use crate::discovery::WellImages;
use crate::error::SourceError;

/// A decoded frame at native bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u16>,
}

impl RawFrame {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let img = image::open(path).map_err(|source| SourceError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_image(img))
    }

    /// Convert to single-channel, keeping 16-bit samples as they are.
    pub fn from_image(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let sixteen_bit = matches!(
            img.color(),
            ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16
        );
        let pixels = if sixteen_bit {
            img.into_luma16().into_raw()
        } else {
            img.into_luma8().into_raw().into_iter().map(u16::from).collect()
        };
        Self {
            width,
            height,
            pixels,
        }
    }

    fn min_max(&self) -> Option<(u16, u16)> {
        let min = *self.pixels.iter().min()?;
        let max = *self.pixels.iter().max()?;
        Some((min, max))
    }
}

/// One well's frames, ready for signal extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedWell {
    /// Timestamps of the frames that survived loading.
    pub times: Vec<f64>,
    pub frames: FrameStack,
    /// Frames listed for the well, including dropped ones.
    pub attempted: usize,
}

impl LoadedWell {
    pub fn dropped(&self) -> usize {
        self.attempted - self.times.len()
    }
}

/// Load and normalise every frame of `well` on the current rayon pool.
pub fn load_well(well: &WellImages, cancel: &CancelToken) -> Result<LoadedWell, SourceError> {
    let decoded: Vec<Option<RawFrame>> = well
        .entries
        .par_iter()
        .map(|entry| {
            if cancel.is_cancelled() {
                return None;
            }
            RawFrame::open(&entry.path)
                .map_err(|e| tracing::error!(error = %e, "Failed to load frame"))
                .ok()
        })
        .collect();
    if cancel.is_cancelled() {
        return Err(SourceError::Cancelled);
    }

    let times: Vec<f64> = well.entries.iter().map(|e| e.time_secs).collect();
    let label = format!("{}/{}", well.plate, well.well);
    normalise_frames(&label, &times, decoded)
}

/// Stretch decoded frames to 8 bits and drop failures. `frames[i]` belongs
/// to `times[i]`; `None` marks a frame that failed to load.
pub fn normalise_frames(
    label: &str,
    times: &[f64],
    frames: Vec<Option<RawFrame>>,
) -> Result<LoadedWell, SourceError> {
    let attempted = frames.len();
    let no_frames = || SourceError::NoFrames {
        well: label.to_string(),
        attempted,
    };

    let (min, max) = frames
        .iter()
        .flatten()
        .filter_map(RawFrame::min_max)
        .reduce(|(lo, hi), (a, b)| (lo.min(a), hi.max(b)))
        .ok_or_else(no_frames)?;
    let range = f64::from(max.saturating_sub(min).max(1));

    let mut shape = None;
    let mut kept_times = Vec::with_capacity(attempted);
    let mut kept = Vec::with_capacity(attempted);
    for (index, (frame, &time)) in frames.into_iter().zip(times).enumerate() {
        let Some(frame) = frame else {
            continue;
        };
        let (width, height) = *shape.get_or_insert((frame.width, frame.height));
        if (frame.width, frame.height) != (width, height) {
            tracing::error!(
                well = label,
                frame = index,
                width = frame.width,
                height = frame.height,
                expected_width = width,
                expected_height = height,
                "Inconsistent dimensions across images, dropping frame"
            );
            continue;
        }
        kept_times.push(time);
        kept.push(
            frame
                .pixels
                .iter()
                .map(|&v| (256.0 * f64::from(v - min) / range).clamp(0.0, 255.0) as u8)
                .collect::<Vec<u8>>(),
        );
    }

    let Some((width, height)) = shape else {
        return Err(no_frames());
    };
    let stack = FrameStack::new(width, height, kept).map_err(|_| no_frames())?;

    if kept_times.len() < attempted {
        tracing::warn!(
            well = label,
            loaded = kept_times.len(),
            attempted,
            "Only some frames successfully loaded"
        );
    } else {
        tracing::info!(well = label, frames = attempted, "Successfully loaded frames");
    }

    Ok(LoadedWell {
        times: kept_times,
        frames: stack,
        attempted,
    })
}
