//! Locate imager output files and group them by plate and well.
//!
//! File names follow the Yokogawa CV8000 convention:
//!
//! ```text
//! <plate>_<Row><2 digits>_T<4 digits><series>.tif
//! series = F<3 digits>L<2 digits>A<2 digits>Z<2 digits>C<2 digits>
//! ```
//!
//! `T` is the 1-based frame number. Frame time is `(T - 1) / fps`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use cardiomotion_plate_model::well::WellId;
use serde::Serialize;

use crate::error::SourceError;

const EXTENSION: &str = ".tif";
/// Lengths of the `F L A Z C` series fields, digits only.
const SERIES_FIELDS: [(u8, usize); 5] = [(b'F', 3), (b'L', 2), (b'A', 2), (b'Z', 2), (b'C', 2)];
const SERIES_LEN: usize = 16;
/// `_T` plus four digits.
const FRAME_LEN: usize = 6;
/// `_` plus row letter plus two digits.
const WELL_LEN: usize = 4;

/// Fields recovered from a matching file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub plate: String,
    pub well: WellId,
    pub frame_number: u32,
    pub series: String,
}

/// One image file on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageEntry {
    pub frame_number: u32,
    pub time_secs: f64,
    pub path: PathBuf,
}

/// All frames of one well, in time order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellImages {
    pub plate: String,
    pub well: WellId,
    pub entries: Vec<ImageEntry>,
}

impl WellImages {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All wells of one plate, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateImages {
    pub plate: String,
    pub wells: Vec<WellImages>,
}

/// Every matching image in a directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageCatalog {
    pub plates: Vec<PlateImages>,
}

impl ImageCatalog {
    pub fn image_count(&self) -> usize {
        self.wells().map(WellImages::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }

    pub fn wells(&self) -> impl Iterator<Item = &WellImages> + '_ {
        self.plates.iter().flat_map(|p| p.wells.iter())
    }

    /// Whether every well has the same number of frames.
    pub fn has_consistent_frame_counts(&self) -> bool {
        let mut counts = self.wells().map(WellImages::len);
        match counts.next() {
            Some(first) => counts.all(|c| c == first),
            None => true,
        }
    }

    fn well_mut(&mut self, plate: &str, well: &WellId) -> &mut WellImages {
        let plate_index = match self.plates.iter().position(|p| p.plate == plate) {
            Some(index) => index,
            None => {
                self.plates.push(PlateImages {
                    plate: plate.to_string(),
                    wells: Vec::new(),
                });
                self.plates.len() - 1
            }
        };
        let wells = &mut self.plates[plate_index].wells;
        let well_index = match wells.iter().position(|w| &w.well == well) {
            Some(index) => index,
            None => {
                wells.push(WellImages {
                    plate: plate.to_string(),
                    well: well.clone(),
                    entries: Vec::new(),
                });
                wells.len() - 1
            }
        };
        &mut wells[well_index]
    }
}

/// Parse a CV8000 image file name. Returns `None` for anything else.
pub fn parse_image_name(name: &str) -> Option<ParsedName> {
    let stem = name.strip_suffix(EXTENSION)?;
    if !stem.is_ascii() || stem.len() < WELL_LEN + FRAME_LEN + SERIES_LEN {
        return None;
    }

    let (rest, series) = stem.split_at(stem.len() - SERIES_LEN);
    if !is_series(series) {
        return None;
    }

    let (rest, frame) = rest.split_at(rest.len() - FRAME_LEN);
    let digits = frame.strip_prefix("_T")?;
    if !all_digits(digits) {
        return None;
    }
    let frame_number: u32 = digits.parse().ok()?;
    if frame_number == 0 {
        tracing::warn!(file = name, "Frame numbers start at T0001, ignoring file");
        return None;
    }

    let (plate, well) = rest.split_at(rest.len() - WELL_LEN);
    let well = well.strip_prefix('_')?;
    let bytes = well.as_bytes();
    if !bytes[0].is_ascii_uppercase() || !all_digits(&well[1..]) {
        return None;
    }

    Some(ParsedName {
        plate: plate.to_string(),
        well: WellId::parse(well).ok()?,
        frame_number,
        series: series.to_string(),
    })
}

fn is_series(series: &str) -> bool {
    let bytes = series.as_bytes();
    let mut pos = 0;
    for (letter, digits) in SERIES_FIELDS {
        if bytes.get(pos) != Some(&letter) {
            return false;
        }
        let field = &bytes[pos + 1..pos + 1 + digits];
        if !field.iter().all(u8::is_ascii_digit) {
            return false;
        }
        pos += 1 + digits;
    }
    pos == bytes.len()
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Scan `dir` for image files and group them by plate and well.
///
/// When the directory holds more than one acquisition series, each series is
/// treated as its own plate (`<plate>_<series>`).
pub fn find_images(dir: &Path, fps: f64) -> Result<ImageCatalog, SourceError> {
    if !dir.is_dir() {
        return Err(SourceError::MissingDirectory {
            path: dir.to_path_buf(),
        });
    }
    let io_err = |source| SourceError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut matches: Vec<(ParsedName, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if let Some(parsed) = parse_image_name(&name) {
            matches.push((parsed, entry.path()));
        }
    }
    // Directory order is unspecified; sort so plate/well order is stable.
    matches.sort_by(|a, b| a.1.cmp(&b.1));

    if matches.is_empty() {
        tracing::warn!(dir = %dir.display(), "No image files found");
        return Ok(ImageCatalog::default());
    }
    tracing::info!(count = matches.len(), dir = %dir.display(), "Found image files");

    let series: HashSet<&str> = matches.iter().map(|(p, _)| p.series.as_str()).collect();
    let split_series = series.len() > 1;
    if split_series {
        tracing::info!(series = series.len(), "Multiple acquisition series, processing each as a plate");
    }

    let mut catalog = ImageCatalog::default();
    for (parsed, path) in matches {
        let plate = if split_series {
            format!("{}_{}", parsed.plate, parsed.series)
        } else {
            parsed.plate
        };
        // Frame numbers are 1-based; zero is rejected when parsing.
        let time_secs = f64::from(parsed.frame_number - 1) / fps;
        catalog.well_mut(&plate, &parsed.well).entries.push(ImageEntry {
            frame_number: parsed.frame_number,
            time_secs,
            path,
        });
    }
    for well in catalog.plates.iter_mut().flat_map(|p| p.wells.iter_mut()) {
        well.entries.sort_by_key(|e| e.frame_number);
    }

    if !catalog.has_consistent_frame_counts() {
        tracing::warn!("Inconsistent number of frames per well");
    }
    Ok(catalog)
}
