//! Acquisition metadata from the imager's `.mes` measurement-settings file.
//!
//! Only two values are read:
//! - frame rate, from `bts:LiveOption/@bts:Interval` (milliseconds per frame)
//! - pixel scale, from the first `bts:Channel`'s `bts:Binning` and
//!   `bts:Magnification`: `camera_pixel_size * binning / magnification`
//!
//! A value that cannot be read is `None`; the caller falls back to a
//! configured default. Metadata problems never abort a run.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::SourceError;

const METADATA_EXTENSION: &str = "mes";

/// Values recovered from a `.mes` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImagerMetadata {
    pub fps: Option<f64>,
    pub scale_nm_per_px: Option<f64>,
    pub source: Option<PathBuf>,
}

/// Find and parse the `.mes` file in `dir`.
pub fn load_metadata(dir: &Path, camera_pixel_size_nm: f64) -> ImagerMetadata {
    let files = match metadata_files(dir) {
        Ok(files) => files,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list metadata files");
            return ImagerMetadata::default();
        }
    };
    let Some(path) = files.first() else {
        tracing::warn!(dir = %dir.display(), "No .mes file found");
        return ImagerMetadata::default();
    };
    if files.len() > 1 {
        tracing::warn!(count = files.len(), using = %path.display(), "Found multiple .mes files");
    }

    tracing::info!(path = %path.display(), "Reading .mes file");
    match std::fs::read_to_string(path) {
        Ok(xml) => ImagerMetadata {
            source: Some(path.clone()),
            ..parse_mes(&xml, camera_pixel_size_nm)
        },
        Err(source) => {
            let err = SourceError::Io {
                path: path.clone(),
                source,
            };
            tracing::error!(error = %err, "Failed to read .mes file");
            ImagerMetadata::default()
        }
    }
}

/// Parse the contents of a `.mes` file, logging each value that is missing
/// or malformed.
pub fn parse_mes(xml: &str, camera_pixel_size_nm: f64) -> ImagerMetadata {
    let fps = frame_rate(xml)
        .map_err(|reason| tracing::error!(%reason, "Failed to read frame rate from .mes file"))
        .ok();
    let scale_nm_per_px = pixel_scale(xml, camera_pixel_size_nm)
        .map_err(|reason| tracing::error!(%reason, "Failed to read pixel scale from .mes file"))
        .ok();
    ImagerMetadata {
        fps,
        scale_nm_per_px,
        source: None,
    }
}

fn frame_rate(xml: &str) -> Result<f64, String> {
    let tag = start_tag(xml, "bts:LiveOption").ok_or("no bts:LiveOption element")?;
    let interval: u32 = attribute(tag, "bts:Interval")
        .ok_or("bts:LiveOption has no bts:Interval")?
        .trim()
        .parse()
        .map_err(|e| format!("bad bts:Interval: {e}"))?;
    if interval == 0 {
        return Err("bts:Interval is zero".into());
    }
    Ok(1000.0 / f64::from(interval))
}

fn pixel_scale(xml: &str, camera_pixel_size_nm: f64) -> Result<f64, String> {
    let tag = start_tag(xml, "bts:Channel").ok_or("no bts:Channel element")?;
    let binning: u32 = attribute(tag, "bts:Binning")
        .ok_or("bts:Channel has no bts:Binning")?
        .trim()
        .parse()
        .map_err(|e| format!("bad bts:Binning: {e}"))?;
    let magnification: f64 = attribute(tag, "bts:Magnification")
        .ok_or("bts:Channel has no bts:Magnification")?
        .trim()
        .parse()
        .map_err(|e| format!("bad bts:Magnification: {e}"))?;
    if !(magnification.is_finite() && magnification > 0.0) {
        return Err(format!("bts:Magnification must be positive, got {magnification}"));
    }
    Ok(camera_pixel_size_nm * f64::from(binning) / magnification)
}

/// `.mes` files in `dir`, sorted by name.
fn metadata_files(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let io_err = |source| SourceError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == METADATA_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Attribute text of the first start tag named `name`, without the
/// surrounding `<` and `>`.
fn start_tag<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!("<{name}");
    let mut offset = 0;
    while let Some(found) = xml[offset..].find(&pattern) {
        let start = offset + found + pattern.len();
        let rest = &xml[start..];
        if rest.starts_with(|c: char| c.is_whitespace() || c == '/' || c == '>') {
            let end = rest.find('>')?;
            return Some(rest[..end].trim_end_matches('/'));
        }
        offset = start;
    }
    None
}

/// Value of attribute `name` within a start tag's text.
fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let mut offset = 0;
    while let Some(found) = tag[offset..].find(name) {
        let start = offset + found;
        offset = start + name.len();
        let preceded = tag[..start].ends_with(char::is_whitespace);
        let rest = tag[offset..].trim_start();
        let Some(rest) = rest.strip_prefix('=').filter(|_| preceded) else {
            continue;
        };
        let rest = rest.trim_start();
        let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let value = &rest[1..];
        return value.find(quote).map(|end| &value[..end]);
    }
    None
}
