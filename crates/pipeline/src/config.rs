//! Settings for one pipeline run.

use std::path::PathBuf;

use cardiomotion_analysis_core::stats::PeakStatsParams;
use cardiomotion_common::config::{AnalysisDefaults, AppConfig, FlowParams};
use cardiomotion_common::error::{CardioError, CardioResult};
use cardiomotion_image_source::metadata::ImagerMetadata;
use serde::{Deserialize, Serialize};

/// Frame rates outside `(0, MAX_FPS)` given on the command line are ignored.
pub const MAX_FPS: f64 = 1000.0;

/// Everything the orchestrator needs, resolved from config and flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub source_dir: PathBuf,
    /// Defaults to `<source_dir>/Cardio-Motion_Data`.
    pub dest_dir: Option<PathBuf>,
    /// Overrides the metadata frame rate.
    pub fps: Option<f64>,
    /// Overrides the metadata pixel scale (nm/px).
    pub scale_nm_per_px: Option<f64>,
    pub min_prominence_nm: f64,
    pub min_width_secs: f64,
    pub cutoff: f64,
    pub emit_graph: bool,
    pub workers: Option<usize>,
    pub flow: FlowParams,
    pub camera_pixel_size_nm: f64,
    /// Used for fps and scale when neither a flag nor metadata supplies one.
    pub fallback: AnalysisDefaults,
}

impl PipelineConfig {
    /// Start from the application config; flags are applied by the caller.
    pub fn from_app_config(app: &AppConfig, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            dest_dir: None,
            fps: None,
            scale_nm_per_px: None,
            min_prominence_nm: app.analysis.min_prominence_nm,
            min_width_secs: app.analysis.min_width_secs,
            cutoff: app.analysis.cutoff,
            emit_graph: false,
            workers: app.workers,
            flow: app.flow,
            camera_pixel_size_nm: app.imager.camera_pixel_size_nm,
            fallback: app.analysis.clone(),
        }
    }

    /// Reject invalid parameters before any work starts.
    pub fn validate(&self) -> CardioResult<()> {
        AnalysisDefaults {
            min_prominence_nm: self.min_prominence_nm,
            min_width_secs: self.min_width_secs,
            cutoff: self.cutoff,
            ..self.fallback.clone()
        }
        .validate()?;
        self.flow.validate()?;
        if let Some(scale) = self.scale_nm_per_px {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(CardioError::invalid_parameter(format!(
                    "scale must be positive, got {scale}"
                )));
            }
        }
        Ok(())
    }

    /// Drop a command-line frame rate outside `(0, MAX_FPS)`, logging it.
    pub fn sanitise_fps(&mut self) {
        if let Some(fps) = self.fps {
            if !(fps > 0.0 && fps < MAX_FPS) {
                tracing::error!(fps, "Invalid fps, ignoring");
                self.fps = None;
            }
        }
    }

    /// Frame rate: flag, then metadata, then the configured fallback.
    pub fn resolve_fps(&self, metadata: &ImagerMetadata) -> f64 {
        resolve("fps", self.fps, metadata.fps, self.fallback.fps)
    }

    /// Pixel scale: flag, then metadata, then the configured fallback.
    pub fn resolve_scale(&self, metadata: &ImagerMetadata) -> f64 {
        resolve(
            "scale",
            self.scale_nm_per_px,
            metadata.scale_nm_per_px,
            self.fallback.scale_nm_per_px,
        )
    }

    /// Peak detection thresholds, with the width converted to frames.
    pub fn peak_params(&self, fps: f64) -> PeakStatsParams {
        PeakStatsParams::with_width_secs(self.min_prominence_nm, self.min_width_secs, fps, self.cutoff)
    }
}

fn resolve(name: &'static str, flag: Option<f64>, metadata: Option<f64>, fallback: f64) -> f64 {
    match (flag, metadata) {
        (Some(value), _) => value,
        (None, Some(value)) => value,
        (None, None) => {
            tracing::warn!(parameter = name, value = fallback, "Using default value");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::from_app_config(&AppConfig::default(), "/data/plate")
    }

    #[test]
    fn test_resolution_order() {
        let meta = ImagerMetadata {
            fps: Some(25.0),
            scale_nm_per_px: None,
            source: None,
        };
        let mut cfg = config();
        assert_eq!(cfg.resolve_fps(&meta), 25.0);
        assert_eq!(cfg.resolve_scale(&meta), 650.0);
        cfg.fps = Some(50.0);
        assert_eq!(cfg.resolve_fps(&meta), 50.0);
        assert_eq!(cfg.resolve_fps(&ImagerMetadata::default()), 50.0);
    }

    #[test]
    fn test_out_of_range_fps_flag_ignored() {
        let mut cfg = config();
        cfg.fps = Some(1000.0);
        cfg.sanitise_fps();
        assert_eq!(cfg.fps, None);

        cfg.fps = Some(12.5);
        cfg.sanitise_fps();
        assert_eq!(cfg.fps, Some(12.5));
    }

    #[test]
    fn test_invalid_cutoff_rejected() {
        let mut cfg = config();
        assert!(cfg.validate().is_ok());
        cfg.cutoff = 1.2;
        assert!(matches!(cfg.validate(), Err(CardioError::InvalidParameter { .. })));
    }

    #[test]
    fn test_width_in_frames() {
        let cfg = config();
        assert_eq!(cfg.peak_params(40.0).min_width_frames, 8.0);
    }
}
