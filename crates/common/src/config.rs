//! Application configuration.
//!
//! Every tunable that used to be a process-wide constant lives here and is
//! handed explicitly to the components that need it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CardioError, CardioResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fallback acquisition and peak-detection parameters.
    pub analysis: AnalysisDefaults,

    /// Dense optical-flow estimator parameters.
    pub flow: FlowParams,

    /// Imager properties used to derive the pixel scale from metadata.
    pub imager: ImagerConfig,

    /// Worker pool size. `None` uses the number of available CPU cores.
    pub workers: Option<usize>,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Values used when neither a command-line flag nor the metadata file
/// provides one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisDefaults {
    /// Acquisition frame rate (frames per second).
    pub fps: f64,

    /// Pixel scale in nanometres per pixel.
    pub scale_nm_per_px: f64,

    /// Minimum topographic prominence for a peak, in nanometres.
    pub min_prominence_nm: f64,

    /// Minimum peak width in seconds.
    pub min_width_secs: f64,

    /// Fraction of the peak height at which width is measured.
    /// `0.0` measures at the base, `1.0` at the top.
    pub cutoff: f64,
}

/// Parameters of the Farnebäck optical-flow estimator.
///
/// These depend on the imager and its resolution, which is why they are not
/// baked into the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowParams {
    /// Image scale between consecutive pyramid levels (`< 1`).
    pub pyr_scale: f64,

    /// Number of pyramid layers, counting the full-resolution image.
    pub levels: usize,

    /// Averaging window size used when solving for displacement.
    pub window_size: usize,

    /// Solver iterations at each pyramid level.
    pub iterations: usize,

    /// Size of the pixel neighbourhood used for polynomial expansion
    /// (typically 5 or 7).
    pub poly_n: usize,

    /// Standard deviation of the Gaussian weighting the polynomial fit.
    pub poly_sigma: f64,
}

/// Imager hardware properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagerConfig {
    /// Physical camera pixel pitch in nanometres.
    pub camera_pixel_size_nm: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "cardiomotion=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file receiving every record that passes `level`.
    pub file: Option<PathBuf>,

    /// Optional log file receiving only warnings and errors.
    pub error_file: Option<PathBuf>,
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            fps: 40.0,
            scale_nm_per_px: 650.0,
            min_prominence_nm: 65.0,
            min_width_secs: 0.2,
            cutoff: 0.25,
        }
    }
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            pyr_scale: 0.5,
            levels: 2,
            window_size: 16,
            iterations: 3,
            poly_n: 5,
            poly_sigma: 1.2,
        }
    }
}

impl Default for ImagerConfig {
    fn default() -> Self {
        Self {
            camera_pixel_size_nm: 6500.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
            error_file: None,
        }
    }
}

impl AnalysisDefaults {
    /// Reject parameter combinations that would make every downstream result
    /// meaningless. Runs before any processing starts.
    pub fn validate(&self) -> CardioResult<()> {
        validate_cutoff(self.cutoff)?;
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(CardioError::invalid_parameter(format!(
                "fps must be positive, got {}",
                self.fps
            )));
        }
        if !(self.scale_nm_per_px.is_finite() && self.scale_nm_per_px > 0.0) {
            return Err(CardioError::invalid_parameter(format!(
                "scale must be positive, got {}",
                self.scale_nm_per_px
            )));
        }
        if !(self.min_prominence_nm.is_finite() && self.min_prominence_nm >= 0.0) {
            return Err(CardioError::invalid_parameter(format!(
                "prominence must be non-negative, got {}",
                self.min_prominence_nm
            )));
        }
        if !(self.min_width_secs.is_finite() && self.min_width_secs >= 0.0) {
            return Err(CardioError::invalid_parameter(format!(
                "width must be non-negative, got {}",
                self.min_width_secs
            )));
        }
        Ok(())
    }
}

impl FlowParams {
    pub fn validate(&self) -> CardioResult<()> {
        if !(self.pyr_scale > 0.0 && self.pyr_scale < 1.0) {
            return Err(CardioError::invalid_parameter(format!(
                "pyr_scale must be in (0, 1), got {}",
                self.pyr_scale
            )));
        }
        if self.levels == 0 {
            return Err(CardioError::invalid_parameter("levels must be >= 1"));
        }
        if self.window_size == 0 {
            return Err(CardioError::invalid_parameter("window_size must be >= 1"));
        }
        if self.iterations == 0 {
            return Err(CardioError::invalid_parameter("iterations must be >= 1"));
        }
        if self.poly_n == 0 {
            return Err(CardioError::invalid_parameter("poly_n must be >= 1"));
        }
        if !(self.poly_sigma.is_finite() && self.poly_sigma > 0.0) {
            return Err(CardioError::invalid_parameter(format!(
                "poly_sigma must be positive, got {}",
                self.poly_sigma
            )));
        }
        Ok(())
    }
}

/// `cutoff` is the fraction of the peak height at which width is measured.
pub fn validate_cutoff(cutoff: f64) -> CardioResult<()> {
    if (0.0..=1.0).contains(&cutoff) {
        Ok(())
    } else {
        Err(CardioError::invalid_parameter(format!(
            "cutoff must be between 0.0 and 1.0, got {cutoff}"
        )))
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    ///
    /// Failures are logged; use [`read_from`](Self::read_from) when the
    /// caller has no subscriber installed yet.
    pub fn load_from(config_path: &Path) -> Self {
        match Self::read_from(config_path) {
            Ok(config) => config.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                Self::default()
            }
        }
    }

    /// Read config from `config_path`. `Ok(None)` when the file does not
    /// exist.
    pub fn read_from(config_path: &Path) -> CardioResult<Option<Self>> {
        if !config_path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(config_path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Number of worker threads to use (at least one).
    pub fn worker_count(&self) -> usize {
        resolve_worker_count(self.workers)
    }
}

/// Resolve an optional worker count against the available CPU cores.
pub fn resolve_worker_count(requested: Option<usize>) -> usize {
    requested
        .filter(|&n| n > 0)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
        .max(1)
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("cardiomotion").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_tool() {
        let config = AppConfig::default();
        assert_eq!(config.analysis.fps, 40.0);
        assert_eq!(config.analysis.scale_nm_per_px, 650.0);
        assert_eq!(config.analysis.min_prominence_nm, 65.0);
        assert_eq!(config.analysis.min_width_secs, 0.2);
        assert_eq!(config.analysis.cutoff, 0.25);
        assert_eq!(config.flow.window_size, 16);
        assert_eq!(config.flow.levels, 2);
        assert_eq!(config.imager.camera_pixel_size_nm, 6500.0);
        assert!(config.analysis.validate().is_ok());
        assert!(config.flow.validate().is_ok());
    }

    #[test]
    fn test_cutoff_bounds() {
        assert!(validate_cutoff(0.0).is_ok());
        assert!(validate_cutoff(1.0).is_ok());
        assert!(validate_cutoff(-0.01).is_err());
        assert!(validate_cutoff(1.01).is_err());
        assert!(validate_cutoff(f64::NAN).is_err());
    }

    #[test]
    fn test_invalid_analysis_defaults_rejected() {
        let mut defaults = AnalysisDefaults::default();
        defaults.cutoff = 2.0;
        assert!(matches!(
            defaults.validate(),
            Err(CardioError::InvalidParameter { .. })
        ));

        let mut defaults = AnalysisDefaults::default();
        defaults.fps = 0.0;
        assert!(defaults.validate().is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "analysis": { "fps": 25.0 }, "workers": 3 }"#).unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.analysis.fps, 25.0);
        assert_eq!(config.analysis.cutoff, 0.25);
        assert_eq!(config.flow, FlowParams::default());
        assert_eq!(config.worker_count(), 3);
    }

    #[test]
    fn test_unparseable_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.analysis.fps, 40.0);
        assert!(matches!(AppConfig::read_from(&path), Err(CardioError::Json(_))));
    }

    #[test]
    fn test_missing_config_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::read_from(&dir.path().join("absent.json")).unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn test_zero_flow_levels_rejected() {
        let params = FlowParams {
            levels: 0,
            ..FlowParams::default()
        };
        assert!(params.validate().is_err());
        assert!(FlowParams::default().validate().is_ok());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.flow.iterations = 5;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.flow.iterations, 5);
    }

    #[test]
    fn test_worker_count_is_at_least_one() {
        assert_eq!(resolve_worker_count(Some(0)).max(1), resolve_worker_count(None));
        assert_eq!(resolve_worker_count(Some(2)), 2);
        assert!(resolve_worker_count(None) >= 1);
    }
}
