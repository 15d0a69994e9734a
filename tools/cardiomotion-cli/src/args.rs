//! Command-line arguments and how they override the config file.

use std::path::PathBuf;

use cardiomotion_common::config::{config_file_path, AppConfig, LoggingConfig};
use cardiomotion_pipeline::PipelineConfig;
use clap::Parser;

/// Log files written to the working directory unless configured otherwise.
pub const DEFAULT_LOG_FILE: &str = "Cardio-Motion_log.txt";
pub const DEFAULT_ERROR_LOG: &str = "Cardio-Motion_errors.txt";

#[derive(Debug, Parser)]
#[command(
    name = "cardiomotion",
    about = "Measure cardiac tissue contraction from time-lapse well images",
    version,
    author
)]
pub struct Cli {
    /// Directory containing the input image files
    pub source_dir: PathBuf,

    /// Directory for the output files (default: <SOURCE_DIR>/Cardio-Motion_Data)
    pub dest_dir: Option<PathBuf>,

    /// Video frame rate (default: read from the .mes file)
    #[arg(long)]
    pub fps: Option<f64>,

    /// Nanometres per pixel (default: derived from the .mes file)
    #[arg(long)]
    pub scale: Option<f64>,

    /// Minimum peak topographic prominence (nm)
    #[arg(long)]
    pub prominence: Option<f64>,

    /// Minimum peak width (seconds)
    #[arg(long)]
    pub width: Option<f64>,

    /// Fraction of the peak height at which width is measured, 0.0 (base) to 1.0 (top)
    #[arg(long, allow_negative_numbers = true)]
    pub cutoff: Option<f64>,

    /// Write a graph of each signal with the located peaks marked
    #[arg(long)]
    pub graph: bool,

    /// Worker threads (default: available CPU cores)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Log file receiving every record
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log file receiving warnings and errors only
    #[arg(long)]
    pub error_log: Option<PathBuf>,

    /// Config file (default: $XDG_CONFIG_HOME/cardiomotion/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Read the config file, falling back to defaults.
    ///
    /// A load failure is returned as a message rather than logged, because
    /// logging is configured from the result.
    pub fn load_app_config(&self) -> (AppConfig, Option<String>) {
        let path = self.config.clone().unwrap_or_else(config_file_path);
        match AppConfig::read_from(&path) {
            Ok(config) => (config.unwrap_or_default(), None),
            Err(e) => (
                AppConfig::default(),
                Some(format!(
                    "Failed to load config at {}, using defaults: {e}",
                    path.display()
                )),
            ),
        }
    }

    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        LoggingConfig {
            level: if self.verbose {
                "debug".to_string()
            } else {
                base.level.clone()
            },
            json: self.json_logs || base.json,
            file: self
                .log_file
                .clone()
                .or_else(|| base.file.clone())
                .or_else(|| Some(PathBuf::from(DEFAULT_LOG_FILE))),
            error_file: self
                .error_log
                .clone()
                .or_else(|| base.error_file.clone())
                .or_else(|| Some(PathBuf::from(DEFAULT_ERROR_LOG))),
        }
    }

    pub fn pipeline_config(&self, app: &AppConfig) -> PipelineConfig {
        let mut config = PipelineConfig::from_app_config(app, self.source_dir.clone());
        config.dest_dir = self.dest_dir.clone();
        config.fps = self.fps;
        config.scale_nm_per_px = self.scale;
        if let Some(prominence) = self.prominence {
            config.min_prominence_nm = prominence;
        }
        if let Some(width) = self.width {
            config.min_width_secs = width;
        }
        if let Some(cutoff) = self.cutoff {
            config.cutoff = cutoff;
        }
        config.emit_graph = self.graph;
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "cardiomotion",
            "/scans/run1",
            "/out",
            "--fps",
            "25",
            "--cutoff",
            "0.5",
            "--graph",
        ]);
        let config = cli.pipeline_config(&AppConfig::default());
        assert_eq!(config.dest_dir, Some(PathBuf::from("/out")));
        assert_eq!(config.fps, Some(25.0));
        assert_eq!(config.cutoff, 0.5);
        assert_eq!(config.min_prominence_nm, 65.0);
        assert!(config.emit_graph);
        assert_eq!(config.scale_nm_per_px, None);
    }

    #[test]
    fn test_negative_cutoff_parses_for_validation() {
        let cli = Cli::parse_from(["cardiomotion", "/scans", "--cutoff", "-0.5"]);
        assert_eq!(cli.cutoff, Some(-0.5));
    }

    #[test]
    fn test_unparseable_config_yields_defaults_and_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ \"analysis\": ").unwrap();

        let cli = Cli::parse_from(["cardiomotion", "/scans", "--config", path.to_str().unwrap()]);
        let (app, warning) = cli.load_app_config();
        assert_eq!(app.analysis.fps, 40.0);
        let warning = warning.unwrap();
        assert!(warning.contains("config.json"), "{warning}");
    }

    #[test]
    fn test_valid_config_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut saved = AppConfig::default();
        saved.analysis.fps = 12.5;
        saved.save_to(&path).unwrap();

        let cli = Cli::parse_from(["cardiomotion", "/scans", "--config", path.to_str().unwrap()]);
        let (app, warning) = cli.load_app_config();
        assert_eq!(app.analysis.fps, 12.5);
        assert!(warning.is_none());
    }

    #[test]
    fn test_default_log_files() {
        let cli = Cli::parse_from(["cardiomotion", "/scans", "-v"]);
        let logging = cli.logging_config(&LoggingConfig::default());
        assert_eq!(logging.level, "debug");
        assert_eq!(logging.file, Some(PathBuf::from(DEFAULT_LOG_FILE)));
        assert_eq!(logging.error_file, Some(PathBuf::from(DEFAULT_ERROR_LOG)));
    }
}
