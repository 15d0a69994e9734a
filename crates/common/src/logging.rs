//! Logging and tracing initialization.
//!
//! Console output always goes to stderr. The optional `file` receives the
//! same records; the optional `error_file` receives warnings and errors only.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console = if config.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    let full_file = config.file.as_deref().and_then(open_log_file).map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .boxed()
    });

    let error_file = config
        .error_file
        .as_deref()
        .and_then(open_log_file)
        .map(|file| {
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(LevelFilter::WARN)
                .boxed()
        });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(full_file)
        .with(error_file);
    tracing::subscriber::set_global_default(subscriber).ok();
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}

fn open_log_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Cannot create log directory {}: {e}", parent.display());
            return None;
        }
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Cannot open log file {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_log_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.txt");
        assert!(open_log_file(&path).is_some());
        assert!(path.exists());
    }
}
