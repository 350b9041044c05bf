//! Logging configuration
//!
//! The subscriber itself is installed by the application; this only carries
//! the settings so they can live in the configuration file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level (`error`, `warn`, `info`, `debug`, `trace`).
    /// `RUST_LOG` takes precedence at runtime.
    pub level: String,
    /// Write logs to stderr
    pub console_output: bool,
    /// Also write logs to this file
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file: None,
        }
    }
}

impl LogConfig {
    /// Parse the configured level, falling back to INFO
    pub fn parse_level(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "off" => LevelFilter::OFF,
            "error" => LevelFilter::ERROR,
            "warn" | "warning" => LevelFilter::WARN,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            _ => LevelFilter::INFO,
        }
    }

    /// Create the parent directory of the log file if needed
    pub fn ensure_log_directory(&self) -> std::io::Result<()> {
        match self.file.as_ref().and_then(|path| path.parent()) {
            Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
            _ => Ok(()),
        }
    }
}
