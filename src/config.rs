//! Configuration loading for the reader core.
//!
//! Ambient settings are centralized here and loaded from `conf/config.toml`
//! if present. Any missing or invalid entries fall back to sensible defaults
//! so the reader can still launch. Per-user preferences (language, font) are
//! not part of this file; they live in the settings store.

use crate::book::LengthStrategy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_locale_dir")]
    pub locale_dir: PathBuf,
    #[serde(default)]
    pub length_strategy: LengthStrategy,
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: default_data_dir(),
            locale_dir: default_locale_dir(),
            length_strategy: LengthStrategy::default(),
            log_level: default_log_level(),
        }
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Load configuration from `path`, falling back to defaults on any error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            AppConfig::default()
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_locale_dir() -> PathBuf {
    PathBuf::from("locale")
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_config(Path::new("/nonexistent/config.toml"));
        assert_eq!(cfg.length_strategy, LengthStrategy::ResourceSize);
        assert_eq!(cfg.log_level, LogLevel::Info);
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn partial_toml_fills_remaining_fields() {
        let cfg: AppConfig =
            toml::from_str("length_strategy = \"extracted-text\"\nlog_level = \"warn\"").unwrap();
        assert_eq!(cfg.length_strategy, LengthStrategy::ExtractedText);
        assert_eq!(cfg.log_level, LogLevel::Warn);
        assert_eq!(cfg.locale_dir, PathBuf::from("locale"));
    }
}
