//! Configuration file support for imgload.
//!
//! Holds the default load options, loader tuning and the persisted
//! recent/watched lists, serialized as JSON.

use std::path::{Path, PathBuf};

use imgload_codecs::LoadOptions;
use serde::{Deserialize, Serialize};

use crate::recent::DEFAULT_RECENT_CAPACITY;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get all log levels in order from least to most verbose.
    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ]
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => {
                let expected: Vec<String> = LogLevel::all()
                    .iter()
                    .map(|level| level.to_level_filter().as_str().to_ascii_lowercase())
                    .collect();
                Err(format!(
                    "unknown log level '{}', expected one of: {}",
                    other,
                    expected.join(", ")
                ))
            }
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Loader preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Options applied to every load unless overridden per call
    #[serde(default)]
    pub load_options: LoadOptions,

    /// Maximum number of recent files remembered
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,

    /// Decoder threads; 0 uses one per CPU
    #[serde(default)]
    pub worker_threads: usize,

    /// Interval between watch scans in milliseconds
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,

    /// Treat files already present in a newly watched folder as seen
    #[serde(default = "default_ignore_existing")]
    pub ignore_existing_on_watch: bool,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_recent_capacity() -> usize {
    DEFAULT_RECENT_CAPACITY
}

fn default_watch_interval_ms() -> u64 {
    1000
}

fn default_ignore_existing() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            load_options: LoadOptions::default(),
            recent_capacity: default_recent_capacity(),
            worker_threads: 0,
            watch_interval_ms: default_watch_interval_ms(),
            ignore_existing_on_watch: default_ignore_existing(),
            log_level: LogLevel::default(),
        }
    }
}

/// Everything persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Loader preferences
    #[serde(default)]
    pub preferences: Preferences,

    /// Recently opened sources, oldest first
    #[serde(default)]
    pub recent_files: Vec<String>,

    /// Directories watched for new and modified files
    #[serde(default)]
    pub watched_directories: Vec<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LoaderConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: Preferences::default(),
            recent_files: Vec::new(),
            watched_directories: Vec::new(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    pub fn default_filename() -> &'static str {
        "imgload-config.json"
    }

    /// Default config file location under the user's config directory.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("imgload").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home| {
                home.join(".config")
                    .join("imgload")
                    .join(Self::default_filename())
            })
        }
    }

    /// Read and parse a configuration file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load from `path`, falling back to defaults if it is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return Self::new();
        }
        Self::load_from_path(path).unwrap_or_else(|e| {
            log::warn!("Failed to load config file {:?}: {}", path, e);
            Self::new()
        })
    }

    /// Write the configuration, creating parent directories as needed.
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
