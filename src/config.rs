//! Configuration file support for annosync.
//!
//! Settings are stored as versioned JSON. Missing fields fall back to their
//! defaults so older files keep loading.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ICON_SIZE, DEFAULT_ID_PREFIX_LEN, DEFAULT_SERVER_URL, DEFAULT_SNAP_TOLERANCE,
};
use crate::engine::{CommitPolicy, EngineSettings};
use crate::placement::{SnapPolicy, Snapper};
use crate::table::SortMode;

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
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
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

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Base address of the annotation server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Line endpoint snap distance in image pixels
    #[serde(default = "default_snap_tolerance")]
    pub snap_tolerance: f32,

    #[serde(default)]
    pub snap_policy: SnapPolicy,

    /// When update/remove are committed locally
    #[serde(default)]
    pub commit_policy: CommitPolicy,

    /// Id characters shown in the table
    #[serde(default = "default_id_prefix_len")]
    pub id_prefix_len: usize,

    /// Marker icon edge length in pixels
    #[serde(default = "default_icon_size")]
    pub icon_size: u32,

    #[serde(default)]
    pub sort_mode: SortMode,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_snap_tolerance() -> f32 {
    DEFAULT_SNAP_TOLERANCE
}

fn default_id_prefix_len() -> usize {
    DEFAULT_ID_PREFIX_LEN
}

fn default_icon_size() -> u32 {
    DEFAULT_ICON_SIZE
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            server_url: default_server_url(),
            snap_tolerance: default_snap_tolerance(),
            snap_policy: SnapPolicy::default(),
            commit_policy: CommitPolicy::default(),
            id_prefix_len: default_id_prefix_len(),
            icon_size: default_icon_size(),
            sort_mode: SortMode::default(),
            log_level: LogLevel::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Engine tuning derived from this configuration.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            snapper: Snapper::new(self.snap_tolerance, self.snap_policy),
            commit_policy: self.commit_policy,
            id_prefix_len: self.id_prefix_len,
            icon_size: self.icon_size,
            sort_mode: self.sort_mode,
        }
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "annosync-config.json"
    }

    /// Get the default config file path for auto-load/save.
    pub fn default_path() -> Option<std::path::PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("annosync").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("annosync")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the default path.
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
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
