//! # Configuration
//!
//! Settings read from an optional TOML file. Every key is optional; a
//! missing file means defaults.
//!
//! ```toml
//! database = "marugoto.db"
//! backend = "redb"            # or "memory"
//! identity = "random"         # or "sequential"
//! log_format = "text"         # or "json"
//! max_payload_bytes = 67108864
//! ```
//!
//! Command line flags override file values (see `Config::apply`).

use clap::ValueEnum;
use marugoto_core::primitives::MAX_PAYLOAD_BYTES;
use marugoto_core::{IdStrategy, MarugotoError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "marugoto.toml";

/// Database path used when neither file nor flag names one.
pub const DEFAULT_DATABASE: &str = "marugoto.db";

/// Where games, dialogs and instances are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// redb database file.
    #[default]
    Redb,
    /// In-process maps, gone when the command exits.
    Memory,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redb => write!(f, "redb"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Output format of the log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parse the value of `MARUGOTO_LOG_FORMAT`. Unknown values mean text.
    #[must_use]
    pub fn from_env_value(value: &str) -> Self {
        match value {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database: PathBuf,
    pub backend: Backend,
    /// Identity strategy for content built by `sample`.
    pub identity: IdStrategy,
    pub log_format: LogFormat,
    /// Largest payload file `check`, `import` and `hash` will read.
    pub max_payload_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            backend: Backend::default(),
            identity: IdStrategy::default(),
            log_format: LogFormat::default(),
            max_payload_bytes: MAX_PAYLOAD_BYTES as u64,
        }
    }
}

/// Values given on the command line, each overriding the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub backend: Option<Backend>,
}

impl Config {
    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, MarugotoError> {
        let config: Config = toml::from_str(text)
            .map_err(|e| MarugotoError::SerializationError(format!("Invalid config: {}", e)))?;
        if config.max_payload_bytes == 0 {
            return Err(MarugotoError::SerializationError(
                "Invalid config: max_payload_bytes must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    /// Read the config file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, MarugotoError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MarugotoError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Load settings.
    ///
    /// An explicit path must exist. Without one, `marugoto.toml` in the
    /// working directory is used when present, defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, MarugotoError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply command line overrides.
    #[must_use]
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(database) = overrides.database {
            self.database = database;
        }
        if let Some(backend) = overrides.backend {
            self.backend = backend;
        }
        self
    }
}
