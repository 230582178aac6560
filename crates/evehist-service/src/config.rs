//! Service configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use evehist_core::AccessoryOptions;
use evehist_types::{HISTORY_INTERVAL_SECS, SAMPLE_INTERVAL_SECS, SensorKind};

/// Service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Snapshot storage settings.
    pub storage: StorageConfig,
    /// Timer periods shared by all accessories.
    pub history: HistoryConfig,
    /// Accessories to emulate.
    #[serde(default)]
    pub accessories: Vec<AccessoryConfig>,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every error found.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - Storage path is not empty
    /// - Timer periods are within bounds and the sampling beat fits in a tick
    /// - Accessory ids are non-empty and unique
    /// - Per-kind options are only set on kinds that use them
    ///
    /// # Example
    ///
    /// ```
    /// use evehist_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.history.validate());

        let mut seen_ids = HashSet::new();
        for (i, accessory) in self.accessories.iter().enumerate() {
            let prefix = format!("accessories[{}]", i);
            errors.extend(accessory.validate(&prefix));

            if !accessory.id.is_empty() && !seen_ids.insert(accessory.id.as_str()) {
                errors.push(ValidationError {
                    field: format!("{}.id", prefix),
                    message: format!("duplicate accessory id '{}'", accessory.id),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "bind address cannot be empty".to_string(),
            });
            return errors;
        }

        let Some((_, port)) = self.bind.rsplit_once(':') else {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            });
            return errors;
        };

        match port.parse::<u16>() {
            Ok(0) => errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "port cannot be 0".to_string(),
            }),
            Err(_) => errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: format!("invalid port '{}': must be a number 1-65535", port),
            }),
            Ok(_) => {}
        }

        errors
    }
}

/// Snapshot storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one snapshot file per accessory.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: evehist_store::default_storage_dir(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "snapshot directory cannot be empty".to_string(),
            });
        }

        errors
    }
}

/// Minimum timer period in seconds.
pub const MIN_INTERVAL: u64 = 1;
/// Maximum history tick in seconds (1 hour).
pub const MAX_TICK_INTERVAL: u64 = 3600;
/// Maximum save period in seconds (1 day).
pub const MAX_SAVE_INTERVAL: u64 = 86_400;

/// Timer periods in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Sampling beat between history ticks.
    pub sample_interval: u64,
    /// History tick.
    pub tick_interval: u64,
    /// Snapshot save period.
    pub save_interval: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            sample_interval: SAMPLE_INTERVAL_SECS,
            tick_interval: HISTORY_INTERVAL_SECS,
            save_interval: HISTORY_INTERVAL_SECS,
        }
    }
}

impl HistoryConfig {
    /// Validate timer periods.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let bounds = [
            ("history.tick_interval", self.tick_interval, MAX_TICK_INTERVAL),
            ("history.save_interval", self.save_interval, MAX_SAVE_INTERVAL),
        ];
        for (field, value, max) in bounds {
            if value < MIN_INTERVAL {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!(
                        "interval {} is too short (minimum {} seconds)",
                        value, MIN_INTERVAL
                    ),
                });
            } else if value > max {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("interval {} is too long (maximum {} seconds)", value, max),
                });
            }
        }

        if self.sample_interval < MIN_INTERVAL {
            errors.push(ValidationError {
                field: "history.sample_interval".to_string(),
                message: format!(
                    "interval {} is too short (minimum {} seconds)",
                    self.sample_interval, MIN_INTERVAL
                ),
            });
        } else if self.sample_interval > self.tick_interval {
            errors.push(ValidationError {
                field: "history.sample_interval".to_string(),
                message: format!(
                    "sample interval {} exceeds the tick interval {}",
                    self.sample_interval, self.tick_interval
                ),
            });
        }

        errors
    }

    /// Timer periods for the accessory runtime.
    pub fn options(&self) -> AccessoryOptions {
        AccessoryOptions {
            sample_interval: Duration::from_secs(self.sample_interval),
            tick_interval: Duration::from_secs(self.tick_interval),
            save_interval: Duration::from_secs(self.save_interval),
        }
    }
}

/// An emulated accessory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryConfig {
    /// Unique id, also the snapshot file name.
    pub id: String,
    /// Sensor type.
    pub kind: SensorKind,
    /// Consumption only: derive power from the lifetime total.
    #[serde(default)]
    pub derive_power: bool,
    /// Contact and motion only: re-append the state on every tick.
    #[serde(default)]
    pub repeat_on_tick: bool,
}

impl AccessoryConfig {
    /// An accessory of `kind` with default options.
    pub fn new(id: impl Into<String>, kind: SensorKind) -> Self {
        Self {
            id: id.into(),
            kind,
            derive_power: false,
            repeat_on_tick: false,
        }
    }

    /// Validate accessory configuration.
    pub fn validate(&self, prefix: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.id.is_empty() {
            errors.push(ValidationError {
                field: format!("{}.id", prefix),
                message: "accessory id cannot be empty".to_string(),
            });
        }

        if self.derive_power && self.kind != SensorKind::Consumption {
            errors.push(ValidationError {
                field: format!("{}.derive_power", prefix),
                message: format!("derive_power is not available for {} sensors", self.kind),
            });
        }

        if self.repeat_on_tick && !self.kind.is_event_driven() {
            errors.push(ValidationError {
                field: format!("{}.repeat_on_tick", prefix),
                message: format!("repeat_on_tick is not available for {} sensors", self.kind),
            });
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `accessories[0].id`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("evehist")
        .join("server.toml")
}
