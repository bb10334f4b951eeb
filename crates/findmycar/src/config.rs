//! Configuration management for findmycar.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::controller::ControllerOptions;
use crate::error::{Error, Result};
use crate::handoff::DEFAULT_FALLBACK_DELAY;
use crate::location::{LocateOptions, Position};
use crate::photo::{PhotoOptions, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_DIMENSION};
use crate::session::Coordinates;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "findmycar";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "parking.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FINDMYCAR_`)
/// 2. TOML config file at `~/.config/findmycar/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Location configuration.
    pub location: LocationConfig,
    /// Photo configuration.
    pub photo: PhotoConfig,
    /// Notification configuration.
    pub notifications: NotificationConfig,
    /// Native maps hand-off configuration.
    pub handoff: HandoffConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/findmycar/parking.db`
    pub database_path: Option<PathBuf>,
}

/// Location-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Fixed latitude reported as this machine's position.
    pub latitude: Option<f64>,
    /// Fixed longitude reported as this machine's position.
    pub longitude: Option<f64>,
    /// Accuracy in meters of the fixed position.
    pub accuracy: Option<f64>,
    /// Prefer precise fixes.
    pub high_accuracy: bool,
    /// Timeout for the fix taken when saving, in milliseconds.
    pub save_timeout_ms: u64,
    /// Timeout for the fix used as route origin, in milliseconds.
    pub navigate_timeout_ms: u64,
}

/// Photo-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    /// Longest side of a stored photo in pixels.
    pub max_dimension: u32,
    /// JPEG quality (1-100).
    pub quality: u8,
}

/// Notification-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Show timer alerts (terminal bell + message).
    pub enabled: bool,
}

/// Hand-off-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    /// How long to wait for a native maps app before opening the web link,
    /// in milliseconds.
    pub fallback_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            accuracy: None,
            high_accuracy: true,
            save_timeout_ms: 12_000,
            navigate_timeout_ms: 10_000,
        }
    }
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for HandoffConfig {
    #[allow(clippy::cast_possible_truncation)]
    fn default() -> Self {
        Self {
            fallback_ms: DEFAULT_FALLBACK_DELAY.as_millis() as u64,
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FINDMYCAR_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lng)) => {
                Coordinates::new(lat, lng).map_err(|e| Error::ConfigValidation {
                    message: format!("location: {e}"),
                })?;
            }
            (None, None) => {}
            _ => {
                return Err(Error::ConfigValidation {
                    message: "location.latitude and location.longitude must be set together"
                        .to_string(),
                });
            }
        }

        if self.location.accuracy.is_some_and(|a| !a.is_finite() || a < 0.0) {
            return Err(Error::ConfigValidation {
                message: "location.accuracy must be a non-negative number".to_string(),
            });
        }

        if self.location.save_timeout_ms == 0 || self.location.navigate_timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "location timeouts must be greater than 0".to_string(),
            });
        }

        if self.photo.max_dimension == 0 {
            return Err(Error::ConfigValidation {
                message: "photo.max_dimension must be greater than 0".to_string(),
            });
        }

        if !(1..=100).contains(&self.photo.quality) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "photo.quality ({}) must be between 1 and 100",
                    self.photo.quality
                ),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// The configured fixed position, if any.
    #[must_use]
    pub fn fixed_position(&self) -> Option<Position> {
        let (lat, lng) = (self.location.latitude?, self.location.longitude?);
        let coords = Coordinates::new(lat, lng).ok()?;
        Some(Position::new(coords, self.location.accuracy))
    }

    /// Options for the fix taken when saving.
    #[must_use]
    pub fn save_locate_options(&self) -> LocateOptions {
        LocateOptions {
            high_accuracy: self.location.high_accuracy,
            timeout: Duration::from_millis(self.location.save_timeout_ms),
        }
    }

    /// Options for the fix used as route origin.
    #[must_use]
    pub fn navigate_locate_options(&self) -> LocateOptions {
        LocateOptions {
            high_accuracy: self.location.high_accuracy,
            timeout: Duration::from_millis(self.location.navigate_timeout_ms),
        }
    }

    /// Photo size and quality limits.
    #[must_use]
    pub fn photo_options(&self) -> PhotoOptions {
        PhotoOptions {
            max_dimension: self.photo.max_dimension,
            quality: self.photo.quality,
        }
    }

    /// Timeouts and limits for the parking session controller.
    #[must_use]
    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            save_locate: self.save_locate_options(),
            navigate_locate: self.navigate_locate_options(),
            initial_locate: self.navigate_locate_options(),
            photo: self.photo_options(),
            ..ControllerOptions::default()
        }
    }

    /// Native maps fallback delay.
    #[must_use]
    pub fn handoff_fallback(&self) -> Duration {
        Duration::from_millis(self.handoff.fallback_ms)
    }
}
