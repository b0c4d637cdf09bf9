use crate::error::config::ConfigError;
use crate::{VARNISHADM_BINARY, VARNISHD_BINARY};

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

const DEFAULT_POLL_INTERVAL_MS: u64 = 200;
const DEFAULT_SECRET_WAIT_MS: u64 = 2_000;
const MAX_POLL_INTERVAL_MS: u64 = 60_000;
const INLINE_CONFIG_PATH: &str = "<inline>";

// ============================================
// ENUMS WITH DEFAULTS
// ============================================

/// How management commands reach the instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// varnishd connects back to a listener we own (`-M`); we authenticate in-process.
    #[default]
    Socket,
    /// Every command runs `varnishadm -n <workdir>`, which does its own authentication.
    Exec,
}

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_varnishd_path")]
    pub varnishd_path: String,

    #[serde(default = "default_varnishadm_path")]
    pub varnishadm_path: String,

    #[serde(default = "default_work_root")]
    pub work_root: PathBuf,

    #[serde(default)]
    pub transport: Transport,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub startup_timeout_ms: Option<u64>,

    #[serde(default = "default_secret_wait_ms")]
    pub secret_wait_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            varnishd_path: default_varnishd_path(),
            varnishadm_path: default_varnishadm_path(),
            work_root: default_work_root(),
            transport: Transport::default(),
            poll_interval_ms: default_poll_interval_ms(),
            startup_timeout_ms: None,
            secret_wait_ms: default_secret_wait_ms(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_varnishd_path() -> String {
    VARNISHD_BINARY.to_string()
}
fn default_varnishadm_path() -> String {
    VARNISHADM_BINARY.to_string()
}
fn default_work_root() -> PathBuf {
    std::env::temp_dir()
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_secret_wait_ms() -> u64 {
    DEFAULT_SECRET_WAIT_MS
}

// ============================================
// IMPLEMENTATION
// ============================================

impl SupervisorConfig {
    /// Load a TOML config file.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file does not exist.
    /// Returns `Err(ConfigError)` if the file exists but cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source: e,
        })?;

        let config = Self::parse(&contents, path)?;

        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text.
    #[track_caller]
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Self::parse(contents, Path::new(INLINE_CONFIG_PATH))
    }

    #[track_caller]
    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: SupervisorConfig =
            toml::from_str(contents).map_err(|e| ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.varnishd_path.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "varnishd_path cannot be empty".to_string(),
            });
        }

        if self.transport == Transport::Exec && self.varnishadm_path.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "varnishadm_path cannot be empty with the exec transport".to_string(),
            });
        }

        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid poll interval: {} ms (must be 1-{MAX_POLL_INTERVAL_MS})",
                    self.poll_interval_ms
                ),
            });
        }

        if self.startup_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "startup_timeout_ms must be non-zero when set".to_string(),
            });
        }

        if self.secret_wait_ms == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "secret_wait_ms must be non-zero".to_string(),
            });
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn startup_timeout(&self) -> Option<Duration> {
        self.startup_timeout_ms.map(Duration::from_millis)
    }

    pub fn secret_wait(&self) -> Duration {
        Duration::from_millis(self.secret_wait_ms)
    }
}
