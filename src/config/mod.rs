//! Configuration for the countdown daemon and CLI.
//!
//! Settings live in `~/.countdown/config.json`. Every field has a default, so
//! the file is optional and may list only the fields it changes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directory under the home directory holding all countdown files.
const BASE_DIR_NAME: &str = ".countdown";

const CONFIG_FILE_NAME: &str = "config.json";
const SOCKET_FILE_NAME: &str = "countdown.sock";
const STATE_FILE_NAME: &str = "trigger.json";

/// Allowed tick interval range in milliseconds.
const MIN_TICK_INTERVAL_MS: u64 = 100;
const MAX_TICK_INTERVAL_MS: u64 = 60_000;

// ============================================================================
// ConfigError
// ============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The home directory could not be determined
    #[error("ホームディレクトリが見つかりません")]
    NoHomeDirectory,

    /// The config file exists but could not be read
    #[error("設定ファイルを読み込めません: {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for this schema
    #[error("設定ファイルの形式が不正です: {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A value is out of range
    #[error("{0}")]
    Invalid(String),
}

// ============================================================================
// CountdownConfig
// ============================================================================

/// Countdown settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountdownConfig {
    /// Tick period in milliseconds (100-60000)
    pub tick_interval_ms: u64,
    /// Title of the completion notification
    pub notification_title: String,
    /// Body of the completion notification
    pub notification_body: String,
    /// Socket path override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,
    /// Trigger state file override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_path: Option<PathBuf>,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            notification_title: "Countdown".to_string(),
            notification_body: "Time is up".to_string(),
            socket_path: None,
            state_path: None,
        }
    }
}

impl CountdownConfig {
    /// Loads the config from the default location.
    ///
    /// # Errors
    ///
    /// See [`CountdownConfig::load`].
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&base_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Loads and validates the config at `path`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or holds
    /// out-of-range values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TICK_INTERVAL_MS..=MAX_TICK_INTERVAL_MS).contains(&self.tick_interval_ms) {
            return Err(ConfigError::Invalid(format!(
                "tick_interval_ms は{}-{}の範囲で指定してください",
                MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS
            )));
        }
        if self.notification_title.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "notification_title を空にすることはできません".to_string(),
            ));
        }
        Ok(())
    }

    /// Socket path, falling back to `~/.countdown/countdown.sock`.
    ///
    /// # Errors
    ///
    /// Returns an error if no override is set and the home directory is unknown.
    pub fn socket_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.socket_path {
            Some(path) => Ok(path.clone()),
            None => default_socket_path(),
        }
    }

    /// State file path, falling back to `~/.countdown/trigger.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if no override is set and the home directory is unknown.
    pub fn state_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.state_path {
            Some(path) => Ok(path.clone()),
            None => Ok(base_dir()?.join(STATE_FILE_NAME)),
        }
    }
}

/// Returns `~/.countdown`.
///
/// # Errors
///
/// Returns an error if the home directory is unknown.
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(BASE_DIR_NAME))
        .ok_or(ConfigError::NoHomeDirectory)
}

/// Returns `~/.countdown/countdown.sock`.
///
/// # Errors
///
/// Returns an error if the home directory is unknown.
pub fn default_socket_path() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join(SOCKET_FILE_NAME))
}

// ============================================================================
// Tests
// ============================================================================
