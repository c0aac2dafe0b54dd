//! Ambient configuration loading via `ortho-config`.
//!
//! Per-driver options flow through the flag spec and [`crate::options`];
//! this module carries only the settings that apply regardless of backend:
//! where machine artefacts live and how patiently waits poll.

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Default local directory for per-machine artefacts.
pub const DEFAULT_STORAGE_PATH: &str = ".machina/machines";

/// Machine-manager settings merged from defaults, configuration files, and
/// environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "MACHINA")]
pub struct MachineConfig {
    /// Directory that receives per-machine artefacts (keys, certificates).
    #[ortho_config(default = DEFAULT_STORAGE_PATH.to_owned())]
    pub storage_path: String,
    /// Seconds between convergence polls.
    #[ortho_config(default = 3_u64)]
    pub poll_interval_secs: u64,
    /// Total seconds one lifecycle wait may take before timing out.
    #[ortho_config(default = 300_u64)]
    pub wait_timeout_secs: u64,
}

impl MachineConfig {
    /// Loads configuration without attempting to parse CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge
    /// sources.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("machina")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on the merged values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when a value cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_path.trim().is_empty() {
            return Err(ConfigError::InvalidField(
                "storage_path must not be empty: set MACHINA_STORAGE_PATH".to_owned(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidField(
                "poll_interval_secs must be at least 1: set MACHINA_POLL_INTERVAL_SECS".to_owned(),
            ));
        }
        if self.wait_timeout_secs < self.poll_interval_secs {
            return Err(ConfigError::InvalidField(
                "wait_timeout_secs must be at least the poll interval: set MACHINA_WAIT_TIMEOUT_SECS"
                    .to_owned(),
            ));
        }
        Ok(())
    }

    /// Storage path as a UTF-8 path.
    #[must_use]
    pub fn storage_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.storage_path)
    }

    /// Interval between convergence polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Total deadline for one lifecycle wait.
    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// A merged value fails semantic validation.
    #[error("invalid configuration: {0}")]
    InvalidField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{ConfigError, MachineConfig, DEFAULT_STORAGE_PATH};

    fn config() -> MachineConfig {
        MachineConfig {
            storage_path: DEFAULT_STORAGE_PATH.to_owned(),
            poll_interval_secs: 3,
            wait_timeout_secs: 300,
        }
    }

    #[rstest]
    fn default_shape_validates() {
        config()
            .validate()
            .unwrap_or_else(|err| panic!("defaults should validate: {err}"));
    }

    #[rstest]
    fn zero_poll_interval_is_rejected() {
        let cfg = MachineConfig {
            poll_interval_secs: 0,
            ..config()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidField(_))));
    }

    #[rstest]
    fn timeout_shorter_than_interval_is_rejected() {
        let cfg = MachineConfig {
            poll_interval_secs: 30,
            wait_timeout_secs: 10,
            ..config()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidField(_))));
    }
}
