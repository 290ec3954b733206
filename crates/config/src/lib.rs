#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for execgate
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/execgate/config.toml)
//! - Environment variables (`EXECGATE_*`)
//! - CLI flags

pub mod constants;
pub mod core;
pub mod policy;
pub mod resources_semaphore;

pub use core::{AuditConfig, BrokerConfig};
pub use policy::{ArgSpec, PolicyConfig, RuleConfig};
pub use resources_semaphore::{acquire_semaphore_permit, create_semaphore};

use execgate_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub policy: PolicyConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir
            .join(constants::APP_DIR)
            .join(constants::CONFIG_FILE))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML, or
    /// holds values that fail [`Config::validate`].
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        Self::parse(&contents)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error for invalid TOML or out-of-range values.
    pub fn parse(contents: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Check values that would make the broker misbehave
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad field.
    pub fn validate(&self) -> Result<(), Error> {
        let broker = &self.broker;
        for (field, secs) in [
            ("broker.timeout_ceiling_secs", broker.timeout_ceiling_secs),
            ("broker.default_timeout_secs", broker.default_timeout_secs),
        ] {
            if secs == 0 || secs > constants::MAX_TIMEOUT_SECS {
                return Err(invalid(field, &secs.to_string()));
            }
        }
        if broker.kill_grace_ms > constants::MAX_KILL_GRACE_MS {
            return Err(invalid(
                "broker.kill_grace_ms",
                &broker.kill_grace_ms.to_string(),
            ));
        }
        if broker.max_output_bytes == 0 {
            return Err(invalid("broker.max_output_bytes", "0"));
        }
        if let Some(dir) = &broker.sandbox_dir {
            if !dir.is_absolute() {
                return Err(invalid("broker.sandbox_dir", &dir.display().to_string()));
            }
        }
        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(path) = std::env::var(constants::ENV_AUDIT_PATH) {
            self.audit.path = Some(PathBuf::from(path));
        }

        if let Some(secs) = env_number(constants::ENV_DEFAULT_TIMEOUT)? {
            self.broker.default_timeout_secs = secs;
        }

        if let Some(secs) = env_number(constants::ENV_TIMEOUT_CEILING)? {
            self.broker.timeout_ceiling_secs = secs;
        }

        if let Some(bytes) = env_number(constants::ENV_MAX_OUTPUT_BYTES)? {
            self.broker.max_output_bytes = bytes;
        }

        if let Some(slots) = env_number(constants::ENV_MAX_CONCURRENT)? {
            self.broker.max_concurrent = slots;
        }

        self.validate()
    }

    /// Get the audit file path (with default)
    #[must_use]
    pub fn audit_path(&self) -> PathBuf {
        self.audit.path()
    }
}

fn invalid(field: &str, value: &str) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

fn env_number<T: std::str::FromStr>(var: &str) -> Result<Option<T>, Error> {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| invalid(var, &value)),
        Err(_) => Ok(None),
    }
}
