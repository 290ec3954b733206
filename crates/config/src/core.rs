//! Broker and audit sections of the configuration file

use crate::constants;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Execution limits and child environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    /// Applies to rules that do not set their own ceiling
    #[serde(default = "default_timeout_ceiling_secs")]
    pub timeout_ceiling_secs: u64,
    /// Cap per captured stream (stdout and stderr each)
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Time between SIGTERM and SIGKILL on timeout
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
    /// Simultaneous executions; 0 means unlimited
    #[serde(default)]
    pub max_concurrent: usize,
    /// Parent for per-request sandbox directories (system temp dir if unset)
    pub sandbox_dir: Option<PathBuf>,
    /// The complete environment given to children; nothing is inherited
    #[serde(default = "default_env")]
    pub env: BTreeMap<String, String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            timeout_ceiling_secs: default_timeout_ceiling_secs(),
            max_output_bytes: default_max_output_bytes(),
            kill_grace_ms: default_kill_grace_ms(),
            max_concurrent: 0,
            sandbox_dir: None,
            env: default_env(),
        }
    }
}

impl BrokerConfig {
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    #[must_use]
    pub fn timeout_ceiling(&self) -> Duration {
        Duration::from_secs(self.timeout_ceiling_secs)
    }

    #[must_use]
    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }
}

/// Audit sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub path: Option<PathBuf>,
    /// fsync after every record
    #[serde(default = "default_sync")]
    pub sync: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: None,
            sync: default_sync(),
        }
    }
}

impl AuditConfig {
    /// Get the audit file path (with default)
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(constants::AUDIT_PATH))
    }
}

// Default value functions for serde
fn default_timeout_secs() -> u64 {
    10
}

fn default_timeout_ceiling_secs() -> u64 {
    60
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

fn default_kill_grace_ms() -> u64 {
    2000
}

fn default_sync() -> bool {
    true
}

fn default_env() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("PATH".to_string(), "/usr/local/bin:/usr/bin:/bin".to_string()),
        ("LANG".to_string(), "C".to_string()),
    ])
}
