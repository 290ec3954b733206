//! Fixed paths and environment variable names for execgate

pub const APP_DIR: &str = "execgate";
pub const CONFIG_FILE: &str = "config.toml";

pub const AUDIT_PATH: &str = "/var/log/execgate/audit.jsonl";
pub const LOGS_DIR: &str = "/var/log/execgate";

pub const ENV_AUDIT_PATH: &str = "EXECGATE_AUDIT_PATH";
pub const ENV_DEFAULT_TIMEOUT: &str = "EXECGATE_DEFAULT_TIMEOUT";
pub const ENV_TIMEOUT_CEILING: &str = "EXECGATE_TIMEOUT_CEILING";
pub const ENV_MAX_OUTPUT_BYTES: &str = "EXECGATE_MAX_OUTPUT_BYTES";
pub const ENV_MAX_CONCURRENT: &str = "EXECGATE_MAX_CONCURRENT";

/// Upper bound for any configured timeout or timeout ceiling (one day)
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;
/// Upper bound for the SIGTERM-to-SIGKILL grace period
pub const MAX_KILL_GRACE_MS: u64 = 60 * 1000;
