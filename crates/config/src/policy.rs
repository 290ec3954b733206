//! Raw policy section as written in the configuration file
//!
//! ```toml
//! [policy]
//! allowed_roots = ["/bin", "/usr/bin"]
//!
//! [[policy.rules]]
//! program = "/bin/echo"
//! args = ["*"]
//! timeout_ceiling_secs = 2
//!
//! [[policy.rules]]
//! program = "/usr/bin/git"
//! args = ["log", { prefix = "--format=" }, { regex = "^[0-9a-f]{7,40}$" }]
//! ```
//!
//! Compilation into matchers happens in `execgate-policy`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Allow-list: program roots plus ordered rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Program paths must live under one of these (no restriction when empty)
    #[serde(default)]
    pub allowed_roots: Vec<PathBuf>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// One allow rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Absolute program path or glob (`/usr/bin/git*`)
    pub program: String,
    /// One shape per argument position; empty means "no arguments"
    #[serde(default)]
    pub args: Vec<ArgSpec>,
    pub timeout_ceiling_secs: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Allowed shape of one argument.
///
/// A bare string is an exact match, except `*` (any single argument) and `**`
/// (any remaining arguments, last position only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgSpec {
    Literal(String),
    Exact { exact: String },
    Prefix { prefix: String },
    Regex { regex: String },
}
