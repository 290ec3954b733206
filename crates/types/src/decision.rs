//! Validation decisions and denial reasons

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of policy evaluation as recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allowed,
    Denied,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "allowed"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allowed" | "allow" => Ok(Self::Allowed),
            "denied" | "deny" => Ok(Self::Denied),
            other => Err(format!("unknown decision: {other}")),
        }
    }
}

/// Why a request was refused.
///
/// Checks run in a fixed order (command line, program path, working
/// directory, rule lookup, argument shapes) and the first failing check
/// determines the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenyReason {
    /// The command line could not be split into words
    MalformedCommandLine { message: String },
    /// Relative path, `..`/`.` component or NUL byte in a path
    PathTraversal { path: String },
    /// Program path is not under any configured allowed root
    OutsideAllowedRoot { path: String },
    /// No rule exists for the program path
    UnknownProgram { program: String },
    /// Rules exist but none accepts the argument vector; reports the first rule tried
    ArgumentMismatch {
        rule: usize,
        position: usize,
        detail: String,
    },
}

impl DenyReason {
    /// Stable reason string written to the audit log and shown to callers
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::MalformedCommandLine { .. } => "malformed command line",
            Self::PathTraversal { .. } | Self::OutsideAllowedRoot { .. } => "path traversal",
            Self::UnknownProgram { .. } => "unknown program",
            Self::ArgumentMismatch { .. } => "argument mismatch",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedCommandLine { message } => {
                write!(f, "malformed command line: {message}")
            }
            Self::PathTraversal { path } => write!(f, "path traversal: {path}"),
            Self::OutsideAllowedRoot { path } => {
                write!(f, "path traversal: {path} is outside the allowed roots")
            }
            Self::UnknownProgram { program } => write!(f, "unknown program: {program}"),
            Self::ArgumentMismatch {
                rule,
                position,
                detail,
            } => write!(
                f,
                "argument mismatch: rule #{rule} rejected argument {position} ({detail})"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outside_root_is_traversal_class() {
        let reason = DenyReason::OutsideAllowedRoot {
            path: "/opt/tools/x".into(),
        };
        assert_eq!(reason.category(), "path traversal");
        assert!(reason.to_string().contains("/opt/tools/x"));
    }

    #[test]
    fn test_decision_parse() {
        assert_eq!("denied".parse::<Decision>().unwrap(), Decision::Denied);
        assert_eq!("allow".parse::<Decision>().unwrap(), Decision::Allowed);
        assert!("maybe".parse::<Decision>().is_err());
    }
}
