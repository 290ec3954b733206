//! Execution results and per-request outcomes

use crate::decision::DenyReason;
use crate::status;
use std::borrow::Cow;
use std::time::Duration;

/// What a finished (or aborted) child process produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code, or `128 + signal` when the process died from a signal
    pub exit_code: i32,
    /// Terminating signal, if any
    pub signal: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    /// Wall-clock time from spawn to reap
    pub duration: Duration,
    pub timed_out: bool,
}

impl ExecutionResult {
    /// Whether either captured stream hit the output cap
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.stdout_truncated || self.stderr_truncated
    }

    #[must_use]
    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    #[must_use]
    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Final result of one request through the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The process ran to completion; a non-zero exit code is still a completion
    Completed(ExecutionResult),
    /// The process was killed at its deadline; output is partial
    TimedOut(ExecutionResult),
    /// Policy refused the request
    Denied(DenyReason),
    /// The program could not be started
    SpawnFailed { message: String },
    /// An audit record could not be written
    AuditUnavailable { message: String },
}

impl Outcome {
    /// Collapse the outcome to the integer status returned at the boundary
    #[must_use]
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Completed(result) => result.exit_code,
            Self::TimedOut(_) => status::TIMED_OUT,
            Self::Denied(_) => status::DENIED,
            Self::SpawnFailed { .. } => status::SPAWN_FAILED,
            Self::AuditUnavailable { .. } => status::AUDIT_UNAVAILABLE,
        }
    }

    /// The execution result, if the process was started
    #[must_use]
    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            Self::Completed(result) | Self::TimedOut(result) => Some(result),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(exit_code: i32) -> ExecutionResult {
        ExecutionResult {
            exit_code,
            signal: None,
            stdout: b"out".to_vec(),
            stderr: Vec::new(),
            stdout_truncated: false,
            stderr_truncated: true,
            duration: Duration::from_millis(12),
            timed_out: false,
        }
    }

    #[test]
    fn test_exit_code_is_data() {
        assert_eq!(Outcome::Completed(result(0)).status_code(), 0);
        assert_eq!(Outcome::Completed(result(3)).status_code(), 3);
    }

    #[test]
    fn test_sentinels_are_distinct_from_exit_codes() {
        let outcomes = [
            Outcome::TimedOut(result(137)),
            Outcome::Denied(DenyReason::UnknownProgram {
                program: "/bin/x".into(),
            }),
            Outcome::SpawnFailed {
                message: "missing".into(),
            },
            Outcome::AuditUnavailable {
                message: "disk full".into(),
            },
        ];
        let codes: Vec<i32> = outcomes.iter().map(Outcome::status_code).collect();
        assert_eq!(codes, vec![-4, -1, -2, -3]);
        assert!(codes.iter().all(|c| status::is_sentinel(*c)));
    }

    #[test]
    fn test_truncated_flag() {
        assert!(result(0).truncated());
        assert_eq!(result(0).duration_ms(), 12);
    }
}
