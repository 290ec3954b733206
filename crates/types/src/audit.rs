//! Audit record definitions
//!
//! One record is one JSON object per line in the audit file. Each request
//! produces a `decision` record before anything runs and, when it was allowed,
//! a `completion` record carrying the same request id.

use crate::decision::{Decision, DenyReason};
use crate::request::{CommandRequest, RequestId};
use crate::result::Outcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which step of a request a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditPhase {
    Decision,
    Completion,
}

/// Append-only audit entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub request_id: RequestId,
    pub phase: AuditPhase,
    pub requester: String,
    pub program: String,
    /// Arguments following the program, exactly as submitted
    pub argv: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    pub decision: Decision,
    /// Denial category (`unknown program`, `path traversal`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub truncated_output: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditRecord {
    fn snapshot(request: &CommandRequest, phase: AuditPhase, decision: Decision) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: request.id(),
            phase,
            requester: request.requester().to_string(),
            program: request.program().to_string(),
            argv: request.args().to_vec(),
            cwd: request.cwd().map(std::path::Path::to_path_buf),
            timeout_ms: request
                .timeout()
                .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
            decision,
            reason: None,
            detail: None,
            exit_code: None,
            signal: None,
            duration_ms: None,
            timed_out: false,
            truncated_output: false,
            error: None,
        }
    }

    /// Record written before execution is dispatched
    #[must_use]
    pub fn decision(request: &CommandRequest, denial: Option<&DenyReason>) -> Self {
        let decision = if denial.is_some() {
            Decision::Denied
        } else {
            Decision::Allowed
        };
        let mut record = Self::snapshot(request, AuditPhase::Decision, decision);
        if let Some(reason) = denial {
            record.reason = Some(reason.category().to_string());
            record.detail = Some(reason.to_string());
        }
        record
    }

    /// Decision record for a command line that never became a request
    #[must_use]
    pub fn unparsed(
        request_id: RequestId,
        requester: &str,
        command_line: &str,
        reason: &DenyReason,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id,
            phase: AuditPhase::Decision,
            requester: requester.to_string(),
            program: String::new(),
            argv: vec![command_line.to_string()],
            cwd: None,
            timeout_ms: None,
            decision: Decision::Denied,
            reason: Some(reason.category().to_string()),
            detail: Some(reason.to_string()),
            exit_code: None,
            signal: None,
            duration_ms: None,
            timed_out: false,
            truncated_output: false,
            error: None,
        }
    }

    /// Record written after an allowed request finished, failed to spawn, or timed out
    #[must_use]
    pub fn completion(request: &CommandRequest, outcome: &Outcome) -> Self {
        let mut record = Self::snapshot(request, AuditPhase::Completion, Decision::Allowed);
        match outcome {
            Outcome::Completed(result) | Outcome::TimedOut(result) => {
                record.exit_code = Some(result.exit_code);
                record.signal = result.signal;
                record.duration_ms = Some(result.duration_ms());
                record.timed_out = result.timed_out;
                record.truncated_output = result.truncated();
            }
            Outcome::SpawnFailed { message } | Outcome::AuditUnavailable { message } => {
                record.error = Some(message.clone());
            }
            Outcome::Denied(reason) => {
                record.decision = Decision::Denied;
                record.reason = Some(reason.category().to_string());
                record.detail = Some(reason.to_string());
            }
        }
        record
    }
}
