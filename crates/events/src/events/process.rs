//! Child process lifecycle events

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Program and argv as handed to process creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessCommandDescriptor {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ProcessEvent {
    Started {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        command: ProcessCommandDescriptor,
        pid: Option<u32>,
        timeout_ms: u64,
    },

    Completed {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        program: String,
        exit_code: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        signal: Option<i32>,
        duration_ms: u64,
        stdout_bytes: u64,
        stderr_bytes: u64,
        truncated: bool,
    },

    /// Deadline passed; the process group was signalled
    TimedOut {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        program: String,
        timeout_ms: u64,
        /// SIGKILL was needed after the grace period
        escalated: bool,
    },

    SpawnFailed {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        command: ProcessCommandDescriptor,
        failure: FailureContext,
    },
}
