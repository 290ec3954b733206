//! Audit sink events

use serde::{Deserialize, Serialize};

use super::FailureContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    Appended {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        phase: String,
    },

    /// The request was refused (or its completion left unrecorded)
    WriteFailed {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        phase: String,
        failure: FailureContext,
    },
}
