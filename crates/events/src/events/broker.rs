//! Request decision events

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum BrokerEvent {
    RequestAllowed {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        requester: String,
        program: String,
        /// Index of the matching rule in the active policy
        rule: usize,
        timeout_ms: u64,
    },

    RequestDenied {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        requester: String,
        program: String,
        reason: String,
    },

    /// Final status handed back to the caller
    RequestFinished {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        status: i32,
    },
}
