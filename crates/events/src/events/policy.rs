//! Policy store events

use serde::{Deserialize, Serialize};

use super::FailureContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PolicyEvent {
    /// A new rule set became active
    Reloaded {
        generation: u64,
        rules: usize,
        allowed_roots: usize,
    },

    /// A reload was rejected; the previous rule set stays active
    ReloadFailed {
        active_generation: u64,
        failure: FailureContext,
    },
}
