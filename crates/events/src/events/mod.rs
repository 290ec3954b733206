use serde::{Deserialize, Serialize};

use crate::EventSource;
use execgate_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self {
            code: error.user_code().map(Into::into),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(Into::into),
            retryable: error.is_retryable(),
        }
    }
}

pub mod audit;
pub mod broker;
pub mod policy;
pub mod process;

pub use audit::*;
pub use broker::*;
pub use policy::*;
pub use process::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Policy reloads
    Policy(PolicyEvent),

    /// Per-request decisions
    Broker(BrokerEvent),

    /// Child process lifecycle
    Process(ProcessEvent),

    /// Audit sink health
    Audit(AuditEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::Policy(_) => EventSource::POLICY,
            Self::Broker(_) => EventSource::BROKER,
            Self::Process(_) => EventSource::PROCESS,
            Self::Audit(_) => EventSource::AUDIT,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::Policy(PolicyEvent::ReloadFailed { .. })
            | Self::Process(ProcessEvent::SpawnFailed { .. })
            | Self::Audit(AuditEvent::WriteFailed { .. }) => Level::ERROR,

            Self::Broker(BrokerEvent::RequestDenied { .. })
            | Self::Process(ProcessEvent::TimedOut { .. }) => Level::WARN,

            Self::Process(ProcessEvent::Started { .. })
            | Self::Audit(AuditEvent::Appended { .. }) => Level::DEBUG,

            _ => Level::INFO,
        }
    }

    /// Request id carried by the event, if it belongs to a request
    #[must_use]
    pub fn request_id(&self) -> Option<String> {
        match self {
            Self::Broker(
                BrokerEvent::RequestAllowed { request_id, .. }
                | BrokerEvent::RequestDenied { request_id, .. }
                | BrokerEvent::RequestFinished { request_id, .. },
            )
            | Self::Process(
                ProcessEvent::Started { request_id, .. }
                | ProcessEvent::Completed { request_id, .. }
                | ProcessEvent::TimedOut { request_id, .. }
                | ProcessEvent::SpawnFailed { request_id, .. },
            )
            | Self::Audit(
                AuditEvent::Appended { request_id, .. } | AuditEvent::WriteFailed { request_id, .. },
            ) => request_id.clone(),
            Self::Policy(_) => None,
        }
    }
}
