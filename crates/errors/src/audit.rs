//! Audit log error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum AuditError {
    #[error("audit log unavailable at {path}: {message}")]
    Unavailable { path: String, message: String },

    #[error("failed to encode audit record: {message}")]
    Encode { message: String },

    #[error("corrupt audit record at line {line}: {message}")]
    Corrupt { line: u64, message: String },

    #[error("audit log read failed at {path}: {message}")]
    ReadFailed { path: String, message: String },
}

impl UserFacingError for AuditError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Unavailable { .. } => Some(
                "Commands are refused while the audit sink is unwritable; check [audit].path permissions and free space.",
            ),
            Self::Corrupt { .. } => Some("Inspect the audit file; records are never rewritten by execgate."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::ReadFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::Unavailable { .. } => "audit.unavailable",
            Self::Encode { .. } => "audit.encode",
            Self::Corrupt { .. } => "audit.corrupt",
            Self::ReadFailed { .. } => "audit.read",
        })
    }
}
