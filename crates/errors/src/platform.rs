//! Process spawning and signalling errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors that can occur while creating or supervising a child process
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    #[error("process spawn failed: {command} - {message}")]
    SpawnFailed { command: String, message: String },

    #[error("command not found: {command}")]
    CommandNotFound { command: String },

    #[error("permission denied: {operation} - {message}")]
    PermissionDenied { operation: String, message: String },

    #[error("working directory unavailable: {path} - {message}")]
    WorkingDirectory { path: String, message: String },

    #[error("failed to wait for {command}: {message}")]
    WaitFailed { command: String, message: String },

    #[error("failed to signal process group {pgid}: {message}")]
    SignalFailed { pgid: i32, message: String },
}

impl PlatformError {
    /// Classify a spawn-time I/O error for the given program
    #[must_use]
    pub fn from_spawn(command: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::CommandNotFound {
                command: command.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                operation: format!("spawn {command}"),
                message: err.to_string(),
            },
            _ => Self::SpawnFailed {
                command: command.to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::CommandNotFound { .. } => {
                Some("The program is allowed by policy but missing on this host.")
            }
            Self::PermissionDenied { .. } => Some("Check the execute bit and ownership of the program."),
            Self::WorkingDirectory { .. } => Some("Create the working directory or omit --cwd."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::SpawnFailed { .. } | Self::WaitFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::SpawnFailed { .. } => "platform.spawn",
            Self::CommandNotFound { .. } => "platform.not_found",
            Self::PermissionDenied { .. } => "platform.permission",
            Self::WorkingDirectory { .. } => "platform.cwd",
            Self::WaitFailed { .. } => "platform.wait",
            Self::SignalFailed { .. } => "platform.signal",
        })
    }
}
