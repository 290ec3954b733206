//! Configuration and policy error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("parse error: {message}")]
    ParseError { message: String },

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("invalid policy rule #{index} ({program}): {message}")]
    InvalidRule {
        index: usize,
        program: String,
        message: String,
    },

    #[error("invalid allowed root {root}: {message}")]
    InvalidRoot { root: String, message: String },
}

impl UserFacingError for ConfigError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => {
                Some("Pass --config or create the default execgate configuration file.")
            }
            Self::InvalidRule { .. } => {
                Some("Fix the rule in [[policy.rules]]; the previously active policy stays in force.")
            }
            Self::InvalidRoot { .. } => Some("Allowed roots must be absolute directory paths."),
            Self::InvalidValue { .. } | Self::ParseError { .. } => {
                Some("Fix the configuration value and retry the command.")
            }
        }
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::NotFound { .. } => "config.not_found",
            Self::InvalidValue { .. } => "config.invalid",
            Self::ParseError { .. } => "config.parse",
            Self::InvalidRule { .. } | Self::InvalidRoot { .. } => "config.policy",
        })
    }
}
