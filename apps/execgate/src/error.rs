//! CLI error handling

use std::fmt;

use execgate_errors::{ConfigError, UserFacingError};

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration or policy error
    Config(ConfigError),
    /// Broker, audit or platform error
    Broker(execgate_errors::Error),
    /// Invalid command arguments
    InvalidArguments(String),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => {
                write!(f, "Configuration error: {}", e.user_message())?;
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                Ok(())
            }
            CliError::Broker(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Broker(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::InvalidArguments(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<execgate_errors::Error> for CliError {
    fn from(e: execgate_errors::Error) -> Self {
        match e {
            execgate_errors::Error::Config(config) => CliError::Config(config),
            other => CliError::Broker(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use execgate_errors::AuditError;

    #[test]
    fn test_config_errors_are_unwrapped() {
        let err: CliError = execgate_errors::Error::from(ConfigError::ParseError {
            message: "expected `=`".into(),
        })
        .into();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_broker_error_shows_code() {
        let err: CliError = execgate_errors::Error::from(AuditError::Unavailable {
            path: "/var/log/execgate/audit.jsonl".into(),
            message: "read-only file system".into(),
        })
        .into();
        let text = err.to_string();
        assert!(text.contains("read-only file system"));
        assert!(text.contains("Code:"));
    }
}
