//! Integration tests for error types

#[cfg(test)]
mod tests {
    use execgate_errors::*;

    #[test]
    fn test_error_conversion() {
        let audit_err = AuditError::Unavailable {
            path: "/var/log/execgate/audit.jsonl".into(),
            message: "read-only file system".into(),
        };
        let err: Error = audit_err.into();
        assert!(matches!(err, Error::Audit(_)));
        assert_eq!(err.user_code(), Some("audit.unavailable"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::InvalidRule {
            index: 2,
            program: "bin/ls".into(),
            message: "program path must be absolute".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid policy rule #2 (bin/ls): program path must be absolute"
        );
    }

    #[test]
    fn test_spawn_error_classification() {
        let not_found = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        assert!(matches!(
            PlatformError::from_spawn("/usr/bin/missing", &not_found),
            PlatformError::CommandNotFound { .. }
        ));

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            PlatformError::from_spawn("/usr/bin/locked", &denied),
            PlatformError::PermissionDenied { .. }
        ));

        let other = std::io::Error::other("fork failed");
        assert!(matches!(
            PlatformError::from_spawn("/bin/echo", &other),
            PlatformError::SpawnFailed { .. }
        ));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(
            err,
            Error::Io {
                kind: std::io::ErrorKind::PermissionDenied,
                ..
            }
        ));
    }
}
