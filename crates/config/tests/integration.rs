//! Integration tests for config

#[cfg(test)]
mod tests {
    use execgate_config::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for var in [
            constants::ENV_AUDIT_PATH,
            constants::ENV_DEFAULT_TIMEOUT,
            constants::ENV_TIMEOUT_CEILING,
            constants::ENV_MAX_OUTPUT_BYTES,
            constants::ENV_MAX_CONCURRENT,
        ] {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[broker]
default_timeout_secs = 5
timeout_ceiling_secs = 30
max_output_bytes = 4096
kill_grace_ms = 250

[broker.env]
PATH = "/usr/bin:/bin"

[audit]
path = "/tmp/execgate-audit.jsonl"
sync = false

[policy]
allowed_roots = ["/bin", "/usr/bin"]

[[policy.rules]]
program = "/bin/echo"
args = ["*"]
timeout_ceiling_secs = 2

[[policy.rules]]
program = "/usr/bin/git"
args = ["log", {{ prefix = "--format=" }}, {{ regex = "^[0-9a-f]{{7,40}}$" }}, "**"]
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.broker.default_timeout(), Duration::from_secs(5));
        assert_eq!(config.broker.timeout_ceiling(), Duration::from_secs(30));
        assert_eq!(config.broker.max_output_bytes, 4096);
        assert_eq!(config.broker.kill_grace(), Duration::from_millis(250));
        assert_eq!(config.broker.env.len(), 1);
        assert!(!config.audit.sync);
        assert_eq!(
            config.audit_path(),
            PathBuf::from("/tmp/execgate-audit.jsonl")
        );

        assert_eq!(config.policy.allowed_roots.len(), 2);
        assert_eq!(config.policy.rules.len(), 2);
        assert_eq!(config.policy.rules[0].timeout_ceiling_secs, Some(2));
        assert_eq!(
            config.policy.rules[0].args,
            vec![ArgSpec::Literal("*".into())]
        );
        assert_eq!(
            config.policy.rules[1].args[1],
            ArgSpec::Prefix {
                prefix: "--format=".into()
            }
        );
        assert!(matches!(
            config.policy.rules[1].args[2],
            ArgSpec::Regex { .. }
        ));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.broker.default_timeout_secs, 10);
        assert_eq!(config.broker.max_concurrent, 0);
        assert_eq!(
            config.broker.env.get("PATH").map(String::as_str),
            Some("/usr/local/bin:/usr/bin:/bin")
        );
        assert_eq!(config.audit_path(), PathBuf::from(constants::AUDIT_PATH));
        assert!(config.policy.rules.is_empty());
    }

    #[test]
    fn test_zero_ceiling_rejected() {
        let err = Config::parse("[broker]\ntimeout_ceiling_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_ceiling_secs"));
    }

    #[test]
    fn test_unbounded_timeouts_rejected() {
        let err = Config::parse("[broker]\ndefault_timeout_secs = 9223372036854775807\n")
            .unwrap_err();
        assert!(err.to_string().contains("default_timeout_secs"));

        let too_long = constants::MAX_TIMEOUT_SECS + 1;
        let err = Config::parse(&format!("[broker]\ntimeout_ceiling_secs = {too_long}\n"))
            .unwrap_err();
        assert!(err.to_string().contains("timeout_ceiling_secs"));

        let err = Config::parse("[broker]\nkill_grace_ms = 600000\n").unwrap_err();
        assert!(err.to_string().contains("kill_grace_ms"));

        let at_limit = constants::MAX_TIMEOUT_SECS;
        assert!(Config::parse(&format!("[broker]\ntimeout_ceiling_secs = {at_limit}\n")).is_ok());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = Config::load_from_file(std::path::Path::new("/nonexistent/execgate.toml")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var(constants::ENV_AUDIT_PATH, "/srv/audit.jsonl");
        std::env::set_var(constants::ENV_TIMEOUT_CEILING, "90");
        std::env::set_var(constants::ENV_MAX_CONCURRENT, "4");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.audit_path(), PathBuf::from("/srv/audit.jsonl"));
        assert_eq!(config.broker.timeout_ceiling_secs, 90);
        assert_eq!(config.broker.max_concurrent, 4);

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var(constants::ENV_DEFAULT_TIMEOUT, "soon");

        let mut config = Config::default();
        let result = config.merge_env();
        assert!(result.is_err());

        clear_env();
    }

    #[tokio::test]
    async fn test_semaphore_helpers() {
        assert!(create_semaphore(0).is_none());
        let semaphore = create_semaphore(1).unwrap();
        let permit = acquire_semaphore_permit(semaphore.clone(), "test")
            .await
            .unwrap();
        assert_eq!(semaphore.available_permits(), 0);
        drop(permit);
        assert_eq!(semaphore.available_permits(), 1);
    }
}
