use execgate_errors::{Error, PlatformError};
use execgate_events::{AppEvent, ProcessEvent};
use execgate_platform::{Platform, PlatformCommand, PlatformContext};
use std::time::Duration;

const SIGTERM: i32 = 15;

fn command(program: &str, args: &[&str]) -> PlatformCommand {
    let mut cmd = PlatformCommand::new(program);
    cmd.args(args)
        .env("PATH", "/usr/bin:/bin")
        .timeout(Duration::from_secs(10))
        .kill_grace(Duration::from_millis(300));
    cmd
}

async fn run(cmd: PlatformCommand) -> Result<execgate_platform::CommandOutput, Error> {
    let platform = Platform::current();
    platform
        .execute_command(&PlatformContext::default(), cmd)
        .await
}

#[tokio::test]
async fn test_arguments_reach_program_verbatim() {
    let output = run(command("/bin/echo", &["hello;rm -rf /"])).await.unwrap();
    assert_eq!(output.stdout, b"hello;rm -rf /\n");
    assert_eq!(output.exit_code(), 0);
    assert!(!output.timed_out);
}

#[tokio::test]
async fn test_environment_is_not_inherited() {
    std::env::set_var("EXECGATE_TEST_LEAK", "1");
    let mut cmd = PlatformCommand::new("/usr/bin/env");
    cmd.env("ONLY", "this");
    let output = run(cmd).await.unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout), "ONLY=this\n");
}

#[tokio::test]
async fn test_nonzero_exit_is_not_an_error() {
    let output = run(command("/bin/sh", &["-c", "echo oops >&2; exit 3"]))
        .await
        .unwrap();
    assert_eq!(output.exit_code(), 3);
    assert_eq!(output.stderr, b"oops\n");
}

#[tokio::test]
async fn test_unbounded_timeout_runs_normally() {
    let mut cmd = command("/bin/echo", &["ok"]);
    cmd.timeout(Duration::MAX).kill_grace(Duration::MAX);
    let output = run(cmd).await.unwrap();
    assert_eq!(output.stdout, b"ok\n");
    assert!(!output.timed_out);
}

#[tokio::test]
async fn test_timeout_terminates_group() {
    let mut cmd = command("/bin/sleep", &["30"]);
    cmd.timeout(Duration::from_millis(200));
    let output = run(cmd).await.unwrap();

    assert!(output.timed_out);
    assert!(!output.escalated);
    assert_eq!(output.signal, Some(SIGTERM));
    assert!(output.duration < Duration::from_secs(5));
}

#[tokio::test]
async fn test_timeout_escalates_to_sigkill() {
    // SIG_IGN survives exec, so the sleep ignores SIGTERM too
    let mut cmd = command("/bin/sh", &["-c", "trap '' TERM; /bin/sleep 30"]);
    cmd.timeout(Duration::from_millis(200));
    let output = run(cmd).await.unwrap();

    assert!(output.timed_out);
    assert!(output.escalated);
    assert_eq!(output.exit_code(), 128 + 9);
    assert!(output.duration < Duration::from_secs(5));
}

#[tokio::test]
async fn test_background_descendant_cannot_hold_request_open() {
    let mut cmd = command("/bin/sh", &["-c", "/bin/sleep 30 & echo started"]);
    cmd.timeout(Duration::from_millis(500));
    let output = run(cmd).await.unwrap();

    assert_eq!(output.stdout, b"started\n");
    assert_eq!(output.exit_code(), 0);
    assert!(!output.timed_out);
    assert!(output.duration < Duration::from_secs(5));
}

#[tokio::test]
async fn test_output_is_capped() {
    let mut cmd = command("/usr/bin/head", &["-c", "100000", "/dev/zero"]);
    cmd.max_output(1000);
    let output = run(cmd).await.unwrap();

    assert_eq!(output.stdout.len(), 1000);
    assert!(output.stdout_truncated);
    assert!(!output.stderr_truncated);
    assert_eq!(output.exit_code(), 0);
}

#[tokio::test]
async fn test_missing_program() {
    let err = run(command("/nonexistent/program", &[])).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Platform(PlatformError::CommandNotFound { .. })
    ));
}

#[tokio::test]
async fn test_missing_working_directory() {
    let mut cmd = command("/bin/echo", &["x"]);
    cmd.current_dir("/nonexistent/dir");
    let err = run(cmd).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Platform(PlatformError::WorkingDirectory { .. })
    ));
}

#[tokio::test]
async fn test_runs_in_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = command("/bin/pwd", &[]);
    cmd.current_dir(dir.path());
    let output = run(cmd).await.unwrap();
    let printed = String::from_utf8_lossy(&output.stdout);
    let expected = dir.path().canonicalize().unwrap();
    assert_eq!(
        std::path::Path::new(printed.trim()).canonicalize().unwrap(),
        expected
    );
}

#[tokio::test]
async fn test_lifecycle_events_carry_request_id() {
    let (tx, mut rx) = execgate_events::channel();
    let ctx = PlatformContext::new(Some(tx)).with_request_id("req-1");
    Platform::current()
        .execute_command(&ctx, command("/bin/true", &[]))
        .await
        .unwrap();
    drop(ctx);

    let mut kinds = Vec::new();
    while let Some(message) = rx.recv().await {
        assert_eq!(message.meta.correlation_id.as_deref(), Some("req-1"));
        match message.event {
            AppEvent::Process(ProcessEvent::Started { .. }) => kinds.push("started"),
            AppEvent::Process(ProcessEvent::Completed { exit_code, .. }) => {
                assert_eq!(exit_code, 0);
                kinds.push("completed");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(kinds, ["started", "completed"]);
}
