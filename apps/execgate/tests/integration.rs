//! Integration tests for the execgate CLI

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let audit = dir.path().join("audit.jsonl");
        let config = format!(
            r#"
[broker]
default_timeout_secs = 5
kill_grace_ms = 200

[audit]
path = "{}"
sync = false

[policy]
allowed_roots = ["/bin", "/usr/bin"]

[[policy.rules]]
program = "/bin/echo"
args = ["**"]
timeout_ceiling_secs = 2
description = "print arguments"

[[policy.rules]]
program = "/bin/sleep"
args = ["*"]
timeout_ceiling_secs = 1
"#,
            audit.display()
        );
        std::fs::write(dir.path().join("config.toml"), config).unwrap();
        Self { dir }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn audit(&self) -> PathBuf {
        self.dir.path().join("audit.jsonl")
    }

    fn execgate(&self, args: &[&str]) -> Output {
        command(&self.config())
            .args(args)
            .output()
            .expect("Failed to execute execgate")
    }
}

fn command(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_execgate"));
    cmd.arg("--config")
        .arg(config)
        .env_remove("RUST_LOG")
        .env_remove("EXECGATE_AUDIT_PATH")
        .env_remove("EXECGATE_REQUESTER");
    cmd
}

fn audit_lines(path: &Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_cli_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_execgate"))
        .arg("--version")
        .output()
        .expect("Failed to execute execgate");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("execgate"));
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_execgate"))
        .arg("--help")
        .output()
        .expect("Failed to execute execgate");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["run", "check", "audit", "serve", "policy"] {
        assert!(stdout.contains(subcommand), "help is missing {subcommand}");
    }
}

#[test]
fn test_cli_invalid_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_execgate"))
        .arg("invalid-command")
        .output()
        .expect("Failed to execute execgate");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn test_run_prints_output_and_records_both_phases() {
    let fx = Fixture::new();
    let output = fx.execgate(&["run", "--as", "ci", "--", "/bin/echo", "hello;rm -rf /"]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(output.stdout, b"hello;rm -rf /\n");

    let records = audit_lines(&fx.audit());
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["phase"], "decision");
    assert_eq!(records[0]["requester"], "ci");
    assert_eq!(records[0]["argv"][0], "hello;rm -rf /");
    assert_eq!(records[1]["phase"], "completion");
    assert_eq!(records[1]["exit_code"], 0);
}

#[test]
fn test_run_single_word_is_split() {
    let fx = Fixture::new();
    let output = fx.execgate(&["run", "--", "/bin/echo 'a b' c"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(output.stdout, b"a b c\n");
}

#[test]
fn test_denied_run_exits_126() {
    let fx = Fixture::new();
    let output = fx.execgate(&["run", "--", "/bin/rm", "-rf", "/tmp/nothing"]);

    assert_eq!(output.status.code(), Some(126));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown program"));

    let records = audit_lines(&fx.audit());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["decision"], "denied");
}

#[test]
fn test_timed_out_run_exits_124() {
    let fx = Fixture::new();
    let output = fx.execgate(&["--json", "run", "--timeout", "30", "--", "/bin/sleep", "10"]);

    assert_eq!(output.status.code(), Some(124));
    let reply: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reply["outcome"], "timed_out");
    assert_eq!(reply["timed_out"], true);
}

#[test]
fn test_unwritable_audit_exits_125() {
    let fx = Fixture::new();
    let output = command(&fx.config())
        .env("EXECGATE_AUDIT_PATH", fx.dir.path())
        .args(["run", "--", "/bin/echo", "hi"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(125));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_check_does_not_write_audit() {
    let fx = Fixture::new();

    let allowed = fx.execgate(&["--json", "check", "--", "/bin/echo", "x"]);
    assert_eq!(allowed.status.code(), Some(0));
    let report: serde_json::Value = serde_json::from_slice(&allowed.stdout).unwrap();
    assert_eq!(report["allowed"], true);
    assert_eq!(report["rule"], 0);
    assert_eq!(report["timeout_ms"], 2000);

    let denied = fx.execgate(&["check", "--", "/bin/../bin/echo", "x"]);
    assert_eq!(denied.status.code(), Some(126));

    assert!(!fx.audit().exists());
}

#[test]
fn test_audit_query_filters_by_decision() {
    let fx = Fixture::new();
    fx.execgate(&["run", "--as", "alice", "--", "/bin/echo", "one"]);
    fx.execgate(&["run", "--as", "bob", "--", "/bin/cat", "/etc/passwd"]);

    let output = fx.execgate(&["--json", "audit", "--decision", "denied"]);
    assert!(output.status.success());
    let lines: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["requester"], "bob");

    let output = fx.execgate(&["--json", "audit", "--requester", "alice", "--limit", "1"]);
    let text = String::from_utf8_lossy(&output.stdout);
    assert_eq!(text.lines().count(), 1);
}

#[test]
fn test_policy_lists_rules() {
    let fx = Fixture::new();
    let output = fx.execgate(&["--json", "policy"]);
    assert!(output.status.success());

    let policy: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(policy["allowed_roots"][0], "/bin");
    assert_eq!(policy["rules"][0]["program"], "/bin/echo");
    assert_eq!(policy["rules"][0]["args"][0], "**");
    assert_eq!(policy["rules"][1]["timeout_ceiling_secs"], 1);
}

#[test]
fn test_policy_reports_invalid_rule() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        "[[policy.rules]]\nprogram = \"bin/echo\"\nargs = [\"*\"]\n",
    )
    .unwrap();

    let output = command(&config).arg("policy").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Configuration error"));
}

#[test]
fn test_serve_answers_each_line() {
    let fx = Fixture::new();
    let mut child = command(&fx.config())
        .args(["serve", "--as", "svc"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        stdin
            .write_all(b"/bin/echo first\n\n/bin/rm -rf /\n/bin/echo 'unterminated\n")
            .unwrap();
    }
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let mut replies: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    replies.sort_by_key(|reply| reply["line"].as_u64());

    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0]["line"], 1);
    assert_eq!(replies[0]["stdout"], "first\n");
    assert_eq!(replies[1]["line"], 3);
    assert_eq!(replies[1]["reason"], "unknown program");
    assert_eq!(replies[2]["line"], 4);
    assert_eq!(replies[2]["reason"], "malformed command line");

    let records = audit_lines(&fx.audit());
    assert!(records.iter().all(|record| record["requester"] == "svc"));
    assert_eq!(records.len(), 4);
}
