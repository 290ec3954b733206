//! Command line interface definition

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use execgate_types::Decision;
use std::path::PathBuf;
use uuid::Uuid;

/// execgate - run allow-listed commands without a shell
#[derive(Parser)]
#[command(name = "execgate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Policy-gated command execution broker")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to /var/log/execgate/
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Identity recorded as the requester in the audit log
#[derive(Parser)]
pub struct RequesterArgs {
    /// Requester identity
    #[arg(
        long = "as",
        value_name = "ID",
        env = "EXECGATE_REQUESTER",
        default_value = "cli"
    )]
    pub requester: String,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Validate and execute one command line
    #[command(alias = "exec")]
    Run {
        #[command(flatten)]
        requester: RequesterArgs,

        /// Requested timeout in seconds (capped by policy; 0 = default)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Working directory (a throwaway sandbox directory if omitted)
        #[arg(long, value_name = "DIR")]
        cwd: Option<PathBuf>,

        /// Command line: a single quoted string, or program and arguments
        #[arg(last = true, required = true, value_name = "COMMAND")]
        line: Vec<String>,
    },

    /// Validate a command line against the policy without running it
    Check {
        #[command(flatten)]
        requester: RequesterArgs,

        /// Command line: a single quoted string, or program and arguments
        #[arg(last = true, required = true, value_name = "COMMAND")]
        line: Vec<String>,
    },

    /// Query the audit log
    Audit {
        /// Only records for this requester
        #[arg(long, value_name = "ID")]
        requester: Option<String>,

        /// Only records for this request
        #[arg(long, value_name = "UUID")]
        request_id: Option<Uuid>,

        /// Only allowed or denied records
        #[arg(long, value_name = "allowed|denied")]
        decision: Option<Decision>,

        /// Records at or after this time (RFC 3339)
        #[arg(long, value_name = "TIME")]
        since: Option<DateTime<Utc>>,

        /// Records before this time (RFC 3339)
        #[arg(long, value_name = "TIME")]
        until: Option<DateTime<Utc>>,

        /// Maximum number of records
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Execute command lines read from stdin, one JSON result per line
    Serve {
        #[command(flatten)]
        requester: RequesterArgs,
    },

    /// Print the compiled policy
    Policy,
}

/// Turn trailing command words into one command line
///
/// A single word is taken as a complete command line and split later. Several
/// words have already been split by the invoking shell, so they are quoted
/// back together and split into the same vector.
pub fn command_line(words: &[String]) -> String {
    match words {
        [line] => line.clone(),
        words => shell_words::join(words),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_collects_trailing_words() {
        let cli = Cli::parse_from([
            "execgate", "--json", "run", "--as", "ci", "--timeout", "3", "--", "/bin/echo", "a b",
        ]);
        assert!(cli.global.json);
        let Commands::Run {
            requester,
            timeout,
            cwd,
            line,
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(requester.requester, "ci");
        assert_eq!(timeout, Some(3));
        assert!(cwd.is_none());
        assert_eq!(line, ["/bin/echo", "a b"]);
    }

    #[test]
    fn test_audit_filters_parse() {
        let cli = Cli::parse_from([
            "execgate",
            "audit",
            "--decision",
            "denied",
            "--since",
            "2024-05-01T00:00:00Z",
            "-n",
            "5",
        ]);
        let Commands::Audit {
            decision,
            since,
            limit,
            ..
        } = cli.command
        else {
            panic!("expected audit");
        };
        assert_eq!(decision, Some(Decision::Denied));
        assert!(since.is_some());
        assert_eq!(limit, Some(5));
    }

    #[test]
    fn test_command_line_joining() {
        assert_eq!(command_line(&["/bin/echo 'a;b'".into()]), "/bin/echo 'a;b'");
        let words: Vec<String> = vec!["/bin/echo".into(), "a;b".into(), "$(id)".into()];
        let joined = command_line(&words);
        assert_eq!(shell_words::split(&joined).unwrap(), words);
    }
}
