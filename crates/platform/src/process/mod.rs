//! Process execution operations

use async_trait::async_trait;
use execgate_errors::Error;
use execgate_types::{status, ExecutionResult};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::PlatformContext;

/// Default deadline when the caller sets none
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default wait between SIGTERM and SIGKILL
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);
/// Default per-stream capture cap
pub const DEFAULT_MAX_OUTPUT: usize = 1024 * 1024;

/// Command to run under supervision
///
/// The child sees exactly the variables set through [`PlatformCommand::env`];
/// nothing is inherited from the broker.
#[derive(Debug, Clone)]
pub struct PlatformCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    timeout: Duration,
    kill_grace: Duration,
    max_output: usize,
}

impl PlatformCommand {
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            current_dir: None,
            env: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            kill_grace: DEFAULT_KILL_GRACE,
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }

    /// Add multiple arguments to the command
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    pub fn current_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> &mut Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(&mut self, vars: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in vars {
            self.env.insert(key.into(), value.into());
        }
        self
    }

    /// Hard deadline measured from spawn
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    pub fn kill_grace(&mut self, grace: Duration) -> &mut Self {
        self.kill_grace = grace;
        self
    }

    /// Bytes kept per stream; the rest is read and dropped
    pub fn max_output(&mut self, bytes: usize) -> &mut Self {
        self.max_output = bytes;
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn get_current_dir(&self) -> Option<&PathBuf> {
        self.current_dir.as_ref()
    }

    #[must_use]
    pub fn get_env_vars(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    #[must_use]
    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn get_kill_grace(&self) -> Duration {
        self.kill_grace
    }

    #[must_use]
    pub fn get_max_output(&self) -> usize {
        self.max_output
    }
}

/// Output from supervised execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or `None` when the process died from a signal
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub duration: Duration,
    /// The deadline passed and the process group was signalled
    pub timed_out: bool,
    /// SIGKILL was needed after the grace period
    pub escalated: bool,
}

impl CommandOutput {
    /// Exit code as a shell reports it: `128 + signal` for a signal death
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => status::SIGNAL_EXIT_BASE + signal,
            (None, None) => status::SIGNAL_EXIT_BASE,
        }
    }

    #[must_use]
    pub fn truncated(&self) -> bool {
        self.stdout_truncated || self.stderr_truncated
    }
}

impl From<CommandOutput> for ExecutionResult {
    fn from(output: CommandOutput) -> Self {
        Self {
            exit_code: output.exit_code(),
            signal: output.signal,
            stdout_truncated: output.stdout_truncated,
            stderr_truncated: output.stderr_truncated,
            duration: output.duration,
            timed_out: output.timed_out,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// Trait for process execution operations
#[async_trait]
pub trait ProcessOperations: Send + Sync {
    /// Spawn `cmd` and supervise it to completion or deadline
    ///
    /// A non-zero exit or a timeout is a successful return; `Err` means the
    /// process could not be started or waited on.
    async fn execute_command(
        &self,
        ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<CommandOutput, Error>;

    /// Create a new command builder
    fn create_command(&self, program: &str) -> PlatformCommand {
        PlatformCommand::new(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(code: Option<i32>, signal: Option<i32>) -> CommandOutput {
        CommandOutput {
            code,
            signal,
            stdout: Vec::new(),
            stderr: Vec::new(),
            stdout_truncated: false,
            stderr_truncated: true,
            duration: Duration::from_millis(5),
            timed_out: false,
            escalated: false,
        }
    }

    #[test]
    fn test_signal_exit_code() {
        assert_eq!(output(Some(3), None).exit_code(), 3);
        assert_eq!(output(None, Some(9)).exit_code(), 137);
    }

    #[test]
    fn test_into_execution_result() {
        let result = ExecutionResult::from(output(None, Some(15)));
        assert_eq!(result.exit_code, 143);
        assert_eq!(result.signal, Some(15));
        assert!(result.truncated());
    }

    #[test]
    fn test_builder_defaults() {
        let mut cmd = PlatformCommand::new("/bin/echo");
        cmd.args(["a", "b"]).env("LANG", "C");
        assert_eq!(cmd.get_args(), ["a", "b"]);
        assert_eq!(cmd.get_timeout(), DEFAULT_TIMEOUT);
        assert_eq!(cmd.get_env_vars().len(), 1);
    }
}
