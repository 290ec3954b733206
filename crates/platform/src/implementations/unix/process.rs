//! Supervised child processes
//!
//! Each child becomes the leader of a fresh process group so that a timeout
//! can reach everything it forked. The deadline is enforced with SIGTERM to
//! the group, then SIGKILL once the grace period runs out.

use async_trait::async_trait;
use execgate_errors::{Error, PlatformError};
use execgate_events::{EventEmitter, FailureContext, ProcessCommandDescriptor, ProcessEvent};
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::output::{read_bounded, Captured};
use super::signal::{signal_group, SIGKILL, SIGTERM};
use crate::core::PlatformContext;
use crate::process::{CommandOutput, PlatformCommand, ProcessOperations};

type Reader = JoinHandle<std::io::Result<Captured>>;

/// Unix implementation of process operations
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixProcessOperations;

impl UnixProcessOperations {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// `now + after`, saturating far in the future instead of overflowing
fn deadline_after(after: Duration) -> tokio::time::Instant {
    const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);
    let now = tokio::time::Instant::now();
    now.checked_add(after)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

fn descriptor(cmd: &PlatformCommand) -> ProcessCommandDescriptor {
    ProcessCommandDescriptor {
        program: cmd.program().to_string(),
        args: cmd.get_args().to_vec(),
        cwd: cmd.get_current_dir().cloned(),
    }
}

fn wait_failed(cmd: &PlatformCommand, message: impl ToString) -> PlatformError {
    PlatformError::WaitFailed {
        command: cmd.program().to_string(),
        message: message.to_string(),
    }
}

async fn check_working_dir(cmd: &PlatformCommand) -> Result<(), PlatformError> {
    let Some(dir) = cmd.get_current_dir() else {
        return Ok(());
    };
    let fail = |message: String| PlatformError::WorkingDirectory {
        path: dir.display().to_string(),
        message,
    };
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(fail("not a directory".to_string())),
        Err(e) => Err(fail(e.to_string())),
    }
}

fn spawn_child(cmd: &PlatformCommand) -> Result<Child, PlatformError> {
    let mut command = Command::new(cmd.program());
    command
        .args(cmd.get_args())
        .env_clear()
        .envs(cmd.get_env_vars())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);
    if let Some(dir) = cmd.get_current_dir() {
        command.current_dir(dir);
    }

    command
        .spawn()
        .map_err(|e| PlatformError::from_spawn(cmd.program(), &e))
}

fn spawn_reader<R>(reader: Option<R>, limit: usize, stop: watch::Receiver<bool>) -> Reader
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        match reader {
            Some(reader) => read_bounded(reader, limit, stop).await,
            None => Ok(Captured::default()),
        }
    })
}

/// Signal the group, falling back to killing the leader alone
fn signal_or_kill_leader(child: &mut Child, pgid: i32, signal: i32) {
    if let Err(e) = signal_group(pgid, signal) {
        tracing::warn!(pgid, signal, error = %e, "group signal failed; killing leader");
        if let Err(e) = child.start_kill() {
            tracing::warn!(pgid, error = %e, "failed to kill process leader");
        }
    }
}

/// SIGTERM the group, wait out the grace period, then SIGKILL
///
/// Returns the leader's status and whether SIGKILL was needed.
async fn terminate(
    child: &mut Child,
    pgid: i32,
    grace: Duration,
) -> std::io::Result<(ExitStatus, bool)> {
    signal_or_kill_leader(child, pgid, SIGTERM);

    if let Ok(waited) = tokio::time::timeout(grace, child.wait()).await {
        let status = waited?;
        // descendants that ignored SIGTERM
        if let Err(e) = signal_group(pgid, SIGKILL) {
            tracing::debug!(pgid, error = %e, "post-exit group sweep failed");
        }
        return Ok((status, false));
    }

    signal_or_kill_leader(child, pgid, SIGKILL);
    let status = child.wait().await?;
    Ok((status, true))
}

fn finish_reader(
    cmd: &PlatformCommand,
    joined: Result<std::io::Result<Captured>, tokio::task::JoinError>,
) -> Result<Captured, PlatformError> {
    joined
        .map_err(|e| wait_failed(cmd, e))?
        .map_err(|e| wait_failed(cmd, e))
}

async fn supervise(
    ctx: &PlatformContext,
    cmd: &PlatformCommand,
) -> Result<CommandOutput, PlatformError> {
    check_working_dir(cmd).await?;

    let grace = cmd.get_kill_grace();
    let start = Instant::now();
    let deadline = deadline_after(cmd.get_timeout());
    let mut child = spawn_child(cmd)?;

    let pid = child.id();
    let pgid = pid
        .and_then(|pid| i32::try_from(pid).ok())
        .ok_or_else(|| wait_failed(cmd, "child has no pid after spawn"))?;

    ctx.emit_process(ProcessEvent::Started {
        request_id: ctx.request_id().map(String::from),
        command: descriptor(cmd),
        pid,
        timeout_ms: duration_to_millis(cmd.get_timeout()),
    });

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut stdout_task = spawn_reader(child.stdout.take(), cmd.get_max_output(), stop_rx.clone());
    let mut stderr_task = spawn_reader(child.stderr.take(), cmd.get_max_output(), stop_rx);

    let (status, timed_out, escalated) =
        match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(waited) => (waited.map_err(|e| wait_failed(cmd, e))?, false, false),
            Err(_) => {
                tracing::debug!(pgid, "deadline passed; terminating process group");
                let (status, escalated) = terminate(&mut child, pgid, grace)
                    .await
                    .map_err(|e| wait_failed(cmd, e))?;
                (status, true, escalated)
            }
        };

    // Descendants may still hold the pipes after the leader is gone.
    let drain_deadline = if timed_out {
        deadline_after(grace)
    } else {
        deadline
    };
    let drained = tokio::time::timeout_at(
        drain_deadline,
        futures::future::join(&mut stdout_task, &mut stderr_task),
    )
    .await;
    let (stdout, stderr) = if let Ok(pair) = drained {
        pair
    } else {
        tracing::debug!(pgid, "output still open past deadline; killing process group");
        if let Err(e) = signal_group(pgid, SIGKILL) {
            tracing::warn!(pgid, error = %e, "failed to kill lingering process group");
        }
        let settled = tokio::time::timeout(
            grace,
            futures::future::join(&mut stdout_task, &mut stderr_task),
        )
        .await;
        if let Ok(pair) = settled {
            pair
        } else {
            let _ = stop_tx.send(true);
            futures::future::join(stdout_task, stderr_task).await
        }
    };

    let stdout = finish_reader(cmd, stdout)?;
    let stderr = finish_reader(cmd, stderr)?;

    Ok(CommandOutput {
        code: status.code(),
        signal: status.signal(),
        stdout: stdout.data,
        stderr: stderr.data,
        stdout_truncated: stdout.truncated,
        stderr_truncated: stderr.truncated,
        duration: start.elapsed(),
        timed_out,
        escalated,
    })
}

#[async_trait]
impl ProcessOperations for UnixProcessOperations {
    async fn execute_command(
        &self,
        ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<CommandOutput, Error> {
        let result = supervise(ctx, &cmd).await;
        let request_id = ctx.request_id().map(String::from);

        match &result {
            Ok(output) if output.timed_out => ctx.emit_process(ProcessEvent::TimedOut {
                request_id,
                program: cmd.program().to_string(),
                timeout_ms: duration_to_millis(cmd.get_timeout()),
                escalated: output.escalated,
            }),
            Ok(output) => ctx.emit_process(ProcessEvent::Completed {
                request_id,
                program: cmd.program().to_string(),
                exit_code: output.exit_code(),
                signal: output.signal,
                duration_ms: duration_to_millis(output.duration),
                stdout_bytes: output.stdout.len() as u64,
                stderr_bytes: output.stderr.len() as u64,
                truncated: output.truncated(),
            }),
            Err(e) => ctx.emit_process(ProcessEvent::SpawnFailed {
                request_id,
                command: descriptor(&cmd),
                failure: FailureContext::from_error(e),
            }),
        }

        result.map_err(Error::from)
    }
}
