//! execgate - policy-gated command execution broker
//!
//! Runs allow-listed programs directly (never through a shell), records every
//! decision and completion in an append-only audit log, and refuses to run
//! anything it cannot record.

mod cli;
mod display;
mod error;
mod logging;
mod serve;

use crate::cli::{command_line, Cli, Commands};
use crate::display::{CheckReport, OutputRenderer};
use crate::error::CliError;
use clap::Parser;
use execgate_audit::{AuditFilter, AuditSink, JsonlAuditLog};
use execgate_broker::ExecutionBroker;
use execgate_config::{constants, Config};
use execgate_events::EventReceiver;
use execgate_policy::{parse_command_line, PolicySet, ValidationOutcome};
use execgate_types::{status, AuditRecord, Outcome, RequestId};
use futures::TryStreamExt;
use std::future::Future;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let json_mode = cli.global.json;
    init_tracing(json_mode, cli.global.debug);

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Error: {}", e);
            if json_mode {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            } else {
                eprintln!("Error: {e}");
            }
            process::exit(1);
        }
    }
}

/// Main application logic; returns the process exit code
async fn run(cli: Cli) -> Result<i32, CliError> {
    info!("Starting execgate v{}", env!("CARGO_PKG_VERSION"));

    let config_path = cli.global.config.clone();
    let mut config = Config::load_or_default(config_path.as_deref()).await?;
    config.merge_env()?;

    let renderer = OutputRenderer::new(cli.global.json);

    match cli.command {
        Commands::Policy => {
            let policy = PolicySet::compile(&config.policy)?;
            renderer.render_policy(&policy)?;
            Ok(0)
        }

        Commands::Audit {
            requester,
            request_id,
            decision,
            since,
            until,
            limit,
        } => {
            let filter = AuditFilter {
                requester,
                request_id: request_id.map(RequestId::from),
                decision,
                phase: None,
                since,
                until,
                limit,
            };
            let log = JsonlAuditLog::new(config.audit_path(), config.audit.sync);
            let records: Vec<AuditRecord> = log.query(filter).await?.try_collect().await?;
            renderer.render_audit(&records)?;
            Ok(0)
        }

        Commands::Check { requester, line } => {
            let broker = ExecutionBroker::from_config(&config)?;
            let report = check(&broker, &command_line(&line), &requester.requester);
            renderer.render_check(&report)?;
            Ok(if report.allowed {
                0
            } else {
                shell_exit_code(status::DENIED)
            })
        }

        Commands::Run {
            requester,
            timeout,
            cwd,
            line,
        } => {
            let (event_sender, mut event_receiver) = execgate_events::channel();
            let broker = ExecutionBroker::from_config(&config)?.with_event_sender(event_sender);
            let line = command_line(&line);
            let submission = submit(
                &broker,
                &line,
                &requester.requester,
                timeout.map(Duration::from_secs),
                cwd,
            );
            let outcome = drive_with_events(submission, &mut event_receiver).await;

            renderer.render_outcome(&outcome)?;
            Ok(shell_exit_code(outcome.status_code()))
        }

        Commands::Serve { requester } => {
            let (event_sender, event_receiver) = execgate_events::channel();
            let broker = Arc::new(
                ExecutionBroker::from_config(&config)?.with_event_sender(event_sender),
            );
            let logger = tokio::spawn(log_events(event_receiver));

            serve::serve(Arc::clone(&broker), config_path, requester.requester).await?;

            // dropping the last sender ends the logger
            drop(broker);
            let _ = logger.await;
            Ok(0)
        }
    }
}

/// Dry-run validation; nothing is executed or recorded
fn check(broker: &ExecutionBroker, line: &str, requester: &str) -> CheckReport {
    let generation = broker.policy().generation();
    match parse_command_line(line, requester) {
        Ok(request) => {
            let validation = broker.check(&request);
            let timeout = match &validation {
                ValidationOutcome::Allowed { rule, .. } => Some(broker.timeout_for(&request, rule)),
                ValidationOutcome::Denied(_) => None,
            };
            CheckReport::new(request.program(), &validation, timeout, generation)
        }
        Err(reason) => CheckReport::new("", &ValidationOutcome::Denied(reason), None, generation),
    }
}

/// Parse `line`, apply the request options, and run it through the broker
async fn submit(
    broker: &ExecutionBroker,
    line: &str,
    requester: &str,
    timeout: Option<Duration>,
    cwd: Option<PathBuf>,
) -> Outcome {
    match parse_command_line(line, requester) {
        Ok(mut request) => {
            if let Some(timeout) = timeout {
                request = request.with_timeout(timeout);
            }
            if let Some(dir) = cwd {
                request = request.with_cwd(dir);
            }
            broker.submit(request).await
        }
        Err(reason) => broker.reject_unparsed(line, requester, reason).await,
    }
}

/// Poll `future` to completion while rendering events as they arrive
async fn drive_with_events<F, T>(future: F, event_receiver: &mut EventReceiver) -> T
where
    F: Future<Output = T>,
{
    tokio::pin!(future);
    loop {
        select! {
            result = &mut future => {
                while let Ok(message) = event_receiver.try_recv() {
                    logging::log_event_with_tracing(&message);
                }
                return result;
            }
            Some(message) = event_receiver.recv() => {
                logging::log_event_with_tracing(&message);
            }
        }
    }
}

async fn log_events(mut event_receiver: EventReceiver) {
    while let Some(message) = event_receiver.recv().await {
        logging::log_event_with_tracing(&message);
    }
}

/// Map a broker status to a process exit code
///
/// Exit codes pass through; sentinels take the codes shells use for the
/// same situations.
fn shell_exit_code(code: i32) -> i32 {
    match code {
        status::DENIED => 126,
        status::SPAWN_FAILED => 127,
        status::TIMED_OUT => 124,
        status::AUDIT_UNAVAILABLE => 125,
        code => code.clamp(0, 255),
    }
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    if json_mode {
        // JSON mode: keep stdout and stderr free of log lines
        if debug_enabled {
            if let Some(file) = create_log_file() {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                            |_| tracing_subscriber::EnvFilter::new("info,execgate=debug"),
                        ),
                    )
                    .init();
                return;
            }
        }
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else if debug_enabled {
        match create_log_file() {
            Some(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                            |_| tracing_subscriber::EnvFilter::new("info,execgate=debug"),
                        ),
                    )
                    .init();
            }
            None => {
                tracing_subscriber::fmt()
                    .with_writer(std::io::stderr)
                    .with_env_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                            |_| tracing_subscriber::EnvFilter::new("info,execgate=info"),
                        ),
                    )
                    .init();
            }
        }
    } else {
        // Normal mode: warnings and denials only, on stderr
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,execgate=warn")),
            )
            .init();
    }
}

/// Open a timestamped log file under the logs directory
fn create_log_file() -> Option<std::fs::File> {
    let log_dir = std::path::Path::new(constants::LOGS_DIR);
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Warning: Failed to create log directory: {e}");
        return None;
    }

    let log_file = log_dir.join(format!(
        "execgate-{}.log",
        chrono::Utc::now().format("%Y%m%d-%H%M%S")
    ));
    match std::fs::File::create(&log_file) {
        Ok(file) => {
            eprintln!("Debug logging enabled: {}", log_file.display());
            Some(file)
        }
        Err(e) => {
            eprintln!("Warning: Failed to create log file: {e}");
            None
        }
    }
}
