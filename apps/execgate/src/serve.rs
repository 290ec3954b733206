//! Line-oriented broker loop over stdin
//!
//! Every non-blank input line is submitted as its own request and answered
//! with one JSON object on stdout, in completion order. SIGHUP re-reads the
//! configuration file and swaps in its policy; the rest of the configuration
//! is fixed for the life of the process.

use crate::display::OutcomeReport;
use crate::error::CliError;
use execgate_broker::ExecutionBroker;
use execgate_config::Config;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

#[derive(Serialize)]
struct Reply<'a> {
    line: u64,
    #[serde(flatten)]
    report: OutcomeReport<'a>,
}

/// Counters for one serve session
#[derive(Debug, Default, Clone, Copy)]
pub struct ServeSummary {
    pub submitted: u64,
    /// Most request tasks held at once, finished but unreaped included
    pub peak_pending: usize,
}

/// Serve requests from stdin until EOF or Ctrl-C, then wait for in-flight work
pub async fn serve(
    broker: Arc<ExecutionBroker>,
    config_path: Option<PathBuf>,
    requester: String,
) -> Result<ServeSummary, CliError> {
    let input = BufReader::new(tokio::io::stdin());
    serve_from(broker, input, config_path, requester).await
}

async fn serve_from<R>(
    broker: Arc<ExecutionBroker>,
    input: R,
    config_path: Option<PathBuf>,
    requester: String,
) -> Result<ServeSummary, CliError>
where
    R: AsyncBufRead + Unpin,
{
    let mut hangup = signal(SignalKind::hangup())?;
    let mut lines = input.lines();
    let mut tasks = JoinSet::new();
    let mut summary = ServeSummary::default();
    let mut line_no: u64 = 0;

    info!(requester = %requester, generation = broker.policy().generation(), "serving requests from stdin");

    loop {
        tokio::select! {
            next = lines.next_line() => {
                let Some(line) = next? else { break };
                line_no += 1;
                if line.trim().is_empty() {
                    continue;
                }
                let broker = Arc::clone(&broker);
                let requester = requester.clone();
                let number = line_no;
                tasks.spawn(async move {
                    let outcome = broker.submit_line(&line, &requester).await;
                    let reply = Reply {
                        line: number,
                        report: OutcomeReport::new(&outcome),
                    };
                    match serde_json::to_string(&reply) {
                        Ok(json) => println!("{json}"),
                        Err(e) => error!(line = number, error = %e, "failed to encode reply"),
                    }
                });
                summary.submitted += 1;
                summary.peak_pending = summary.peak_pending.max(tasks.len());
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => reap(joined),
            _ = hangup.recv() => reload(&broker, config_path.as_deref()).await,
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted; finishing in-flight requests");
                break;
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        reap(joined);
    }

    let stats = broker.stats();
    info!(
        received = stats.received,
        allowed = stats.allowed,
        denied = stats.denied,
        timed_out = stats.timed_out,
        audit_failures = stats.audit_failures,
        submitted = summary.submitted,
        peak_pending = summary.peak_pending,
        "serve finished"
    );
    Ok(summary)
}

fn reap(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "request task failed");
    }
}

/// Re-read the configuration and swap its policy in; failures keep the active policy
async fn reload(broker: &ExecutionBroker, config_path: Option<&std::path::Path>) {
    info!("SIGHUP received, reloading policy");
    let mut config = match Config::load_or_default(config_path).await {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "cannot read configuration; keeping active policy");
            return;
        }
    };
    if let Err(e) = config.merge_env() {
        error!(error = %e, "invalid environment override; keeping active policy");
        return;
    }
    // reload_policy reports its own failures
    let _ = broker.reload_policy(&config.policy);
}
