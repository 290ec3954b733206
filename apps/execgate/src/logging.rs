//! Structured logging integration for events
//!
//! Domain events from the library crates are turned into tracing records with
//! structured fields, so the same subscriber (stderr, JSON file) sees both.

use execgate_events::{AppEvent, AuditEvent, BrokerEvent, EventMessage, PolicyEvent, ProcessEvent};
use tracing::{debug, error, info, warn};

/// Log an event using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;
    match event {
        AppEvent::Policy(policy_event) => match policy_event {
            PolicyEvent::Reloaded {
                generation,
                rules,
                allowed_roots,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    generation = generation,
                    rules = rules,
                    allowed_roots = allowed_roots,
                    "Policy reloaded"
                );
            }
            PolicyEvent::ReloadFailed {
                active_generation,
                failure,
            } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    active_generation = active_generation,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Policy reload failed"
                );
            }
        },

        AppEvent::Broker(broker_event) => match broker_event {
            BrokerEvent::RequestAllowed {
                requester,
                program,
                rule,
                timeout_ms,
                ..
            } => {
                debug!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    requester = %requester,
                    program = %program,
                    rule = rule,
                    timeout_ms = timeout_ms,
                    "Request allowed"
                );
            }
            BrokerEvent::RequestDenied {
                requester,
                program,
                reason,
                ..
            } => {
                warn!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    requester = %requester,
                    program = %program,
                    reason = %reason,
                    "Request denied"
                );
            }
            BrokerEvent::RequestFinished { status, .. } => {
                debug!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    status = status,
                    "Request finished"
                );
            }
        },

        AppEvent::Process(process_event) => match process_event {
            ProcessEvent::Started {
                command,
                pid,
                timeout_ms,
                ..
            } => {
                debug!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    program = %command.program,
                    args = ?command.args,
                    cwd = ?command.cwd,
                    pid = ?pid,
                    timeout_ms = timeout_ms,
                    "Process started"
                );
            }
            ProcessEvent::Completed {
                program,
                exit_code,
                signal,
                duration_ms,
                stdout_bytes,
                stderr_bytes,
                truncated,
                ..
            } => {
                info!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    program = %program,
                    exit_code = exit_code,
                    signal = ?signal,
                    duration_ms = duration_ms,
                    stdout_bytes = stdout_bytes,
                    stderr_bytes = stderr_bytes,
                    truncated = truncated,
                    "Process completed"
                );
            }
            ProcessEvent::TimedOut {
                program,
                timeout_ms,
                escalated,
                ..
            } => {
                warn!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    program = %program,
                    timeout_ms = timeout_ms,
                    escalated = escalated,
                    "Process timed out"
                );
            }
            ProcessEvent::SpawnFailed {
                command, failure, ..
            } => {
                error!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    program = %command.program,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Process could not be started"
                );
            }
        },

        AppEvent::Audit(audit_event) => match audit_event {
            AuditEvent::Appended { phase, .. } => {
                debug!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    phase = %phase,
                    "Audit record appended"
                );
            }
            AuditEvent::WriteFailed { phase, failure, .. } => {
                error!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    phase = %phase,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    "Audit write failed"
                );
            }
        },
    }
}
