//! The request pipeline: validate, record, execute, record

use execgate_audit::{AuditSink, JsonlAuditLog};
use execgate_config::{acquire_semaphore_permit, create_semaphore, BrokerConfig, Config, PolicyConfig};
use execgate_errors::{Error, UserFacingError};
use execgate_events::{
    AuditEvent, BrokerEvent, EventEmitter, EventSender, FailureContext, PolicyEvent,
};
use execgate_platform::Platform;
use execgate_policy::{parse_command_line, CommandValidator, PolicyRule, PolicyStore, ValidationOutcome};
use execgate_types::{
    AuditPhase, AuditRecord, CommandRequest, DenyReason, ExecutionResult, Outcome, RequestId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};

use crate::sandbox::WorkDir;
use crate::stats::{BrokerStats, BrokerStatsSnapshot};

/// Timeout for one execution
///
/// The request (or the configured default) is capped by the rule's ceiling,
/// or the system ceiling when the rule has none. A zero request means "use
/// the default".
#[must_use]
pub fn effective_timeout(
    requested: Option<Duration>,
    default: Duration,
    rule_ceiling: Option<Duration>,
    system_ceiling: Duration,
) -> Duration {
    let wanted = requested.filter(|t| !t.is_zero()).unwrap_or(default);
    wanted.min(rule_ceiling.unwrap_or(system_ceiling))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Policy-gated executor
///
/// Every request gets a decision record before anything runs; a request whose
/// decision cannot be recorded is refused. Allowed requests run directly
/// (no shell) and get a completion record.
pub struct ExecutionBroker {
    validator: CommandValidator,
    platform: Platform,
    audit: Arc<dyn AuditSink>,
    settings: BrokerConfig,
    /// Serializes validation with the decision append
    decision_lock: Mutex<()>,
    slots: Option<Arc<Semaphore>>,
    stats: BrokerStats,
    event_sender: Option<EventSender>,
}

impl std::fmt::Debug for ExecutionBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionBroker")
            .field("settings", &self.settings)
            .field("policy_generation", &self.validator.store().generation())
            .finish_non_exhaustive()
    }
}

impl EventEmitter for ExecutionBroker {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl ExecutionBroker {
    #[must_use]
    pub fn new(policy: Arc<PolicyStore>, audit: Arc<dyn AuditSink>, settings: BrokerConfig) -> Self {
        Self {
            validator: CommandValidator::new(policy),
            platform: Platform::current(),
            audit,
            slots: create_semaphore(settings.max_concurrent),
            settings,
            decision_lock: Mutex::new(()),
            stats: BrokerStats::default(),
            event_sender: None,
        }
    }

    /// Build a broker from a loaded configuration, auditing to the configured JSONL file
    ///
    /// The audit file is opened lazily; an unwritable location shows up as
    /// refused requests, not as a construction error.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy section does not compile.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let policy = Arc::new(PolicyStore::new(&config.policy)?);
        let audit = Arc::new(JsonlAuditLog::new(config.audit_path(), config.audit.sync));
        Ok(Self::new(policy, audit, config.broker.clone()))
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &Arc<PolicyStore> {
        self.validator.store()
    }

    #[must_use]
    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    #[must_use]
    pub fn settings(&self) -> &BrokerConfig {
        &self.settings
    }

    #[must_use]
    pub fn stats(&self) -> BrokerStatsSnapshot {
        self.stats.snapshot()
    }

    /// Dry run: validate against the current policy without recording anything
    #[must_use]
    pub fn check(&self, request: &CommandRequest) -> ValidationOutcome {
        self.validator.validate(request)
    }

    /// Timeout that would apply to `request` under `rule`
    #[must_use]
    pub fn timeout_for(&self, request: &CommandRequest, rule: &PolicyRule) -> Duration {
        effective_timeout(
            request.timeout(),
            self.settings.default_timeout(),
            rule.timeout_ceiling,
            self.settings.timeout_ceiling(),
        )
    }

    /// Integer entry point: parse, submit, collapse to a status code
    pub async fn exec_command_line(&self, line: &str, requester: &str) -> i32 {
        self.submit_line(line, requester).await.status_code()
    }

    /// Parse `line` and run it through the full pipeline
    pub async fn submit_line(&self, line: &str, requester: &str) -> Outcome {
        match parse_command_line(line, requester) {
            Ok(request) => self.submit(request).await,
            Err(reason) => self.reject_unparsed(line, requester, reason).await,
        }
    }

    /// Record and refuse a command line that could not be split into a request
    pub async fn reject_unparsed(&self, line: &str, requester: &str, reason: DenyReason) -> Outcome {
        self.stats.record_received();
        let request_id = RequestId::new();
        let record = AuditRecord::unparsed(request_id, requester, line, &reason);

        let appended = {
            let _guard = self.decision_lock.lock().await;
            self.audit.append(&record).await
        };
        if let Err(e) = appended {
            return self.audit_failed(&record, &e);
        }
        self.emit_audit(AuditEvent::Appended {
            request_id: Some(request_id.to_string()),
            phase: "decision".to_string(),
        });

        self.refuse(&record, reason)
    }

    /// Validate, record the decision, and when allowed execute and record completion
    pub async fn submit(&self, request: CommandRequest) -> Outcome {
        self.stats.record_received();

        let guard = self.decision_lock.lock().await;
        let validation = self.validator.validate(&request);
        let record = AuditRecord::decision(&request, validation.denial());
        let appended = self.audit.append(&record).await;
        drop(guard);
        if let Err(e) = appended {
            return self.audit_failed(&record, &e);
        }
        self.emit_audit(AuditEvent::Appended {
            request_id: Some(request.id().to_string()),
            phase: "decision".to_string(),
        });

        let (rule, generation) = match validation {
            ValidationOutcome::Denied(reason) => return self.refuse(&record, reason),
            ValidationOutcome::Allowed { rule, generation } => (rule, generation),
        };

        self.stats.record_allowed();
        let timeout = self.timeout_for(&request, &rule);
        tracing::debug!(
            request_id = %request.id(),
            requester = request.requester(),
            program = request.program(),
            rule = rule.index,
            generation,
            timeout_ms = millis(timeout),
            "request allowed"
        );
        self.emit_broker(BrokerEvent::RequestAllowed {
            request_id: Some(request.id().to_string()),
            requester: request.requester().to_string(),
            program: request.program().to_string(),
            rule: rule.index,
            timeout_ms: millis(timeout),
        });

        let outcome = match self.execute(&request, timeout).await {
            Ok(result) if result.timed_out => {
                self.stats.record_timed_out();
                tracing::warn!(request_id = %request.id(), timeout_ms = millis(timeout), "request timed out");
                Outcome::TimedOut(result)
            }
            Ok(result) => {
                self.stats.record_completed();
                Outcome::Completed(result)
            }
            Err(e) => {
                self.stats.record_spawn_failed();
                tracing::warn!(request_id = %request.id(), error = %e, "spawn failed");
                Outcome::SpawnFailed {
                    message: e.user_message().into_owned(),
                }
            }
        };

        let completion = AuditRecord::completion(&request, &outcome);
        if let Err(e) = self.audit.append(&completion).await {
            return self.audit_failed(&completion, &e);
        }
        self.emit_audit(AuditEvent::Appended {
            request_id: Some(request.id().to_string()),
            phase: "completion".to_string(),
        });

        self.finish(&request.id(), &outcome);
        outcome
    }

    /// Run an already-allowed request
    ///
    /// Spawns the program directly in its working directory (or a fresh
    /// sandbox) with the configured environment, waits for it or its
    /// deadline, and returns what it produced. Non-zero exits and timeouts
    /// are results, not errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the sandbox cannot be created or the program
    /// cannot be started.
    pub async fn execute(
        &self,
        request: &CommandRequest,
        timeout: Duration,
    ) -> Result<ExecutionResult, Error> {
        let _permit = match &self.slots {
            Some(slots) => Some(acquire_semaphore_permit(Arc::clone(slots), request.program()).await?),
            None => None,
        };

        let work_dir = WorkDir::prepare(request.cwd(), self.settings.sandbox_dir.as_deref())?;

        let mut cmd = self.platform.command(request.program());
        cmd.args(request.args())
            .envs(&self.settings.env)
            .current_dir(work_dir.path())
            .timeout(timeout)
            .kill_grace(self.settings.kill_grace())
            .max_output(self.settings.max_output_bytes);

        let ctx = self
            .platform
            .create_context(self.event_sender.clone())
            .with_request_id(request.id().to_string());
        let output = self.platform.execute_command(&ctx, cmd).await;

        work_dir.finish();
        Ok(output?.into())
    }

    /// Compile and swap in a new policy
    ///
    /// # Errors
    ///
    /// Returns the compile error; the active policy is unchanged.
    pub fn reload_policy(&self, config: &PolicyConfig) -> Result<u64, Error> {
        let store = self.validator.store();
        match store.reload(config) {
            Ok(generation) => {
                let snapshot = store.snapshot();
                tracing::info!(
                    generation,
                    rules = snapshot.rules().len(),
                    "policy reloaded"
                );
                self.emit_policy(PolicyEvent::Reloaded {
                    generation,
                    rules: snapshot.rules().len(),
                    allowed_roots: snapshot.allowed_roots().len(),
                });
                Ok(generation)
            }
            Err(e) => {
                tracing::error!(error = %e, "policy reload rejected; keeping active policy");
                self.emit_policy(PolicyEvent::ReloadFailed {
                    active_generation: store.generation(),
                    failure: FailureContext::from_error(&e),
                });
                Err(e)
            }
        }
    }

    fn refuse(&self, record: &AuditRecord, reason: DenyReason) -> Outcome {
        self.stats.record_denied();
        tracing::warn!(
            request_id = %record.request_id,
            requester = %record.requester,
            program = %record.program,
            reason = %reason,
            "request denied"
        );
        self.emit_broker(BrokerEvent::RequestDenied {
            request_id: Some(record.request_id.to_string()),
            requester: record.requester.clone(),
            program: record.program.clone(),
            reason: reason.category().to_string(),
        });
        let outcome = Outcome::Denied(reason);
        self.finish(&record.request_id, &outcome);
        outcome
    }

    fn audit_failed(&self, record: &AuditRecord, error: &Error) -> Outcome {
        self.stats.record_audit_failure();
        let phase = match record.phase {
            AuditPhase::Decision => "decision",
            AuditPhase::Completion => "completion",
        };
        tracing::error!(
            request_id = %record.request_id,
            phase,
            error = %error,
            "audit append failed; refusing request"
        );
        self.emit_audit(AuditEvent::WriteFailed {
            request_id: Some(record.request_id.to_string()),
            phase: phase.to_string(),
            failure: FailureContext::from_error(error),
        });

        let message = match record.phase {
            AuditPhase::Decision => error.user_message().into_owned(),
            AuditPhase::Completion => {
                format!("command ran but its completion was not recorded: {}", error.user_message())
            }
        };
        let outcome = Outcome::AuditUnavailable { message };
        self.finish(&record.request_id, &outcome);
        outcome
    }

    fn finish(&self, request_id: &RequestId, outcome: &Outcome) {
        self.emit_broker(BrokerEvent::RequestFinished {
            request_id: Some(request_id.to_string()),
            status: outcome.status_code(),
        });
    }
}

/// Integer entry point over a shared broker
pub async fn exec_command_line(broker: &ExecutionBroker, line: &str, requester: &str) -> i32 {
    broker.exec_command_line(line, requester).await
}
