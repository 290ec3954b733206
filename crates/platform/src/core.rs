//! Core platform abstractions and context management

use execgate_errors::Error;
use execgate_events::{EventEmitter, EventSender};

use crate::implementations::unix::UnixProcessOperations;
use crate::process::{CommandOutput, PlatformCommand, ProcessOperations};

/// Per-operation context: where events go and which request they belong to
#[derive(Debug, Clone, Default)]
pub struct PlatformContext {
    event_sender: Option<EventSender>,
    request_id: Option<String>,
}

impl PlatformContext {
    #[must_use]
    pub fn new(event_sender: Option<EventSender>) -> Self {
        Self {
            event_sender,
            request_id: None,
        }
    }

    /// Tag every event emitted through this context with a request id
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

impl EventEmitter for PlatformContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

/// Entry point to host operations
pub struct Platform {
    process_ops: Box<dyn ProcessOperations>,
}

impl Platform {
    #[must_use]
    pub fn new(process_ops: Box<dyn ProcessOperations>) -> Self {
        Self { process_ops }
    }

    /// Platform for the running host
    #[must_use]
    pub fn current() -> Self {
        Self::new(Box::new(UnixProcessOperations::new()))
    }

    #[must_use]
    pub fn process(&self) -> &dyn ProcessOperations {
        &*self.process_ops
    }

    #[must_use]
    pub fn create_context(&self, event_sender: Option<EventSender>) -> PlatformContext {
        PlatformContext::new(event_sender)
    }

    /// Convenience method: run a command under supervision
    ///
    /// # Errors
    ///
    /// See [`ProcessOperations::execute_command`].
    pub async fn execute_command(
        &self,
        ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<CommandOutput, Error> {
        self.process().execute_command(ctx, cmd).await
    }

    /// Convenience method: create a new command builder
    #[must_use]
    pub fn command(&self, program: &str) -> PlatformCommand {
        self.process().create_command(program)
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}
