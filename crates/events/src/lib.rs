#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for execgate
//!
//! Library crates report what they do through events; the CLI decides how
//! to render them (tracing, JSON lines, or nothing).
//!
//! ## Architecture
//!
//! - **Domain events**: policy, broker decisions, process lifecycle, audit sink
//! - **`EventEmitter` trait**: one API for anything holding an optional sender
//! - **`EventMeta`**: id, timestamp, level, source and request correlation

pub mod meta;
pub use meta::{EventLevel, EventMeta, EventSource};

pub mod events;
pub use events::{
    AppEvent, AuditEvent, BrokerEvent, FailureContext, PolicyEvent, ProcessCommandDescriptor,
    ProcessEvent,
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// An event together with its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub meta: EventMeta,
    pub event: AppEvent,
}

impl EventMessage {
    /// Wrap an event, deriving level, source and correlation from the event itself
    #[must_use]
    pub fn from_event(event: AppEvent) -> Self {
        let mut meta = EventMeta::new(event.log_level(), event.event_source());
        if let Some(request_id) = event.request_id() {
            meta = meta.with_correlation_id(request_id);
        }
        Self { meta, event }
    }
}

/// Type alias for the event sender
pub type EventSender = UnboundedSender<EventMessage>;

/// Type alias for the event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<EventMessage>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events
///
/// Implemented for the raw `EventSender` and for any struct that holds one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(EventMessage::from_event(event));
        }
    }

    fn emit_policy(&self, event: PolicyEvent) {
        self.emit(AppEvent::Policy(event));
    }

    fn emit_broker(&self, event: BrokerEvent) {
        self.emit(AppEvent::Broker(event));
    }

    fn emit_process(&self, event: ProcessEvent) {
        self.emit(AppEvent::Process(event));
    }

    fn emit_audit(&self, event: AuditEvent) {
        self.emit(AppEvent::Audit(event));
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
