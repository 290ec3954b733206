//! Request counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters updated by concurrent requests
#[derive(Debug, Default)]
pub struct BrokerStats {
    received: AtomicU64,
    allowed: AtomicU64,
    denied: AtomicU64,
    completed: AtomicU64,
    timed_out: AtomicU64,
    spawn_failed: AtomicU64,
    audit_failures: AtomicU64,
}

/// Point-in-time copy of [`BrokerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BrokerStatsSnapshot {
    pub received: u64,
    pub allowed: u64,
    pub denied: u64,
    pub completed: u64,
    pub timed_out: u64,
    pub spawn_failed: u64,
    pub audit_failures: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl BrokerStats {
    pub(crate) fn record_received(&self) {
        bump(&self.received);
    }

    pub(crate) fn record_allowed(&self) {
        bump(&self.allowed);
    }

    pub(crate) fn record_denied(&self) {
        bump(&self.denied);
    }

    pub(crate) fn record_completed(&self) {
        bump(&self.completed);
    }

    pub(crate) fn record_timed_out(&self) {
        bump(&self.timed_out);
    }

    pub(crate) fn record_spawn_failed(&self) {
        bump(&self.spawn_failed);
    }

    pub(crate) fn record_audit_failure(&self) {
        bump(&self.audit_failures);
    }

    #[must_use]
    pub fn snapshot(&self) -> BrokerStatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        BrokerStatsSnapshot {
            received: load(&self.received),
            allowed: load(&self.allowed),
            denied: load(&self.denied),
            completed: load(&self.completed),
            timed_out: load(&self.timed_out),
            spawn_failed: load(&self.spawn_failed),
            audit_failures: load(&self.audit_failures),
        }
    }
}
