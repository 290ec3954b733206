//! Record selection for audit queries

use chrono::{DateTime, Utc};
use execgate_types::{AuditPhase, AuditRecord, Decision, RequestId};

/// Conjunction of optional criteria; the default matches every record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub requester: Option<String>,
    pub request_id: Option<RequestId>,
    pub decision: Option<Decision>,
    pub phase: Option<AuditPhase>,
    /// Inclusive lower bound on the record timestamp
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the record timestamp
    pub until: Option<DateTime<Utc>>,
    /// Stop after this many matching records
    pub limit: Option<usize>,
}

impl AuditFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = Some(requester.into());
        self
    }

    #[must_use]
    pub fn request_id(mut self, id: RequestId) -> Self {
        self.request_id = Some(id);
        self
    }

    #[must_use]
    pub fn decision(mut self, decision: Decision) -> Self {
        self.decision = Some(decision);
        self
    }

    #[must_use]
    pub fn phase(mut self, phase: AuditPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    #[must_use]
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    #[must_use]
    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `record` satisfies every criterion (the limit is not considered)
    #[must_use]
    pub fn matches(&self, record: &AuditRecord) -> bool {
        self.requester
            .as_deref()
            .is_none_or(|r| r == record.requester)
            && self.request_id.is_none_or(|id| id == record.request_id)
            && self.decision.is_none_or(|d| d == record.decision)
            && self.phase.is_none_or(|p| p == record.phase)
            && self.since.is_none_or(|t| record.timestamp >= t)
            && self.until.is_none_or(|t| record.timestamp < t)
    }
}
