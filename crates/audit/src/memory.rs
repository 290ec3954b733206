//! In-memory audit sink

use async_trait::async_trait;
use execgate_errors::{AuditError, Error};
use execgate_types::AuditRecord;
use futures::stream::{self, StreamExt};
use std::sync::{Mutex, PoisonError};

use crate::{AuditFilter, AuditSink, AuditStream};

/// Audit sink that keeps records in a vector
///
/// Used for embedding and tests. Can be told to start refusing appends
/// after a number of records to exercise fail-closed paths.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
    accept_limit: Option<usize>,
}

impl MemoryAuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that accepts `count` records and refuses every append after that
    #[must_use]
    pub fn failing_after(count: usize) -> Self {
        Self {
            records: Mutex::default(),
            accept_limit: Some(count),
        }
    }

    /// Copy of everything appended so far
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn append(&self, record: &AuditRecord) -> Result<(), Error> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if self.accept_limit.is_some_and(|limit| records.len() >= limit) {
            return Err(AuditError::Unavailable {
                path: "memory".to_string(),
                message: "sink refused the record".to_string(),
            }
            .into());
        }
        records.push(record.clone());
        Ok(())
    }

    async fn query(&self, filter: AuditFilter) -> Result<AuditStream, Error> {
        let limit = filter.limit.unwrap_or(usize::MAX);
        let selected: Vec<_> = self
            .records()
            .into_iter()
            .filter(|record| filter.matches(record))
            .take(limit)
            .map(Ok)
            .collect();
        Ok(stream::iter(selected).boxed())
    }
}
