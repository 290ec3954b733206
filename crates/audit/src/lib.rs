#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Audit log for execgate
//!
//! Every request produces a decision record before anything runs and, when
//! allowed, a completion record afterwards. Sinks are append-only; a sink
//! that cannot persist a record must say so, since the broker refuses to
//! execute anything it could not record.

mod filter;
mod jsonl;
mod memory;

pub use filter::AuditFilter;
pub use jsonl::JsonlAuditLog;
pub use memory::MemoryAuditLog;

use async_trait::async_trait;
use execgate_errors::Error;
use execgate_types::AuditRecord;
use futures::stream::BoxStream;

/// Lazily evaluated query result
pub type AuditStream = BoxStream<'static, Result<AuditRecord, Error>>;

/// Destination for audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Durably append one record
    ///
    /// Returns only after the record is persisted to the sink's standard.
    async fn append(&self, record: &AuditRecord) -> Result<(), Error>;

    /// Records matching `filter`, in append order
    async fn query(&self, filter: AuditFilter) -> Result<AuditStream, Error>;
}
