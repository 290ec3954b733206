#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the execgate command broker
//!
//! This crate provides the data model shared by the validator, the broker,
//! and the audit log: requests, decisions, execution results, and audit records.

pub mod audit;
pub mod decision;
pub mod request;
pub mod result;
pub mod status;

// Re-export commonly used types
pub use audit::{AuditPhase, AuditRecord};
pub use decision::{Decision, DenyReason};
pub use request::{CommandRequest, RequestId};
pub use result::{ExecutionResult, Outcome};
pub use uuid::Uuid;
