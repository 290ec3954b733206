#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Policy-gated command execution
//!
//! [`ExecutionBroker`] ties the pieces together: a command line becomes a
//! [`execgate_types::CommandRequest`], is checked against the active policy,
//! recorded, run without a shell under a deadline, and recorded again. The
//! caller gets an integer status (see [`execgate_types::status`]).

mod broker;
mod sandbox;
mod stats;

pub use broker::{effective_timeout, exec_command_line, ExecutionBroker};
pub use stats::{BrokerStats, BrokerStatsSnapshot};
