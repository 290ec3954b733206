//! Platform-specific implementations

pub mod unix;
