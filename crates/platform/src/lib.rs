#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Host process supervision for execgate
//!
//! Children are spawned directly (never through a shell) with a cleared
//! environment, in their own process group, with captured and bounded
//! output and a hard deadline enforced by signalling the whole group.

pub mod core;
pub mod implementations;
pub mod process;

pub use core::{Platform, PlatformContext};
pub use implementations::unix::UnixProcessOperations;
pub use process::{CommandOutput, PlatformCommand, ProcessOperations};
