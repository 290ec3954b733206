//! Unix implementation: tokio child processes plus `kill(2)` on the process group

mod output;
mod process;
mod signal;

pub use process::UnixProcessOperations;
