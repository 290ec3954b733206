//! Integer status values returned across the caller boundary
//!
//! Non-negative values are process exit codes (`128 + signal` for a process
//! killed by a signal). Negative values never collide with an exit code.

/// Request refused by policy (or unparseable)
pub const DENIED: i32 = -1;

/// Program could not be started
pub const SPAWN_FAILED: i32 = -2;

/// Audit sink refused the record; the command was not run
pub const AUDIT_UNAVAILABLE: i32 = -3;

/// Process was killed after exceeding its timeout
pub const TIMED_OUT: i32 = -4;

/// Offset added to a terminating signal number, as shells report it
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// Whether `status` is one of the broker's negative sentinels
#[must_use]
pub fn is_sentinel(status: i32) -> bool {
    matches!(status, DENIED | SPAWN_FAILED | AUDIT_UNAVAILABLE | TIMED_OUT)
}
