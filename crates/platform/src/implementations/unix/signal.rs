//! Process group signalling

use execgate_errors::PlatformError;

pub(crate) use libc::{SIGKILL, SIGTERM};

/// Send `signal` to every process in group `pgid`
///
/// A group that no longer exists is not an error.
pub(crate) fn signal_group(pgid: i32, signal: i32) -> Result<(), PlatformError> {
    if pgid <= 1 {
        return Err(PlatformError::SignalFailed {
            pgid,
            message: "refusing to signal a reserved process group".to_string(),
        });
    }

    #[allow(unsafe_code)]
    // SAFETY: kill(2) has no memory-safety preconditions; a negative pid targets the group.
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc == 0 {
        return Ok(());
    }

    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(PlatformError::SignalFailed {
            pgid,
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_groups_refused() {
        assert!(signal_group(0, SIGTERM).is_err());
        assert!(signal_group(1, SIGKILL).is_err());
    }
}
