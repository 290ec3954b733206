//! Semaphore utilities for bounding concurrent executions
//!
//! The broker limits how many children run at once when
//! `broker.max_concurrent` is non-zero.

use execgate_errors::Error;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Acquire a semaphore permit with proper error handling
///
/// # Arguments
///
/// * `semaphore` - The semaphore to acquire a permit from
/// * `operation` - Description of the operation for error reporting
///
/// # Errors
///
/// Returns an error if the semaphore is closed or acquisition fails
pub async fn acquire_semaphore_permit(
    semaphore: Arc<Semaphore>,
    operation: &str,
) -> Result<OwnedSemaphorePermit, Error> {
    semaphore
        .acquire_owned()
        .await
        .map_err(|_| Error::internal(format!("failed to acquire execution slot for {operation}")))
}

/// Create a semaphore for `max_concurrent` slots; `0` means unlimited
#[must_use]
pub fn create_semaphore(max_concurrent: usize) -> Option<Arc<Semaphore>> {
    (max_concurrent > 0).then(|| Arc::new(Semaphore::new(max_concurrent)))
}
