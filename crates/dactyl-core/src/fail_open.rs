//! Fail-open utilities for graceful degradation
//!
//! Use these for infrastructure operations like round logging that should
//! never take down a run in progress.
//!
//! DO NOT use fail-open for:
//! - Gateway calls (business logic)
//! - The final poem write (the deliverable)
//! - Configuration loading (correctness)

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open (infrastructure, not business logic)
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// ```no_run
/// use dactyl_core::fail_open::fail_open;
/// use dactyl_core::Result;
///
/// async fn append_log_line() -> Result<()> {
///     // Some operation that might fail
///     Ok(())
/// }
///
/// async fn example() {
///     let result = fail_open("round_log", || append_log_line()).await;
///     // result is None if append_log_line() failed, otherwise Some(())
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}
