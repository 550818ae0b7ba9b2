//! Deadline enforcement around collaborator calls

use skybridge_core::{CoreError, Kit, Result};
use std::future::Future;

/// Run a collaborator call under the kit deadline.
///
/// An unbounded kit runs the call as-is. Exceeding the deadline stops the
/// wait and reports through `on_timeout`; it never cancels an already
/// issued vendor operation, whose side effects the next reconciliation
/// pass will pick up.
pub(crate) async fn with_deadline<T, F>(
    kit: &Kit,
    fut: F,
    on_timeout: impl FnOnce() -> CoreError,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match kit.remaining() {
        None => fut.await,
        Some(remaining) => match tokio::time::timeout(remaining, fut).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout()),
        },
    }
}
