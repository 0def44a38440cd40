//! Ties process signals to the monitor's cancellation token.

use std::io;

use tokio_util::sync::CancellationToken;

/// Cancels `cancel` once `signal` resolves.
///
/// If the signal listener cannot be installed the error is logged and the
/// token is left alone, so the loop keeps running until the process is
/// stopped.
pub async fn cancel_on_signal<F>(signal: F, cancel: CancellationToken)
where
    F: Future<Output = io::Result<()>>,
{
    let guard = cancel.drop_guard();
    match signal.await {
        Ok(()) => {
            tracing::info!("shutdown requested");
            drop(guard);
        }
        Err(error) => {
            let _token = guard.disarm();
            tracing::error!(%error, "cannot listen for the shutdown signal");
        }
    }
}
