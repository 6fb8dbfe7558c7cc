use std::fmt::Display;
use std::future::Future;
use tokio::sync::watch;
use tracing::{error, info};

/// Waits for `signal` and then tells every `shutdown_tx` subscriber to stop.
///
/// If the signal cannot be listened for, the sender is held forever instead:
/// subscribers treat a closed channel as a shutdown request.
pub async fn forward_shutdown<F, E>(signal: F, shutdown_tx: watch::Sender<()>)
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    if let Err(e) = signal.await {
        error!(error = %e, "Failed to listen for shutdown signal. Running until killed.");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
    let _ = shutdown_tx.send(());
}
