use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Install a shutdown handler that listens for SIGTERM and SIGINT.
///
/// Returns a `CancellationToken` that is cancelled when either signal is
/// received. Board pollers select on the token and exit at their next
/// suspension point, letting in-flight board-service calls finish; the
/// ledgers are in-memory only and rebuilt from zero on the next start, so
/// abrupt termination is also safe.
///
/// Must be called from within a tokio runtime. The signal listeners are
/// registered before this function returns; only the wait for a signal
/// runs on a background task.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();

    let mut sigterm =
        signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    let handler_token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, stopping board pollers");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, stopping board pollers");
            }
        }

        handler_token.cancel();
    });

    token
}
