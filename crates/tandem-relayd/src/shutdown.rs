//! Graceful-shutdown trigger for the HTTP server.
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Resolve on SIGINT, SIGTERM (unix) or once `stop` is cancelled.
///
/// The supervisor reacts to SIGTERM on its own and cancels `stop` when it returns,
/// so the HTTP server never outlives the services it feeds.
pub async fn shutdown_signal(stop: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
        () = stop.cancelled() => info!("supervisor stopped, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn resolves_when_supervisor_stops() {
        let stop = CancellationToken::new();
        let pending = tokio::spawn(shutdown_signal(stop.clone()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished(), "must wait while services run");

        stop.cancel();
        tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("shutdown future did not resolve")
            .unwrap();
    }
}
