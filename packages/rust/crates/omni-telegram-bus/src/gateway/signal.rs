/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to listen for SIGTERM; only Ctrl+C stops the gateway");
                wait_ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        wait_ctrl_c().await;
    }
    tracing::info!("shutdown signal received");
}

async fn wait_ctrl_c() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
