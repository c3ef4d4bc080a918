use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Running axum server with a graceful-shutdown trigger.
pub struct HttpServer {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

/// Bind `bind_addr` and serve `app` in a background task.
pub async fn start_http_server(bind_addr: &str, app: Router) -> Result<HttpServer> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {bind_addr}"))?;
    let local_addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });
    tracing::info!(addr = %local_addr, "HTTP server listening");
    Ok(HttpServer {
        local_addr,
        shutdown_tx,
        task,
    })
}

impl HttpServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Resolves when the server task ends on its own, which only happens on failure.
    pub(super) async fn exited(&mut self) {
        match (&mut self.task).await {
            Ok(Ok(())) => tracing::warn!("HTTP server exited"),
            Ok(Err(error)) => tracing::error!(error = %error, "HTTP server failed"),
            Err(error) => tracing::error!(error = %error, "HTTP server task join error"),
        }
    }

    /// Stop accepting, let in-flight requests finish within `grace`, then abort.
    pub async fn stop(self, grace: Duration) {
        let Self {
            shutdown_tx,
            mut task,
            ..
        } = self;
        if task.is_finished() {
            return;
        }
        let _ = shutdown_tx.send(());
        if tokio::time::timeout(grace, &mut task).await.is_err() {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "HTTP server did not stop within grace period; aborting"
            );
            task.abort();
        }
    }
}
