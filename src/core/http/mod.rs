//! HTTP services: the static site server and the push webhook receiver.

pub mod static_site;
pub mod webhook;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::{Error, Result};

/// Bind `address` and serve `app` until Ctrl-C.
pub async fn serve(app: Router, address: &str, service: &'static str) -> Result<()> {
    let listener = TcpListener::bind(address).await.map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("bind {} to {}", service, address)))
            .with_hint("Pick another port with --port or free the one in use")
    })?;

    let local = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| address.to_string());
    info!(service, address = %local, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(service))
        .await
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("serve {}", service))))?;

    info!(service, "stopped");
    Ok(())
}

async fn shutdown_signal(service: &'static str) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(service, "shutdown signal received"),
        Err(e) => {
            // Without a signal handler the server just runs until killed.
            error!(service, error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
