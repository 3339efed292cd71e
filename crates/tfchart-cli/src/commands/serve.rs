//! Serve command - run the HTTP render server

use std::net::SocketAddr;

use crate::error::{CliError, Result};
use crate::server;

pub async fn run(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "tfchart server listening");

    axum::serve(listener, server::router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CliError::internal(format!("server error: {}", e)))?;

    tracing::info!("tfchart server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
