//! Agora server - standalone entry point for the debate arena API
//!
//! This crate is a thin wrapper around `agora-api` so deployments get a
//! runnable binary without touching the library crate.

use anyhow::Result;
use agora_api::{init_tracing, AgoraServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    tracing::info!("Starting Agora debate arena...");

    // PaaS compatibility: map a provided $PORT to AGORA_PORT
    if let Ok(port) = std::env::var("PORT") {
        if std::env::var("AGORA_PORT").is_err() {
            std::env::set_var("AGORA_PORT", port);
        }
    }

    let config = ServerConfig::from_env();

    let server = AgoraServer::new(config).await.map_err(|e| {
        tracing::error!("Failed to initialize server: {}", e);
        anyhow::anyhow!("{e}")
    })?;

    server.run().await.map_err(|e| {
        tracing::error!("Server error during execution: {}", e);
        anyhow::anyhow!("{e}")
    })?;

    Ok(())
}
