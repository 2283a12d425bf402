//! Agora API server with graceful shutdown

use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::TraceLayer;

use agora_llm::LlmConfig;
use agora_persist::SqliteBackend;

use crate::error::ApiError;
use crate::middleware::{body_limit_layer, cors_layer, timeout_layer};
use crate::routes::{api_router, stream_router};
use crate::state::AppState;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server address
    pub addr: SocketAddr,
    /// Request timeout for non-streaming routes
    pub timeout: Duration,
    /// Max request body size (bytes)
    pub max_body_size: usize,
    /// SQLite database URL
    pub database_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            timeout: Duration::from_secs(30),
            max_body_size: 64 * 1024,
            database_url: "sqlite:agora.db?mode=rwc".to_string(),
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("AGORA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let timeout_secs: u64 = std::env::var("AGORA_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(30);

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:agora.db?mode=rwc".to_string());

        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
            timeout: Duration::from_secs(timeout_secs),
            database_url,
            ..Default::default()
        }
    }
}

/// Agora API server
pub struct AgoraServer {
    config: ServerConfig,
    app_state: AppState,
}

impl AgoraServer {
    /// Create a new server: connect storage, select the LLM provider
    pub async fn new(config: ServerConfig) -> Result<Self, ApiError> {
        let db = SqliteBackend::new(&config.database_url)
            .await
            .map_err(|e| ApiError::Internal(format!("DB init failed: {}", e)))?;

        let llm = LlmConfig::from_env().build_provider();
        tracing::info!(provider = llm.name(), "Generation provider ready");

        let app_state = AppState::new(db, llm);

        Ok(Self { config, app_state })
    }

    /// Get the configured router
    pub fn router(&self) -> Router {
        // The advancement stream outlives any sane request timeout, so the
        // timeout layer wraps everything except the streaming routes.
        let timed = api_router(self.app_state.clone()).layer(timeout_layer(self.config.timeout));
        let streaming = stream_router(self.app_state.clone());

        timed
            .merge(streaming)
            .layer(body_limit_layer(self.config.max_body_size))
            .layer(cors_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server with graceful shutdown
    pub async fn run(self) -> Result<(), ApiError> {
        let app = self.router();
        let addr = self.config.addr;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Agora API listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Get the shared application state
    pub fn app_state(&self) -> &AppState {
        &self.app_state
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Initialize tracing subscriber
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,agora_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
