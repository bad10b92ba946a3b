//! Gateway Server
//!
//! HTTP server exposing the MCP protocol over an SSE stream plus a message
//! endpoint. All collaborators are injected through `GatewayServer::new`.

mod handlers;
pub mod request_log;
mod sse;
mod state;

pub use handlers::{HealthResponse, TransportError};
pub use sse::{extract_access_code, parse_tags, StreamParams};
pub use state::AppState;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tapmcp_core::{branding, BackendGateway};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::mcp::McpDispatcher;
use crate::pool::{ConnectionPool, StoreConnector};
use crate::session::SessionRegistry;

/// Gateway server configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL of the management backend
    pub backend_url: String,
    /// Timeout applied to every backend request
    pub backend_timeout: Duration,
    /// Enable CORS for browser access
    pub enable_cors: bool,
    /// Interval between SSE keep-alive comments
    pub sse_keep_alive: Duration,
    /// Directory for daily log files; console only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: branding::DEFAULT_GATEWAY_PORT,
            backend_url: branding::DEFAULT_BACKEND_URL.to_string(),
            backend_timeout: Duration::from_secs(60),
            enable_cors: true,
            sse_keep_alive: Duration::from_secs(15),
            log_dir: None,
        }
    }
}

impl GatewayConfig {
    /// Defaults overridden by `TAPMCP_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = lookup("TAPMCP_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "TAPMCP_PORT")? {
            config.port = port;
        }
        if let Some(url) = lookup("TAPMCP_BACKEND_URL") {
            url::Url::parse(&url)
                .with_context(|| format!("TAPMCP_BACKEND_URL is not a valid URL: {}", url))?;
            config.backend_url = url;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "TAPMCP_BACKEND_TIMEOUT_SECS")? {
            config.backend_timeout = Duration::from_secs(secs);
        }
        if let Some(cors) = parse_var(&lookup, "TAPMCP_CORS")? {
            config.enable_cors = cors;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "TAPMCP_SSE_KEEP_ALIVE_SECS")? {
            config.sse_keep_alive = Duration::from_secs(secs.max(1));
        }
        if let Some(dir) = lookup("TAPMCP_LOG_DIR").filter(|d| !d.is_empty()) {
            config.log_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    /// `host:port` to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}

/// MCP Gateway Server
pub struct GatewayServer {
    config: GatewayConfig,
    state: AppState,
}

impl GatewayServer {
    pub fn new(
        config: GatewayConfig,
        backend: Arc<dyn BackendGateway>,
        connector: Arc<dyn StoreConnector>,
    ) -> Self {
        let pool = Arc::new(ConnectionPool::new(connector));
        let sessions = Arc::new(SessionRegistry::new(pool.clone()));
        let dispatcher = Arc::new(McpDispatcher::new(
            sessions.clone(),
            backend.clone(),
            pool.clone(),
        ));

        info!("[Gateway] Initialized (backend {})", config.backend_url);

        Self {
            state: AppState {
                sessions,
                pool,
                dispatcher,
                backend,
                sse_keep_alive: config.sse_keep_alive,
            },
            config,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/sse", get(sse::sse_handler))
            .route(branding::MESSAGE_ENDPOINT, post(handlers::post_message))
            .route("/health", get(handlers::health))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn(request_log::log_requests));

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router = router.layer(cors);
        }

        router
    }

    /// Serve until `shutdown` is cancelled, then destroy every session and
    /// close every pooled client.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let address = self.config.bind_address();
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {}", address))?;

        info!("[Gateway] Listening on {}", listener.local_addr()?);
        info!(
            "[Gateway] CORS: {}",
            if self.config.enable_cors {
                "enabled"
            } else {
                "disabled"
            }
        );

        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener
    pub async fn serve(self, listener: tokio::net::TcpListener, shutdown: CancellationToken) -> Result<()> {
        let router = self.router();
        let stop = shutdown.clone();

        // Open SSE streams never finish on their own; end them when shutting down
        let sessions = self.state.sessions.clone();
        tokio::spawn(async move {
            stop.cancelled().await;
            sessions.destroy_all().await;
        });

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .context("Server error")?;

        self.state.sessions.destroy_all().await;
        self.state.pool.close_all().await;
        info!("[Gateway] Stopped");
        Ok(())
    }

    /// Start the server in the background
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}
