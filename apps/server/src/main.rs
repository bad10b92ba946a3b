//! TapData MCP Server
//!
//! Serves TapData connections to MCP clients over SSE.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tapmcp_core::{branding, BackendClient};
use tapmcp_gateway::{GatewayConfig, GatewayServer, MongoConnector};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Default filter when RUST_LOG is not set
const DEFAULT_LOG_FILTER: &str = "info,tapmcp_core=debug,tapmcp_gateway=debug";

/// Console logging, plus a daily log file when `log_dir` is set.
///
/// The returned guard flushes the file writer and must outlive the server.
fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Invalid log filter")?;

    let console_layer = fmt::layer()
        .with_ansi(true)
        .compact()
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            // Files like: tapmcp.2026-10-18.log
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(branding::LOG_PREFIX)
                .filename_suffix("log")
                .build(dir)
                .context("Failed to create log file appender")?;
            let (writer, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = GatewayConfig::from_env().context("Invalid configuration")?;
    let _log_guard = init_tracing(config.log_dir.as_deref())?;

    info!(
        "{} v{} starting (backend {})",
        branding::DISPLAY_NAME,
        env!("CARGO_PKG_VERSION"),
        config.backend_url
    );

    let backend = Arc::new(BackendClient::new(
        config.backend_url.clone(),
        config.backend_timeout,
    )?);
    let server = GatewayServer::new(config, backend, Arc::new(MongoConnector));

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        info!("Shutdown requested");
        signal.cancel();
    });

    server.run(shutdown).await
}
