//! # Tollgate - Verification Gate
//!
//! Issues image CAPTCHAs, gates SMS code requests behind them and
//! rate-limits issuance per mobile number.
//!
//! ## Architecture
//! ```text
//! Client → Tollgate → SMS Gateway
//!             ↓  ↘
//!          Redis   User Registry
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod captcha;
mod config;
mod diagnostics;
mod gateway;
mod registry;
mod routes;
mod state;
mod store;
mod verification;

use config::AppConfig;
use state::AppState;

/// Tollgate - CAPTCHA and SMS verification service
#[derive(Parser, Debug)]
#[command(name = "tollgate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/tollgate.toml")]
    config: String,

    /// Redis URL (overrides config)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,

    /// Keep state in process memory instead of Redis (development only)
    #[arg(long, default_value = "false", env = "TOLLGATE_MEMORY_STORE")]
    memory_store: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Local .env is optional
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("🚦 Starting Tollgate v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    // Initialize application state
    let listen_addr = config.listen_addr.clone();
    let state = AppState::new(config).await?;
    info!(store = ?state.config.store, "✅ Cache store ready");

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    info!("🚀 Tollgate listening on {}", listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("👋 Tollgate shutdown complete");
    Ok(())
}

/// Resolve once Ctrl+C arrives
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("🛑 Shutdown signal received");
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
