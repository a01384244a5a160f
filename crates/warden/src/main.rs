//! # Warden - Gatehouse reCAPTCHA Gate
//!
//! Puts routes behind a reCAPTCHA challenge and remembers verified clients
//! with a signed, encrypted cookie bound to their address and user agent.
//!
//! ## Flow
//! ```text
//! Request → cookie matches fingerprint? ──yes──┐
//!                  │ no                         ↓
//!                  └→ siteverify(c, ip) ─ok→ mint cookie → handler
//!                                   └─fail→ 403
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod captcha;
mod config;
mod cookie;
mod gate;
mod routes;
mod state;

use config::AppConfig;
use state::AppState;

/// Gatehouse Warden - reCAPTCHA gate
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/warden.toml")]
    config: String,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// reCAPTCHA private key (overrides config)
    #[arg(long, env = "RECAPTCHA_PRIVATE_KEY", hide_env_values = true)]
    recaptcha_private_key: Option<String>,

    /// Verification cookie name (overrides config)
    #[arg(long, env = "RECAPTCHA_COOKIE_NAME")]
    cookie_name: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Read before parsing args so .env can feed clap's env fallbacks
    let dotenv = dotenvy::dotenv();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    if let Some(e) = dotenv_failure(dotenv) {
        tracing::warn!(error = %e, "Failed to load .env file");
    }

    info!("🛡️ Starting Gatehouse Warden v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!(
        cookie = %config.recaptcha_cookie.name,
        verify_url = %config.recaptcha.verify_url,
        "📋 Configuration loaded from {}",
        args.config
    );

    let listen_addr = config.listen_addr.clone();

    // Initialize application state (keys + verifier client)
    let state = AppState::new(config)?;

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    info!("🚀 Warden listening on {}", listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("🛑 Shutdown signal received");
    };

    // Peer addresses feed the client fingerprint
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await
    .context("Server error")?;

    info!("👋 Warden shutdown complete");
    Ok(())
}

/// Error from loading `.env`, ignoring the file simply not existing
fn dotenv_failure<T>(result: dotenvy::Result<T>) -> Option<dotenvy::Error> {
    result.err().filter(|e| !e.not_found())
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
