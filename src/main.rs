// =============================================================================
// Fibscan — Main Entry Point
// =============================================================================
//
// NIFTY50 Fibonacci gap-and-accept scanner: fetches daily index bars, runs
// the retracement evaluation, serves results over REST, and alerts on fresh
// triggers.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod market_data;
mod notify;
mod report;
mod runtime_config;
mod scanner;
mod signal;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::{RuntimeConfig, CONFIG_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Fibscan starting up");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Env overrides for deployment without a config file.
    if let Ok(symbol) = std::env::var("FIBSCAN_SYMBOL") {
        if !symbol.trim().is_empty() {
            config.symbol = symbol.trim().to_string();
        }
    }
    if let Ok(recipients) = std::env::var("FIBSCAN_RECIPIENTS") {
        config.recipients = recipients
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(url) = std::env::var("FIBSCAN_WEBHOOK_URL") {
        if !url.trim().is_empty() {
            config.alert_webhook_url = Some(url.trim().to_string());
        }
    }

    info!(
        symbol = %config.symbol,
        lookback_days = config.lookback_days,
        scan_interval_secs = config.scan_interval_secs,
        recipients = config.recipients.len(),
        "scanner configured"
    );

    // ── 2. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config));

    // ── 3. Start the API server ──────────────────────────────────────────
    let api_state = state.clone();
    let bind_addr = std::env::var("FIBSCAN_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());

    tokio::spawn(async move {
        let app = api::rest::router(api_state);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .expect("Failed to bind API server");
        info!(addr = %bind_addr, "API server listening");
        axum::serve(listener, app).await.expect("API server failed");
    });

    // ── 4. Scan loop ─────────────────────────────────────────────────────
    let scan_state = state.clone();
    tokio::spawn(async move {
        info!("scan loop starting");
        scanner::run_scan_loop(scan_state).await;
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    if let Err(e) = state.runtime_config.read().save(CONFIG_PATH) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("Fibscan shut down complete.");
    Ok(())
}
