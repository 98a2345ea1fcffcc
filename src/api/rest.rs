// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. There is no auth layer: the service is
// meant to sit behind whatever fronts it, and admin authentication is
// deliberately out of scope.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::report::{self, ScanSummary};
use crate::runtime_config::{self, RuntimeConfig};
use crate::scanner;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/results", get(results))
        .route("/api/v1/summary", get(summary))
        .route("/api/v1/table", get(table))
        .route("/api/v1/config", get(get_config))
        .route("/api/v1/config", post(set_config))
        .route("/api/v1/scan", post(trigger_scan))
        .route("/api/v1/alert/test", post(test_alert))
        .route("/api/v1/alert/report", post(report_alert))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// State / results / summary / table
// =============================================================================

async fn full_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

async fn results(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.results_snapshot())
}

async fn summary(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let results = state.results_snapshot();
    Json(ScanSummary::from_results(&results))
}

/// Plain-text table of the most recent results, for terminal consumers.
async fn table(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let results = state.results_snapshot();
    let rows = state.runtime_config.read().table_rows;
    report::render_table(&results, rows)
}

// =============================================================================
// Config
// =============================================================================

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.runtime_config.read().clone())
}

/// Replace the runtime config. Missing fields fall back to defaults through
/// serde, so partial documents are accepted. The new config is persisted
/// best-effort so an API update survives a crash before shutdown.
async fn set_config(
    State(state): State<Arc<AppState>>,
    Json(config): Json<RuntimeConfig>,
) -> impl IntoResponse {
    info!(symbol = %config.symbol, lookback_days = config.lookback_days, "runtime config updated via API");
    state.update_config(config);

    let applied = state.runtime_config.read().clone();
    if let Err(e) = applied.save(runtime_config::CONFIG_PATH) {
        warn!(error = %e, "Failed to save runtime config to disk");
    }

    Json(applied)
}

// =============================================================================
// Actions
// =============================================================================

async fn trigger_scan(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match scanner::run_scan_once(&state).await {
        Some(Ok(outcome)) => (StatusCode::OK, Json(serde_json::json!(outcome))),
        Some(Err(e)) => {
            warn!(error = %e, "on-demand scan failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": format!("{e:#}") })),
            )
        }
        None => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "scan already running" })),
        ),
    }
}

async fn test_alert(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let delivered = scanner::send_test_alert(&state).await;
    Json(serde_json::json!({ "delivered": delivered }))
}

async fn report_alert(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let delivered = scanner::send_report_alert(&state).await;
    Json(serde_json::json!({ "delivered": delivered }))
}
