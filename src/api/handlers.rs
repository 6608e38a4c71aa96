//! HTTP API handlers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{instrument, warn};

use crate::arbitrage::{run_scan, ScanReport, ScanStats};
use crate::config::ScanConfig;
use crate::error::{ConfigError, SnapshotError};
use crate::market::Snapshot;
use crate::metrics;

/// Summary of the most recent scan.
#[derive(Debug, Clone, Serialize)]
pub struct LastScan {
    /// RFC 3339 completion time.
    pub scanned_at: String,
    /// Scan counters.
    pub stats: ScanStats,
}

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Whether the service accepts scans.
    pub ready: Arc<AtomicBool>,
    /// Parameters applied to every scan.
    pub scan_config: Arc<ScanConfig>,
    /// Scans completed since startup.
    pub scans_completed: Arc<AtomicU64>,
    /// Most recent scan summary.
    pub last_scan: Arc<RwLock<Option<LastScan>>>,
    /// Prometheus render handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new(scan_config: ScanConfig) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            scan_config: Arc::new(scan_config),
            scans_completed: Arc::new(AtomicU64::new(0)),
            last_scan: Arc::new(RwLock::new(None)),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body is not a valid snapshot.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Server-side scan parameters are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The blocking scan task did not complete.
    #[error("scan task failed: {0}")]
    Task(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error.
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Snapshot(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Config(_) | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(status = %status, error = %self, "Request failed");
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether service is ready.
    pub ready: bool,
    /// Scans completed since startup.
    pub scans_completed: u64,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Scans completed since startup.
    pub scans_completed: u64,
    /// Longest cycle searched.
    pub max_cycle_length: usize,
    /// Whether fee tiers are applied.
    pub fee_aware: bool,
    /// Most recent scan, if any.
    pub last_scan: Option<LastScan>,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let response = ReadyResponse {
        ready: is_ready,
        scans_completed: state.scans_completed.load(Ordering::SeqCst),
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns scanner settings and the last scan summary.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let last_scan = state.last_scan.read().await.clone();
    let status = if state.is_ready() { "running" } else { "starting" };

    Json(StatusResponse {
        status,
        scans_completed: state.scans_completed.load(Ordering::SeqCst),
        max_cycle_length: state.scan_config.max_cycle_length,
        fee_aware: state.scan_config.fee_aware,
        last_scan,
    })
}

/// Scan handler - runs a full scan over the posted snapshot.
#[instrument(skip_all, fields(bytes = body.len()))]
pub async fn scan(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ScanReport>, ApiError> {
    let start = Instant::now();
    let snapshot = Snapshot::from_json(&body)?;
    let registry = snapshot.registry()?;
    let config = Arc::clone(&state.scan_config);

    let report = tokio::task::spawn_blocking(move || {
        run_scan(&registry, &snapshot.quotes, &config)
    })
    .await
    .map_err(|e| ApiError::Task(e.to_string()))??;

    let scanned_at = report
        .scanned_at
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    *state.last_scan.write().await = Some(LastScan {
        scanned_at,
        stats: report.stats.clone(),
    });
    state.scans_completed.fetch_add(1, Ordering::SeqCst);
    metrics::record_http_latency(start, "scan");

    Ok(Json(report))
}

/// Metrics handler - Prometheus text exposition.
pub async fn prometheus(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_state_ready_toggle() {
        let state = AppState::new(ScanConfig::default());
        assert!(!state.is_ready());

        state.set_ready(true);
        assert!(state.is_ready());

        state.set_ready(false);
        assert!(!state.is_ready());
    }

    #[test]
    fn snapshot_errors_map_to_422() {
        let error = ApiError::from(SnapshotError::Parse(
            serde_json::from_str::<Snapshot>("{").unwrap_err(),
        ));
        assert_eq!(
            error.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
