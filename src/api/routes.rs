//! HTTP API route definitions.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{health, prometheus, ready, scan, status, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Scanner endpoints
        .route("/api/v1/status", get(status))
        .route("/api/v1/scan", post(scan))
        .route("/metrics", get(prometheus))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::market::MockSnapshotBuilder;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn triangle_snapshot() -> String {
        // sqrt ratios 2/1, 3/2 and 1/2 give rates 4, 2.25 and 0.25.
        let snapshot = MockSnapshotBuilder::new()
            .token("AAA", 1, 18)
            .token("BBB", 2, 18)
            .token("CCC", 3, 18)
            .pool(1, 2, 500, 2, 1)
            .pool(2, 3, 500, 3, 2)
            .pool(3, 1, 500, 1, 2)
            .build();
        serde_json::to_string(&snapshot).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = create_router(AppState::new(ScanConfig::default()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_503_when_not_ready() {
        let app = create_router(AppState::new(ScanConfig::default()));

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_200_when_ready() {
        let state = AppState::new(ScanConfig::default());
        state.set_ready(true);
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn scan_endpoint_returns_report_and_updates_status() {
        let state = AppState::new(ScanConfig::default());
        let app = create_router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/scan")
                    .header("content-type", "application/json")
                    .body(Body::from(triangle_snapshot()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let report = body_json(response).await;
        assert_eq!(report["cycles"].as_array().unwrap().len(), 1);
        assert_eq!(report["stats"]["quotes_accepted"], 3);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = body_json(response).await;
        assert_eq!(status["scans_completed"], 1);
        assert_eq!(status["last_scan"]["stats"]["cycles_found"], 1);
    }

    #[tokio::test]
    async fn scan_endpoint_rejects_invalid_snapshot() {
        let app = create_router(AppState::new(ScanConfig::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/scan")
                    .body(Body::from(r#"{"tokens": [], "quotes": 7}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let error = body_json(response).await;
        assert!(error["error"].as_str().unwrap().contains("parse"));
    }

    #[tokio::test]
    async fn metrics_endpoint_requires_recorder() {
        let app = create_router(AppState::new(ScanConfig::default()));

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
