//! Tests for health and metrics endpoints

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::clock::SystemClock;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::TimeZone;
use tower::ServiceExt;

fn router(readiness: ReadinessState, metrics: SharedMetrics) -> Router {
    build_router(AppState::new(
        PathBuf::from("/nonexistent/ca.crt"),
        Arc::new(SystemClock),
        readiness,
        metrics,
    ))
}

async fn get(router: Router, uri: &str) -> axum::response::Response {
    router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_healthz_returns_200() {
    let response = get(
        router(ReadinessState::new(), create_metrics().unwrap()),
        "/healthz",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readyz_returns_503_when_not_ready() {
    let readiness = ReadinessState::new();
    assert!(!readiness.is_ready(), "Should start as not ready");

    let response = get(router(readiness, create_metrics().unwrap()), "/readyz").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_readyz_returns_200_when_ready() {
    let readiness = ReadinessState::new();
    readiness.set_ready();

    let response = get(router(readiness, create_metrics().unwrap()), "/readyz").await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_exposes_expiry_gauge() {
    let metrics = create_metrics().unwrap();
    metrics.set_expiry(chrono::Utc.timestamp_opt(1_924_992_000, 0).unwrap());

    let response = get(router(ReadinessState::new(), metrics), "/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[axum::http::header::CONTENT_TYPE],
        metrics::METRICS_CONTENT_TYPE
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(body.to_vec()).unwrap();
    let sample = body
        .lines()
        .find_map(|line| line.strip_prefix("ca_cert_expiry_timestamp "))
        .expect("missing expiry sample");
    assert_eq!(sample.parse::<f64>().unwrap(), 1_924_992_000.0);
}

#[test]
fn test_readiness_state_transitions() {
    let state = ReadinessState::new();
    assert!(!state.is_ready());

    state.set_ready();
    assert!(state.is_ready());

    // Clone should share state
    let cloned = state.clone();
    cloned.set_not_ready();
    assert!(!state.is_ready());
}
