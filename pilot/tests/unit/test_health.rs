//! Health probe and smoke test tests

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use deploy_pilot::health::probe::{HealthFailure, HealthProbe};
use deploy_pilot::health::smoke::{run_smoke_tests, SmokeOptions};

use crate::mocks::{refused_url, spawn_status_server};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_probe_passes_on_200() {
    let url = spawn_status_server(200).await;
    let result = HealthProbe::new().unwrap().check(&url, TIMEOUT).await;

    assert!(result.passed);
    assert_eq!(result.status_code, Some(200));
    assert!(result.failure.is_none());
    assert!(result.message().starts_with("Health check passed"));
}

#[tokio::test]
async fn test_probe_fails_on_503() {
    let url = spawn_status_server(503).await;
    let result = HealthProbe::new().unwrap().check(&url, TIMEOUT).await;

    assert!(!result.passed);
    assert_eq!(result.failure, Some(HealthFailure::Status(503)));
    assert_eq!(
        result.message(),
        format!("Health check failed for {} (Status: 503)", url)
    );
}

#[tokio::test]
async fn test_connection_refused_is_a_request_failure() {
    let url = refused_url();
    let result = HealthProbe::new().unwrap().check(&url, TIMEOUT).await;

    assert!(!result.passed);
    assert!(result.status_code.is_none());
    assert!(matches!(result.failure, Some(HealthFailure::Request(_))));
    assert!(result.message().starts_with("Health check error"));
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let app = Router::new().route(
        "/health",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let result = HealthProbe::new()
        .unwrap()
        .check(&format!("http://{}/health", addr), Duration::from_millis(200))
        .await;

    assert!(!result.passed);
    assert!(matches!(result.failure, Some(HealthFailure::Request(_))));
}

async fn spawn_app() -> String {
    let app = Router::new()
        .route("/", get(|| async { "welcome" }))
        .route("/health", get(|| async { StatusCode::OK }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_smoke_tests_find_health_endpoint() {
    let url = spawn_app().await;
    let options = SmokeOptions {
        health_check: true,
        load_test: true,
        load_duration: Duration::from_millis(300),
        load_pause: Duration::from_millis(50),
        ..Default::default()
    };

    let report = run_smoke_tests(&HealthProbe::new().unwrap(), &url, &options).await;

    assert!(report.overall_success, "{:?}", report.tests);
    let names: Vec<&str> = report.tests.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["connectivity", "health_check", "load_test"]);
    assert_eq!(
        report.tests[1].message,
        format!("Health endpoint found: {}/health", url)
    );
    let load = report.tests[2].load.as_ref().unwrap();
    assert!(load.requests > 0);
    assert_eq!(load.errors, 0);
}

#[tokio::test]
async fn test_health_endpoint_found_under_url_with_query() {
    let url = spawn_app().await;
    let options = SmokeOptions {
        health_check: true,
        load_test: false,
        ..Default::default()
    };

    let report = run_smoke_tests(
        &HealthProbe::new().unwrap(),
        &format!("{}/?ref=release#top", url),
        &options,
    )
    .await;

    assert!(report.overall_success, "{:?}", report.tests);
    assert_eq!(
        report.tests[1].message,
        format!("Health endpoint found: {}/health", url)
    );
}

#[tokio::test]
async fn test_unreachable_app_skips_remaining_smoke_tests() {
    let options = SmokeOptions {
        health_check: true,
        load_test: true,
        ..Default::default()
    };

    let report = run_smoke_tests(&HealthProbe::new().unwrap(), &refused_url(), &options).await;

    assert!(!report.overall_success);
    assert_eq!(report.tests.len(), 1);
    assert_eq!(report.tests[0].name, "connectivity");
}
