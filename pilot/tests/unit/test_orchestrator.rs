//! Orchestrator tests against scripted drivers

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use deploy_pilot::deploy::orchestrator::{never, Orchestrator};
use deploy_pilot::errors::{DeployError, DeployErrorKind};
use deploy_pilot::execlog::{ExecutionEvent, RecordingLog, StepPhase};
use deploy_pilot::health::probe::HealthProbe;
use deploy_pilot::models::deployment::{
    Backend, BackendStatus, DeploymentRequest, Environment, RollbackOutcome,
};
use deploy_pilot::storage::settings::DeploymentSettings;

use crate::mocks::{
    deployment_settings, refused_url, spawn_status_server, Calls, MockBackup, MockDriver,
};

struct Harness {
    driver: Arc<MockDriver>,
    backup: Arc<MockBackup>,
    log: Arc<RecordingLog>,
    orchestrator: Orchestrator,
}

fn harness(driver: MockDriver, settings: DeploymentSettings) -> Harness {
    harness_with(driver, settings, MockBackup::new(false), None)
}

fn harness_with(
    driver: MockDriver,
    settings: DeploymentSettings,
    backup: MockBackup,
    health_url: Option<String>,
) -> Harness {
    let driver = Arc::new(driver);
    let backup = Arc::new(backup);
    let log = Arc::new(RecordingLog::new());
    let orchestrator = Orchestrator::new(
        settings,
        driver.clone(),
        HealthProbe::new().unwrap(),
        log.clone(),
    )
    .with_backup(backup.clone())
    .with_health_check(health_url, Duration::from_secs(5));

    Harness {
        driver,
        backup,
        log,
        orchestrator,
    }
}

fn paas_request() -> DeploymentRequest {
    DeploymentRequest::new(Backend::Paas, Environment::Production, "shop")
}

#[tokio::test(start_paused = true)]
async fn test_missing_configuration_makes_no_calls() {
    let driver = MockDriver::new(Backend::Paas)
        .failing_validation(DeployError::Configuration("api_token missing".to_string()));
    let h = harness(driver, DeploymentSettings::default());

    let result = h.orchestrator.deploy(paas_request(), never()).await;

    assert!(!result.success);
    assert_eq!(result.error.as_ref().map(|e| e.kind()), Some(DeployErrorKind::Configuration));
    assert_eq!(h.driver.calls.side_effects(), 0);
    assert_eq!(h.backup.calls.load(Ordering::SeqCst), 0);
    assert!(result.deployment_id.is_none());
    assert!(result.rollback.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_request_for_another_backend_is_rejected() {
    let h = harness(MockDriver::new(Backend::Compose), DeploymentSettings::default());

    let result = h.orchestrator.deploy(paas_request(), never()).await;

    assert_eq!(result.error.map(|e| e.kind()), Some(DeployErrorKind::Configuration));
    assert_eq!(Calls::get(&h.driver.calls.validate), 0);
    assert_eq!(h.driver.calls.side_effects(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_immediate_success_skips_rollback() {
    let h = harness(MockDriver::new(Backend::Paas), DeploymentSettings::default());

    let result = h.orchestrator.deploy(paas_request(), never()).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.message, "deployed target-shop");
    assert_eq!(result.deployment_id.as_deref(), Some("dep-1"));
    assert_eq!(result.backend_status, BackendStatus::Success);
    assert!(result.error.is_none());
    assert!(result.backup.is_some());
    assert!(result.health.is_none());
    assert_eq!(Calls::get(&h.driver.calls.poll), 1);
    assert_eq!(Calls::get(&h.driver.calls.rollback), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_status_rolls_back_when_enabled() {
    let driver = MockDriver::new(Backend::Paas).with_statuses(vec![
        Ok(BackendStatus::Running),
        Ok(BackendStatus::Failed),
    ]);
    let h = harness(driver, DeploymentSettings::default());

    let result = h.orchestrator.deploy(paas_request(), never()).await;

    assert!(!result.success);
    assert_eq!(result.error.as_ref().map(|e| e.kind()), Some(DeployErrorKind::Status));
    assert_eq!(result.backend_status, BackendStatus::Failed);
    assert_eq!(Calls::get(&h.driver.calls.rollback), 1);
    assert_eq!(
        result.rollback,
        Some(RollbackOutcome::Completed("rolled back".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_status_without_rollback_policy() {
    let driver = MockDriver::new(Backend::Paas).with_statuses(vec![Ok(BackendStatus::Failed)]);
    let settings = DeploymentSettings {
        rollback_on_failure: false,
        ..Default::default()
    };
    let h = harness(driver, settings);

    let result = h.orchestrator.deploy(paas_request(), never()).await;

    assert!(!result.success);
    assert_eq!(Calls::get(&h.driver.calls.rollback), 0);
    assert!(result.rollback.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_monitoring_timeout_rolls_back() {
    let driver = MockDriver::new(Backend::Paas).with_statuses(vec![Ok(BackendStatus::Running)]);
    let h = harness(driver, deployment_settings(30, 10));

    let result = h.orchestrator.deploy(paas_request(), never()).await;

    assert!(!result.success);
    assert_eq!(result.error.as_ref().map(|e| e.kind()), Some(DeployErrorKind::Timeout));
    assert!(result.message.contains("timeout after 30 seconds"));
    assert!(Calls::get(&h.driver.calls.poll) <= 4);
    assert_eq!(Calls::get(&h.driver.calls.rollback), 1);
    assert!(result.duration_secs >= 30.0 && result.duration_secs < 31.0);
}

#[tokio::test(start_paused = true)]
async fn test_trigger_failure_returns_without_monitoring() {
    let driver = MockDriver::new(Backend::Paas)
        .failing_trigger(DeployError::Trigger("HTTP status error: 422".to_string()));
    let h = harness(driver, DeploymentSettings::default());

    let result = h.orchestrator.deploy(paas_request(), never()).await;

    assert!(!result.success);
    assert_eq!(result.error.as_ref().map(|e| e.kind()), Some(DeployErrorKind::Trigger));
    assert_eq!(Calls::get(&h.driver.calls.poll), 0);
    assert_eq!(Calls::get(&h.driver.calls.rollback), 0);
    assert!(result.deployment_id.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_trigger_timeout_rolls_back() {
    let driver = MockDriver::new(Backend::Compose)
        .failing_trigger(DeployError::Timeout("docker timed out after 300s".to_string()));
    let h = harness(driver, DeploymentSettings::default());
    let request = DeploymentRequest::new(Backend::Compose, Environment::Production, "");

    let result = h.orchestrator.deploy(request, never()).await;

    assert_eq!(result.error.as_ref().map(|e| e.kind()), Some(DeployErrorKind::Timeout));
    assert_eq!(Calls::get(&h.driver.calls.poll), 0);
    assert_eq!(Calls::get(&h.driver.calls.rollback), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_skips_rollback() {
    let driver = MockDriver::new(Backend::Paas).with_statuses(vec![Ok(BackendStatus::Running)]);
    let h = harness(driver, DeploymentSettings::default());
    let shutdown = Box::pin(tokio::time::sleep(Duration::from_secs(25)));

    let result = h.orchestrator.deploy(paas_request(), shutdown).await;

    assert!(!result.success);
    assert_eq!(result.error, Some(DeployError::Cancelled));
    assert_eq!(Calls::get(&h.driver.calls.poll), 3);
    assert_eq!(Calls::get(&h.driver.calls.rollback), 0);
    assert!(result.rollback.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_a_slow_trigger() {
    let driver = MockDriver::new(Backend::Paas).slow_trigger(Duration::from_secs(300));
    let h = harness(driver, DeploymentSettings::default());
    let shutdown = Box::pin(tokio::time::sleep(Duration::from_secs(5)));
    let started = tokio::time::Instant::now();

    let result = h.orchestrator.deploy(paas_request(), shutdown).await;

    assert!(started.elapsed() < Duration::from_secs(6));
    assert_eq!(result.error, Some(DeployError::Cancelled));
    assert!(result.deployment_id.is_none());
    assert_eq!(Calls::get(&h.driver.calls.poll), 0);
    assert_eq!(Calls::get(&h.driver.calls.rollback), 0);
    assert_eq!(
        h.log.steps(StepPhase::Failed),
        vec!["Triggering deployment".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_abandons_a_slow_rollback() {
    let driver = MockDriver::new(Backend::Paas)
        .with_statuses(vec![Ok(BackendStatus::Failed)])
        .slow_rollback(Duration::from_secs(300));
    let h = harness(driver, DeploymentSettings::default());
    let shutdown = Box::pin(tokio::time::sleep(Duration::from_secs(5)));
    let started = tokio::time::Instant::now();

    let result = h.orchestrator.deploy(paas_request(), shutdown).await;

    assert!(started.elapsed() < Duration::from_secs(6));
    assert_eq!(result.error.as_ref().map(|e| e.kind()), Some(DeployErrorKind::Status));
    assert_eq!(Calls::get(&h.driver.calls.rollback), 1);
    assert!(matches!(result.rollback, Some(RollbackOutcome::Failed(_))));
}

#[tokio::test(start_paused = true)]
async fn test_backup_failure_is_not_fatal() {
    let h = harness_with(
        MockDriver::new(Backend::Paas),
        DeploymentSettings::default(),
        MockBackup::new(true),
        None,
    );

    let result = h.orchestrator.deploy(paas_request(), never()).await;

    assert!(result.success);
    assert!(result.backup.is_none());
    assert_eq!(h.backup.calls.load(Ordering::SeqCst), 1);
    assert!(h.log.events().iter().any(|e| matches!(
        e,
        ExecutionEvent::Backup { success: false, .. }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_backup_disabled() {
    let settings = DeploymentSettings {
        backup_before_deploy: false,
        ..Default::default()
    };
    let h = harness(MockDriver::new(Backend::Paas), settings);

    let result = h.orchestrator.deploy(paas_request(), never()).await;

    assert!(result.success);
    assert_eq!(h.backup.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_execution_log_records_steps_in_order() {
    let h = harness(MockDriver::new(Backend::Paas), DeploymentSettings::default());

    h.orchestrator.deploy(paas_request(), never()).await;

    assert_eq!(
        h.log.steps(StepPhase::Start),
        vec![
            "Resolving deployment target",
            "Creating pre-deployment backup",
            "Triggering deployment",
            "Monitoring deployment",
        ]
    );
    let events = h.log.events();
    assert!(matches!(events.first(), Some(ExecutionEvent::DeploymentStarted { .. })));
    assert!(matches!(
        events.last(),
        Some(ExecutionEvent::DeploymentFinished { success: true, .. })
    ));
}

#[tokio::test]
async fn test_passing_health_check() {
    let url = spawn_status_server(200).await;
    let h = harness_with(
        MockDriver::new(Backend::Paas),
        DeploymentSettings::default(),
        MockBackup::new(false),
        Some(url),
    );

    let result = h.orchestrator.deploy(paas_request(), never()).await;

    assert!(result.success);
    let health = result.health.unwrap();
    assert!(health.passed);
    assert_eq!(health.status_code, Some(200));
}

#[tokio::test]
async fn test_failing_health_check_rolls_back() {
    let url = spawn_status_server(503).await;
    let h = harness_with(
        MockDriver::new(Backend::Paas),
        DeploymentSettings::default(),
        MockBackup::new(false),
        Some(url),
    );

    let result = h.orchestrator.deploy(paas_request(), never()).await;

    assert!(!result.success);
    assert_eq!(result.error.as_ref().map(|e| e.kind()), Some(DeployErrorKind::HealthCheck));
    assert_eq!(result.backend_status, BackendStatus::Success);
    assert_eq!(Calls::get(&h.driver.calls.rollback), 1);
}

#[tokio::test]
async fn test_unreachable_health_endpoint_fails_deployment() {
    let h = harness_with(
        MockDriver::new(Backend::Paas)
            .with_rollback(RollbackOutcome::Unsupported("not implemented".to_string())),
        DeploymentSettings::default(),
        MockBackup::new(false),
        Some(refused_url()),
    );

    let result = h.orchestrator.deploy(paas_request(), never()).await;

    assert!(!result.success);
    assert!(result.message.contains("Health check error"));
    assert_eq!(
        result.rollback,
        Some(RollbackOutcome::Unsupported("not implemented".to_string()))
    );
}

#[tokio::test]
async fn test_empty_health_url_is_skipped() {
    let h = harness_with(
        MockDriver::new(Backend::Paas),
        DeploymentSettings::default(),
        MockBackup::new(false),
        Some("  ".to_string()),
    );

    let result = h.orchestrator.deploy(paas_request(), never()).await;

    assert!(result.success);
    assert!(result.health.is_none());
}
