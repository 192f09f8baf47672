//! Docker Compose driver tests with a fake process runner

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use deploy_pilot::backup::FileBackup;
use deploy_pilot::deploy::compose::{ComposeCli, ComposeDriver};
use deploy_pilot::deploy::driver::BackendDriver;
use deploy_pilot::deploy::orchestrator::{never, Orchestrator};
use deploy_pilot::errors::DeployErrorKind;
use deploy_pilot::execlog::TracingLog;
use deploy_pilot::health::probe::HealthProbe;
use deploy_pilot::models::deployment::{
    Backend, DeploymentRequest, Environment, RollbackOutcome,
};
use deploy_pilot::process::{CommandOutput, ProcessError};
use deploy_pilot::storage::layout::StorageLayout;
use deploy_pilot::storage::settings::{DeploymentSettings, Settings};

use crate::mocks::FakeRunner;

fn compose_driver(project: &Path, runner: Arc<FakeRunner>) -> ComposeDriver {
    ComposeDriver::new(
        ComposeCli::new(runner, project),
        project,
        Settings::default().environments,
    )
}

fn orchestrator(project: &Path, runner: Arc<FakeRunner>) -> Orchestrator {
    let backup = FileBackup::new(StorageLayout::new(project), "backups");
    Orchestrator::new(
        DeploymentSettings::default(),
        Arc::new(compose_driver(project, runner)),
        HealthProbe::new().unwrap(),
        Arc::new(TracingLog),
    )
    .with_backup(Arc::new(backup))
}

fn project_with_compose_file() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();
    dir
}

fn compose_request() -> DeploymentRequest {
    DeploymentRequest::new(Backend::Compose, Environment::Production, "")
        .with_option("build", "false")
        .with_option("restart", "false")
}

#[tokio::test]
async fn test_up_only_deployment_end_to_end() {
    let project = project_with_compose_file();
    let runner = FakeRunner::succeeding();
    let compose_file = project.path().join("docker-compose.yml");

    let result = orchestrator(project.path(), runner.clone())
        .deploy(compose_request(), never())
        .await;

    assert!(result.success, "{:?}", result.error);
    assert!(result.message.contains(&compose_file.display().to_string()));
    assert!(result.deployment_id.unwrap().starts_with("compose-"));
    assert_eq!(
        runner.command_lines(),
        vec![format!("docker compose -f {} up -d", compose_file.display())]
    );

    let backup = result.backup.unwrap();
    assert_eq!(backup.manifest, vec!["docker-compose.yml".to_string()]);
    assert!(backup.path.starts_with(project.path().join("backups")));
}

#[tokio::test]
async fn test_restart_and_build_run_in_order() {
    let project = project_with_compose_file();
    let runner = FakeRunner::succeeding();
    let request = DeploymentRequest::new(Backend::Compose, Environment::Production, "")
        .with_option("build", "true")
        .with_option("restart", "true");

    let result = orchestrator(project.path(), runner.clone())
        .deploy(request, never())
        .await;

    assert!(result.success);
    let last_args: Vec<Vec<String>> = runner
        .commands()
        .iter()
        .map(|c| c.args[3..].to_vec())
        .collect();
    assert_eq!(
        last_args,
        vec![
            vec!["down".to_string()],
            vec!["build".to_string()],
            vec!["up".to_string(), "-d".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_build_failure_aborts_before_up() {
    let project = project_with_compose_file();
    let runner = FakeRunner::new(|spec| {
        if spec.args.iter().any(|a| a == "build") {
            Ok(CommandOutput::failed(1, "failed to solve: missing Dockerfile"))
        } else {
            Ok(CommandOutput::ok(""))
        }
    });
    let request = compose_request().with_option("build", "true");

    let result = orchestrator(project.path(), runner.clone())
        .deploy(request, never())
        .await;

    assert!(!result.success);
    assert_eq!(result.error.as_ref().map(|e| e.kind()), Some(DeployErrorKind::Trigger));
    assert!(result.message.contains("Docker build failed"));
    assert!(result.rollback.is_none());
    assert!(!runner.command_lines().iter().any(|c| c.ends_with("up -d")));
}

#[tokio::test]
async fn test_falls_back_to_legacy_binary() {
    let project = project_with_compose_file();
    let runner = FakeRunner::new(|spec| {
        if spec.program == "docker" {
            Err(ProcessError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::from(ErrorKind::NotFound),
            })
        } else {
            Ok(CommandOutput::ok("started"))
        }
    });

    let result = orchestrator(project.path(), runner.clone())
        .deploy(compose_request(), never())
        .await;

    assert!(result.success);
    let programs: Vec<String> = runner.commands().into_iter().map(|c| c.program).collect();
    assert_eq!(programs, vec!["docker", "docker-compose"]);
}

#[tokio::test]
async fn test_up_timeout_is_distinct_and_rolls_back() {
    let project = project_with_compose_file();
    let runner = FakeRunner::new(|spec| {
        if spec.args.iter().any(|a| a == "up") {
            Err(ProcessError::TimedOut {
                program: spec.program.clone(),
                timeout: Duration::from_secs(300),
            })
        } else {
            Ok(CommandOutput::ok(""))
        }
    });

    let result = orchestrator(project.path(), runner.clone())
        .deploy(compose_request(), never())
        .await;

    assert_eq!(result.error.as_ref().map(|e| e.kind()), Some(DeployErrorKind::Timeout));
    assert!(matches!(result.rollback, Some(RollbackOutcome::Completed(_))));
    assert!(runner.command_lines().last().unwrap().ends_with("down"));
}

#[tokio::test]
async fn test_missing_compose_file_spawns_nothing() {
    let project = tempfile::tempdir().unwrap();
    let runner = FakeRunner::succeeding();

    let result = orchestrator(project.path(), runner.clone())
        .deploy(compose_request(), never())
        .await;

    assert_eq!(
        result.error.as_ref().map(|e| e.kind()),
        Some(DeployErrorKind::Configuration)
    );
    assert!(result.message.contains("Docker Compose file not found"));
    assert!(runner.commands().is_empty());
    assert!(!project.path().join("backups").exists());
}

#[test]
fn test_compose_file_resolution() {
    let project = project_with_compose_file();
    let driver = compose_driver(project.path(), FakeRunner::succeeding());
    let request = DeploymentRequest::new(Backend::Compose, Environment::Production, "");

    // Environment file missing: fall back to docker-compose.yml
    assert_eq!(
        driver.compose_file(&request),
        project.path().join("docker-compose.yml")
    );

    std::fs::write(
        project.path().join("docker-compose.production.yml"),
        "services: {}\n",
    )
    .unwrap();
    assert_eq!(
        driver.compose_file(&request),
        project.path().join("docker-compose.production.yml")
    );

    let explicit = request.with_option("compose_file", "custom.yml");
    assert_eq!(driver.compose_file(&explicit), project.path().join("custom.yml"));
}

#[tokio::test]
async fn test_status_is_known_only_for_triggered_deployments() {
    let project = project_with_compose_file();
    let driver = compose_driver(project.path(), FakeRunner::succeeding());
    let request = compose_request();

    let target = driver.resolve_target(&request).await.unwrap();
    let triggered = driver.trigger(&request, &target).await.unwrap();

    tokio_test::assert_ok!(driver.poll_status(&triggered.deployment_id).await);
    tokio_test::assert_err!(driver.poll_status("compose-unknown").await);
}
