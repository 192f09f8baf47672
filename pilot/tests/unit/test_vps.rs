//! VPS script driver tests

use std::time::Duration;

use deploy_pilot::deploy::driver::BackendDriver;
use deploy_pilot::deploy::vps::VpsDriver;
use deploy_pilot::errors::DeployErrorKind;
use deploy_pilot::models::deployment::{
    Backend, BackendStatus, DeploymentRequest, Environment, RollbackOutcome,
};
use deploy_pilot::process::{CommandOutput, ProcessError};
use deploy_pilot::storage::layout::StorageLayout;
use deploy_pilot::storage::settings::Settings;

use crate::mocks::FakeRunner;

fn vps_request(provider: &str) -> DeploymentRequest {
    DeploymentRequest::new(Backend::Vps, Environment::Production, provider)
        .with_option("server_ip", "203.0.113.7")
        .with_option("ssh_key", "/home/deploy/.ssh/id_ed25519")
}

#[tokio::test]
async fn test_script_runs_with_arguments() {
    let project = tempfile::tempdir().unwrap();
    std::fs::write(project.path().join("deploy-vultr.sh"), "#!/bin/sh\n").unwrap();
    let runner = FakeRunner::new(|_| Ok(CommandOutput::ok("server ready\n")));
    let driver = VpsDriver::new(
        runner.clone(),
        StorageLayout::new(project.path()),
        &Settings::default(),
    );
    let request = vps_request("vultr");

    driver.validate(&request).unwrap();
    let target = driver.resolve_target(&request).await.unwrap();
    let triggered = driver.trigger(&request, &target).await.unwrap();

    assert_eq!(triggered.summary, "Deployment script executed successfully: server ready");
    assert_eq!(
        driver.poll_status(&triggered.deployment_id).await.unwrap(),
        BackendStatus::Success
    );

    let commands = runner.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(
        commands[0].program,
        project.path().join("deploy-vultr.sh").display().to_string()
    );
    assert_eq!(
        commands[0].args,
        vec![
            "--environment",
            "production",
            "--server-ip",
            "203.0.113.7",
            "--ssh-key",
            "/home/deploy/.ssh/id_ed25519",
        ]
    );
    assert_eq!(commands[0].timeout, Duration::from_secs(600));
}

#[test]
fn test_unconfigured_provider_is_rejected() {
    let project = tempfile::tempdir().unwrap();
    let driver = VpsDriver::new(
        FakeRunner::succeeding(),
        StorageLayout::new(project.path()),
        &Settings::default(),
    );

    let err = driver.validate(&vps_request("aws")).unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::Configuration);
}

#[tokio::test]
async fn test_missing_script_is_unsupported() {
    let project = tempfile::tempdir().unwrap();
    let runner = FakeRunner::succeeding();
    let driver = VpsDriver::new(
        runner.clone(),
        StorageLayout::new(project.path()),
        &Settings::default(),
    );

    let err = driver
        .trigger(&vps_request("digitalocean"), "digitalocean")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::Unsupported);
    assert!(runner.commands().is_empty());
}

#[tokio::test]
async fn test_script_failure_and_timeout() {
    let project = tempfile::tempdir().unwrap();
    std::fs::write(project.path().join("deploy-vultr.sh"), "#!/bin/sh\n").unwrap();
    let layout = StorageLayout::new(project.path());

    let failing = VpsDriver::new(
        FakeRunner::new(|_| Ok(CommandOutput::failed(2, "ssh: connect refused"))),
        layout.clone(),
        &Settings::default(),
    );
    let err = failing.trigger(&vps_request("vultr"), "vultr").await.unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::Trigger);
    assert!(err.to_string().contains("ssh: connect refused"));

    let hanging = VpsDriver::new(
        FakeRunner::new(|spec| {
            Err(ProcessError::TimedOut {
                program: spec.program.clone(),
                timeout: spec.timeout,
            })
        }),
        layout,
        &Settings::default(),
    );
    let err = hanging.trigger(&vps_request("vultr"), "vultr").await.unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::Timeout);
}

#[tokio::test]
async fn test_rollback_is_unavailable() {
    let project = tempfile::tempdir().unwrap();
    let driver = VpsDriver::new(
        FakeRunner::succeeding(),
        StorageLayout::new(project.path()),
        &Settings::default(),
    );

    let outcome = driver.rollback("vultr", Some("vps-vultr-1")).await;
    assert!(matches!(outcome, RollbackOutcome::Unsupported(_)));
}
