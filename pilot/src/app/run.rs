//! Command dispatch

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;
use tracing::{debug, info};

use crate::app::cli::{
    BackendArg, Commands, ConfigCommand, DeployCommand, FileCommand, MonitorCommand, WebCommand,
};
use crate::app::options::RunOptions;
use crate::backup::{BackupOptions, FileBackup, RestoreOptions};
use crate::deploy::compose::ComposeCli;
use crate::deploy::driver::BackendDriver;
use crate::deploy::factory::DriverFactory;
use crate::deploy::orchestrator::Shutdown;
use crate::deploy::paas::PaasDriver;
use crate::errors::AppError;
use crate::execlog::TracingLog;
use crate::filesys::file::File;
use crate::health::probe::HealthProbe;
use crate::health::smoke::{run_smoke_tests, SmokeOptions};
use crate::models::deployment::{
    Backend, BackendStatus, DeploymentRequest, DeploymentResult, RollbackOutcome,
};
use crate::storage::config::{parse_cli_value, ConfigStore};
use crate::storage::layout::StorageLayout;
use crate::utils::version_info;

/// Timeout of `compose logs --follow`
const FOLLOW_TIMEOUT: Duration = Duration::from_secs(3600);

/// Providers whose deployment script marks a project as VPS-deployed
const VPS_MARKERS: [&str; 3] = ["vultr", "digitalocean", "aws"];

/// Run one command. Returns whether the command succeeded; the caller
/// maps `false` to a non-zero exit code.
pub async fn run(
    command: Commands,
    options: RunOptions,
    store: ConfigStore,
    shutdown: Shutdown,
) -> Result<bool, AppError> {
    match command {
        Commands::Deploy(cmd) => deploy(cmd, &options, &store, shutdown).await,
        Commands::Monitor(cmd) => monitor(cmd, &options, &store, shutdown).await,
        Commands::Web(cmd) => web(cmd, &options).await,
        Commands::File(cmd) => file(cmd, &options, &store).await,
        Commands::Config(cmd) => config(cmd, &options, store).await,
        Commands::Version => {
            print_json(&version_info())?;
            Ok(true)
        }
    }
}

// ================================== DEPLOY ======================================= //

async fn deploy(
    cmd: DeployCommand,
    options: &RunOptions,
    store: &ConfigStore,
    shutdown: Shutdown,
) -> Result<bool, AppError> {
    let request = build_request(cmd);
    let orchestrator = DriverFactory::orchestrator(
        request.backend,
        request.environment,
        store.settings(),
        &options.layout,
        options.runner.clone(),
        Arc::new(TracingLog),
    )?;

    let result = orchestrator.deploy(request, shutdown).await;
    if options.json {
        print_json(&result)?;
    } else {
        print_result(&result);
    }
    Ok(result.success)
}

/// Translate the command line into a deployment request
pub fn build_request(cmd: DeployCommand) -> DeploymentRequest {
    match cmd {
        DeployCommand::Paas {
            environment,
            project,
            force,
        } => DeploymentRequest::new(Backend::Paas, environment, project.unwrap_or_default())
            .with_force(force),
        DeployCommand::Compose {
            compose_file,
            environment,
            build,
            restart,
        } => {
            let mut request = DeploymentRequest::new(Backend::Compose, environment, "")
                .with_option("build", build.to_string())
                .with_option("restart", restart.to_string());
            if let Some(file) = compose_file {
                request = request.with_option("compose_file", file.display().to_string());
            }
            request
        }
        DeployCommand::Vps {
            provider,
            environment,
            server_ip,
            ssh_key,
        } => {
            let mut request = DeploymentRequest::new(Backend::Vps, environment, provider);
            if let Some(ip) = server_ip {
                request = request.with_option("server_ip", ip);
            }
            if let Some(key) = ssh_key {
                request = request.with_option("ssh_key", key.display().to_string());
            }
            request
        }
    }
}

fn print_result(result: &DeploymentResult) {
    if result.success {
        println!("{} {}", "✓".green().bold(), result.message);
    } else {
        println!("{} {}", "✗".red().bold(), result.message.red());
    }
    if let Some(id) = &result.deployment_id {
        println!("  deployment: {} ({})", id, result.backend_status);
    }
    if let Some(backup) = &result.backup {
        println!("  backup: {}", backup.path.display());
    }
    if let Some(health) = &result.health {
        println!("  health: {}", health.message());
    }
    match &result.rollback {
        Some(RollbackOutcome::Completed(detail)) => println!("  rollback: {}", detail.green()),
        Some(RollbackOutcome::Failed(detail)) => println!("  rollback failed: {}", detail.red()),
        Some(RollbackOutcome::Unsupported(detail)) => println!("  rollback: {}", detail.yellow()),
        None => {}
    }
    println!("  duration: {:.2}s", result.duration_secs);
}

// ================================== MONITOR ====================================== //

async fn monitor(
    cmd: MonitorCommand,
    options: &RunOptions,
    store: &ConfigStore,
    shutdown: Shutdown,
) -> Result<bool, AppError> {
    match cmd {
        MonitorCommand::Status {
            backend,
            deployment_id,
            watch,
        } => {
            let backend = resolve_backend(backend, &options.layout).await;
            match backend {
                Backend::Compose => {
                    let cli = ComposeCli::new(options.runner.clone(), options.layout.project_dir());
                    let output = cli
                        .run(None, &["ps"])
                        .await
                        .map_err(|e| AppError::ProcessError(e.to_string()))?;
                    if output.success() {
                        println!("Docker container status:\n{}", output.stdout);
                    } else {
                        println!("{} {}", "Error checking Docker status:".red(), output.error_text());
                    }
                    Ok(output.success())
                }
                Backend::Paas => {
                    let Some(id) = deployment_id else {
                        println!("{}", "A --deployment-id is required for PaaS status".yellow());
                        return Ok(false);
                    };
                    paas_status(&id, watch, store, shutdown).await
                }
                Backend::Vps => {
                    println!("{}", "VPS status checks are not supported".yellow());
                    Ok(false)
                }
            }
        }
        MonitorCommand::Logs {
            backend,
            deployment_id,
            tail,
            follow,
        } => {
            let backend = resolve_backend(backend, &options.layout).await;
            if backend != Backend::Compose {
                println!(
                    "{}",
                    format!(
                        "{} logs are not available (deployment {})",
                        backend.display_name(),
                        deployment_id.as_deref().unwrap_or("none")
                    )
                    .yellow()
                );
                return Ok(false);
            }

            let tail = tail.to_string();
            let mut args = vec!["logs", "--tail", tail.as_str()];
            let mut cli = ComposeCli::new(options.runner.clone(), options.layout.project_dir());
            if follow {
                args.push("--follow");
                cli = cli.with_timeout(FOLLOW_TIMEOUT);
            }

            let output = cli
                .run(None, &args)
                .await
                .map_err(|e| AppError::ProcessError(e.to_string()))?;
            if output.success() {
                print!("{}", output.stdout);
            } else {
                println!("{} {}", "Error getting Docker logs:".red(), output.error_text());
            }
            Ok(output.success())
        }
        MonitorCommand::Health {
            url,
            environment,
            timeout,
        } => {
            let url = url
                .or_else(|| store.settings().health_check_url(environment))
                .ok_or_else(|| {
                    AppError::ConfigError(
                        "No health check URL given and none configured (monitoring.health_check_url)"
                            .to_string(),
                    )
                })?;

            let probe = HealthProbe::new()?;
            let result = probe.check(&url, Duration::from_secs(timeout)).await;
            if options.json {
                print_json(&result)?;
            } else if result.passed {
                println!("{} {}", "✓".green().bold(), result.message());
            } else {
                println!("{} {}", "✗".red().bold(), result.message().red());
            }
            Ok(result.passed)
        }
    }
}

async fn paas_status(
    deployment_id: &str,
    watch: bool,
    store: &ConfigStore,
    mut shutdown: Shutdown,
) -> Result<bool, AppError> {
    let settings = store.settings();
    let driver = PaasDriver::from_settings(&settings.coolify)?;
    let interval = settings.deployment.poll_interval().max(Duration::from_secs(1));

    loop {
        let status = match driver.poll_status(deployment_id).await {
            Ok(status) => status,
            Err(e) => {
                println!("{} {}", "PaaS status check failed:".red(), e);
                return Ok(false);
            }
        };
        println!("PaaS deployment status: {}", status);

        if !watch || status.is_finished() {
            return Ok(status != BackendStatus::Failed);
        }

        tokio::select! {
            _ = &mut shutdown => {
                info!("Stopped watching deployment {}", deployment_id);
                return Ok(true);
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

async fn resolve_backend(arg: Option<BackendArg>, layout: &StorageLayout) -> Backend {
    match arg {
        Some(arg) => arg.into(),
        None => {
            let backend = detect_backend(layout).await;
            debug!("Detected backend: {}", backend);
            backend
        }
    }
}

/// Guess the deployment backend from the files in the project directory
pub async fn detect_backend(layout: &StorageLayout) -> Backend {
    if File::new(layout.resolve("docker-compose.yml")).exists().await {
        return Backend::Compose;
    }
    for provider in VPS_MARKERS {
        if layout.vps_script(provider).exists().await {
            return Backend::Vps;
        }
    }
    Backend::Paas
}

// ==================================== WEB ======================================== //

async fn web(cmd: WebCommand, options: &RunOptions) -> Result<bool, AppError> {
    match cmd {
        WebCommand::Test {
            url,
            health_check,
            load_test,
            duration,
        } => {
            let smoke = SmokeOptions {
                health_check,
                load_test,
                load_duration: Duration::from_secs(duration),
                ..Default::default()
            };
            let probe = HealthProbe::new()?;
            let report = run_smoke_tests(&probe, &url, &smoke).await;

            print_json(&report)?;
            if !options.json {
                let verdict = if report.overall_success {
                    "All smoke tests passed".green()
                } else {
                    "Smoke tests failed".red()
                };
                println!("{}", verdict);
            }
            Ok(report.overall_success)
        }
    }
}

// =================================== FILE ======================================== //

async fn file(cmd: FileCommand, options: &RunOptions, store: &ConfigStore) -> Result<bool, AppError> {
    let backups = FileBackup::new(
        options.layout.clone(),
        &store.settings().database.backup_path,
    );

    match cmd {
        FileCommand::Backup {
            config_files,
            logs,
            database,
            destination,
        } => {
            let nothing_selected = !config_files && !logs && !database;
            let backup_options = BackupOptions {
                config: config_files || nothing_selected,
                logs,
                database,
                destination,
            };

            let handle = backups.backup(&backup_options).await?;
            if options.json {
                print_json(&handle)?;
            } else {
                println!("{} Backup created: {}", "✓".green().bold(), handle.path.display());
                for entry in &handle.manifest {
                    println!("  - {}", entry);
                }
            }
            Ok(true)
        }
        FileCommand::Restore {
            backup_path,
            config_files,
            logs,
            database,
        } => {
            let restore_options = RestoreOptions {
                config: config_files,
                logs,
                database,
            };

            let report = backups.restore(&backup_path, &restore_options).await?;
            if options.json {
                print_json(&report)?;
            } else {
                println!(
                    "{} Restored {} items from {}",
                    "✓".green().bold(),
                    report.restored.len(),
                    backup_path.display()
                );
                for skipped in &report.skipped {
                    println!("  {} restore is not implemented, skipped", skipped.yellow());
                }
            }
            Ok(true)
        }
    }
}

// ================================== CONFIG ======================================= //

async fn config(cmd: ConfigCommand, options: &RunOptions, mut store: ConfigStore) -> Result<bool, AppError> {
    match cmd {
        ConfigCommand::Get { key: None } => {
            print_json(store.document())?;
            Ok(true)
        }
        ConfigCommand::Get { key: Some(key) } => match store.get(&key) {
            Some(value) => {
                if options.json || !value.is_string() {
                    print_json(value)?;
                } else if let Some(text) = value.as_str() {
                    println!("{}", text);
                }
                Ok(true)
            }
            None => {
                println!("{}", format!("Configuration key not found: {}", key).yellow());
                Ok(false)
            }
        },
        ConfigCommand::Set { key, value } => {
            let value = parse_cli_value(&value);
            store.set(&key, value.clone()).await?;
            println!("Configuration updated: {} = {}", key, value);
            Ok(true)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
