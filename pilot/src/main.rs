//! deploy-pilot - Entry Point
//!
//! Deployment automation for PaaS, Docker Compose and VPS targets.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use deploy_pilot::app::cli::Cli;
use deploy_pilot::app::options::RunOptions;
use deploy_pilot::app::run::run;
use deploy_pilot::logs::{init_logging, LogLevel, LogOptions};
use deploy_pilot::storage::config::ConfigStore;
use deploy_pilot::storage::layout::StorageLayout;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let layout = StorageLayout::new(cli.project_dir.clone()).with_config_file(cli.config.clone());

    // Load the configuration before logging so its log level applies
    let store = match ConfigStore::load(layout.config_file()).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_level = match cli.verbose {
        0 => store.settings().log_level.clone(),
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    let log_options = LogOptions {
        log_level,
        log_dir: Some(layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    };
    let _guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = RunOptions::new(layout, cli.json);
    match run(cli.command, options, store, Box::pin(await_shutdown_signal())).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("SIGTERM received, shutting down...");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Ctrl+C received, shutting down...");
                    }
                }
                return;
            }
            Err(e) => warn!("Unable to listen for SIGTERM: {e}"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C received, shutting down..."),
        Err(e) => {
            warn!("Unable to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    }
}
