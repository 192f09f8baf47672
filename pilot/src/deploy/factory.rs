//! Driver construction from settings

use std::sync::Arc;

use crate::backup::FileBackup;
use crate::deploy::compose::{ComposeCli, ComposeDriver};
use crate::deploy::driver::BackendDriver;
use crate::deploy::orchestrator::{Orchestrator, HEALTH_CHECK_TIMEOUT};
use crate::deploy::paas::PaasDriver;
use crate::deploy::vps::VpsDriver;
use crate::errors::AppError;
use crate::execlog::ExecutionLog;
use crate::health::probe::HealthProbe;
use crate::models::deployment::{Backend, Environment};
use crate::process::CommandRunner;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;

/// Factory for backend drivers
pub struct DriverFactory;

impl DriverFactory {
    /// Create the driver for `backend`
    pub fn create(
        backend: Backend,
        settings: &Settings,
        layout: &StorageLayout,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Arc<dyn BackendDriver>, AppError> {
        let driver: Arc<dyn BackendDriver> = match backend {
            Backend::Paas => Arc::new(PaasDriver::from_settings(&settings.coolify)?),
            Backend::Compose => Arc::new(ComposeDriver::new(
                ComposeCli::new(runner, layout.project_dir()),
                layout.project_dir(),
                settings.environments.clone(),
            )),
            Backend::Vps => Arc::new(VpsDriver::new(runner, layout.clone(), settings)),
        };

        Ok(driver)
    }

    /// Create an orchestrator wired with the file backup, the configured
    /// health check URL and a snapshot of the deployment settings
    pub fn orchestrator(
        backend: Backend,
        environment: Environment,
        settings: &Settings,
        layout: &StorageLayout,
        runner: Arc<dyn CommandRunner>,
        log: Arc<dyn ExecutionLog>,
    ) -> Result<Orchestrator, AppError> {
        let driver = Self::create(backend, settings, layout, runner)?;
        let backup = FileBackup::new(layout.clone(), &settings.database.backup_path);

        Ok(
            Orchestrator::new(settings.deployment.clone(), driver, HealthProbe::new()?, log)
                .with_backup(Arc::new(backup))
                .with_health_check(settings.health_check_url(environment), HEALTH_CHECK_TIMEOUT),
        )
    }
}
