//! Project storage layout

use std::path::{Path, PathBuf};

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Name of the tool's state directory inside the project
pub const STATE_DIR_NAME: &str = ".deploy-pilot";

/// Locations of everything deploy-pilot reads or writes, relative to the
/// project being deployed
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Root of the deployed project (compose files, scripts, `.env`)
    pub project_dir: PathBuf,

    /// Explicit configuration file, overriding the default location
    pub config_override: Option<PathBuf>,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            config_override: None,
        }
    }

    pub fn with_config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_override = path;
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Tool state directory
    pub fn state_dir(&self) -> Dir {
        Dir::new(self.project_dir.join(STATE_DIR_NAME))
    }

    /// Configuration file path
    pub fn config_file(&self) -> File {
        match &self.config_override {
            Some(path) => File::new(path.clone()),
            None => self.state_dir().file("deployment_config.json"),
        }
    }

    /// Directory of deploy-pilot's own log files
    pub fn logs_dir(&self) -> Dir {
        self.state_dir().subdir("logs")
    }

    /// The application's log directory (included in file backups)
    pub fn app_logs_dir(&self) -> Dir {
        Dir::new(self.project_dir.join("logs"))
    }

    /// Root directory for backups; relative paths resolve against the
    /// project directory
    pub fn backup_root(&self, backup_path: &str) -> Dir {
        Dir::new(self.resolve(backup_path))
    }

    /// Provider deployment script, `deploy-<provider>.sh`
    pub fn vps_script(&self, provider: &str) -> File {
        File::new(self.project_dir.join(format!("deploy-{}.sh", provider)))
    }

    /// Resolve a path relative to the project directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(".")
    }
}
