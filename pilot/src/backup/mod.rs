//! File backups of deployment configuration
//!
//! A backup is a timestamped directory under the backup root holding a
//! `config/` copy of the project's deployment files, optionally a copy
//! of the application logs, and a `backup_manifest.json`. Backups are
//! never deleted here; retention is handled elsewhere.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::storage::layout::StorageLayout;

pub const MANIFEST_FILE: &str = "backup_manifest.json";

/// Files copied by a pre-deployment backup
pub const PRE_DEPLOY_FILES: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.production.yml",
    ".env",
    ".env.production",
];

/// Files copied by a `file backup --config`
pub const CONFIG_FILES: [&str; 9] = [
    "docker-compose.yml",
    "docker-compose.production.yml",
    "docker-compose.vps.yml",
    ".env",
    ".env.production",
    ".env.vps",
    "nginx.conf",
    "package.json",
    "package-lock.json",
];

const DATABASE_NOTE_FILE: &str = "database_backup_note.txt";

/// A backup that was written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupHandle {
    pub path: PathBuf,
    pub timestamp_id: String,
    /// Entries recorded in the manifest
    pub manifest: Vec<String>,
}

/// On-disk manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub backup_name: String,
    pub timestamp: String,
    pub backed_up_files: Vec<String>,
    pub backup_type: String,
    pub total_files: usize,
}

/// Creates the backup taken before a deployment
#[async_trait]
pub trait BackupProvider: Send + Sync {
    async fn create_backup(&self, backup_type: &str) -> Result<BackupHandle, AppError>;
}

/// What `file backup` should include
#[derive(Debug, Clone, Default)]
pub struct BackupOptions {
    pub config: bool,
    pub logs: bool,
    pub database: bool,
    /// Directory to create the backup in instead of the backup root
    pub destination: Option<PathBuf>,
}

/// What `file restore` should restore
#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    pub config: bool,
    pub logs: bool,
    pub database: bool,
}

/// Result of a restore
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestoreReport {
    pub restored: Vec<String>,
    pub skipped: Vec<String>,
}

/// Filesystem backups rooted at the configured backup directory
#[derive(Debug, Clone)]
pub struct FileBackup {
    layout: StorageLayout,
    backup_root: Dir,
}

impl FileBackup {
    pub fn new(layout: StorageLayout, backup_path: &str) -> Self {
        let backup_root = layout.backup_root(backup_path);
        Self {
            layout,
            backup_root,
        }
    }

    /// Create a deployment backup
    pub async fn backup(&self, options: &BackupOptions) -> Result<BackupHandle, AppError> {
        let root = match &options.destination {
            Some(dest) => Dir::new(self.layout.resolve(dest)),
            None => self.backup_root.clone(),
        };
        let (backup_dir, name, timestamp) = allocate_dir(&root, "deployment").await?;
        let mut backed_up = Vec::new();

        if options.config {
            backed_up.extend(self.copy_project_files(&CONFIG_FILES, &backup_dir).await?);
        }

        if options.logs {
            let logs = self.layout.app_logs_dir();
            if logs.exists().await {
                let copied = logs.copy_recursive(backup_dir.subdir("logs").path()).await?;
                debug!("Copied {} log files", copied);
                backed_up.push("logs/".to_string());
            } else {
                warn!("No log directory at {}", logs.path().display());
            }
        }

        if options.database {
            backup_dir
                .file(DATABASE_NOTE_FILE)
                .write_string(
                    "Database backup requested but not implemented.\n\
                     Please implement database-specific backup logic.\n",
                )
                .await?;
            backed_up.push("database_note".to_string());
        }

        write_manifest(&backup_dir, &name, &timestamp, backed_up, "deployment").await
    }

    /// Restore files from a backup directory. Existing config files are
    /// kept next to the restored ones as `<name>.backup.<timestamp>`.
    pub async fn restore(
        &self,
        backup_path: &Path,
        options: &RestoreOptions,
    ) -> Result<RestoreReport, AppError> {
        let backup_dir = Dir::new(self.layout.resolve(backup_path));
        if !backup_dir.exists().await {
            return Err(AppError::NotFound(format!(
                "Backup path not found: {}",
                backup_path.display()
            )));
        }

        let manifest_file = backup_dir.file(MANIFEST_FILE);
        if !manifest_file.exists().await {
            return Err(AppError::NotFound(format!(
                "Backup manifest not found: {}",
                manifest_file.path().display()
            )));
        }
        let manifest: BackupManifest = manifest_file.read_json().await?;
        let mut report = RestoreReport::default();

        if options.config {
            let config_dir = backup_dir.subdir("config");
            if config_dir.exists().await {
                for src in config_dir.list_files().await? {
                    let src = File::new(src);
                    let Some(name) = src.name() else { continue };
                    let dest = self.layout.resolve(&name);

                    if File::new(&dest).exists().await {
                        let keep = self
                            .layout
                            .resolve(format!("{}.backup.{}", name, manifest.timestamp));
                        File::new(&dest).copy_to(&keep).await?;
                    }
                    src.copy_to(&dest).await?;
                    report.restored.push(name);
                }
            }
        }

        if options.logs {
            let logs_backup = backup_dir.subdir("logs");
            if logs_backup.exists().await {
                let logs = self.layout.app_logs_dir();
                logs.delete().await?;
                logs_backup.copy_recursive(logs.path()).await?;
                report.restored.push("logs/".to_string());
            }
        }

        if options.database {
            report.skipped.push("database".to_string());
        }

        info!(
            "Restored {} items from backup: {}",
            report.restored.len(),
            backup_path.display()
        );
        Ok(report)
    }

    async fn copy_project_files(&self, names: &[&str], backup_dir: &Dir) -> Result<Vec<String>, AppError> {
        let config_dir = backup_dir.subdir("config");
        config_dir.create().await?;

        let mut copied = Vec::new();
        for name in names {
            let src = File::new(self.layout.resolve(name));
            if src.exists().await {
                src.copy_to(&config_dir.path().join(name)).await?;
                copied.push(name.to_string());
            }
        }
        Ok(copied)
    }
}

#[async_trait]
impl BackupProvider for FileBackup {
    async fn create_backup(&self, backup_type: &str) -> Result<BackupHandle, AppError> {
        let (backup_dir, name, timestamp) = allocate_dir(&self.backup_root, backup_type).await?;
        let copied = self.copy_project_files(&PRE_DEPLOY_FILES, &backup_dir).await?;
        write_manifest(&backup_dir, &name, &timestamp, copied, backup_type).await
    }
}

/// Create `<root>/<type>_backup_<timestamp>`, adding a numeric suffix
/// when a backup with the same second already exists
async fn allocate_dir(root: &Dir, backup_type: &str) -> Result<(Dir, String, String), AppError> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let base = format!("{}_backup_{}", backup_type, timestamp);

    let mut name = base.clone();
    let mut suffix = 1;
    while root.subdir(&name).exists().await {
        name = format!("{}_{}", base, suffix);
        suffix += 1;
    }

    let dir = root.subdir(&name);
    dir.create().await?;
    Ok((dir, name, timestamp))
}

async fn write_manifest(
    backup_dir: &Dir,
    name: &str,
    timestamp: &str,
    backed_up_files: Vec<String>,
    backup_type: &str,
) -> Result<BackupHandle, AppError> {
    let manifest = BackupManifest {
        backup_name: name.to_string(),
        timestamp: timestamp.to_string(),
        total_files: backed_up_files.len(),
        backed_up_files,
        backup_type: backup_type.to_string(),
    };
    backup_dir.file(MANIFEST_FILE).write_json(&manifest).await?;

    info!(
        "Backup created: {} ({} items)",
        backup_dir.path().display(),
        manifest.total_files
    );
    Ok(BackupHandle {
        path: backup_dir.path().to_path_buf(),
        timestamp_id: manifest.timestamp,
        manifest: manifest.backed_up_files,
    })
}
