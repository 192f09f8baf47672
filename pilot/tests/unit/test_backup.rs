//! File backup and restore tests

use std::fs;

use deploy_pilot::backup::{BackupManifest, BackupOptions, FileBackup, RestoreOptions, MANIFEST_FILE};
use deploy_pilot::errors::AppError;
use deploy_pilot::storage::layout::StorageLayout;

fn project_with_files() -> tempfile::TempDir {
    let project = tempfile::tempdir().unwrap();
    fs::write(project.path().join("docker-compose.yml"), "services: {}\n").unwrap();
    fs::write(project.path().join("nginx.conf"), "server {}\n").unwrap();
    fs::create_dir_all(project.path().join("logs/api")).unwrap();
    fs::write(project.path().join("logs/api/app.log"), "started\n").unwrap();
    project
}

#[tokio::test]
async fn test_full_backup_writes_manifest() {
    let project = project_with_files();
    let backup = FileBackup::new(StorageLayout::new(project.path()), "backups");

    let handle = backup
        .backup(&BackupOptions {
            config: true,
            logs: true,
            database: true,
            destination: None,
        })
        .await
        .unwrap();

    assert!(handle.path.starts_with(project.path().join("backups")));
    let name = handle.path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("deployment_backup_"));

    let manifest: BackupManifest =
        serde_json::from_str(&fs::read_to_string(handle.path.join(MANIFEST_FILE)).unwrap()).unwrap();
    assert_eq!(manifest.backup_name, name);
    assert_eq!(manifest.backup_type, "deployment");
    assert_eq!(
        manifest.backed_up_files,
        vec!["docker-compose.yml", "nginx.conf", "logs/", "database_note"]
    );
    assert_eq!(manifest.total_files, 4);

    assert!(handle.path.join("config/nginx.conf").exists());
    assert_eq!(
        fs::read_to_string(handle.path.join("logs/api/app.log")).unwrap(),
        "started\n"
    );
    assert!(handle.path.join("database_backup_note.txt").exists());
}

#[tokio::test]
async fn test_backups_in_the_same_second_do_not_collide() {
    let project = project_with_files();
    let backup = FileBackup::new(StorageLayout::new(project.path()), "backups");
    let options = BackupOptions {
        config: true,
        ..Default::default()
    };

    let first = backup.backup(&options).await.unwrap();
    let second = backup.backup(&options).await.unwrap();

    assert_ne!(first.path, second.path);
}

#[tokio::test]
async fn test_restore_keeps_current_files() {
    let project = project_with_files();
    let backup = FileBackup::new(StorageLayout::new(project.path()), "backups");
    let handle = backup
        .backup(&BackupOptions {
            config: true,
            logs: true,
            ..Default::default()
        })
        .await
        .unwrap();

    fs::write(project.path().join("nginx.conf"), "server { listen 81; }\n").unwrap();
    fs::remove_dir_all(project.path().join("logs")).unwrap();

    let report = backup
        .restore(
            &handle.path,
            &RestoreOptions {
                config: true,
                logs: true,
                database: true,
            },
        )
        .await
        .unwrap();

    assert!(report.restored.contains(&"nginx.conf".to_string()));
    assert!(report.restored.contains(&"logs/".to_string()));
    assert_eq!(report.skipped, vec!["database"]);

    assert_eq!(
        fs::read_to_string(project.path().join("nginx.conf")).unwrap(),
        "server {}\n"
    );
    let kept = project
        .path()
        .join(format!("nginx.conf.backup.{}", handle.timestamp_id));
    assert_eq!(fs::read_to_string(kept).unwrap(), "server { listen 81; }\n");
    assert!(project.path().join("logs/api/app.log").exists());
}

#[tokio::test]
async fn test_restore_requires_manifest() {
    let project = project_with_files();
    let backup = FileBackup::new(StorageLayout::new(project.path()), "backups");
    let bogus = project.path().join("backups/not_a_backup");
    fs::create_dir_all(&bogus).unwrap();

    let err = backup
        .restore(&bogus, &RestoreOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = backup
        .restore(&project.path().join("missing"), &RestoreOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
