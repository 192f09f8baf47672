//! Directory operations

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::AppError;
use crate::filesys::file::File;

/// A directory wrapper with path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Create the directory (and parents)
    pub async fn create(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Delete the directory and all contents
    pub async fn delete(&self) -> Result<(), AppError> {
        if self.exists().await {
            fs::remove_dir_all(&self.path).await?;
        }
        Ok(())
    }

    /// List files in the directory
    pub async fn list_files(&self) -> Result<Vec<PathBuf>, AppError> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.path).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Recursively copy the directory tree into `dest`. Returns the
    /// number of files copied.
    pub async fn copy_recursive(&self, dest: &Path) -> Result<usize, AppError> {
        let mut copied = 0;
        let mut pending = vec![(self.path.clone(), dest.to_path_buf())];

        while let Some((src, dst)) = pending.pop() {
            fs::create_dir_all(&dst).await?;
            let mut entries = fs::read_dir(&src).await?;
            while let Some(entry) = entries.next_entry().await? {
                let target = dst.join(entry.file_name());
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push((entry.path(), target));
                } else if file_type.is_file() {
                    fs::copy(entry.path(), &target).await?;
                    copied += 1;
                }
            }
        }

        Ok(copied)
    }

    /// Get a file within this directory
    pub fn file(&self, name: &str) -> File {
        File::new(self.path.join(name))
    }

    /// Get a subdirectory
    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }
}
