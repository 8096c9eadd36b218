//! Object storage for backup files.

use std::io::ErrorKind;
use std::path::Path;

use strict_path::{PathBoundary, StrictPath};

use super::{BackupError, BackupResult};

/// Flat object store holding backup files by name.
pub trait BackupStore: Send + Sync {
    /// Write an object, replacing any existing one with the same name.
    fn put(&self, name: &str, bytes: &[u8]) -> BackupResult<()>;

    /// Read an object.
    fn get(&self, name: &str) -> BackupResult<Vec<u8>>;

    /// Delete an object. Deleting a missing object is not an error.
    fn delete(&self, name: &str) -> BackupResult<()>;

    /// Names of all stored objects, sorted.
    fn list(&self) -> BackupResult<Vec<String>>;

    fn exists(&self, name: &str) -> BackupResult<bool> {
        Ok(self.list()?.iter().any(|n| n == name))
    }
}

/// Marker for paths inside the backup directory.
#[derive(Debug, Clone, Copy)]
pub struct BackupDir;

/// Backup store backed by a local directory.
///
/// Every object path is resolved through the directory's [`PathBoundary`],
/// so no name can reach outside it.
#[derive(Debug, Clone)]
pub struct FsBackupStore {
    boundary: PathBoundary<BackupDir>,
}

impl FsBackupStore {
    /// Use `root` as the store, creating it if needed.
    pub fn new<P: AsRef<Path>>(root: P) -> BackupResult<Self> {
        let boundary = PathBoundary::<BackupDir>::try_new_create(root)?;
        Ok(Self { boundary })
    }

    fn path_for(&self, name: &str) -> BackupResult<StrictPath<BackupDir>> {
        validate_name(name)?;
        self.boundary
            .strict_join(name)
            .map_err(|_| BackupError::InvalidName(name.to_string()))
    }
}

/// Object names are single, visible path components.
fn validate_name(name: &str) -> BackupResult<()> {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\', '\0']) {
        return Err(BackupError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl BackupStore for FsBackupStore {
    fn put(&self, name: &str, bytes: &[u8]) -> BackupResult<()> {
        self.path_for(name)?;
        // Readers only ever see complete files
        let partial = self
            .boundary
            .strict_join(format!(".{name}.partial"))
            .map_err(|_| BackupError::InvalidName(name.to_string()))?;
        partial.write(bytes)?;
        partial.strict_rename(name)?;
        Ok(())
    }

    fn get(&self, name: &str) -> BackupResult<Vec<u8>> {
        let path = self.path_for(name)?;
        path.read().map_err(|e| match e.kind() {
            ErrorKind::NotFound => BackupError::NotFound(format!("backup file {name}")),
            _ => BackupError::Io(e),
        })
    }

    fn delete(&self, name: &str) -> BackupResult<()> {
        let path = self.path_for(name)?;
        match path.remove_file() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> BackupResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.boundary.read_dir()? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
