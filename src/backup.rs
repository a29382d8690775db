//! Filesystem snapshots of the managed world directories.
//!
//! Each backup is a directory under the backup root, named either by a
//! decimal Unix timestamp (auto-created, subject to rotation) or by an
//! arbitrary user-supplied string (manual, never auto-evicted), containing
//! a copy of every configured world directory. Active `*.lock` files are
//! excluded from copies.
//!
//! The store performs no coordination with the live process; the
//! orchestrator brackets calls with `save-off`/`save-on` so an inconsistent
//! on-disk state is never copied.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Filesystem operations for creating, listing, deleting, and restoring
/// world backups.
///
/// All operations are synchronous filesystem work; the orchestrator runs
/// them on a blocking task.
#[derive(Debug, Clone)]
pub struct BackupStore {
    /// Directory holding one subdirectory per backup entry.
    backup_root: PathBuf,
    /// Live server directory containing the world directories.
    server_directory: PathBuf,
    /// World directory names mirrored beneath each backup entry.
    world_names: Vec<String>,
    /// Auto-named backups kept before rotation. Zero disables rotation.
    max_backups: u32,
}

impl BackupStore {
    /// Creates a store rooted at `<server directory>/<folder>`.
    pub fn new(
        server_directory: impl AsRef<Path>,
        folder: &str,
        world_names: Vec<String>,
        max_backups: u32,
    ) -> Self {
        let server_directory = server_directory.as_ref().to_path_buf();
        Self {
            backup_root: server_directory.join(folder),
            server_directory,
            world_names,
            max_backups,
        }
    }

    /// The directory holding all backup entries.
    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Returns the entry names under the backup root, unsorted.
    ///
    /// Ordering is a presentation concern of the caller. An absent root
    /// means no backups have been made yet.
    pub fn list(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.backup_root) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect()
    }

    /// Creates an auto-named backup using the current Unix timestamp.
    ///
    /// When `max_backups` is configured and already met, the entry with the
    /// numerically smallest integer-parsable name is deleted first.
    /// Manually named backups never parse as integers, so rotation never
    /// evicts them. Returns the new backup's name.
    pub fn create_auto(&self) -> Result<String> {
        if self.max_backups > 0 {
            self.rotate()?;
        }
        let name = unix_now().to_string();
        let destination = self.backup_root.join(&name);
        self.copy_worlds_to(&destination)?;
        Ok(name)
    }

    /// Creates a manually named backup.
    ///
    /// Fails with [`Error::NameCollision`] before any filesystem mutation
    /// when the name is already in use. Manual backups are exempt from
    /// rotation.
    pub fn create_named(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Other("Backup name is empty".to_string()));
        }
        if self.backup_root.join(name).exists() {
            return Err(Error::NameCollision(name.to_string()));
        }
        let destination = self.backup_root.join(name);
        self.copy_worlds_to(&destination)?;
        Ok(name.to_string())
    }

    /// Deletes a backup entry.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.backup_root.join(name);
        if !path.exists() {
            return Err(Error::BackupNotFound(name.to_string()));
        }
        std::fs::remove_dir_all(&path)
            .map_err(|e| Error::Copy(format!("Failed to delete backup '{}': {}", name, e)))
    }

    /// Replaces the live world directories with a backup's copies.
    ///
    /// Each world directory is deleted then copied back in turn. A failure
    /// mid-copy surfaces as [`Error::Copy`] and leaves that world in a
    /// partial state; there is no rollback. The orchestrator guards this
    /// with the should-be-running check so it never races the process.
    pub fn restore(&self, name: &str) -> Result<()> {
        let backup_dir = self.backup_root.join(name);
        if !backup_dir.exists() {
            return Err(Error::BackupNotFound(name.to_string()));
        }
        for world in &self.world_names {
            let live = self.server_directory.join(world);
            let saved = backup_dir.join(world);
            if live.exists() {
                std::fs::remove_dir_all(&live).map_err(|e| {
                    Error::Copy(format!("Failed to delete world '{}': {}", world, e))
                })?;
            }
            copy_dir_excluding_locks(&saved, &live).map_err(|e| {
                Error::Copy(format!(
                    "Failed to restore world '{}' from backup '{}': {}",
                    world, name, e
                ))
            })?;
        }
        Ok(())
    }

    /// Evicts the oldest auto-named backup when the configured maximum is
    /// already met.
    fn rotate(&self) -> Result<()> {
        let mut oldest: Option<u64> = None;
        let mut auto_count = 0u32;
        for entry in self.list() {
            if let Ok(timestamp) = entry.parse::<u64>() {
                auto_count += 1;
                oldest = Some(oldest.map_or(timestamp, |o| o.min(timestamp)));
            }
        }
        if auto_count >= self.max_backups {
            if let Some(oldest) = oldest {
                tracing::info!(backup = %oldest, "Rotating out oldest automatic backup");
                self.delete(&oldest.to_string())?;
            }
        }
        Ok(())
    }

    fn copy_worlds_to(&self, destination: &Path) -> Result<()> {
        for world in &self.world_names {
            let source = self.server_directory.join(world);
            let target = destination.join(world);
            copy_dir_excluding_locks(&source, &target).map_err(|e| {
                Error::Copy(format!("Failed to back up world '{}': {}", world, e))
            })?;
        }
        Ok(())
    }
}

/// Recursively copies a directory tree, skipping `*.lock` files.
///
/// Lock files belong to the running process and are not part of the world
/// data.
fn copy_dir_excluding_locks(source: &Path, destination: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(destination)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = destination.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_excluding_locks(&entry.path(), &target)?;
        } else if file_type.is_file() {
            let is_lock = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(".lock"));
            if !is_lock {
                std::fs::copy(entry.path(), &target)?;
            }
        }
    }
    Ok(())
}

/// Current Unix timestamp in seconds.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
