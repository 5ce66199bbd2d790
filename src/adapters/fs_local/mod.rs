// Local filesystem adapter - File system operations and the instance lock

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::rules::LOCK_FILE_NAME;
use crate::ports::*;

/// Filesystem adapter backed by `std::fs`
pub struct FsLocalAdapter;

impl FsLocalAdapter {
    /// Create new local filesystem adapter
    pub fn new() -> Self {
        Self
    }
}

impl Default for FsLocalAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn fs_error(action: &str, path: &Path, e: std::io::Error) -> DomainError {
    DomainError::Fs(format!("Failed to {} {}: {}", action, path.display(), e))
}

impl FsPort for FsLocalAdapter {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), DomainError> {
        fs::create_dir_all(path).map_err(|e| fs_error("create directory", path, e))
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<(), DomainError> {
        fs::write(path, contents).map_err(|e| fs_error("write", path, e))
    }

    fn remove_file(&self, path: &Path) -> Result<(), DomainError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(fs_error("remove", path, e)),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), DomainError> {
        // Windows refuses to rename over an existing file
        if cfg!(windows) && to.exists() {
            self.remove_file(to)?;
        }
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            // across filesystems a copy is the only option
            Err(e) => {
                if fs::copy(from, to).is_err() {
                    return Err(fs_error("move", from, e));
                }
                self.remove_file(from)
            }
        }
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, DomainError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(fs_error("list", dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| fs_error("list", dir, e))?;
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Exclusive claim on an output root, released on drop
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Claim `output_root`, failing if another session already holds it
    pub fn acquire(output_root: &Path) -> Result<Self, DomainError> {
        fs::create_dir_all(output_root).map_err(|e| fs_error("create directory", output_root, e))?;
        let path = output_root.join(LOCK_FILE_NAME);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                return Err(DomainError::InstanceLocked(format!(
                    "{} held by process {}",
                    path.display(),
                    holder.trim()
                )));
            }
            Err(e) => return Err(fs_error("create", &path, e)),
        };

        writeln!(file, "{}", std::process::id()).map_err(|e| fs_error("write", &path, e))?;
        debug!("Acquired instance lock {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Could not release lock {}: {}", self.path.display(), e);
        }
    }
}
