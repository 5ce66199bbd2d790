// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::command::CommandLine;
use crate::engine::progress::ProgressCallback;

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe a media file and summarise its first video and audio streams
    async fn probe(&self, path: &Path) -> Result<MediaMetadata, DomainError>;
}

/// Port for running the encoder
#[async_trait]
pub trait ExecutePort: Send + Sync {
    /// Run one command to completion, reporting progress while it runs.
    ///
    /// A failure status yields [`DomainError::EncodeProcess`] carrying the
    /// rendered command line.
    async fn run(
        &self,
        command: &CommandLine,
        label: &str,
        expected_seconds: f64,
        progress: &dyn ProgressCallback,
    ) -> Result<(), DomainError>;
}

/// Port for file system operations
pub trait FsPort: Send + Sync {
    /// Check if a file or directory exists
    fn exists(&self, path: &Path) -> bool;

    /// Create directory (including parent directories)
    fn create_dir_all(&self, path: &Path) -> Result<(), DomainError>;

    /// Write a small text file
    fn write_string(&self, path: &Path, contents: &str) -> Result<(), DomainError>;

    /// Delete a file, succeeding if it is already gone
    fn remove_file(&self, path: &Path) -> Result<(), DomainError>;

    /// Move a file into place, replacing any existing file
    fn rename(&self, from: &Path, to: &Path) -> Result<(), DomainError>;

    /// Plain files directly inside a directory
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, DomainError>;
}

/// Source of run requests: the interactive prompts or a single scripted request
pub trait RequestSource {
    /// Next validated request, or `None` when there are no more runs
    fn next_request(&mut self) -> Result<Option<RunRequest>, DomainError>;
}
