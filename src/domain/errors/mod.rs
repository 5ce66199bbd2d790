// Domain errors - Error types for the domain layer

use thiserror::Error;

/// Domain-specific error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Metadata could not be obtained or parsed
    #[error("Failed to probe media file {path}: {message}")]
    Probe { path: String, message: String },

    /// A supplied path does not exist
    #[error("Path does not exist: {0}")]
    InvalidPath(String),

    /// A trim point is not a usable timestamp
    #[error("Invalid timestamp: {0}. Expected HH:MM:SS or HH:MM:SS.ms")]
    InvalidTimestamp(String),

    /// The encoder exited with a failure status
    #[error("Encoder failed ({status}) running: {command}")]
    EncodeProcess { command: String, status: String },

    /// A required video or audio stream is absent
    #[error("Missing {kind} stream in {path}")]
    MissingStream { kind: String, path: String },

    /// Filesystem operation failed
    #[error("Filesystem error: {0}")]
    Fs(String),

    /// Configuration is invalid or unreadable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Another instance holds the output directory
    #[error("Another instance is already using {0} (remove the lock file if it is stale)")]
    InstanceLocked(String),
}

impl DomainError {
    /// Whether the error came from operator input rather than processing
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidPath(_) | DomainError::InvalidTimestamp(_)
        )
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Fs(err.to_string())
    }
}
