//! Chopper video helper library
//!
//! Trims a source clip with stream copy, joins normalized intros and outros
//! around it, and burns in a watermark, all by driving `ffmpeg`/`ffprobe`.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod ports;
pub mod probe;
pub mod utils;

/// Log target for raw encoder output and command lines; kept out of the console
pub const DIAGNOSTIC_TARGET: &str = "chopper::diagnostic";

// Re-export commonly used types
pub use app::{EncodeInteractor, Workspace};
pub use domain::errors::DomainError;
pub use domain::model::{MediaMetadata, RunReport, RunRequest, TrimRange};
