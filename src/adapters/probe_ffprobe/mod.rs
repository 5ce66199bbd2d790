//! FFprobe adapter for media file probing
//!
//! Runs the probe tool and hands its JSON report to the report parser.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;
use crate::probe::{parse_probe_report, PROBE_ARGS};
use crate::DIAGNOSTIC_TARGET;

/// FFprobe-based probe adapter
pub struct FfprobeAdapter {
    ffprobe_path: String,
}

impl FfprobeAdapter {
    /// Create new FFprobe adapter
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe(&self, path: &Path) -> Result<MediaMetadata, DomainError> {
        let shown = path.display().to_string();
        debug!(
            target: DIAGNOSTIC_TARGET,
            "subprocess call: {} {} {:?}",
            self.ffprobe_path,
            PROBE_ARGS.join(" "),
            shown
        );

        let output = Command::new(&self.ffprobe_path)
            .args(PROBE_ARGS)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DomainError::Probe {
                path: shown.clone(),
                message: format!("could not run {}: {}", self.ffprobe_path, e),
            })?;

        if !output.status.success() {
            return Err(DomainError::Probe {
                path: shown,
                message: format!(
                    "{} exited with {}: {}",
                    self.ffprobe_path,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        parse_probe_report(&shown, &output.stdout)
    }
}
