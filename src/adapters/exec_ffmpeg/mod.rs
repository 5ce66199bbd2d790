//! FFmpeg execution adapter
//!
//! Spawns the encoder, merges its stdout and stderr into one line stream and
//! feeds that stream to the progress parser while the process is running.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::domain::errors::*;
use crate::engine::command::CommandLine;
use crate::engine::progress::{LineSplitter, ProgressCallback, ProgressParser};
use crate::ports::*;
use crate::DIAGNOSTIC_TARGET;

const READ_CHUNK: usize = 4096;

/// FFmpeg-based execution adapter
pub struct FfmpegAdapter;

impl FfmpegAdapter {
    /// Create new FFmpeg adapter
    pub fn new() -> Self {
        Self
    }
}

impl Default for FfmpegAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward every line of `reader` until it closes
async fn pump_lines<R>(mut reader: R, lines: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::new();
    let mut buffer = [0u8; READ_CHUNK];

    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => {
                for line in splitter.push(&buffer[..n]) {
                    if lines.send(line).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                trace!("output stream closed with error: {}", e);
                break;
            }
        }
    }

    if let Some(line) = splitter.finish() {
        let _ = lines.send(line);
    }
}

#[async_trait]
impl ExecutePort for FfmpegAdapter {
    async fn run(
        &self,
        command: &CommandLine,
        label: &str,
        expected_seconds: f64,
        progress: &dyn ProgressCallback,
    ) -> Result<(), DomainError> {
        let rendered = command.render();

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DomainError::EncodeProcess {
                command: rendered.clone(),
                status: format!("failed to start: {}", e),
            })?;

        let (sender, mut receiver) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump_lines(stdout, sender.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump_lines(stderr, sender.clone()));
        }
        // the channel closes once both pumps are done
        drop(sender);

        let mut parser = ProgressParser::new(expected_seconds);
        progress.on_start(label, expected_seconds);

        while let Some(line) = receiver.recv().await {
            debug!(target: DIAGNOSTIC_TARGET, "{}", line);
            if let Some(delta) = parser.observe(&line) {
                progress.on_progress(delta, parser.state());
            }
        }

        let status = child.wait().await.map_err(|e| DomainError::EncodeProcess {
            command: rendered.clone(),
            status: format!("failed to wait: {}", e),
        })?;
        progress.on_finish(status.success());

        if !status.success() {
            return Err(DomainError::EncodeProcess {
                command: rendered,
                status: status.to_string(),
            });
        }

        debug!(
            "{} finished after {:.2}s of output",
            label,
            parser.state().seconds_encoded
        );
        Ok(())
    }
}
