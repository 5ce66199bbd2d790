//! Progress tracking from the encoder's diagnostic output
//!
//! The encoder periodically prints a stats line containing `time=HH:MM:SS.ff`.
//! That marker is the only thing this module relies on; everything else in the
//! stream is passed through untouched for the diagnostic log.

use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;

use crate::domain::model::ProgressState;

fn time_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i)time=(\d+):(\d+):(\d+)\.(\d+)").expect("time marker pattern is valid")
    })
}

/// Elapsed seconds reported by a `time=` marker on this line, if any
pub fn parse_time_marker(line: &str) -> Option<f64> {
    let caps = time_marker().captures(line)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    let fraction: f64 = format!("0.{}", &caps[4]).parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds + fraction)
}

/// Turns output lines into monotonic progress deltas for one job
#[derive(Debug, Default)]
pub struct ProgressParser {
    state: ProgressState,
}

impl ProgressParser {
    pub fn new(total_duration_seconds: f64) -> Self {
        Self {
            state: ProgressState::new(total_duration_seconds),
        }
    }

    /// Seconds encoded since the previous marker; `None` without a usable marker
    pub fn observe(&mut self, line: &str) -> Option<f64> {
        let elapsed = parse_time_marker(line)?;
        self.state.advance_to(elapsed)
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }
}

/// Splits raw process output into lines.
///
/// The encoder redraws its stats line with bare carriage returns, so both
/// `\r` and `\n` end a line. Empty lines are dropped.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                if !self.pending.is_empty() {
                    lines.push(String::from_utf8_lossy(&self.pending).into_owned());
                    self.pending.clear();
                }
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Whatever is left once the stream closes
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}

/// Progress callback trait for UI integration
pub trait ProgressCallback: Send + Sync {
    /// Called when a job starts
    fn on_start(&self, label: &str, total_seconds: f64);

    /// Called for every forward step of the encoder
    fn on_progress(&self, delta_seconds: f64, state: &ProgressState);

    /// Called when the job's process has exited
    fn on_finish(&self, success: bool);
}

/// Discards all progress
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_start(&self, _label: &str, _total_seconds: f64) {}

    fn on_progress(&self, _delta_seconds: f64, _state: &ProgressState) {}

    fn on_finish(&self, _success: bool) {}
}

/// Terminal progress bar sized to the expected duration
pub struct ConsoleProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{msg:>12} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% ETA {eta}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_start(&self, label: &str, total_seconds: f64) {
        // milliseconds keep short clips from rounding to an empty bar
        let total_ms = (total_seconds * 1000.0).max(1.0) as u64;
        let bar = ProgressBar::new(total_ms);
        bar.set_style(Self::style());
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(200));

        if let Ok(mut slot) = self.bar.lock() {
            if let Some(previous) = slot.replace(bar) {
                previous.abandon();
            }
        }
    }

    fn on_progress(&self, _delta_seconds: f64, state: &ProgressState) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.set_position((state.seconds_encoded * 1000.0) as u64);
            }
        }
    }

    fn on_finish(&self, success: bool) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                if success {
                    bar.finish();
                } else {
                    bar.abandon_with_message("failed");
                }
            }
        }
    }
}
