// Domain models - Core types and data structures

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::utils::time::{format_hms, parse_hms};

/// Demuxers that decode a single still frame
const STILL_IMAGE_DEMUXERS: &[&str] = &["image2", "image2pipe"];

/// Summary of one probed media file.
///
/// Built once from a probe report and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub video_codec: String,
    pub pixel_format: String,
    /// Rational frame rate as reported, e.g. `30000/1001`
    pub frame_rate: String,
    /// Empty when the file has no audio stream
    pub audio_codec: String,
    /// Empty when the file has no audio stream
    pub sample_rate: String,
    pub duration_seconds: f64,
    pub container_format: String,
}

impl MediaMetadata {
    /// Whether an audio stream was found
    pub fn has_audio(&self) -> bool {
        !self.audio_codec.is_empty()
    }

    /// Still images are demuxed by the image readers (`image2`, `png_pipe`, ...)
    pub fn is_still_image(&self) -> bool {
        self.container_format
            .split(',')
            .any(|name| STILL_IMAGE_DEMUXERS.contains(&name) || name.ends_with("_pipe"))
    }

    /// Video dimensions, required by scaling operations
    pub fn dimensions(&self, path: &str) -> Result<(u32, u32), DomainError> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Ok((w, h)),
            _ => Err(DomainError::MissingStream {
                kind: "video".to_string(),
                path: path.to_string(),
            }),
        }
    }

}

/// In/out points requested by the operator; `None` means unset
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrimRange {
    pub inpoint: Option<String>,
    pub outpoint: Option<String>,
}

impl TrimRange {
    /// Create a trim range, validating any explicit timestamps.
    ///
    /// Blank strings count as unset.
    pub fn new(inpoint: Option<String>, outpoint: Option<String>) -> Result<Self, DomainError> {
        let normalize = |value: Option<String>| -> Result<Option<String>, DomainError> {
            match value.map(|v| v.trim().to_string()) {
                Some(v) if v.is_empty() => Ok(None),
                Some(v) => {
                    parse_hms(&v)?;
                    Ok(Some(v))
                }
                None => Ok(None),
            }
        };

        Ok(Self {
            inpoint: normalize(inpoint)?,
            outpoint: normalize(outpoint)?,
        })
    }

    /// A range with both bounds unset
    pub fn full() -> Self {
        Self::default()
    }

    /// Resolve unset bounds against a file duration.
    ///
    /// The open end falls back to one second past the duration so the last
    /// partial second is never cut off.
    pub fn resolve(&self, duration_seconds: f64) -> ResolvedTrim {
        let start = self
            .inpoint
            .clone()
            .unwrap_or_else(|| "00:00:00".to_string());
        let end = self
            .outpoint
            .clone()
            .unwrap_or_else(|| format_hms(duration_seconds + 1.0));

        ResolvedTrim { start, end }
    }
}

/// Concrete `(start, end)` timestamps handed to the encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTrim {
    pub start: String,
    pub end: String,
}

impl ResolvedTrim {
    /// Length of the kept segment, bounded by the source duration
    pub fn span_seconds(&self, duration_seconds: f64) -> f64 {
        let start = parse_hms(&self.start).unwrap_or(0.0);
        let end = parse_hms(&self.end)
            .unwrap_or(duration_seconds)
            .min(duration_seconds.max(0.0));
        (end - start).max(0.0)
    }
}

/// What a single encoder job does
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    /// Stream-copy the requested range
    PlainTrim,
    /// Re-encode a side clip to match the primary clip; carries the side clip's own metadata
    NormalizeToTarget { source: MediaMetadata },
    /// Stream-copy join of the segments listed in a manifest
    Concat { manifest: PathBuf },
    /// Scale a watermark image and lay it over the output
    WatermarkOverlay { watermark: PathBuf, scaled: PathBuf },
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::PlainTrim => "plain-trim",
            OperationKind::NormalizeToTarget { .. } => "normalize",
            OperationKind::Concat { .. } => "concat",
            OperationKind::WatermarkOverlay { .. } => "watermark",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One request to run the encoder
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub operation: OperationKind,
    pub input: PathBuf,
    pub output: PathBuf,
    pub trim: Option<ResolvedTrim>,
    /// Metadata of the primary clip, the format every output must match
    pub metadata: MediaMetadata,
    /// Duration used to size the progress indicator
    pub expected_seconds: f64,
}

impl EncodeJob {
    pub fn plain_trim(
        input: PathBuf,
        output: PathBuf,
        trim: ResolvedTrim,
        metadata: MediaMetadata,
    ) -> Self {
        let expected_seconds = trim.span_seconds(metadata.duration_seconds);
        Self {
            operation: OperationKind::PlainTrim,
            input,
            output,
            trim: Some(trim),
            metadata,
            expected_seconds,
        }
    }

    pub fn normalize(
        input: PathBuf,
        output: PathBuf,
        source: MediaMetadata,
        target: MediaMetadata,
        expected_seconds: f64,
    ) -> Self {
        Self {
            operation: OperationKind::NormalizeToTarget { source },
            input,
            output,
            trim: None,
            metadata: target,
            expected_seconds,
        }
    }

    pub fn concat(
        manifest: PathBuf,
        output: PathBuf,
        metadata: MediaMetadata,
        expected_seconds: f64,
    ) -> Self {
        Self {
            operation: OperationKind::Concat {
                manifest: manifest.clone(),
            },
            input: manifest,
            output,
            trim: None,
            metadata,
            expected_seconds,
        }
    }

    pub fn watermark(
        input: PathBuf,
        output: PathBuf,
        watermark: PathBuf,
        scaled: PathBuf,
        metadata: MediaMetadata,
        expected_seconds: f64,
    ) -> Self {
        Self {
            operation: OperationKind::WatermarkOverlay { watermark, scaled },
            input,
            output,
            trim: None,
            metadata,
            expected_seconds,
        }
    }
}

/// Encoded-seconds counter for one running job
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressState {
    pub total_duration_seconds: f64,
    pub seconds_encoded: f64,
}

impl ProgressState {
    pub fn new(total_duration_seconds: f64) -> Self {
        Self {
            total_duration_seconds,
            seconds_encoded: 0.0,
        }
    }

    /// Move to `elapsed` and return the delta, or `None` if it would go backwards
    pub fn advance_to(&mut self, elapsed: f64) -> Option<f64> {
        if !elapsed.is_finite() || elapsed < self.seconds_encoded {
            return None;
        }
        let delta = elapsed - self.seconds_encoded;
        self.seconds_encoded = elapsed;
        Some(delta)
    }

    /// Percentage of the expected total; may exceed 100
    pub fn percent(&self) -> f64 {
        if self.total_duration_seconds <= 0.0 {
            return 0.0;
        }
        self.seconds_encoded / self.total_duration_seconds * 100.0
    }
}

/// Intro or outro clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideClip {
    Intro,
    Outro,
}

impl SideClip {
    pub fn label(&self) -> &'static str {
        match self {
            SideClip::Intro => "intro",
            SideClip::Outro => "outro",
        }
    }
}

/// Additional version of the run made from another source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryInput {
    pub path: PathBuf,
    /// Watermarking is chosen separately for the secondary file
    pub watermark: bool,
}

/// Inputs for one run, collected and validated outside the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub primary: PathBuf,
    pub trim: TrimRange,
    pub watermark: Option<PathBuf>,
    pub intro: Option<PathBuf>,
    pub outro: Option<PathBuf>,
    pub suffix: Option<String>,
    pub secondary: Option<SecondaryInput>,
}

impl RunRequest {
    /// Request for a plain trim of one file
    pub fn new(primary: impl Into<PathBuf>, trim: TrimRange) -> Self {
        Self {
            primary: primary.into(),
            trim,
            watermark: None,
            intro: None,
            outro: None,
            suffix: None,
            secondary: None,
        }
    }

    /// All paths the request refers to
    pub fn paths(&self) -> Vec<&PathBuf> {
        let mut paths = vec![&self.primary];
        paths.extend(self.watermark.iter());
        paths.extend(self.intro.iter());
        paths.extend(self.outro.iter());
        paths.extend(self.secondary.iter().map(|s| &s.path));
        paths
    }
}

/// One executed encoder invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub kind: String,
    pub command: String,
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub outputs: Vec<PathBuf>,
    pub jobs: Vec<JobRecord>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            outputs: Vec::new(),
            jobs: Vec::new(),
        }
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
