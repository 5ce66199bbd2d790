//! Encoder command construction
//!
//! Every job becomes one or more structured argument lists. Nothing here goes
//! through a shell, so file names with spaces or quotes are passed verbatim;
//! [`CommandLine::render`] produces a quoted form for logs only.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::{EncodeJob, MediaMetadata, OperationKind};

/// Arguments shared by every encoder invocation
const COMMON_ARGS: &[&str] = &[
    "-hide_banner",
    // never wait for keyboard input
    "-nostdin",
    // overwrite in-flight files in the working directory
    "-y",
];

const FALLBACK_VIDEO_ENCODER: &str = "libx264";
const FALLBACK_PIXEL_FORMAT: &str = "yuv420p";
const FALLBACK_FRAME_RATE: &str = "30";

/// Variation points of the encode pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Encoder executable
    pub ffmpeg_path: String,
    /// Cap applied to normalized intros/outros; `None` keeps their full length
    pub intro_outro_max_duration_seconds: Option<f64>,
    /// Length of a clip generated from a still image
    pub still_image_duration_seconds: f64,
    /// Sample rate for synthesized silence when nothing else dictates one
    pub default_sample_rate: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            intro_outro_max_duration_seconds: None,
            still_image_duration_seconds: 3.0,
            default_sample_rate: 48_000,
        }
    }
}

/// A fully specified encoder invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: COMMON_ARGS.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn path(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    /// Copy-pasteable form for logs and error messages
    pub fn render(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|token| shell_quote(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn shell_quote(token: &str) -> String {
    let plain = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c));
    if plain {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', "'\\''"))
    }
}

/// Ordered list of segments for the encoder's concat demuxer
pub struct ConcatManifest;

impl ConcatManifest {
    /// One `file '<path>'` line per segment, in the given order
    pub fn render(segments: &[PathBuf]) -> String {
        segments
            .iter()
            .map(|segment| {
                format!(
                    "file '{}'\n",
                    segment.to_string_lossy().replace('\'', "'\\''")
                )
            })
            .collect()
    }
}

/// Which way a side clip gets its audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeBranch {
    /// Looped still image with synthesized silence
    StillImage,
    /// Moving video with synthesized silence
    SilentVideo,
    /// Existing audio re-encoded to AAC
    WithAudio,
}

impl NormalizeBranch {
    pub fn select(source: &MediaMetadata) -> Self {
        if source.has_audio() {
            NormalizeBranch::WithAudio
        } else if source.is_still_image() {
            NormalizeBranch::StillImage
        } else {
            NormalizeBranch::SilentVideo
        }
    }
}

/// Encoder library for a probed codec name
pub fn encoder_for_codec(codec: &str) -> &str {
    match codec {
        "" => FALLBACK_VIDEO_ENCODER,
        "h264" => "libx264",
        "hevc" => "libx265",
        "vp8" => "libvpx",
        "vp9" => "libvpx-vp9",
        "av1" => "libaom-av1",
        "prores" => "prores_ks",
        other => other,
    }
}

/// Turns encode jobs into encoder command lines
pub struct CommandBuilder {
    settings: EncoderSettings,
}

impl CommandBuilder {
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    /// Build the invocations for a job, in execution order
    pub fn build(&self, job: &EncodeJob) -> Result<Vec<CommandLine>, DomainError> {
        match &job.operation {
            OperationKind::PlainTrim => Ok(vec![self.plain_trim(job)?]),
            OperationKind::NormalizeToTarget { source } => {
                Ok(vec![self.normalize(job, source)])
            }
            OperationKind::Concat { manifest } => Ok(vec![self.concat(manifest, &job.output)]),
            OperationKind::WatermarkOverlay { watermark, scaled } => {
                self.watermark(job, watermark, scaled)
            }
        }
    }

    /// How long a normalized side clip will run
    pub fn normalized_duration(&self, source: &MediaMetadata) -> f64 {
        match NormalizeBranch::select(source) {
            NormalizeBranch::StillImage => self.settings.still_image_duration_seconds,
            _ => match self.settings.intro_outro_max_duration_seconds {
                Some(cap) if source.duration_seconds > 0.0 => cap.min(source.duration_seconds),
                Some(cap) => cap,
                None => source.duration_seconds,
            },
        }
    }

    /// Key over every input that shapes a normalized side clip
    pub fn normalize_fingerprint(&self, side_source: &Path, target: &MediaMetadata) -> u64 {
        let mut hasher = DefaultHasher::new();
        side_source.hash(&mut hasher);
        target.width.hash(&mut hasher);
        target.height.hash(&mut hasher);
        encoder_for_codec(&target.video_codec).hash(&mut hasher);
        non_empty_or(&target.pixel_format, FALLBACK_PIXEL_FORMAT).hash(&mut hasher);
        non_empty_or(&target.frame_rate, FALLBACK_FRAME_RATE).hash(&mut hasher);
        target.sample_rate.hash(&mut hasher);
        self.settings.default_sample_rate.hash(&mut hasher);
        self.settings
            .intro_outro_max_duration_seconds
            .map(f64::to_bits)
            .hash(&mut hasher);
        self.settings.still_image_duration_seconds.to_bits().hash(&mut hasher);
        hasher.finish()
    }

    fn plain_trim(&self, job: &EncodeJob) -> Result<CommandLine, DomainError> {
        let trim = job.trim.as_ref().ok_or_else(|| {
            DomainError::Config(format!("trim job for {} has no range", job.input.display()))
        })?;

        Ok(CommandLine::new(&self.settings.ffmpeg_path)
            .arg("-i")
            .path(&job.input)
            // absolute bounds, neither depends on the other
            .args(["-ss", trim.start.as_str(), "-to", trim.end.as_str()])
            .args(["-c", "copy"])
            .path(&job.output))
    }

    fn normalize(&self, job: &EncodeJob, source: &MediaMetadata) -> CommandLine {
        let target = &job.metadata;
        let frame_rate = non_empty_or(&target.frame_rate, FALLBACK_FRAME_RATE);
        let sample_rate = self.target_sample_rate(target, source);
        let silence = format!("anullsrc=channel_layout=stereo:sample_rate={}", sample_rate);

        let cmd = CommandLine::new(&self.settings.ffmpeg_path);
        let cmd = match NormalizeBranch::select(source) {
            NormalizeBranch::StillImage => cmd
                .args(["-loop", "1", "-framerate", frame_rate.as_str(), "-i"])
                .path(&job.input)
                .args(["-f", "lavfi", "-i", silence.as_str()])
                .args(["-map", "0:v:0", "-map", "1:a:0"])
                .arg("-t")
                .arg(seconds_arg(self.settings.still_image_duration_seconds)),
            NormalizeBranch::SilentVideo => {
                let cmd = cmd
                    .arg("-i")
                    .path(&job.input)
                    .args(["-f", "lavfi", "-i", silence.as_str()])
                    .args(["-map", "0:v:0", "-map", "1:a:0"]);
                match self.normalized_duration(source) {
                    d if d > 0.0 => cmd.arg("-t").arg(seconds_arg(d)),
                    _ => cmd,
                }
            }
            NormalizeBranch::WithAudio => {
                let cmd = cmd
                    .arg("-i")
                    .path(&job.input)
                    .args(["-map", "0:v:0", "-map", "0:a:0"]);
                match self.settings.intro_outro_max_duration_seconds {
                    Some(cap) => cmd.arg("-t").arg(seconds_arg(cap)),
                    None => cmd,
                }
            }
        };

        cmd.arg("-vf")
            .arg(video_filter(target))
            .args(["-r", frame_rate.as_str()])
            .args(["-c:v", encoder_for_codec(&target.video_codec)])
            .args(["-c:a", "aac", "-ar", sample_rate.as_str()])
            // synthesized silence is endless
            .arg("-shortest")
            .path(&job.output)
    }

    fn concat(&self, manifest: &Path, output: &Path) -> CommandLine {
        CommandLine::new(&self.settings.ffmpeg_path)
            .args(["-f", "concat", "-safe", "0", "-i"])
            .path(manifest)
            .args(["-c", "copy"])
            .path(output)
    }

    fn watermark(
        &self,
        job: &EncodeJob,
        watermark: &Path,
        scaled: &Path,
    ) -> Result<Vec<CommandLine>, DomainError> {
        let (width, height) = job
            .metadata
            .dimensions(&job.input.to_string_lossy())?;
        let target = &job.metadata;

        let rescale = CommandLine::new(&self.settings.ffmpeg_path)
            .arg("-i")
            .path(watermark)
            .arg("-vf")
            .arg(format!("scale={}:{}", width, height))
            .path(scaled);

        let overlay = CommandLine::new(&self.settings.ffmpeg_path)
            .arg("-i")
            .path(&job.input)
            .arg("-i")
            .path(scaled)
            .args(["-filter_complex", "[0:v][1:v]overlay=0:0"])
            .args(["-c:v", encoder_for_codec(&target.video_codec)])
            .args([
                "-pix_fmt",
                non_empty_or(&target.pixel_format, FALLBACK_PIXEL_FORMAT).as_str(),
            ])
            .args(["-c:a", "copy"])
            .path(&job.output);

        Ok(vec![rescale, overlay])
    }

    fn target_sample_rate(&self, target: &MediaMetadata, source: &MediaMetadata) -> String {
        [&target.sample_rate, &source.sample_rate]
            .into_iter()
            .find(|rate| !rate.is_empty())
            .cloned()
            .unwrap_or_else(|| self.settings.default_sample_rate.to_string())
    }
}

/// Scale and pad into the target frame, then convert the pixel format
fn video_filter(target: &MediaMetadata) -> String {
    let pixel_format = non_empty_or(&target.pixel_format, FALLBACK_PIXEL_FORMAT);
    match (target.width, target.height) {
        (Some(w), Some(h)) => format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,format={pf}",
            w = w,
            h = h,
            pf = pixel_format
        ),
        _ => format!("format={}", pixel_format),
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Seconds without trailing zeros, millisecond precision
fn seconds_arg(seconds: f64) -> String {
    format!("{}", (seconds * 1000.0).round() / 1000.0)
}
