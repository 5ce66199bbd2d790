//! Probe report parsing
//!
//! Turns the JSON printed by `ffprobe -show_format -show_streams` into a
//! [`MediaMetadata`]. Running the tool itself lives in the probe adapter.

use serde::Deserialize;

use crate::domain::errors::DomainError;
use crate::domain::model::MediaMetadata;

/// Arguments requesting a quiet JSON report with format and stream sections
pub const PROBE_ARGS: &[&str] = &[
    "-v",
    "quiet",
    "-print_format",
    "json",
    "-show_format",
    "-show_streams",
];

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    pix_fmt: Option<String>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

/// Parse a probe report for `path`
pub fn parse_probe_report(path: &str, report: &[u8]) -> Result<MediaMetadata, DomainError> {
    let report: ProbeReport = serde_json::from_slice(report).map_err(|e| DomainError::Probe {
        path: path.to_string(),
        message: format!("malformed report: {}", e),
    })?;

    let mut metadata = MediaMetadata::default();

    let video = report
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    if let Some(video) = video {
        metadata.width = video.width;
        metadata.height = video.height;
        metadata.video_codec = video.codec_name.clone().unwrap_or_default();
        metadata.pixel_format = video.pix_fmt.clone().unwrap_or_default();
        metadata.frame_rate = video.r_frame_rate.clone().unwrap_or_default();
    }

    // no audio stream is normal for stills and screen captures
    let audio = report
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));
    if let Some(audio) = audio {
        metadata.audio_codec = audio.codec_name.clone().unwrap_or_default();
        metadata.sample_rate = audio.sample_rate.clone().unwrap_or_default();
    }

    if let Some(format) = report.format {
        metadata.container_format = format.format_name.unwrap_or_default();
        metadata.duration_seconds = format
            .duration
            .as_deref()
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(0.0);
    }

    Ok(metadata)
}
