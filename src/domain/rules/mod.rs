// Domain rules - Naming and housekeeping policies

use std::path::Path;

use crate::domain::model::{MediaMetadata, SideClip};
use crate::utils::path::{extension_or_default, sanitized_stem};

/// Concat manifest written into the working directory
pub const MANIFEST_NAME: &str = "listfile.txt";

/// Watermark image rescaled to the primary resolution
pub const SCALED_WATERMARK_NAME: &str = "watermark_scaled.png";

/// Lock file guarding an output root
pub const LOCK_FILE_NAME: &str = ".chopper.lock";

/// Rules that decide the names of everything a run writes
pub struct NamingRules;

impl NamingRules {
    /// Final output name: sanitized stem, optional suffix, source extension
    pub fn output_file_name(source: &Path, suffix: Option<&str>) -> String {
        let suffix = suffix.map(str::trim).unwrap_or("");
        format!(
            "{}{}.{}",
            sanitized_stem(source),
            suffix.split_whitespace().collect::<Vec<_>>().join("_"),
            extension_or_default(source)
        )
    }

    /// Watermarked sibling of an output name
    pub fn watermarked_file_name(output_name: &str) -> String {
        let path = Path::new(output_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| output_name.to_string());
        format!("{}_watermarked.{}", stem, extension_or_default(path))
    }

    /// Temporary trimmed segment that gets concatenated
    pub fn segment_file_name(source: &Path) -> String {
        format!(
            "{}_segment.{}",
            sanitized_stem(source),
            extension_or_default(source)
        )
    }

    /// Cached normalized intro/outro.
    ///
    /// `fingerprint` covers the side clip's full path and every normalization
    /// parameter; stem and resolution stay in the name for readability. The
    /// extension follows the primary clip so concat can stream-copy.
    pub fn side_clip_file_name(
        kind: SideClip,
        side_source: &Path,
        primary_source: &Path,
        target: &MediaMetadata,
        fingerprint: u64,
    ) -> String {
        let size = match (target.width, target.height) {
            (Some(w), Some(h)) => format!("_{}x{}", w, h),
            _ => String::new(),
        };
        format!(
            "{}_{}{}_{:012x}.{}",
            kind.label(),
            sanitized_stem(side_source),
            size,
            fingerprint & 0xffff_ffff_ffff,
            extension_or_default(primary_source)
        )
    }

    /// Name an encode is written under until it completes
    pub fn in_flight_file_name(name: &str) -> String {
        let path = Path::new(name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| name.to_string());
        format!("{}.part.{}", stem, extension_or_default(path))
    }

    /// `talk.mp4` becomes `talk_2.mp4` for `n == 2`
    pub fn numbered_file_name(name: &str, n: usize) -> String {
        let path = Path::new(name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| name.to_string());
        format!("{}_{}.{}", stem, n, extension_or_default(path))
    }

    /// Leftovers from an interrupted session that must not leak into this one.
    ///
    /// Fixed-name `intro.*`/`outro.*` files and unfinished `.part` encodes are
    /// stale; completed side-clip caches are kept so they are never re-encoded.
    pub fn is_stale_artifact(file_name: &str) -> bool {
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        file_name == MANIFEST_NAME
            || file_name == SCALED_WATERMARK_NAME
            || stem == "intro"
            || stem == "outro"
            || stem.ends_with("_segment")
            || stem.ends_with(".part")
    }
}
