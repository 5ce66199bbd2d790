//! Path helpers for operator-supplied and generated file names

use std::path::Path;

/// Fallback container when a source carries no extension
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Clean up a path typed or dragged into a terminal.
///
/// Terminals escape spaces as `\ ` and some wrap the whole path in quotes.
pub fn clean_dropped_path(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = ['\'', '"']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(trimmed);

    let mut cleaned = String::with_capacity(unquoted.len());
    let mut chars = unquoted.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if matches!(next, ' ' | '\'' | '"' | '(' | ')' | '&' | '\\') {
                    cleaned.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        cleaned.push(c);
    }

    cleaned
}

/// File stem with whitespace replaced by underscores
pub fn sanitized_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());

    stem.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Lower-cased extension, or the default container
pub fn extension_or_default(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}
