//! Time parsing and formatting utilities

use crate::domain::errors::DomainError;

/// Format seconds as `HH:MM:SS`, truncating any fractional part.
///
/// Hours are not wrapped at 24 so long recordings keep a usable bound.
pub fn format_hms(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Parse `HH:MM:SS` or `HH:MM:SS.fff` into seconds
pub fn parse_hms(time_str: &str) -> Result<f64, DomainError> {
    let trimmed = time_str.trim();
    let invalid = || DomainError::InvalidTimestamp(trimmed.to_string());

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() != 3 {
        return Err(invalid());
    }

    if !parts[..2]
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(invalid());
    }

    let hours: u64 = parts[0].parse().map_err(|_| invalid())?;
    let minutes: u64 = parts[1].parse().map_err(|_| invalid())?;
    let seconds = parse_seconds_field(parts[2]).ok_or_else(invalid)?;

    if minutes >= 60 || seconds >= 60.0 {
        return Err(invalid());
    }

    Ok(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

/// Seconds field: digits with an optional `.digits` fraction
fn parse_seconds_field(field: &str) -> Option<f64> {
    let (whole, fraction) = match field.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (field, None),
    };

    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    field.parse().ok()
}
