//! Utility functions and helpers

pub mod path;
pub mod time;

pub use path::{clean_dropped_path, extension_or_default, sanitized_stem};
pub use time::{format_hms, parse_hms};
