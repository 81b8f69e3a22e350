//! Utility functions for text handling and error correlation.

use crate::config::ERROR_ID_LEN;
use uuid::Uuid;

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use stream_link_bot::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Short random token that ties a user-visible failure to its log entry.
///
/// # Examples
///
/// ```
/// use stream_link_bot::utils::correlation_token;
/// let token = correlation_token();
/// assert_eq!(token.len(), 12);
/// assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
#[must_use]
pub fn correlation_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(ERROR_ID_LEN);
    token
}

/// Formats a byte count the way file sizes are shown to users.
///
/// # Examples
///
/// ```
/// use stream_link_bot::utils::format_size;
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1536), "1.50 KiB");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.2} {unit}")
}
