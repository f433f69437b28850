//! Filesystem naming helpers

use chrono::Local;

/// Converts free text into a safe, unique filename stem.
///
/// Replaces characters that are invalid on common filesystems with `_`,
/// truncates to 100 characters, and suffixes a local timestamp so repeated
/// synthesis of the same text never collides.
pub fn sanitize_filename(text: &str) -> String {
    const INVALID: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    let safe: String = text
        .chars()
        .map(|c| if INVALID.contains(&c) { '_' } else { c })
        .take(100)
        .collect();

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}", safe, timestamp)
}
