//! Duration formatting

use std::time::Duration;

/// Formats a duration as a short human-readable string, e.g. "2m 30s".
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, rest) = (total / 3600, total % 3600);
    let (minutes, seconds) = (rest / 60, rest % 60);

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
