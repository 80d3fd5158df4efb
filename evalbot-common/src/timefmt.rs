//! Human-readable time formatting for chat replies

use chrono::{DateTime, Local};

/// Format a number of seconds as a compact uptime string.
///
/// Output only grows as large as the time: `30s`, `1m:1s`, `1h:1m:1s`,
/// `1d:1h:1m:1s`.
pub fn format_secs(total: u64) -> String {
    if total < 60 {
        return format!("{}s", total);
    }
    let minutes = total / 60;
    let seconds = total % 60;
    if minutes < 60 {
        return format!("{}m:{}s", minutes, seconds);
    }
    let hours = minutes / 60;
    let minutes = minutes % 60;
    if hours < 24 {
        return format!("{}h:{}m:{}s", hours, minutes, seconds);
    }
    let days = hours / 24;
    let hours = hours % 24;
    format!("{}d:{}h:{}m:{}s", days, hours, minutes, seconds)
}

/// Format a local timestamp for the `time` command.
pub fn human_time(when: DateTime<Local>) -> String {
    when.format("%A, %B %e %Y %l:%M:%S%P").to_string()
}
