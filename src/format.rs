//! Formatting helpers for event properties.

use chrono::Duration;

/// Format a duration as a compact locale-free string, e.g. "1h2m3s".
///
/// Leading zero units are dropped ("2m3s", "45s"); negative durations clamp
/// to "0s".
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.num_seconds().max(0);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(0)), "0s");
        assert_eq!(format_duration(Duration::seconds(45)), "45s");
        assert_eq!(format_duration(Duration::seconds(123)), "2m3s");
        assert_eq!(format_duration(Duration::seconds(3723)), "1h2m3s");
        assert_eq!(format_duration(Duration::seconds(3600)), "1h0m0s");
    }

    #[test]
    fn test_negative_duration_clamps() {
        assert_eq!(format_duration(Duration::seconds(-5)), "0s");
    }
}
