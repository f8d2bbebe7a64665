use crate::error::{RendezvousError, Result};
use std::time::Duration;

/// Parse a duration string like "50ms", "30s", "5m", "2h", "7d"
/// Defaults to seconds if no unit specified
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    if s.is_empty() {
        return Err(RendezvousError::InvalidDuration {
            input: s.to_string(),
            message: "empty string".to_string(),
        });
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else if let Some(stripped) = s.strip_suffix('d') {
        (stripped, "d")
    } else {
        // No unit, assume seconds
        (s, "s")
    };

    let value: u64 = num_str.parse().map_err(|_| RendezvousError::InvalidDuration {
        input: s.to_string(),
        message: "expected format: NUMBER[ms|s|m|h|d] (e.g., '500ms', '30s', '5m')".to_string(),
    })?;

    let duration = match unit {
        "ms" => Some(Duration::from_millis(value)),
        "s" => Some(Duration::from_secs(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs),
        "h" => value.checked_mul(60 * 60).map(Duration::from_secs),
        _ => value.checked_mul(60 * 60 * 24).map(Duration::from_secs),
    };

    duration.ok_or_else(|| RendezvousError::InvalidDuration {
        input: s.to_string(),
        message: "duration is too large".to_string(),
    })
}
