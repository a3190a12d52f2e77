//! Interval strings such as `30m` or `500ms`.

use crate::error::{PcpError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

static INTERVAL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)\s*(ms|s|m|h|d|w|y)$").expect("Invalid interval regex")
});

/// Milliseconds per unit.
fn unit_ms(unit: &str) -> Option<f64> {
    let ms = match unit {
        "ms" => 1.0,
        "s" => 1_000.0,
        "m" => 60_000.0,
        "h" => 3_600_000.0,
        "d" => 86_400_000.0,
        "w" => 604_800_000.0,
        "y" => 31_536_000_000.0,
        _ => return None,
    };
    Some(ms)
}

/// Parse an interval string (`<number><unit>`) into milliseconds.
pub fn interval_to_ms(interval: &str) -> Result<u64> {
    let trimmed = interval.trim();
    let invalid = |reason: &str| PcpError::InvalidInterval {
        interval: interval.to_string(),
        reason: reason.to_string(),
    };

    let caps = INTERVAL_REGEX
        .captures(trimmed)
        .ok_or_else(|| invalid("expected <number><unit>, unit one of ms, s, m, h, d, w, y"))?;

    let amount: f64 = caps[1].parse().map_err(|_| invalid("number out of range"))?;
    let unit = unit_ms(&caps[2]).ok_or_else(|| invalid("unknown unit"))?;

    Ok((amount * unit).round() as u64)
}

/// Parse an interval string into a `Duration`.
pub fn parse_interval(interval: &str) -> Result<Duration> {
    interval_to_ms(interval).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_units() {
        assert_eq!(interval_to_ms("250ms").unwrap(), 250);
        assert_eq!(interval_to_ms("1s").unwrap(), 1_000);
        assert_eq!(interval_to_ms("30m").unwrap(), 1_800_000);
        assert_eq!(interval_to_ms("2h").unwrap(), 7_200_000);
        assert_eq!(interval_to_ms("1d").unwrap(), 86_400_000);
        assert_eq!(interval_to_ms("1w").unwrap(), 604_800_000);
        assert_eq!(interval_to_ms(" 1.5s ").unwrap(), 1_500);
    }

    #[test]
    fn test_interval_rejects_garbage() {
        for bad in ["", "10", "s", "10 minutes", "-5s", "5x"] {
            let err = interval_to_ms(bad).unwrap_err();
            assert!(matches!(err, PcpError::InvalidInterval { .. }), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_parse_interval_duration() {
        assert_eq!(parse_interval("10s").unwrap(), Duration::from_secs(10));
    }
}
