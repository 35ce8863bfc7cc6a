//! Timestamp and duration utilities
//!
//! The command surface expresses every time value in milliseconds, as
//! floating point numbers coming from the host. These helpers convert them
//! to `Duration` without panicking on hostile input.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Convert fractional milliseconds to a duration
///
/// Negative, NaN and infinite values map to `Duration::ZERO`; values too
/// large to represent saturate at `Duration::MAX`.
pub fn millis_f64_to_duration(millis: f64) -> Duration {
    secs_f64_to_duration(millis / 1000.0)
}

/// Convert fractional seconds to a duration
///
/// Same clamping rules as [`millis_f64_to_duration`].
pub fn secs_f64_to_duration(secs: f64) -> Duration {
    if !(secs.is_finite() && secs > 0.0) {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Convert a duration to fractional milliseconds
pub fn duration_to_millis_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // After 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_millis_to_duration() {
        assert_eq!(millis_to_duration(0), Duration::ZERO);
        assert_eq!(millis_to_duration(1000), Duration::from_secs(1));
    }

    #[test]
    fn test_millis_f64_to_duration_positive() {
        assert_eq!(millis_f64_to_duration(100.0), Duration::from_millis(100));
        assert_eq!(millis_f64_to_duration(0.5), Duration::from_micros(500));
    }

    #[test]
    fn test_millis_f64_to_duration_rejects_garbage() {
        assert_eq!(millis_f64_to_duration(-50.0), Duration::ZERO);
        assert_eq!(millis_f64_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(millis_f64_to_duration(f64::INFINITY), Duration::ZERO);
    }

    #[test]
    fn test_secs_f64_to_duration() {
        assert_eq!(secs_f64_to_duration(0.1), Duration::from_millis(100));
        assert_eq!(secs_f64_to_duration(-1.0), Duration::ZERO);
    }

    #[test]
    fn test_huge_values_saturate() {
        assert_eq!(secs_f64_to_duration(1e30), Duration::MAX);
        assert_eq!(secs_f64_to_duration(f64::MAX), Duration::MAX);
        assert_eq!(millis_f64_to_duration(1e300), Duration::MAX);
    }

    #[test]
    fn test_duration_to_millis_f64() {
        let ms = duration_to_millis_f64(Duration::from_millis(150));
        assert!((ms - 150.0).abs() < 1e-9);
    }
}
