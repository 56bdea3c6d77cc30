//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a number of seconds into a whole number of ticks at the given rate, rounding up so
/// that a non-zero duration always takes at least one tick.
pub fn seconds_to_ticks(seconds: f64, tick_rate_hz: f64) -> u64 {
    let ticks = (seconds * tick_rate_hz).ceil();

    if ticks.is_finite() && ticks > 0.0 {
        ticks as u64
    } else {
        0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seconds_to_ticks() {
        assert_eq!(seconds_to_ticks(0.0, 60.0), 0);
        assert_eq!(seconds_to_ticks(0.1, 60.0), 6);
        assert_eq!(seconds_to_ticks(0.101, 60.0), 7);
        assert_eq!(seconds_to_ticks(-1.0, 60.0), 0);
        assert_eq!(seconds_to_ticks(std::f64::NAN, 60.0), 0);
    }

    #[test]
    fn test_duration_to_seconds() {
        let d = chrono::Duration::milliseconds(1500);
        assert_eq!(duration_to_seconds(d), Some(1.5));
    }
}
