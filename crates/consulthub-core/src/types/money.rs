//! Money and billable-time helpers.
//!
//! Amounts are expressed in the currency's minor unit and kept as `f64`
//! so fractional results of discounts and fee rates survive until the
//! final rounding step.

use chrono::{DateTime, Utc};

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Round an amount to 2 decimal places.
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Whole billable minutes between two instants, rounded up.
///
/// Returns 0 when `end` is not after `start`.
pub fn ceil_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let elapsed = (end - start).num_milliseconds();
    if elapsed <= 0 {
        return 0;
    }
    (elapsed + MILLIS_PER_MINUTE - 1) / MILLIS_PER_MINUTE
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(12.345_6), 12.35);
        assert_eq!(round_currency(0.004), 0.0);
        assert_eq!(round_currency(100.0), 100.0);
    }

    #[test]
    fn test_ceil_minutes() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(ceil_minutes(start, start + Duration::milliseconds(150_000)), 3);
        assert_eq!(ceil_minutes(start, start + Duration::seconds(60)), 1);
        assert_eq!(ceil_minutes(start, start + Duration::milliseconds(60_001)), 2);
        assert_eq!(ceil_minutes(start, start), 0);
        assert_eq!(ceil_minutes(start, start - Duration::seconds(5)), 0);
    }
}
