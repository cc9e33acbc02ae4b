//! Timestamp helpers.
//!
//! Event start times are persisted as Unix milliseconds so that range queries
//! in the reminder sweep compare integers instead of formatted strings.

use chrono::{DateTime, TimeZone, Utc};

/// Convert a UTC timestamp to Unix milliseconds.
pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Convert Unix milliseconds back to a UTC timestamp.
///
/// Values outside chrono's representable range clamp to the Unix epoch.
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_roundtrip_keeps_subsecond_precision() {
        let ts = DateTime::parse_from_rfc3339("2025-01-01T10:00:00.250Z")
            .unwrap()
            .with_timezone(&Utc);
        let ms = to_millis(ts);
        assert_eq!(ms, 1_735_725_600_250);
        assert_eq!(from_millis(ms), ts);
    }

    #[test]
    fn out_of_range_millis_fall_back_to_epoch() {
        assert_eq!(from_millis(i64::MAX), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn now_millis_is_reasonable() {
        // After 2024-01-01
        assert!(now_millis() > 1_704_067_200_000);
    }
}
