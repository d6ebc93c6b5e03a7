//! Timestamp helpers shared by run events and the event mirror.

use chrono::{DateTime, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Formats a timestamp as ISO 8601 with microsecond precision.
///
/// # Examples
///
/// ```
/// use reelflow::utils::{format_iso8601, now_utc};
///
/// let ts = format_iso8601(&now_utc());
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn format_iso8601(dt: &Timestamp) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Returns the current UTC time as an ISO 8601 formatted string.
#[must_use]
pub fn iso_timestamp() -> String {
    format_iso8601(&now_utc())
}

/// Formats a timestamp the way spreadsheet rows expect it: `YYYY-MM-DD HH:MM:SS`.
#[must_use]
pub fn format_row_timestamp(dt: &Timestamp) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.ends_with("+00:00"));
    }

    #[test]
    fn test_format_iso8601_fixed() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 20, 10, 0, 0).unwrap();
        assert_eq!(format_iso8601(&dt), "2024-03-20T10:00:00.000000+00:00");
    }

    #[test]
    fn test_format_row_timestamp() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 20, 10, 0, 0).unwrap();
        assert_eq!(format_row_timestamp(&dt), "2024-03-20 10:00:00");
    }
}
