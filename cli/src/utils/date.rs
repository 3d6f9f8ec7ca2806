use chrono::NaiveDate;

use crate::error::{AnalystError, Result};

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
        AnalystError::InvalidInput(format!("'{}' is not a YYYY-MM-DD date: {}", date_str, e))
    })
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Seconds since the Unix epoch at 00:00 UTC of `date`.
pub fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Calendar date (UTC) of a Unix timestamp.
pub fn date_from_unix(timestamp: i64) -> Option<NaiveDate> {
    chrono::DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

/// Format duration for logging
pub fn format_duration(duration_ms: f64) -> String {
    if duration_ms < 1000.0 {
        format!("{:.1}ms", duration_ms)
    } else if duration_ms < 60000.0 {
        format!("{:.1}s", duration_ms / 1000.0)
    } else {
        let minutes = (duration_ms / 60000.0).floor();
        let seconds = (duration_ms % 60000.0) / 1000.0;
        format!("{}m{:.1}s", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format_date() {
        let date = parse_date(" 2024-04-03 ").unwrap();
        assert_eq!(format_date(date), "2024-04-03");
        assert!(matches!(parse_date("04/03/2024"), Err(AnalystError::InvalidInput(_))));
    }

    #[test]
    fn test_unix_round_trip() {
        let date = NaiveDate::from_ymd_opt(2023, 2, 1).unwrap();
        assert_eq!(unix_midnight(date), 1_675_209_600);
        assert_eq!(date_from_unix(1_675_209_600 + 14 * 3600), Some(date));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(12.34), "12.3ms");
        assert_eq!(format_duration(1500.0), "1.5s");
        assert_eq!(format_duration(61_000.0), "1m1.0s");
    }
}
