//! Parsing of user-supplied dates and listing windows.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::{NocalError, NocalResult};
use crate::occurrence::Window;

impl Window {
    /// Build a listing window from optional `YYYY-MM-DD` bounds.
    /// - `from`: start of that day, defaults to now - `days`
    /// - `to`: end of that day, defaults to now + `days`
    pub fn from_args(from: Option<&str>, to: Option<&str>, days: i64) -> NocalResult<Self> {
        let around = Window::around_now(days)?;

        let from = match from {
            Some(s) => parse_date_start(s)?.timestamp(),
            None => around.from,
        };
        let to = match to {
            Some(s) => parse_date_end(s)?.timestamp(),
            None => around.to,
        };

        Window::new(from, to)
    }
}

fn invalid_date(s: &str) -> NocalError {
    NocalError::Invalid(format!("Invalid date format '{s}'. Expected YYYY-MM-DD"))
}

/// Parse YYYY-MM-DD as start of day in UTC
fn parse_date_start(s: &str) -> NocalResult<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid_date(s))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

/// Parse YYYY-MM-DD as end of day in UTC
fn parse_date_end(s: &str) -> NocalResult<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid_date(s))?;
    let end = NaiveTime::from_hms_opt(23, 59, 59).ok_or_else(|| invalid_date(s))?;
    Ok(date.and_time(end).and_utc())
}

/// Parse a point in time into epoch seconds.
///
/// Accepts epoch seconds, RFC 3339, `YYYY-MM-DDTHH:MM`, `YYYY-MM-DD HH:MM`
/// and bare `YYYY-MM-DD`. Times without an offset are UTC.
pub fn parse_timestamp(s: &str) -> NocalResult<i64> {
    let s = s.trim();

    if let Ok(seconds) = s.parse::<i64>() {
        return Ok(seconds);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp());
    }
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt.and_utc().timestamp());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc().timestamp());
    }

    Err(NocalError::Invalid(format!(
        "Invalid time '{s}'. Expected epoch seconds, RFC 3339 or YYYY-MM-DDTHH:MM"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DAY_SECONDS;

    #[test]
    fn test_window_from_dates_is_whole_days() {
        let window = Window::from_args(Some("2024-03-01"), Some("2024-03-02"), 10).unwrap();
        assert_eq!(window.from, 1_709_251_200);
        assert_eq!(window.to, 1_709_251_200 + 2 * DAY_SECONDS - 1);
    }

    #[test]
    fn test_window_defaults_around_now() {
        let window = Window::from_args(None, None, 3).unwrap();
        assert_eq!(window.to - window.from, 6 * DAY_SECONDS);
    }

    #[test]
    fn test_window_rejects_bad_input() {
        assert!(matches!(
            Window::from_args(Some("03/01/2024"), None, 10),
            Err(NocalError::Invalid(_))
        ));
        assert!(matches!(
            Window::from_args(Some("2024-03-05"), Some("2024-03-01"), 10),
            Err(NocalError::Invalid(_))
        ));
        assert!(matches!(
            Window::from_args(None, Some("2024-03-01"), i64::MAX),
            Err(NocalError::Invalid(_))
        ));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = 1_709_294_400; // 2024-03-01 12:00 UTC
        assert_eq!(parse_timestamp("1709294400").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01T12:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01T13:00:00+01:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01T12:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01 12:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01").unwrap(), expected - 12 * 3600);
        assert!(parse_timestamp("tomorrow").is_err());
    }
}
