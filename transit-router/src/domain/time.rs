//! Time-of-day handling.
//!
//! Schedule times are seconds after midnight of the service day, stored as
//! `f64`. Transit schedules routinely run past midnight, so hours above 23
//! are valid (`25:10:00` is ten past one on the following morning).

use std::fmt::Write as _;

use chrono::Duration;
use serde::{Deserialize, Deserializer};

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Parse `HH:MM` or `HH:MM:SS` into seconds after midnight.
///
/// # Examples
///
/// ```
/// use transit_router::domain::parse_time;
///
/// assert_eq!(parse_time("08:00").unwrap(), 28800.0);
/// assert_eq!(parse_time("08:04:00").unwrap(), 29040.0);
/// assert_eq!(parse_time("25:10:00").unwrap(), 90600.0);
///
/// assert!(parse_time("8h").is_err());
/// assert!(parse_time("08:60").is_err());
/// ```
pub fn parse_time(s: &str) -> Result<f64, TimeError> {
    let mut parts = s.split(':');

    let hours = parts
        .next()
        .ok_or_else(|| TimeError::new("expected HH:MM[:SS] format"))?;
    let minutes = parts
        .next()
        .ok_or_else(|| TimeError::new("expected HH:MM[:SS] format"))?;
    let seconds = parts.next();
    if parts.next().is_some() {
        return Err(TimeError::new("too many components"));
    }

    let hours = parse_digits(hours).ok_or_else(|| TimeError::new("invalid hour digits"))?;
    let minutes =
        parse_two_digits(minutes).ok_or_else(|| TimeError::new("invalid minute digits"))?;
    if minutes > 59 {
        return Err(TimeError::new("minute must be 0-59"));
    }

    let seconds = match seconds {
        Some(s) => {
            let secs = parse_two_digits(s).ok_or_else(|| TimeError::new("invalid second digits"))?;
            if secs > 59 {
                return Err(TimeError::new("second must be 0-59"));
            }
            secs
        }
        None => 0,
    };

    Ok(f64::from(hours * 3600 + minutes * 60 + seconds))
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 3 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_two_digits(s: &str) -> Option<u32> {
    if s.len() != 2 {
        return None;
    }
    parse_digits(s)
}

/// Format seconds after midnight as `HH:MM:SS`, rounding to whole seconds.
///
/// Negative or non-finite values are rendered as `--:--:--`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "--:--:--".to_string();
    }
    let total = seconds.round() as u64;
    let mut out = String::with_capacity(8);
    // Writing to a String cannot fail.
    let _ = write!(
        out,
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    );
    out
}

/// Convert a duration in (possibly fractional) seconds to a `chrono::Duration`.
pub fn to_duration(seconds: f64) -> Duration {
    Duration::milliseconds((seconds * 1000.0).round() as i64)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimeValue {
    Seconds(f64),
    Text(String),
}

/// Serde helper accepting either seconds after midnight or an `HH:MM[:SS]` string.
pub fn deserialize_time<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match TimeValue::deserialize(deserializer)? {
        TimeValue::Seconds(secs) => Ok(secs),
        TimeValue::Text(text) => parse_time(&text).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_times() {
        assert_eq!(parse_time("00:00").unwrap(), 0.0);
        assert_eq!(parse_time("00:00:01").unwrap(), 1.0);
        assert_eq!(parse_time("23:59:59").unwrap(), 86399.0);
        assert_eq!(parse_time("8:00").unwrap(), 28800.0);
        assert_eq!(parse_time("100:00").unwrap(), 360000.0);
    }

    #[test]
    fn parse_invalid_times() {
        assert!(parse_time("").is_err());
        assert!(parse_time("08").is_err());
        assert!(parse_time("08:0").is_err());
        assert!(parse_time("08:00:0").is_err());
        assert!(parse_time("08:00:60").is_err());
        assert!(parse_time("08:00:00:00").is_err());
        assert!(parse_time("ab:cd").is_err());
        assert!(parse_time("-1:00").is_err());
        assert!(parse_time("1000:00").is_err());
    }

    #[test]
    fn error_display() {
        let err = parse_time("08:99").unwrap_err();
        assert_eq!(err.to_string(), "invalid time: minute must be 0-59");
    }

    #[test]
    fn format_round_trips_whole_seconds() {
        assert_eq!(format_time(0.0), "00:00:00");
        assert_eq!(format_time(29040.0), "08:04:00");
        assert_eq!(format_time(90600.0), "25:10:00");
        assert_eq!(format_time(59.6), "00:01:00");
        assert_eq!(format_time(-1.0), "--:--:--");
        assert_eq!(format_time(f64::NAN), "--:--:--");
    }

    #[test]
    fn duration_conversion() {
        assert_eq!(to_duration(120.0), Duration::minutes(2));
        assert_eq!(to_duration(0.5), Duration::milliseconds(500));
    }

    #[test]
    fn deserialize_numbers_and_strings() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(deserialize_with = "deserialize_time")]
            t: f64,
        }

        let w: Wrapper = serde_json::from_str(r#"{"t": 28800}"#).unwrap();
        assert_eq!(w.t, 28800.0);

        let w: Wrapper = serde_json::from_str(r#"{"t": "08:04:00"}"#).unwrap();
        assert_eq!(w.t, 29040.0);

        assert!(serde_json::from_str::<Wrapper>(r#"{"t": "8 o'clock"}"#).is_err());
    }
}
