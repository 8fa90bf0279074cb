//! Parsing of the node's `TimeSpan` strings.
//!
//! The federation endpoints report periods such as `periodOfInactivity` in
//! the constant `[-][d.]hh:mm:ss[.fffffff]` layout. Negative spans are
//! clamped to zero since they can only come from clock skew between members.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::TimeSpanError;

/// Parse a `[d.]hh:mm:ss[.fffffff]` string into a [`Duration`].
pub fn parse_timespan(input: &str) -> Result<Duration, TimeSpanError> {
    let trimmed = input.trim();
    let malformed = || TimeSpanError::Malformed(trimmed.to_string());

    let (negative, s) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let first_colon = s.find(':').ok_or_else(malformed)?;
    let (days, clock) = match s[..first_colon].find('.') {
        Some(dot) => (parse_component(&s[..dot], trimmed)?, &s[dot + 1..]),
        None => (0, s),
    };

    let mut parts = clock.split(':');
    let (Some(h), Some(m), Some(rest), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };

    let (secs, frac) = rest.split_once('.').unwrap_or((rest, ""));
    let hours = parse_component(h, trimmed)?;
    let minutes = parse_component(m, trimmed)?;
    let seconds = parse_component(secs, trimmed)?;

    if minutes >= 60 || seconds >= 60 || (days > 0 && hours >= 24) {
        return Err(TimeSpanError::OutOfRange(trimmed.to_string()));
    }

    let nanos = if frac.is_empty() {
        0
    } else {
        if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let digits: u32 = frac.parse().map_err(|_| malformed())?;
        digits * 10u32.pow(9 - frac.len() as u32)
    };

    if negative {
        return Ok(Duration::ZERO);
    }

    let total_secs = days
        .checked_mul(86_400)
        .and_then(|d| d.checked_add(hours.checked_mul(3_600)?))
        .and_then(|t| t.checked_add(minutes * 60 + seconds))
        .ok_or_else(|| TimeSpanError::OutOfRange(trimmed.to_string()))?;

    Ok(Duration::new(total_secs, nanos))
}

fn parse_component(part: &str, whole: &str) -> Result<u64, TimeSpanError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeSpanError::Malformed(whole.to_string()));
    }
    part.parse()
        .map_err(|_| TimeSpanError::OutOfRange(whole.to_string()))
}

/// Serde adapter for `TimeSpan` fields.
pub fn deserialize_timespan<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timespan(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clock_only() {
        assert_eq!(
            parse_timespan("02:15:00").unwrap(),
            Duration::from_secs(2 * 3600 + 15 * 60)
        );
        assert_eq!(parse_timespan("00:45:00").unwrap(), Duration::from_secs(45 * 60));
    }

    #[test]
    fn parses_days_and_fraction() {
        assert_eq!(
            parse_timespan("1.02:00:30.5").unwrap(),
            Duration::new(86_400 + 7_200 + 30, 500_000_000)
        );
        assert_eq!(
            parse_timespan("00:00:01.0000001").unwrap(),
            Duration::new(1, 100)
        );
    }

    #[test]
    fn negative_span_clamps_to_zero() {
        assert_eq!(parse_timespan("-00:00:05").unwrap(), Duration::ZERO);
    }

    #[test]
    fn rejects_malformed() {
        assert!(matches!(parse_timespan("2h"), Err(TimeSpanError::Malformed(_))));
        assert!(matches!(parse_timespan("01:02"), Err(TimeSpanError::Malformed(_))));
        assert!(matches!(
            parse_timespan("01:02:03:04"),
            Err(TimeSpanError::Malformed(_))
        ));
        assert!(matches!(parse_timespan("aa:00:00"), Err(TimeSpanError::Malformed(_))));
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(matches!(
            parse_timespan("00:61:00"),
            Err(TimeSpanError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_timespan("1.25:00:00"),
            Err(TimeSpanError::OutOfRange(_))
        ));
    }

    #[test]
    fn deserializes_from_json() {
        #[derive(Deserialize)]
        struct Member {
            #[serde(deserialize_with = "deserialize_timespan")]
            period: Duration,
        }
        let m: Member = serde_json::from_str(r#"{"period":"00:10:00"}"#).unwrap();
        assert_eq!(m.period, Duration::from_secs(600));

        let bad = serde_json::from_str::<Member>(r#"{"period":"soon"}"#);
        assert!(bad.is_err());
    }
}
