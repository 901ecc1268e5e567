//! ISO-8601 interval parsing
//!
//! Providers tag readings with `<timestamp>` or `<timestamp>/<duration>`
//! (for example `2020-04-10T16:00:00-00:00/P6DT22H`). Both forms map onto a
//! half-open [`TimeInterval`].

use crate::types::{TimeInterval, Timestamp, SECONDS_PER_DAY, SECONDS_PER_HOUR};
use chrono::DateTime;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntervalError {
    #[error("Malformed interval {input:?}: {reason}")]
    Malformed { input: String, reason: &'static str },
}

const DATE_UNITS: &[(char, i64)] = &[('W', 7 * SECONDS_PER_DAY), ('D', SECONDS_PER_DAY)];
const TIME_UNITS: &[(char, i64)] = &[('H', SECONDS_PER_HOUR), ('M', 60), ('S', 1)];

/// Parse an RFC 3339 timestamp into epoch seconds
pub fn parse_timestamp(input: &str) -> Result<Timestamp, IntervalError> {
    DateTime::parse_from_rfc3339(input.trim())
        .map(|dt| dt.timestamp())
        .map_err(|_| IntervalError::Malformed {
            input: input.to_string(),
            reason: "invalid timestamp",
        })
}

/// Parse an ISO-8601 duration (`P[nW][nD][T[nH][nM][nS]]`) into seconds.
///
/// Years and months are rejected: their length depends on the calendar.
pub fn parse_duration(input: &str) -> Result<i64, IntervalError> {
    let malformed = |reason: &'static str| IntervalError::Malformed {
        input: input.to_string(),
        reason,
    };

    let body = input
        .trim()
        .strip_prefix('P')
        .ok_or_else(|| malformed("duration must start with 'P'"))?;
    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                return Err(malformed("empty time section"));
            }
            (date, Some(time))
        }
        None => (body, None),
    };

    let mut total = sum_components(date_part, DATE_UNITS)
        .ok_or_else(|| malformed("invalid date section"))?;
    if let Some(time) = time_part {
        let seconds =
            sum_components(time, TIME_UNITS).ok_or_else(|| malformed("invalid time section"))?;
        total = total
            .checked_add(seconds)
            .ok_or_else(|| malformed("duration overflow"))?;
    }

    if total == 0 {
        return Err(malformed("zero-length duration"));
    }
    Ok(total)
}

/// Sum `<digits><unit>` pairs, requiring units in descending order.
fn sum_components(section: &str, units: &[(char, i64)]) -> Option<i64> {
    let mut total: i64 = 0;
    let mut digits = String::new();
    let mut last_unit: Option<usize> = None;

    for c in section.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let idx = units.iter().position(|(u, _)| *u == c)?;
        if digits.is_empty() || last_unit.map_or(false, |last| idx <= last) {
            return None;
        }
        let amount: i64 = digits.parse().ok()?;
        total = total.checked_add(amount.checked_mul(units[idx].1)?)?;
        digits.clear();
        last_unit = Some(idx);
    }

    // Trailing digits without a designator
    if !digits.is_empty() {
        return None;
    }
    Some(total)
}

/// Parse `<timestamp>`, `<timestamp>/<duration>` or `<timestamp>/<timestamp>`.
pub fn parse_interval(input: &str) -> Result<TimeInterval, IntervalError> {
    let Some((start_str, tail)) = input.split_once('/') else {
        return Ok(TimeInterval::point(parse_timestamp(input)?));
    };

    let start = parse_timestamp(start_str)?;
    let end = if tail.trim_start().starts_with('P') {
        start
            .checked_add(parse_duration(tail)?)
            .ok_or_else(|| IntervalError::Malformed {
                input: input.to_string(),
                reason: "interval end overflows",
            })?
    } else {
        parse_timestamp(tail)?
    };

    TimeInterval::range(start, end).map_err(|_| IntervalError::Malformed {
        input: input.to_string(),
        reason: "interval end must be after its start",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_timestamp() {
        let interval = parse_interval("2020-04-10T16:00:00-00:00").unwrap();
        assert_eq!(interval, TimeInterval::point(1_586_534_400));
    }

    #[test]
    fn test_day_duration() {
        let interval = parse_interval("2020-04-10T16:00:00-00:00/P1D").unwrap();
        assert_eq!(interval.start, 1_586_534_400);
        assert_eq!(interval.end, Some(1_586_534_400 + 86_400));
    }

    #[test]
    fn test_combined_duration() {
        assert_eq!(parse_duration("P6DT22H").unwrap(), 6 * 86_400 + 22 * 3_600);
        assert_eq!(parse_duration("PT1H30M").unwrap(), 5_400);
        assert_eq!(parse_duration("P1W").unwrap(), 604_800);
        assert_eq!(parse_duration("PT45S").unwrap(), 45);
    }

    #[test]
    fn test_offset_timestamp() {
        let utc = parse_timestamp("2020-04-10T16:00:00+00:00").unwrap();
        let local = parse_timestamp("2020-04-10T12:00:00-04:00").unwrap();
        assert_eq!(utc, local);
        assert_eq!(parse_timestamp("2020-04-10T16:00:00.000Z").unwrap(), utc);
    }

    #[test]
    fn test_explicit_end_timestamp() {
        let interval =
            parse_interval("2020-04-10T16:00:00Z/2020-04-10T18:00:00Z").unwrap();
        assert_eq!(interval.duration_hours(), Some(2.0));
    }

    #[test]
    fn test_malformed_inputs() {
        for bad in [
            "not-a-time",
            "2020-04-10T16:00:00Z/",
            "2020-04-10T16:00:00Z/P",
            "2020-04-10T16:00:00Z/PT",
            "2020-04-10T16:00:00Z/P1Y",
            "2020-04-10T16:00:00Z/PT5",
            "2020-04-10T16:00:00Z/PT1M1H",
            "2020-04-10T16:00:00Z/P0D",
            "2020-04-10T16:00:00Z/2020-04-10T15:00:00Z",
        ] {
            assert!(parse_interval(bad).is_err(), "expected failure for {bad}");
        }
    }

    #[test]
    fn test_error_message() {
        let err = parse_interval("2020-04-10T16:00:00Z/P2M").unwrap_err();
        insta::assert_snapshot!(err.to_string(), @r#"Malformed interval "P2M": invalid date section"#);
    }
}
