//! Extract the provider's "next allowed send" timestamp from the tool's
//! free-text output.
//!
//! The rate limit is communicated only as a human-readable line containing an
//! ISO-8601 timestamp with millisecond precision and a numeric UTC offset,
//! e.g. `2024-03-01T14:30:00.000+01:00`. Absence or garbage must never panic;
//! the caller falls back to a fixed delay.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;

static DEADLINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}[+-]\d{2}:\d{2}")
        .expect("deadline pattern is valid")
});

/// First parseable deadline in `output`, if any.
pub fn extract(output: &str) -> Option<DateTime<FixedOffset>> {
    let matched = DEADLINE_PATTERN.find(output)?;
    DateTime::parse_from_rfc3339(matched.as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn extracts_embedded_timestamp() {
        let output = "error: daily limit reached, you may send again at \
                      2024-03-01T14:30:00.000+01:00 (server time)";
        let deadline = extract(output).unwrap();
        assert_eq!(deadline.hour(), 14);
        assert_eq!(deadline.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn negative_offset_parses() {
        let deadline = extract("retry after 2024-07-04T08:00:00.500-05:00").unwrap();
        assert_eq!(deadline.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn first_match_wins() {
        let output = "2030-01-01T00:00:00.000+00:00 then 2031-01-01T00:00:00.000+00:00";
        let deadline = extract(output).unwrap();
        assert_eq!(deadline.to_rfc3339(), "2030-01-01T00:00:00+00:00");
    }

    #[test]
    fn no_timestamp_yields_none() {
        assert!(extract("").is_none());
        assert!(extract("unknown error, please retry later").is_none());
        // Missing milliseconds or offset doesn't match the pattern.
        assert!(extract("2024-03-01T14:30:00+01:00").is_none());
        assert!(extract("2024-03-01T14:30:00.000Z").is_none());
    }

    #[test]
    fn shaped_like_a_date_but_invalid_yields_none() {
        // Matches the pattern but is not a real calendar date.
        assert!(extract("2024-13-40T99:99:99.000+00:00").is_none());
    }
}
