//! Publish-date parsing for feed items.
//!
//! RSS dates are nominally RFC 822, but real feeds disagree on the details:
//! numeric offsets vs. zone names, four- vs. two-digit years, with or without a
//! weekday. [`DateLayout`] describes one accepted shape; [`parse_published`]
//! tries a list of them in order and returns the first match.
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// How the zone at the end of a timestamp is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneStyle {
    /// `-0700` or `+05:30`
    NumericOffset,
    /// `MST`, `GMT`, ...
    Named,
}

/// One accepted timestamp shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateLayout {
    /// Human-readable reference form, used in logs
    pub name: &'static str,
    /// Leading `Mon, ` is required (and not checked against the date)
    pub weekday: bool,
    /// chrono format of the date and time, without weekday or zone
    pub format: &'static str,
    pub zone: ZoneStyle,
}

impl DateLayout {
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    pub const RFC1123_NUMERIC: DateLayout = DateLayout {
        name: "Mon, 02 Jan 2006 15:04:05 -0700",
        weekday: true,
        format: "%d %b %Y %H:%M:%S",
        zone: ZoneStyle::NumericOffset,
    };

    /// `Mon, 02 Jan 2006 15:04:05 MST`
    pub const RFC1123_NAMED: DateLayout = DateLayout {
        name: "Mon, 02 Jan 2006 15:04:05 MST",
        weekday: true,
        format: "%d %b %Y %H:%M:%S",
        zone: ZoneStyle::Named,
    };

    /// `02 Jan 06 15:04 MST`
    pub const RFC822_NAMED: DateLayout = DateLayout {
        name: "02 Jan 06 15:04 MST",
        weekday: false,
        format: "%d %b %y %H:%M",
        zone: ZoneStyle::Named,
    };

    /// Parse `input` against this layout, normalizing to UTC.
    pub fn parse(&self, input: &str) -> Option<DateTime<Utc>> {
        let mut rest = input.trim();

        if self.weekday {
            let (day, tail) = rest.split_once(", ")?;
            if !WEEKDAYS.iter().any(|w| w.eq_ignore_ascii_case(day)) {
                return None;
            }
            rest = tail.trim_start();
        }

        let (stamp, zone) = rest.rsplit_once(' ')?;
        let offset = match self.zone {
            ZoneStyle::NumericOffset => parse_numeric_offset(zone)?,
            ZoneStyle::Named => named_zone_offset(zone)?,
        };

        let naive = NaiveDateTime::parse_from_str(stamp.trim_end(), self.format).ok()?;
        offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// The layouts feed items are parsed with, in priority order.
pub const DEFAULT_LAYOUTS: &[DateLayout] = &[
    DateLayout::RFC1123_NUMERIC,
    DateLayout::RFC1123_NAMED,
    DateLayout::RFC822_NAMED,
];

/// Try each layout in order and return the first successful parse.
pub fn parse_published(input: &str, layouts: &[DateLayout]) -> Option<DateTime<Utc>> {
    layouts.iter().find_map(|layout| layout.parse(input))
}

/// `+hhmm`, `-hhmm`, `+hh:mm` or `-hh:mm`
fn parse_numeric_offset(zone: &str) -> Option<FixedOffset> {
    let (sign, digits) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    let digits = digits.replacen(':', "", 1);
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// RFC 822 zone names. Any other alphabetic abbreviation is read as UTC.
fn named_zone_offset(zone: &str) -> Option<FixedOffset> {
    if zone.is_empty() || !zone.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let hours = match zone.to_ascii_uppercase().as_str() {
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_numeric_offset_layout() {
        let parsed = parse_published("Mon, 02 Jan 2006 15:04:05 -0700", DEFAULT_LAYOUTS);
        assert_eq!(parsed, Some(utc("2006-01-02T22:04:05Z")));

        let parsed = parse_published("Tue, 10 Jun 2003 04:00:00 +0530", DEFAULT_LAYOUTS);
        assert_eq!(parsed, Some(utc("2003-06-09T22:30:00Z")));
    }

    #[test]
    fn test_named_zone_layout() {
        let parsed = parse_published("Mon, 02 Jan 2006 15:04:05 GMT", DEFAULT_LAYOUTS);
        assert_eq!(parsed, Some(utc("2006-01-02T15:04:05Z")));

        let parsed = parse_published("Mon, 02 Jan 2006 15:04:05 MST", DEFAULT_LAYOUTS);
        assert_eq!(parsed, Some(utc("2006-01-02T22:04:05Z")));
    }

    #[test]
    fn test_two_digit_year_layout() {
        let parsed = parse_published("02 Jan 06 15:04 UTC", DEFAULT_LAYOUTS);
        assert_eq!(parsed, Some(utc("2006-01-02T15:04:00Z")));

        let parsed = parse_published("15 Mar 99 08:30 EST", DEFAULT_LAYOUTS);
        assert_eq!(parsed, Some(utc("1999-03-15T13:30:00Z")));
    }

    #[test]
    fn test_unknown_zone_name_read_as_utc() {
        let parsed = parse_published("Wed, 04 Sep 2024 10:00:00 CEST", DEFAULT_LAYOUTS);
        assert_eq!(parsed, Some(utc("2024-09-04T10:00:00Z")));
    }

    #[test]
    fn test_wrong_weekday_is_tolerated() {
        // 2 Jan 2006 was a Monday
        let parsed = parse_published("Fri, 02 Jan 2006 15:04:05 +0000", DEFAULT_LAYOUTS);
        assert_eq!(parsed, Some(utc("2006-01-02T15:04:05Z")));
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        let parsed = parse_published("\n   Mon, 02 Jan 2006 15:04:05 +0000  \n", DEFAULT_LAYOUTS);
        assert_eq!(parsed, Some(utc("2006-01-02T15:04:05Z")));
    }

    #[test]
    fn test_unsupported_formats_rejected() {
        for input in [
            "",
            "2006-01-02T15:04:05Z",
            "yesterday",
            "Mon, 02 Jan 2006",
            "Xyz, 02 Jan 2006 15:04:05 +0000",
            "Mon, 02 Jan 2006 15:04:05 +07",
            "Mon, 32 Jan 2006 15:04:05 +0000",
        ] {
            assert_eq!(parse_published(input, DEFAULT_LAYOUTS), None, "{input:?}");
        }
    }

    #[test]
    fn test_layouts_tried_in_order() {
        // Numeric-offset layout alone cannot read a named zone
        assert!(DateLayout::RFC1123_NUMERIC
            .parse("Mon, 02 Jan 2006 15:04:05 GMT")
            .is_none());
        // Named layout alone cannot read a numeric offset
        assert!(DateLayout::RFC1123_NAMED
            .parse("Mon, 02 Jan 2006 15:04:05 -0700")
            .is_none());
        // Restricting the list restricts what parses
        assert_eq!(
            parse_published("02 Jan 06 15:04 UTC", &[DateLayout::RFC1123_NAMED]),
            None
        );
    }
}
