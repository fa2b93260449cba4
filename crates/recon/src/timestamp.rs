//! Date + time normalization.
//!
//! Readings and bunker deliveries both carry their moment as two separate
//! text fields. [`Stamp::parse`] combines them into one chronological key,
//! keeping the original text for display. A field that does not parse
//! leaves the key as `None`; that is a row-level condition, never an error.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Output rendering for a successfully parsed date.
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y";

const TIME_FORMATS: [&str; 3] = ["%H:%M", "%H:%M:%S", "%H:%M:%S%.f"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stamp {
    pub date_text: String,
    pub time_text: String,
    #[serde(skip)]
    pub date: Option<NaiveDate>,
    /// Combined key; `None` if either component failed to parse.
    pub at: Option<NaiveDateTime>,
}

impl Stamp {
    pub fn parse(date_text: &str, time_text: &str) -> Self {
        let date = parse_date(date_text);
        let time = parse_time(time_text);
        let at = match (date, time) {
            (Some(d), Some(t)) => Some(d.and_time(t)),
            _ => None,
        };
        Self {
            date_text: date_text.to_string(),
            time_text: time_text.to_string(),
            date,
            at,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.at.is_some()
    }

    /// Date as shown in the output: `dd.mm.yyyy` when parsed, else the source text.
    pub fn display_date(&self) -> String {
        match self.date {
            Some(d) => d.format(DISPLAY_DATE_FORMAT).to_string(),
            None => self.date_text.clone(),
        }
    }
}

/// Parse a day-first date (`dd.mm.yyyy`, `dd/mm/yy`, `dd-mm-yyyy`, ...) or an
/// ISO `yyyy-mm-dd` date. A trailing time-of-day part is ignored.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let token = date_token(raw.trim())?;

    if is_iso_date(token) {
        return NaiveDate::parse_from_str(&token[..10], "%Y-%m-%d").ok();
    }

    let sep = token.chars().find(|c| matches!(c, '.' | '/' | '-'))?;
    let parts: Vec<&str> = token.split(sep).collect();
    let [day, month, year] = parts.as_slice() else {
        return None;
    };
    if !day.chars().chain(month.chars()).chain(year.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let year: i32 = match year.len() {
        // strptime %y pivot: 69-99 => 19xx, 00-68 => 20xx
        2 => {
            let yy: i32 = year.parse().ok()?;
            if yy >= 69 {
                1900 + yy
            } else {
                2000 + yy
            }
        }
        4 => year.parse().ok()?,
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse an `HH:MM` time of day; trailing seconds are tolerated.
///
/// Spreadsheet time columns often hold a full date-time (`01.03.2024 12:00`,
/// `2024-03-01T12:00:00`); only its time of day is kept, and a bare date
/// reads as midnight.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(time) = parse_clock(trimmed) {
        return Some(time);
    }
    match trimmed.split_once(|c: char| c == 'T' || c.is_whitespace()) {
        Some((date, clock)) if parse_date(date).is_some() => parse_clock(clock.trim()),
        Some(_) => None,
        None => parse_date(trimmed).and_then(|_| NaiveTime::from_hms_opt(0, 0, 0)),
    }
}

fn parse_clock(s: &str) -> Option<NaiveTime> {
    TIME_FORMATS.iter().find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

fn date_token(s: &str) -> Option<&str> {
    if s.is_empty() {
        return None;
    }
    if is_iso_date(s) {
        return Some(s);
    }
    s.split_whitespace().next()
}

fn is_iso_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[7] == b'-'
        && (b.len() == 10 || matches!(b[10], b'T' | b' '))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_first_formats() {
        assert_eq!(parse_date("03.02.2024"), Some(ymd(2024, 2, 3)));
        assert_eq!(parse_date("03/02/2024"), Some(ymd(2024, 2, 3)));
        assert_eq!(parse_date("03-02-2024"), Some(ymd(2024, 2, 3)));
        assert_eq!(parse_date("3.2.24"), Some(ymd(2024, 2, 3)));
        assert_eq!(parse_date("31.12.99"), Some(ymd(1999, 12, 31)));
    }

    #[test]
    fn iso_dates() {
        assert_eq!(parse_date("2024-02-03"), Some(ymd(2024, 2, 3)));
        assert_eq!(parse_date("2024-02-03T10:00:00"), Some(ymd(2024, 2, 3)));
        assert_eq!(parse_date("2024-02-03 10:00:00"), Some(ymd(2024, 2, 3)));
    }

    #[test]
    fn trailing_time_ignored() {
        assert_eq!(parse_date("03.02.2024 00:00"), Some(ymd(2024, 2, 3)));
    }

    #[test]
    fn month_first_is_not_guessed() {
        // 13 is not a valid month; day-first is strict
        assert_eq!(parse_date("02/13/2024"), None);
    }

    #[test]
    fn invalid_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("31.02.2024"), None);
        assert_eq!(parse_date("1.2.3.4"), None);
        assert_eq!(parse_date("01.02.024"), None);
    }

    #[test]
    fn times() {
        assert_eq!(parse_time("12:00"), NaiveTime::from_hms_opt(12, 0, 0));
        assert_eq!(parse_time(" 7:05 "), NaiveTime::from_hms_opt(7, 5, 0));
        assert_eq!(parse_time("23:59:30"), NaiveTime::from_hms_opt(23, 59, 30));
        assert_eq!(parse_time("25:00"), None);
        assert_eq!(parse_time("noon"), None);
        assert_eq!(parse_time(""), None);
    }

    #[test]
    fn datetime_in_time_column_keeps_time_of_day() {
        let noon = NaiveTime::from_hms_opt(12, 0, 0);
        assert_eq!(parse_time("01.03.2024 12:00"), noon);
        assert_eq!(parse_time("2024-03-01T12:00:00"), noon);
        assert_eq!(parse_time("2024-03-01 12:00:00.000"), noon);
        assert_eq!(parse_time("01.03.2024"), NaiveTime::from_hms_opt(0, 0, 0));
        assert_eq!(parse_time("someday 12:00"), None);
        assert_eq!(parse_time("01.03.2024 noon"), None);
    }

    #[test]
    fn combined_stamp_from_spreadsheet_datetimes() {
        let s = Stamp::parse("01.03.2024 00:00", "01.03.2024 12:00");
        assert_eq!(s.at, Some(ymd(2024, 3, 1).and_hms_opt(12, 0, 0).unwrap()));
    }

    #[test]
    fn combined_stamp() {
        let s = Stamp::parse("01.01.2024", "12:00");
        assert!(s.is_valid());
        assert_eq!(s.at, Some(ymd(2024, 1, 1).and_hms_opt(12, 0, 0).unwrap()));
        assert_eq!(s.display_date(), "01.01.2024");
    }

    #[test]
    fn invalid_time_keeps_parsed_date_for_display() {
        let s = Stamp::parse("2024-01-05", "??");
        assert!(!s.is_valid());
        assert_eq!(s.date, Some(ymd(2024, 1, 5)));
        assert_eq!(s.display_date(), "05.01.2024");
        assert_eq!(s.time_text, "??");
    }

    #[test]
    fn invalid_date_preserves_source_text() {
        let s = Stamp::parse("not a date", "10:00");
        assert!(!s.is_valid());
        assert_eq!(s.display_date(), "not a date");
    }
}
