//! Scalar normalizers: small pure functions shared by the analyzers.
//! Malformed input yields `None` ("no value") instead of an error.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use time::{Date, Month};

// -------- Dates --------

/// Month/day/year as read from a source cell, already range-checked.
/// The day is not validated against the month length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawDate {
    pub month: u8,
    pub day: u8,
    pub year: i32,
}

impl RawDate {
    /// Calendar date, or `None` when the day does not exist in that month.
    pub fn to_date(self) -> Option<Date> {
        let month = Month::try_from(self.month).ok()?;
        Date::from_calendar_date(self.year, month, self.day).ok()
    }
}

impl fmt::Display for RawDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{:04}", self.month, self.day, self.year)
    }
}

fn mdy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)/(\d+)/(\d+)(\s|$)").unwrap())
}

fn my_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)/(\d+)(\s|$)").unwrap())
}

/// Parse `M/D/Y` or `M/Y` (day 1); `-` is accepted as separator.
/// Two-digit years below 20 are 20xx, 20..=99 are 19xx. The resulting year must lie
/// strictly between 1900 and 2020.
pub fn split_date(raw: &str) -> Option<RawDate> {
    let text = raw.replace('-', "/");
    let text = text.trim();
    let (mo, da, yr): (u32, u32, u32) = if let Some(c) = mdy_re().captures(text) {
        (c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?)
    } else if let Some(c) = my_re().captures(text) {
        (c[1].parse().ok()?, 1, c[2].parse().ok()?)
    } else {
        return None;
    };
    let yr = match yr {
        y if y < 20 => y + 2000,
        y if y < 100 => y + 1900,
        y => y,
    };
    if !(1..=12).contains(&mo) || !(1..=31).contains(&da) || yr <= 1900 || yr >= 2020 {
        return None;
    }
    Some(RawDate { month: mo as u8, day: da as u8, year: yr as i32 })
}

/// Normalized `MM/DD/YYYY` text.
pub fn clean_date(raw: &str) -> Option<String> {
    split_date(raw).map(|d| d.to_string())
}

pub fn parse_date(raw: &str) -> Option<Date> {
    split_date(raw).and_then(RawDate::to_date)
}

/// Placeholder dates the source system writes instead of leaving a cell empty.
pub fn is_nil_date(raw: &str) -> bool {
    let s = raw.trim();
    s.is_empty() || s == "0/0/0" || s == "01/01/1900"
}

// -------- Codes --------

/// First word (upper-cased, at most 4 characters) plus the last word when it is a grade
/// marker: all digits, or `K`.
pub fn course_abbreviation(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    let Some(first) = words.first() else { return String::new() };
    let mut abbr: String = first.to_uppercase().chars().take(4).collect();
    if words.len() > 1 {
        let last = words[words.len() - 1].to_uppercase();
        if last == "K" || last.chars().all(|c| c.is_ascii_digit()) {
            abbr.push_str(&last);
        }
    }
    abbr
}

/// Leading digits of a scheduling expression ("3(A)" -> 3). Zero or no digits is `None`;
/// a run too long for `u32` saturates before clamping.
pub fn expression_to_period(expr: &str, clamp_max: Option<u32>) -> Option<u32> {
    let digits = expr.bytes().take_while(u8::is_ascii_digit);
    let mut period: Option<u32> = None;
    for d in digits {
        let v = period.unwrap_or(0);
        period = Some(v.saturating_mul(10).saturating_add(u32::from(d - b'0')));
    }
    let period = period?;
    if period == 0 {
        return None;
    }
    Some(match clamp_max {
        Some(max) => period.min(max),
        None => period,
    })
}

/// Term abbreviation as reported downstream: full-year codes become `YR`, half terms
/// `HT1`..`HT6` (with or without a space) become `H1`..`H6`, anything else passes through.
/// An empty abbreviation has no mapping.
pub fn term_abbreviation(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if s.parse::<crate::date::SchoolYear>().is_ok() {
        return Some("YR".to_string());
    }
    if let Some(rest) = s.strip_prefix("HT") {
        let n = rest.trim_start();
        if n.len() == 1 && matches!(n.as_bytes()[0], b'1'..=b'6') {
            return Some(format!("H{n}"));
        }
    }
    Some(s.to_string())
}

/// Language fluency code: EO=1, IFEP=2, EL=3, RFEP=4, TBD=5.
pub fn language_fluency(raw: &str) -> Option<u8> {
    match raw.trim().to_uppercase().as_str() {
        "EO" => Some(1),
        "IFEP" => Some(2),
        "EL" => Some(3),
        "RFEP" => Some(4),
        "TBD" => Some(5),
        _ => None,
    }
}

/// Integer value of a numeric cell: optional sign and leading digits, 0 when there are none.
pub fn lenient_int(raw: &str) -> i64 {
    let s = raw.trim();
    let (neg, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: String = body.chars().take_while(|c| c.is_ascii_digit()).collect();
    let v = digits.parse::<i64>().unwrap_or(0);
    if neg { -v } else { v }
}

/// Case-insensitive "Yes..." check used by the flag columns of the student extract.
pub fn is_yes(raw: &str) -> bool {
    raw.trim_start().get(..3).is_some_and(|p| p.eq_ignore_ascii_case("yes"))
}
