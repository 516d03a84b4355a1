//! Per-row acceptance predicates. Each returns `Ok(value)` for a row that should be kept
//! or `Err(Reject)` naming why it was skipped; rejections are tallied for the run summary.

use crate::config::{NegativeIdPolicy, PeriodPolicy};
use crate::normalize::{expression_to_period, is_nil_date, lenient_int, parse_date, term_abbreviation};
use crate::store::EntityStore;
use serde::Serialize;
use std::collections::BTreeMap;
use time::Date;

/// Reason a source row was skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reject {
    OutsideSchool,
    ExcludedCourse,
    UnknownStudent,
    DroppedTerm,
    MalformedTerm,
    DroppedSection,
    MissingSection,
    NoPeriod,
    NoTerm,
    InactiveProgram,
    UnknownProgram,
}

/// Rejection counts per reason.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RejectTally {
    counts: BTreeMap<Reject, u64>,
}

impl RejectTally {
    pub fn record(&mut self, reason: Reject) {
        *self.counts.entry(reason).or_insert(0) += 1;
    }

    /// `Some(value)` for an accepted row; counts the reason and yields `None` otherwise.
    pub fn admit<T>(&mut self, verdict: Result<T, Reject>) -> Option<T> {
        match verdict {
            Ok(v) => Some(v),
            Err(reason) => {
                self.record(reason);
                None
            }
        }
    }

    pub fn count(&self, reason: Reject) -> u64 {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Reject, u64)> + '_ {
        self.counts.iter().map(|(r, n)| (*r, *n))
    }
}

// -------- Shared --------

pub fn check_school(school_id: &str, single_school: Option<i64>) -> Result<(), Reject> {
    match single_school {
        Some(want) if lenient_int(school_id) != want => Err(Reject::OutsideSchool),
        _ => Ok(()),
    }
}

/// Race, program and roster rows never create students.
pub fn check_known_student(store: &EntityStore, student_id: &str) -> Result<(), Reject> {
    if store.has_student(student_id) { Ok(()) } else { Err(Reject::UnknownStudent) }
}

// -------- Rosters --------

/// `excluded` must be sorted.
pub fn check_course(course_id: &str, excluded: &[String]) -> Result<(), Reject> {
    if excluded.binary_search_by(|c| c.as_str().cmp(course_id)).is_ok() {
        Err(Reject::ExcludedCourse)
    } else {
        Ok(())
    }
}

/// Numeric term id of a roster row.
pub fn check_term_id(raw: &str, policy: NegativeIdPolicy) -> Result<i64, Reject> {
    let s = raw.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Reject::MalformedTerm);
    }
    if negative && policy == NegativeIdPolicy::Drop {
        return Err(Reject::DroppedTerm);
    }
    digits.parse::<i64>().map_err(|_| Reject::MalformedTerm)
}

/// Section id of a roster row, with the sign removed under `StripSign`.
pub fn check_section_id(raw: &str, policy: NegativeIdPolicy) -> Result<String, Reject> {
    let s = raw.trim();
    let unsigned = match s.strip_prefix('-') {
        Some(_) if policy == NegativeIdPolicy::Drop => return Err(Reject::DroppedSection),
        Some(rest) => rest,
        None => s,
    };
    if unsigned.is_empty() {
        return Err(Reject::MissingSection);
    }
    Ok(unsigned.to_string())
}

/// `Ok(None)` only when unresolved periods are kept.
pub fn check_period(expression: &str, policy: &PeriodPolicy) -> Result<Option<u32>, Reject> {
    match expression_to_period(expression, policy.clamp_max) {
        Some(p) => Ok(Some(p)),
        None if policy.drop_unresolved => Err(Reject::NoPeriod),
        None => Ok(None),
    }
}

pub fn check_term(abbreviation: &str) -> Result<String, Reject> {
    term_abbreviation(abbreviation).ok_or(Reject::NoTerm)
}

// -------- Programs --------

/// Program dates: a nil placeholder or an unparsable cell counts as unset.
fn program_date(raw: Option<&str>) -> Option<Date> {
    raw.filter(|s| !is_nil_date(s)).and_then(parse_date)
}

/// A program row applies only while `start <= today <= end`; unset bounds are open.
pub fn check_program_window(start: Option<&str>, end: Option<&str>, today: Date) -> Result<(), Reject> {
    let started = program_date(start).map_or(true, |d| d <= today);
    let not_ended = program_date(end).map_or(true, |d| d >= today);
    if started && not_ended { Ok(()) } else { Err(Reject::InactiveProgram) }
}
