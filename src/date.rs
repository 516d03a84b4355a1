use std::fmt;
use std::str::FromStr;
use time::{Date, Month};

/// School-year label "YY-YY+1" (e.g. "10-11"), spanning July 1 through June 30.
/// Ordering follows the label's lexical order (two-digit start year).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchoolYear {
    start: u8, // 0..=99
}

impl SchoolYear {
    /// Build from the two-digit calendar year the school year starts in.
    pub fn from_start(yy: u8) -> Self {
        Self { start: yy % 100 }
    }

    /// The source system numbers school years from 1990: number 20 is "10-11".
    pub fn from_year_number(n: i64) -> Self {
        Self { start: (n + 90).rem_euclid(100) as u8 }
    }

    /// School year a calendar date falls in.
    pub fn from_date(date: Date) -> Self {
        let year = date.year() as i64;
        let n = if u8::from(date.month()) >= 7 { year - 1990 } else { year - 1991 };
        Self::from_year_number(n)
    }

    /// School year encoded in a term id (high-order digits, `term_id / 100`).
    pub fn from_term_id(term_id: i64) -> Self {
        Self::from_year_number(term_id.div_euclid(100))
    }

    /// "auto" year: on or after August 15 the school year starting this calendar year,
    /// before it the one that started last calendar year.
    pub fn auto(today: Date) -> Self {
        let mut ending = today.year();
        let month = u8::from(today.month());
        let august = u8::from(Month::August);
        let after_cutover = month > august || (month == august && today.day() >= 15);
        if after_cutover {
            ending += 1;
        }
        Self::from_start((ending - 1).rem_euclid(100) as u8)
    }

    pub fn year_number(self) -> i64 {
        (self.start as i64 + 10) % 100
    }

    /// First term id of this school year ("10-11" -> 2000).
    pub fn first_term_id(self) -> i64 {
        self.year_number() * 100
    }

    pub fn next(self) -> Self {
        Self::from_start((self.start + 1) % 100)
    }
}

impl fmt::Display for SchoolYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.start, (self.start + 1) % 100)
    }
}

impl FromStr for SchoolYear {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lo, hi) = s.trim().split_once('-').ok_or("expected YY-YY")?;
        if lo.len() != 2 || hi.len() != 2 {
            return Err("expected two-digit years".into());
        }
        let lo: u8 = lo.parse().map_err(|_| "invalid start year")?;
        let hi: u8 = hi.parse().map_err(|_| "invalid end year")?;
        if hi != (lo + 1) % 100 {
            return Err("end year must follow start year".into());
        }
        Ok(Self::from_start(lo))
    }
}

/// Inclusive walk from `first` to `last` in chronological order (wrapping at 99-00).
pub fn iter_school_years(first: SchoolYear, last: SchoolYear) -> impl Iterator<Item = SchoolYear> {
    let mut curr = Some(first);
    let mut steps = 0u8;
    std::iter::from_fn(move || {
        let ret = curr?;
        steps += 1;
        curr = if ret == last || steps >= 100 { None } else { Some(ret.next()) };
        Some(ret)
    })
}
