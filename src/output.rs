//! Output projector: turns the entity store into the per-year roster, user and demographic
//! files plus the shared course file.
//!
//! Files are written into `<out>/_staging` first. Only when every file has been written are
//! the previous outputs removed and the staged files promoted, so a failed run never leaves
//! a half-written output directory behind.

use crate::date::SchoolYear;
use crate::store::{EntityStore, Program, RosterMember, Student, Teacher};
use crate::util::{clear_dir_files, create_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const ROSTER_FIELDS: [&str; 11] = [
    "ssid", "student_id", "teacher_id", "employee_id", "school_id", "school_code", "grade_level",
    "period", "term", "course_id", "section_id",
];

pub const USER_FIELDS: [&str; 7] =
    ["employee_id", "teacher_id", "school_id", "school_code", "first_name", "last_name", "email_address"];

pub const DEMO_FIELDS: [&str; 27] = [
    "ssid", "student_id", "school_code", "first_name", "last_name", "birthdate", "gender", "parent",
    "street", "city", "state", "zip", "phone_number", "primary_language", "ethnicity",
    "language_fluency", "date_entered_school", "date_entered_district", "first_us_entry_date", "gate",
    "primary_disability", "nslp", "parent_education", "migrant_ed", "date_rfep", "special_program",
    "title_1",
];

pub const COURSE_FIELDS: [&str; 8] =
    ["course_id", "abbreviation", "name", "credits", "subject_code", "a_to_g", "school_id", "school_code"];

pub const COURSES_FILE: &str = "courses.txt";
const STAGING_DIR: &str = "_staging";

pub fn rosters_file(year: SchoolYear) -> String {
    format!("{year}rosters.txt")
}

pub fn users_file(year: SchoolYear) -> String {
    format!("{year}users.txt")
}

pub fn demo_file(year: SchoolYear) -> String {
    format!("{year}demo.txt")
}

#[inline]
fn cell(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or("")
}

// -------- Record shapes --------

pub fn roster_record(m: &RosterMember) -> Vec<String> {
    vec![
        cell(&m.ssid).to_string(),
        cell(&m.student_id).to_string(),
        cell(&m.teacher_id).to_string(),
        cell(&m.employee_id).to_string(),
        cell(&m.school_id).to_string(),
        cell(&m.school_code).to_string(),
        cell(&m.grade_level).to_string(),
        m.period.map(|p| p.to_string()).unwrap_or_default(),
        cell(&m.term).to_string(),
        cell(&m.course_id).to_string(),
        cell(&m.section_id).to_string(),
    ]
}

pub fn user_record(u: &Teacher) -> Vec<String> {
    [&u.employee_id, &u.teacher_id, &u.school_id, &u.school_code, &u.first_name, &u.last_name, &u.email_address]
        .into_iter()
        .map(|v| cell(v).to_string())
        .collect()
}

pub fn demo_record(s: &Student) -> Vec<String> {
    let flags = s.flags();
    vec![
        cell(&s.ssid).to_string(),
        cell(&s.student_number).to_string(),
        cell(&s.school_code).to_string(),
        cell(&s.first_name).to_string(),
        cell(&s.last_name).to_string(),
        cell(&s.birthdate).to_string(),
        cell(&s.gender).to_string(),
        cell(&s.parent).to_string(),
        cell(&s.street).to_string(),
        cell(&s.city).to_string(),
        cell(&s.state).to_string(),
        cell(&s.zip).to_string(),
        cell(&s.phone_number).to_string(),
        cell(&s.primary_language).to_string(),
        cell(&s.ethnicity).to_string(),
        s.language_fluency.map(|f| f.to_string()).unwrap_or_default(),
        cell(&s.date_entered_school).to_string(),
        cell(&s.date_entered_district).to_string(),
        cell(&s.first_us_entry_date).to_string(),
        flags.yes_no(Program::Gate).to_string(),
        cell(&s.primary_disability).to_string(),
        flags.yes_no(Program::Nslp).to_string(),
        cell(&s.parent_education).to_string(),
        flags.yes_no(Program::MigrantEd).to_string(),
        cell(&s.date_rfep).to_string(),
        flags.yes_no(Program::SpecialProgram).to_string(),
        flags.yes_no(Program::Title1).to_string(),
    ]
}

pub fn course_record(store: &EntityStore, course_id: &str) -> Vec<String> {
    let mut rec = vec![course_id.to_string()];
    match store.course(course_id) {
        Some(c) => rec.extend(
            [&c.abbreviation, &c.name, &c.credits, &c.subject_code, &c.a_to_g, &c.school_id, &c.school_code]
                .into_iter()
                .map(|v| cell(v).to_string()),
        ),
        None => rec.extend(std::iter::repeat(String::new()).take(COURSE_FIELDS.len() - 1)),
    }
    rec
}

// -------- Writer --------

/// Buffered tab-separated writer with robust file creation.
pub struct TsvWriter {
    path: PathBuf,
    w: Option<BufWriter<File>>,
    rows: u64,
}

impl TsvWriter {
    /// Create `path` and write the header row.
    pub fn create(path: &Path, header: &[&str], buf_bytes: usize) -> io::Result<Self> {
        let f = create_with_backoff(path, 16, 50)?;
        let mut me = Self { path: path.to_path_buf(), w: Some(BufWriter::with_capacity(buf_bytes.max(8 * 1024), f)), rows: 0 };
        me.write_cells(header.iter().copied())?;
        Ok(me)
    }

    fn write_cells<'a>(&mut self, cells: impl IntoIterator<Item = &'a str>) -> io::Result<()> {
        if let Some(w) = &mut self.w {
            for (i, c) in cells.into_iter().enumerate() {
                if i > 0 {
                    w.write_all(b"\t")?;
                }
                w.write_all(c.as_bytes())?;
            }
            w.write_all(b"\n")?;
        }
        Ok(())
    }

    #[inline]
    pub fn write_record(&mut self, record: &[String]) -> io::Result<()> {
        self.write_cells(record.iter().map(String::as_str))?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and close; returns the number of data rows written.
    pub fn finish(mut self) -> Result<u64> {
        if let Some(mut w) = self.w.take() {
            w.flush().with_context(|| format!("flush {}", self.path.display()))?;
        }
        Ok(self.rows)
    }
}

// -------- Projection --------

/// What a projection wrote.
#[derive(Clone, Debug, Default, Serialize)]
pub struct OutputReport {
    pub years: Vec<String>,
    pub files_written: Vec<String>,
    pub roster_rows: u64,
    pub user_rows: u64,
    pub demo_rows: u64,
    pub course_rows: u64,
}

struct Stage {
    dir: PathBuf,
    buf: usize,
    files: Vec<String>,
}

impl Stage {
    fn open(&mut self, name: &str, header: &[&str]) -> Result<TsvWriter> {
        self.files.push(name.to_string());
        let path = self.dir.join(name);
        TsvWriter::create(&path, header, self.buf).with_context(|| format!("create {}", path.display()))
    }
}

/// Years to project: every year holding roster memberships, newest first. A single-year run
/// with no memberships still gets its users and demographics files.
pub fn projected_years(store: &EntityStore, single_year: Option<SchoolYear>) -> Vec<SchoolYear> {
    let mut years = store.roster_years();
    if years.is_empty() {
        years.extend(single_year);
    }
    years.sort_unstable_by(|a, b| b.cmp(a));
    years
}

/// Write every output file for `years` into `out_dir`, replacing whatever was there.
pub fn project(store: &mut EntityStore, out_dir: &Path, years: &[SchoolYear], buf_bytes: usize) -> Result<OutputReport> {
    let staging = out_dir.join(STAGING_DIR);
    fs::create_dir_all(&staging).with_context(|| format!("create {}", staging.display()))?;
    clear_dir_files(&staging)?;

    let mut stage = Stage { dir: staging.clone(), buf: buf_bytes, files: Vec::new() };
    let mut report = OutputReport::default();
    let mut course_ids: BTreeSet<String> = BTreeSet::new();

    for &year in years {
        report.years.push(year.to_string());

        if store.rosters(year).next().is_some() {
            let mut w = stage.open(&rosters_file(year), &ROSTER_FIELDS)?;
            for (_, m) in store.rosters(year) {
                if let Some(c) = &m.course_id {
                    course_ids.insert(c.clone());
                }
                w.write_record(&roster_record(m))?;
            }
            report.roster_rows += w.finish()?;
        }

        let mut w = stage.open(&users_file(year), &USER_FIELDS)?;
        for user_id in store.active_teachers(year) {
            match store.user(user_id) {
                None => tracing::warn!(user = %user_id, %year, "active teacher has no teacher record; skipped"),
                Some(u) if u.has_zero_school_code() => {
                    tracing::debug!(user = %user_id, "district-level user not exported")
                }
                Some(u) => w.write_record(&user_record(u))?,
            }
        }
        report.user_rows += w.finish()?;

        let mut w = stage.open(&demo_file(year), &DEMO_FIELDS)?;
        let enrolled: Vec<(String, Option<String>, Option<String>)> = store
            .enrollments(year)
            .map(|(id, e)| (id.clone(), e.school_id.clone(), e.school_code.clone()))
            .collect();
        for (student_id, school_id, school_code) in enrolled {
            let Some(student) = store.known_student_mut(&student_id) else { continue };
            if student.ssid.is_none() {
                continue;
            }
            // The enrollment's school overwrites the student's; with several years the last one projected wins.
            student.school_id = school_id;
            student.school_code = school_code;
            w.write_record(&demo_record(student))?;
        }
        report.demo_rows += w.finish()?;
        tracing::info!(%year, "year projected");
    }

    let mut w = stage.open(COURSES_FILE, &COURSE_FIELDS)?;
    for course_id in &course_ids {
        w.write_record(&course_record(store, course_id))?;
    }
    report.course_rows = w.finish()?;

    let removed = clear_dir_files(out_dir)?;
    tracing::debug!(removed, dir = %out_dir.display(), "previous outputs removed");
    for name in &stage.files {
        replace_file_atomic_backoff(&staging.join(name), &out_dir.join(name))?;
    }
    fs::remove_dir(&staging).with_context(|| format!("remove {}", staging.display()))?;

    report.files_written = stage.files;
    tracing::info!(files = report.files_written.len(), dir = %out_dir.display(), "outputs written");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_record_for_unknown_course_keeps_id() {
        let store = EntityStore::new();
        let rec = course_record(&store, "MATH1");
        assert_eq!(rec.len(), COURSE_FIELDS.len());
        assert_eq!(rec[0], "MATH1");
        assert!(rec[1..].iter().all(String::is_empty));
    }

    #[test]
    fn demo_record_writes_flags_as_yes_no() {
        let mut s = Student::default();
        s.ssid = Some("123".into());
        s.language_fluency = Some(3);
        s.set_flag(Program::Nslp);
        let rec = demo_record(&s);
        assert_eq!(rec.len(), DEMO_FIELDS.len());
        assert_eq!(rec[15], "3");
        assert_eq!(rec[19], "N");
        assert_eq!(rec[21], "Y");
    }

    #[test]
    fn years_are_newest_first() {
        let mut store = EntityStore::new();
        store.roster_mut(SchoolYear::from_start(9), "a-1");
        store.roster_mut(SchoolYear::from_start(10), "a-1");
        let years = projected_years(&store, None);
        assert_eq!(years, vec![SchoolYear::from_start(10), SchoolYear::from_start(9)]);

        let empty = EntityStore::new();
        assert_eq!(projected_years(&empty, Some(SchoolYear::from_start(10))), vec![SchoolYear::from_start(10)]);
        assert!(projected_years(&empty, None).is_empty());
    }
}
