//! In-memory entity model for one batch run.
//!
//! Every family is created lazily on first write (`*_mut` accessors insert a default record);
//! reads of an unknown key return `None`. Year-scoped families (enrollments, roster
//! memberships, teacher activity) are partitioned by `SchoolYear` first.

use crate::date::SchoolYear;
use ahash::AHashMap;
use std::collections::{BTreeMap, BTreeSet};

/// `Some(text)` unless the cell is empty.
#[inline]
pub fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// Yes/No program memberships reported on the demographics file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Program {
    Gate,
    Nslp,
    MigrantEd,
    SpecialProgram,
    Title1,
}

/// Program flags start at `N` and can only move to `Y` within a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgramFlags {
    gate: bool,
    nslp: bool,
    migrant_ed: bool,
    special_program: bool,
    title_1: bool,
}

impl ProgramFlags {
    fn slot(&mut self, p: Program) -> &mut bool {
        match p {
            Program::Gate => &mut self.gate,
            Program::Nslp => &mut self.nslp,
            Program::MigrantEd => &mut self.migrant_ed,
            Program::SpecialProgram => &mut self.special_program,
            Program::Title1 => &mut self.title_1,
        }
    }

    pub fn get(&self, p: Program) -> bool {
        match p {
            Program::Gate => self.gate,
            Program::Nslp => self.nslp,
            Program::MigrantEd => self.migrant_ed,
            Program::SpecialProgram => self.special_program,
            Program::Title1 => self.title_1,
        }
    }

    /// `Y` / `N` as written to the output files.
    pub fn yes_no(&self, p: Program) -> &'static str {
        if self.get(p) { "Y" } else { "N" }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Student {
    pub ssid: Option<String>,
    pub student_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub parent: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone_number: Option<String>,
    pub parent_education: Option<String>,
    pub birthdate: Option<String>,
    pub date_entered_school: Option<String>,
    pub date_entered_district: Option<String>,
    pub first_us_entry_date: Option<String>,
    pub date_rfep: Option<String>,
    pub ethnicity: Option<String>,
    pub primary_language: Option<String>,
    pub language_fluency: Option<u8>,
    pub primary_disability: Option<String>,
    pub school_id: Option<String>,
    pub school_code: Option<String>,
    flags: ProgramFlags,
}

impl Student {
    /// Set a program flag to `Y`. There is deliberately no way back to `N`.
    pub fn set_flag(&mut self, p: Program) {
        *self.flags.slot(p) = true;
    }

    pub fn flags(&self) -> ProgramFlags {
        self.flags
    }

    /// First writer wins: an ethnicity already present is kept.
    /// Returns true when the value was stored.
    pub fn set_ethnicity_if_unset(&mut self, code: &str) -> bool {
        if self.ethnicity.is_some() || code.is_empty() {
            return false;
        }
        self.ethnicity = Some(code.to_string());
        true
    }
}

/// Teacher or staff user.
#[derive(Clone, Debug, Default)]
pub struct Teacher {
    pub employee_id: Option<String>,
    pub teacher_id: Option<String>,
    pub school_id: Option<String>,
    pub school_code: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_address: Option<String>,
}

impl Teacher {
    /// School code `0` marks district-level staff that is never exported.
    pub fn has_zero_school_code(&self) -> bool {
        self.school_code.as_deref().is_some_and(|c| c.trim().parse::<i64>() == Ok(0))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Course {
    pub abbreviation: Option<String>,
    pub name: Option<String>,
    pub credits: Option<String>,
    pub subject_code: Option<String>,
    /// Reserved for downstream enrichment; never populated here.
    pub a_to_g: Option<String>,
    pub school_id: Option<String>,
    pub school_code: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Enrollment {
    pub school_id: Option<String>,
    pub school_code: Option<String>,
    pub grade_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct RosterMember {
    pub ssid: Option<String>,
    pub student_id: Option<String>,
    pub teacher_id: Option<String>,
    pub employee_id: Option<String>,
    pub school_id: Option<String>,
    pub school_code: Option<String>,
    pub grade_level: Option<String>,
    pub period: Option<u32>,
    pub term: Option<String>,
    pub course_id: Option<String>,
    pub section_id: Option<String>,
}

/// Roster membership key: one membership per course and student within a year.
pub fn member_key(course_id: &str, student_id: &str) -> String {
    format!("{course_id}-{student_id}")
}

#[derive(Debug, Default)]
pub struct EntityStore {
    students: AHashMap<String, Student>,
    users: AHashMap<String, Teacher>,
    courses: AHashMap<String, Course>,
    enrollments: BTreeMap<SchoolYear, BTreeMap<String, Enrollment>>,
    rosters: BTreeMap<SchoolYear, BTreeMap<String, RosterMember>>,
    teacher_years: BTreeMap<SchoolYear, BTreeSet<String>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -------- Students --------

    pub fn student_mut(&mut self, id: &str) -> &mut Student {
        self.students.entry(id.to_string()).or_default()
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.get(id)
    }

    /// Known-student test used by the race, program and roster passes, which never create students.
    pub fn has_student(&self, id: &str) -> bool {
        self.students.contains_key(id)
    }

    /// Write access to an already-known student only.
    pub fn known_student_mut(&mut self, id: &str) -> Option<&mut Student> {
        self.students.get_mut(id)
    }

    pub fn student_count(&self) -> usize {
        self.students.len()
    }

    // -------- Users --------

    pub fn user_mut(&mut self, id: &str) -> &mut Teacher {
        self.users.entry(id.to_string()).or_default()
    }

    pub fn user(&self, id: &str) -> Option<&Teacher> {
        self.users.get(id)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    // -------- Courses --------

    pub fn course_mut(&mut self, id: &str) -> &mut Course {
        self.courses.entry(id.to_string()).or_default()
    }

    pub fn course(&self, id: &str) -> Option<&Course> {
        self.courses.get(id)
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }

    // -------- Enrollments --------

    pub fn enrollment_mut(&mut self, year: SchoolYear, student_id: &str) -> &mut Enrollment {
        self.enrollments.entry(year).or_default().entry(student_id.to_string()).or_default()
    }

    pub fn enrollment(&self, year: SchoolYear, student_id: &str) -> Option<&Enrollment> {
        self.enrollments.get(&year)?.get(student_id)
    }

    /// Students enrolled in `year`, by student id.
    pub fn enrollments(&self, year: SchoolYear) -> impl Iterator<Item = (&String, &Enrollment)> {
        self.enrollments.get(&year).into_iter().flatten()
    }

    // -------- Roster memberships --------

    pub fn roster_mut(&mut self, year: SchoolYear, key: &str) -> &mut RosterMember {
        self.rosters.entry(year).or_default().entry(key.to_string()).or_default()
    }

    pub fn roster(&self, year: SchoolYear, key: &str) -> Option<&RosterMember> {
        self.rosters.get(&year)?.get(key)
    }

    /// Memberships of `year`, sorted by membership key.
    pub fn rosters(&self, year: SchoolYear) -> impl Iterator<Item = (&String, &RosterMember)> {
        self.rosters.get(&year).into_iter().flatten()
    }

    /// Years holding at least one roster membership, ascending.
    pub fn roster_years(&self) -> Vec<SchoolYear> {
        self.rosters.keys().copied().collect()
    }

    // -------- Teacher activity --------

    pub fn mark_teacher_active(&mut self, year: SchoolYear, user_id: &str) {
        self.teacher_years.entry(year).or_default().insert(user_id.to_string());
    }

    pub fn is_teacher_active(&self, year: SchoolYear, user_id: &str) -> bool {
        self.teacher_years.get(&year).is_some_and(|s| s.contains(user_id))
    }

    pub fn active_teachers(&self, year: SchoolYear) -> impl Iterator<Item = &String> {
        self.teacher_years.get(&year).into_iter().flatten()
    }
}
