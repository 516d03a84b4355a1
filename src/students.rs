//! Student demographic analysis for one school year: student attributes, flag-derived
//! program memberships and enrollment-year resolution.

use crate::config::ETLOptions;
use crate::context::BatchContext;
use crate::date::SchoolYear;
use crate::error::EtlError;
use crate::filters::check_school;
use crate::normalize::{clean_date, is_yes, language_fluency, lenient_int, parse_date};
use crate::sources::StudentRow;
use crate::store::{non_empty, Program, Student};
use crate::tsv::for_each_record;
use anyhow::{Context, Result};
use std::path::Path;

/// Federal ethnicity flag value for Hispanic/Latino students.
const HISPANIC_FLAG: i64 = 1;
/// Ethnicity code reported for Hispanic/Latino students.
pub const HISPANIC_ETHNICITY: &str = "500";

/// Mother's composed name, or the father's when the mother's is blank.
pub fn parent_name(row: &StudentRow) -> String {
    let mother = format!("{} {}", row.mother_first, row.mother);
    let mother = mother.trim();
    if !mother.is_empty() {
        return mother.to_string();
    }
    format!("{} {}", row.father_first, row.father).trim().to_string()
}

/// Whether the row enrolls its student in `year`: status 0 always does; a positive status
/// does when the entry date falls in `year`. The entry date is only consulted for positive
/// statuses and must then parse.
pub fn enrolls_in(row: &StudentRow, year: SchoolYear) -> Result<bool, EtlError> {
    let status = lenient_int(&row.enroll_status);
    if status == 0 {
        return Ok(true);
    }
    if status < 0 {
        return Ok(false);
    }
    let entry = parse_date(&row.entry_date).ok_or_else(|| EtlError::UnparsableEntryDate {
        student_id: row.id.clone(),
        raw: row.entry_date.clone(),
    })?;
    Ok(SchoolYear::from_date(entry) == year)
}

/// Program flags carried directly on the student extract (used when the program file is off).
fn apply_row_flags(student: &mut Student, row: &StudentRow) {
    if row.gate.as_deref().is_some_and(is_yes) {
        student.set_flag(Program::Gate);
    }
    if row.migrant_ed.as_deref().is_some_and(is_yes) {
        student.set_flag(Program::MigrantEd);
    }
    if let Some(code) = row.primary_disability.as_deref().map(str::trim) {
        if !code.is_empty() && code != "000" {
            student.set_flag(Program::SpecialProgram);
            student.primary_disability = Some(code.to_string());
        }
    }
    if row.title1_targeted.as_deref().is_some_and(|v| !v.trim().is_empty()) {
        student.set_flag(Program::Title1);
    }
}

fn apply_attributes(student: &mut Student, row: &StudentRow, opts: &ETLOptions) {
    student.ssid = non_empty(&row.ssid);
    student.student_number = non_empty(&row.student_number);
    student.first_name = non_empty(&row.first_name);
    student.last_name = non_empty(&row.last_name);
    student.gender = non_empty(&row.gender);
    student.parent = non_empty(&parent_name(row));
    student.street = non_empty(&row.street);
    student.city = non_empty(&row.city);
    student.state = non_empty(&row.state);
    student.zip = non_empty(&row.zip);
    student.phone_number = non_empty(&row.home_phone);
    student.parent_education = non_empty(&row.parent_education);
    student.birthdate = clean_date(&row.dob);
    student.date_entered_school = clean_date(&row.school_entry_date);
    student.date_entered_district = clean_date(&row.district_entry_date);
    student.first_us_entry_date = clean_date(&row.first_us_schooling);
    student.date_rfep = clean_date(&row.date_rfep);

    // The two ethnicity sources are mutually exclusive.
    student.ethnicity = if opts.use_race_file {
        row.ethnicity.as_deref().and_then(non_empty)
    } else if lenient_int(&row.fed_ethnicity) == HISPANIC_FLAG {
        Some(HISPANIC_ETHNICITY.to_string())
    } else {
        None
    };

    student.primary_language = non_empty(&row.primary_language);
    student.language_fluency = language_fluency(&row.ela_status);

    if !opts.use_program_file {
        apply_row_flags(student, row);
    }
}

/// One pass over the student extract for `year`.
pub fn analyze(ctx: &mut BatchContext, path: &Path, year: SchoolYear, opts: &ETLOptions) -> Result<u64> {
    let mut seen = 0u64;
    let mut enrolled = 0u64;
    for_each_record::<StudentRow>(path, |row| {
        seen += 1;
        ctx.progress.rows("student", seen);
        if ctx.tally.admit(check_school(&row.school_id, opts.single_school)).is_none() {
            tracing::debug!(student = %row.id, school = %row.school_id, "skipping student; wrong school");
            return Ok(());
        }

        apply_attributes(ctx.store.student_mut(&row.id), &row, opts);

        if enrolls_in(&row, year)? {
            let enrollment = ctx.store.enrollment_mut(year, &row.id);
            enrollment.school_id = non_empty(&row.school_id);
            enrollment.school_code = non_empty(&row.school_code);
            enrollment.grade_level = non_empty(&row.grade_level);
            enrolled += 1;
        }
        Ok(())
    })
    .with_context(|| format!("reading students from {}", path.display()))?;

    tracing::info!(%year, rows = seen, enrolled, "students analyzed");
    ctx.rows.students += seen;
    Ok(seen)
}
