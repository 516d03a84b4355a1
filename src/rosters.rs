//! Roster (student schedule) analysis. Year-independent: each row lands in the school year
//! its term id encodes.

use crate::config::ETLOptions;
use crate::context::BatchContext;
use crate::date::SchoolYear;
use crate::filters::{check_course, check_known_student, check_period, check_section_id, check_term, check_term_id, Reject};
use crate::sources::RosterRow;
use crate::store::{member_key, non_empty, EntityStore, RosterMember};
use crate::tsv::for_each_record;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// A roster row that passed every filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptedRow {
    pub year: SchoolYear,
    pub section_id: String,
    pub period: Option<u32>,
    pub term: String,
}

/// Run every roster filter in order. Nothing is written to the store here.
pub fn screen(store: &EntityStore, row: &RosterRow, opts: &ETLOptions) -> Result<AcceptedRow, Reject> {
    check_course(&row.course_number, &opts.excluded_courses)?;
    check_known_student(store, &row.student_id)?;
    let term_id = check_term_id(&row.term_id, opts.negative_ids)?;
    let section_id = check_section_id(&row.section_id, opts.negative_ids)?;
    let period = check_period(&row.expression, &opts.period)?;
    let term = check_term(&row.abbreviation)?;
    Ok(AcceptedRow { year: SchoolYear::from_term_id(term_id), section_id, period, term })
}

fn membership(store: &EntityStore, row: &RosterRow, acc: &AcceptedRow) -> RosterMember {
    let student = store.student(&row.student_id);
    let user = store.user(&row.teacher_id);
    RosterMember {
        ssid: student.and_then(|s| s.ssid.clone()),
        student_id: student.and_then(|s| s.student_number.clone()),
        teacher_id: user.and_then(|u| u.teacher_id.clone()),
        employee_id: user.and_then(|u| u.employee_id.clone()),
        school_id: non_empty(&row.school_id),
        school_code: non_empty(&row.school_code),
        grade_level: store.enrollment(acc.year, &row.student_id).and_then(|e| e.grade_level.clone()),
        period: acc.period,
        term: Some(acc.term.clone()),
        course_id: non_empty(&row.course_number),
        section_id: Some(acc.section_id.clone()),
    }
}

/// Read every roster file in `files`, marking instructors active and recording one
/// membership per (year, course, student). A later row for the same key replaces the earlier one.
pub fn analyze(ctx: &mut BatchContext, files: &[PathBuf], opts: &ETLOptions) -> Result<u64> {
    let mut total = 0u64;
    let mut kept = 0u64;
    for path in files {
        for_each_record::<RosterRow>(path, |row| {
            total += 1;
            ctx.progress.rows("roster", total);
            let verdict = screen(&ctx.store, &row, opts);
            let Some(acc) = ctx.tally.admit(verdict) else { return Ok(()) };

            ctx.store.mark_teacher_active(acc.year, &row.teacher_id);
            let member = membership(&ctx.store, &row, &acc);
            let key = member_key(&row.course_number, &row.student_id);
            *ctx.store.roster_mut(acc.year, &key) = member;
            kept += 1;
            Ok(())
        })
        .with_context(|| format!("reading rosters from {}", path.display()))?;
    }
    tracing::info!(rows = total, kept, "rosters analyzed");
    ctx.rows.rosters += total;
    Ok(total)
}
