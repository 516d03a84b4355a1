//! Special-program extract: sets program flags (and the primary disability) for known
//! students whose program membership is currently active.

use crate::context::BatchContext;
use crate::error::EtlError;
use crate::filters::{check_known_student, check_program_window, Reject};
use crate::normalize::lenient_int;
use crate::sources::ProgramRow;
use crate::store::{Program, Student};
use crate::tsv::for_each_present_record;
use anyhow::{Context, Result};
use regex::bytes::Regex;
use std::path::Path;
use std::sync::OnceLock;

pub const TITLE_1: i64 = 122;
pub const GATE: i64 = 127;
pub const MIGRANT_ED: i64 = 135;
pub const SPECIAL_ED: i64 = 144;
pub const NSLP: i64 = 175;

fn disability_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Primary disability entry of the encoded custom field: tag bytes, then three digits.
    // A secondary entry uses \x06 in place of \x03 and is skipped.
    RE.get_or_init(|| Regex::new(r"(?-u)\x11\x04\x03\x12\x00\x03([0-9]{3})").unwrap())
}

/// Three-digit primary disability code from a special-education row's custom field.
pub fn primary_disability(custom: &[u8]) -> Option<&str> {
    let m = disability_re().captures(custom)?.get(1)?;
    std::str::from_utf8(m.as_bytes()).ok()
}

/// Apply one active program row to its student.
fn apply_program(student: &mut Student, row: &ProgramRow) -> Result<Option<Reject>, EtlError> {
    match lenient_int(&row.program_code) {
        TITLE_1 => student.set_flag(Program::Title1),
        GATE => student.set_flag(Program::Gate),
        MIGRANT_ED => student.set_flag(Program::MigrantEd),
        SPECIAL_ED => {
            let code = row
                .custom
                .as_deref()
                .and_then(primary_disability)
                .ok_or_else(|| EtlError::DisabilityCodeMissing { student_id: row.student_id.clone() })?;
            student.set_flag(Program::SpecialProgram);
            student.primary_disability = Some(code.to_string());
        }
        NSLP => student.set_flag(Program::Nslp),
        _ => return Ok(Some(Reject::UnknownProgram)),
    }
    Ok(None)
}

/// Returns `None` when the program file is absent.
pub fn analyze(ctx: &mut BatchContext, path: &Path) -> Result<Option<u64>> {
    let today = ctx.today;
    let mut seen = 0u64;
    let rows = for_each_present_record::<ProgramRow>(path, |row| {
        seen += 1;
        ctx.progress.rows("program", seen);
        if ctx.tally.admit(check_known_student(&ctx.store, &row.student_id)).is_none() {
            return Ok(());
        }
        let window = check_program_window(row.start_date.as_deref(), row.end_date.as_deref(), today);
        if ctx.tally.admit(window).is_none() {
            tracing::debug!(student = %row.student_id, code = %row.program_code, "program not active today");
            return Ok(());
        }
        let Some(student) = ctx.store.known_student_mut(&row.student_id) else { return Ok(()) };
        if let Some(reason) = apply_program(student, &row)? {
            ctx.tally.record(reason);
        }
        Ok(())
    })
    .with_context(|| format!("reading programs from {}", path.display()))?;

    if let Some(n) = rows {
        tracing::info!(rows = n, "programs analyzed");
        ctx.rows.programs += n;
    }
    Ok(rows)
}
