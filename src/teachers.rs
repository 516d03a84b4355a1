//! Teacher/staff analysis for one school year.

use crate::context::BatchContext;
use crate::date::SchoolYear;
use crate::normalize::lenient_int;
use crate::sources::TeacherRow;
use crate::store::non_empty;
use crate::tsv::for_each_record;
use anyhow::{Context, Result};
use std::path::Path;

/// Current teachers, and administrators with reporting access, count as active.
pub fn qualifies_as_active(row: &TeacherRow) -> bool {
    let dd_access = row.datadirector_access.as_deref().map(str::trim) == Some("1");
    lenient_int(&row.status) == 1 && (dd_access || lenient_int(&row.staff_status) == 1)
}

/// Record every user in the teacher extract and mark qualifying ones active for `year`.
pub fn analyze(ctx: &mut BatchContext, path: &Path, year: SchoolYear) -> Result<u64> {
    let mut active = 0u64;
    let mut seen = 0u64;
    for_each_record::<TeacherRow>(path, |row| {
        let user = ctx.store.user_mut(&row.id);
        user.employee_id = non_empty(&row.teacher_number);
        user.teacher_id = non_empty(&row.teacher_number);
        user.school_id = non_empty(&row.school_id);
        user.school_code = non_empty(&row.school_code);
        user.first_name = non_empty(&row.first_name);
        user.last_name = non_empty(&row.last_name);
        user.email_address = non_empty(&row.email);

        if qualifies_as_active(&row) {
            ctx.store.mark_teacher_active(year, &row.id);
            tracing::debug!(user = %row.id, last_name = %row.last_name, %year, "teacher active");
            active += 1;
        }
        seen += 1;
        ctx.progress.rows("teacher", seen);
        Ok(())
    })
    .with_context(|| format!("reading teachers from {}", path.display()))?;

    tracing::info!(%year, rows = seen, active, "teachers analyzed");
    ctx.rows.teachers += seen;
    Ok(seen)
}
