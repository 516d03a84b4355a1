//! Race extract: fills in the ethnicity of known students that have none yet.

use crate::context::BatchContext;
use crate::filters::check_known_student;
use crate::sources::RaceRow;
use crate::tsv::for_each_present_record;
use anyhow::{Context, Result};
use std::path::Path;

/// First writer wins: once a student has an ethnicity, later race rows are ignored.
/// Returns `None` when the race file is absent.
pub fn analyze(ctx: &mut BatchContext, path: &Path) -> Result<Option<u64>> {
    let mut written = 0u64;
    let mut seen = 0u64;
    let rows = for_each_present_record::<RaceRow>(path, |row| {
        seen += 1;
        ctx.progress.rows("race", seen);
        if ctx.tally.admit(check_known_student(&ctx.store, &row.student_id)).is_none() {
            return Ok(());
        }
        if let Some(student) = ctx.store.known_student_mut(&row.student_id) {
            if student.set_ethnicity_if_unset(row.race_code.trim()) {
                written += 1;
            }
        }
        Ok(())
    })
    .with_context(|| format!("reading races from {}", path.display()))?;

    if let Some(n) = rows {
        tracing::info!(rows = n, written, "races analyzed");
        ctx.rows.races += n;
    }
    Ok(rows)
}
