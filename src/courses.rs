//! Course catalog analysis (year-independent).

use crate::context::BatchContext;
use crate::normalize::course_abbreviation;
use crate::sources::CourseRow;
use crate::store::non_empty;
use crate::tsv::for_each_record;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Load every course file in `files`. Later files overwrite attributes of course numbers
/// already seen in earlier ones.
pub fn analyze(ctx: &mut BatchContext, files: &[PathBuf]) -> Result<u64> {
    let mut total = 0u64;
    for path in files {
        let n = for_each_record::<CourseRow>(path, |row| {
            let course = ctx.store.course_mut(&row.course_number);
            course.abbreviation = non_empty(&course_abbreviation(&row.course_name));
            course.name = non_empty(&row.course_name);
            course.credits = non_empty(&row.credit_hours);
            course.subject_code = non_empty(&row.credit_type);
            course.a_to_g = None;
            course.school_id = non_empty(&row.school_id);
            course.school_code = non_empty(&row.school_code);
            total += 1;
            ctx.progress.rows("course", total);
            Ok(())
        })
        .with_context(|| format!("reading courses from {}", path.display()))?;
        tracing::debug!(path = %path.display(), rows = n, "course file analyzed");
    }
    ctx.rows.courses += total;
    Ok(total)
}
