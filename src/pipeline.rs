use crate::config::{ETLOptions, NegativeIdPolicy, PeriodPolicy, YearSelection};
use crate::context::{BatchContext, EntityCounts, RowCounts};
use crate::date::SchoolYear;
use crate::error::EtlError;
use crate::filters::RejectTally;
use crate::output::{self, OutputReport};
use crate::paths::InputLayout;
use crate::progress::{total_work_units, ProgressScope};
use crate::util::init_tracing_once;
use crate::{courses, programs, races, rosters, students, teachers};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use time::Date;

#[derive(Clone, Default)]
pub struct RosterETL {
    pub(crate) opts: ETLOptions,
}

/// Diagnostics of one completed batch.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    /// `Some(year)` for a single-year run.
    pub single_year: Option<String>,
    pub analyzed_years: Vec<String>,
    pub rows: RowCounts,
    pub entities: EntityCounts,
    pub rejections: RejectTally,
    #[serde(flatten)]
    pub output: OutputReport,
}

impl RosterETL {
    pub fn new() -> Self {
        Self { opts: ETLOptions::default() }
    }

    pub fn from_options(opts: ETLOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &ETLOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn output_base_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output_base_dir(dir); self }
    pub fn input_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_input_dir(dir); self }
    pub fn year(mut self, year: YearSelection) -> Self { self.opts = self.opts.with_year(year); self }
    pub fn first_year(mut self, year: SchoolYear) -> Self { self.opts = self.opts.with_first_year(year); self }
    pub fn single_school(mut self, school_id: i64) -> Self { self.opts = self.opts.with_single_school(Some(school_id)); self }
    pub fn use_race_file(mut self, yes: bool) -> Self { self.opts = self.opts.with_race_file(yes); self }
    pub fn use_program_file(mut self, yes: bool) -> Self { self.opts = self.opts.with_program_file(yes); self }
    pub fn excluded_courses<I, S>(mut self, courses: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> { self.opts = self.opts.with_excluded_courses(courses); self }
    pub fn negative_ids(mut self, policy: NegativeIdPolicy) -> Self { self.opts = self.opts.with_negative_ids(policy); self }
    pub fn period_policy(mut self, policy: PeriodPolicy) -> Self { self.opts = self.opts.with_period_policy(policy); self }
    pub fn school_variants<I, S>(mut self, schools: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> { self.opts = self.opts.with_school_variants(schools); self }
    pub fn today(mut self, today: Date) -> Self { self.opts = self.opts.with_today(today); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn io_write_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_write_buffer(bytes); self }

    /// Analyze every source family and write the output files.
    /// Any fatal error aborts the run before the output directory is touched.
    pub fn run(self) -> Result<RunSummary> {
        init_tracing_once();
        let mut opts = self.opts;
        opts.excluded_courses.sort();
        opts.excluded_courses.dedup();

        let out_dir = opts.output_dir().ok_or(EtlError::MissingOutputDir)?;
        let input_dir = opts.resolved_input_dir().ok_or(EtlError::MissingOutputDir)?;
        let target = opts.target_year();
        let years = match target {
            Some(y) => vec![y],
            None => opts.year_range(),
        };
        match target {
            Some(year) => tracing::info!(%year, "processing single year"),
            None => tracing::info!(years = years.len(), "processing all years"),
        }

        let layout = InputLayout::discover(&input_dir, &opts.school_variants);
        let progress = if opts.progress {
            let label = opts.progress_label.clone().unwrap_or_else(|| "Processing SIS extracts".to_string());
            ProgressScope::count(label, total_work_units(years.len(), target.is_some()))
        } else {
            ProgressScope::hidden()
        };
        let mut ctx = BatchContext::new(opts.today()).with_progress(progress);

        ctx.progress.phase("Analyzing course data");
        courses::analyze(&mut ctx, &layout.courses)?;

        for &year in &years {
            ctx.progress.phase(format!("Analyzing teacher data for {year}"));
            teachers::analyze(&mut ctx, &layout.teachers, year)?;
            ctx.progress.phase(format!("Analyzing student demographic data for {year}"));
            students::analyze(&mut ctx, &layout.students, year, &opts)?;
        }
        if opts.use_race_file {
            ctx.progress.phase("Analyzing student race data");
            races::analyze(&mut ctx, &layout.races)?;
        }
        if opts.use_program_file {
            ctx.progress.phase("Analyzing student program data");
            programs::analyze(&mut ctx, &layout.programs)?;
        }
        ctx.progress.phase("Analyzing roster data");
        rosters::analyze(&mut ctx, &layout.rosters, &opts)?;

        for (reason, n) in ctx.tally.iter() {
            tracing::info!(?reason, rows = n, "rows rejected");
        }

        ctx.progress.phase("Preparing output files");
        let out_years = output::projected_years(&ctx.store, target);
        let entities = EntityCounts::of(&ctx.store);
        let report = output::project(&mut ctx.store, &out_dir, &out_years, opts.write_buffer_bytes)
            .with_context(|| format!("writing outputs to {}", out_dir.display()))?;
        ctx.progress.finish(format!("{} files written", report.files_written.len()));

        Ok(RunSummary {
            single_year: target.map(|y| y.to_string()),
            analyzed_years: years.iter().map(|y| y.to_string()).collect(),
            rows: ctx.rows,
            entities,
            rejections: ctx.tally,
            output: report,
        })
    }
}
