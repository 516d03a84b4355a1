//! Progress reporting: a count-style bar over the run's estimated work units.

use indicatif::{ProgressBar, ProgressStyle};

/// Work units ticked per analyzer phase.
pub const PHASE_UNITS: u64 = 10;

/// Estimated work units: 11 phases for a single year; 9 fixed phases plus two per year
/// (teachers and students) for a full-range run.
pub fn total_work_units(years: usize, single_year: bool) -> u64 {
    if single_year {
        PHASE_UNITS * 11
    } else {
        PHASE_UNITS * (9 + 2 * years as u64)
    }
}

pub fn make_count_progress(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  elapsed: {elapsed_precise}",
    )
    .unwrap()
    .progress_chars("█▉▊▋▌▍▎▏  ");
    pb.set_style(style);
    if !label.is_empty() {
        pb.set_message(label.to_string());
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// A small wrapper around an optional `indicatif` bar; every method is a no-op when hidden.
/// - `phase(msg)` advances by one phase and relabels the bar
/// - `rows(family, n)` relabels every 100 rows without advancing
/// - `finish(msg)` finalizes the bar with a message
#[derive(Clone, Default)]
pub struct ProgressScope {
    pb: Option<ProgressBar>,
}

impl ProgressScope {
    pub fn count<T: Into<String>>(label: T, total: u64) -> Self {
        Self { pb: Some(make_count_progress(total, &label.into())) }
    }

    pub fn hidden() -> Self {
        Self { pb: None }
    }

    pub fn phase(&self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::info!("{msg}");
        if let Some(pb) = &self.pb {
            pb.inc(PHASE_UNITS);
            pb.set_message(msg);
        }
    }

    #[inline]
    pub fn rows(&self, family: &str, n: u64) {
        if n % 100 != 0 {
            return;
        }
        tracing::debug!("{n} {family} records analyzed");
        if let Some(pb) = &self.pb {
            pb.set_message(format!("{n} {family} records analyzed"));
        }
    }

    pub fn position(&self) -> u64 {
        self.pb.as_ref().map_or(0, |pb| pb.position())
    }

    pub fn finish<T: Into<String>>(&self, msg: T) {
        if let Some(pb) = &self.pb {
            pb.finish_with_message(msg.into());
        }
    }
}
