use crate::date::SchoolYear;
use std::path::{Path, PathBuf};
use time::{Date, OffsetDateTime};

/// Which school years a run analyzes and exports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum YearSelection {
    /// Every year from `first_year` through the current school year.
    #[default]
    All,
    Single(SchoolYear),
    /// The current school year (August 15 cutover).
    Auto,
}

impl std::str::FromStr for YearSelection {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "auto" => Ok(Self::Auto),
            other => other.parse().map(Self::Single),
        }
    }
}

/// Roster rows whose term id or section id carries a minus sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NegativeIdPolicy {
    /// The sign marks a dropped section: reject the row.
    #[default]
    Drop,
    /// Keep the row with the sign removed.
    StripSign,
}

/// Period extraction behavior for roster rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeriodPolicy {
    /// Reject rows without a resolvable period (otherwise they are kept with an empty period).
    pub drop_unresolved: bool,
    /// Upper bound applied to extracted periods.
    pub clamp_max: Option<u32>,
}

impl Default for PeriodPolicy {
    fn default() -> Self {
        Self { drop_unresolved: true, clamp_max: Some(9) }
    }
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct ETLOptions {
    pub output_base_dir: Option<PathBuf>, // required; outputs land in <base>/datafiles
    pub input_dir: Option<PathBuf>,       // if None, <base>/psexport
    pub year: YearSelection,
    pub first_year: SchoolYear,           // first year of the full range
    pub single_school: Option<i64>,
    pub use_race_file: bool,
    pub use_program_file: bool,
    pub excluded_courses: Vec<String>,
    pub negative_ids: NegativeIdPolicy,
    pub period: PeriodPolicy,
    pub school_variants: Vec<String>,     // per-school course/roster file suffixes
    pub today: Option<Date>,              // if None, the current UTC date
    pub progress: bool,
    pub progress_label: Option<String>,

    // IO tuning
    pub write_buffer_bytes: usize,
}

impl Default for ETLOptions {
    fn default() -> Self {
        Self {
            output_base_dir: None,
            input_dir: None,
            year: YearSelection::All,
            first_year: SchoolYear::from_start(1),
            single_school: None,
            use_race_file: false,
            use_program_file: false,
            excluded_courses: default_excluded_courses(),
            negative_ids: NegativeIdPolicy::Drop,
            period: PeriodPolicy::default(),
            school_variants: vec!["bacich".to_string(), "kent".to_string()],
            today: None,
            progress: false,
            progress_label: None,
            write_buffer_bytes: 64 * 1024,
        }
    }
}

/// Attendance placeholder courses that never appear on a roster.
pub fn default_excluded_courses() -> Vec<String> {
    vec!["AAAA".to_string(), "oooo".to_string()]
}

impl ETLOptions {
    pub fn with_output_base_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_base_dir = Some(dir.as_ref().to_path_buf());
        self
    }
    pub fn with_input_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.input_dir = Some(dir.as_ref().to_path_buf());
        self
    }
    pub fn with_year(mut self, year: YearSelection) -> Self {
        self.year = year;
        self
    }
    pub fn with_first_year(mut self, year: SchoolYear) -> Self {
        self.first_year = year;
        self
    }
    pub fn with_single_school(mut self, school_id: Option<i64>) -> Self {
        self.single_school = school_id;
        self
    }
    pub fn with_race_file(mut self, yes: bool) -> Self {
        self.use_race_file = yes;
        self
    }
    pub fn with_program_file(mut self, yes: bool) -> Self {
        self.use_program_file = yes;
        self
    }
    pub fn with_excluded_courses<I, S>(mut self, courses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_courses = courses.into_iter().map(Into::into).collect();
        self.excluded_courses.sort();
        self.excluded_courses.dedup();
        self
    }
    pub fn with_negative_ids(mut self, policy: NegativeIdPolicy) -> Self {
        self.negative_ids = policy;
        self
    }
    pub fn with_period_policy(mut self, policy: PeriodPolicy) -> Self {
        self.period = policy;
        self
    }
    pub fn with_school_variants<I, S>(mut self, schools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.school_variants = schools.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_today(mut self, today: Date) -> Self {
        self.today = Some(today);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
    pub fn with_write_buffer(mut self, bytes: usize) -> Self {
        self.write_buffer_bytes = bytes.max(8 * 1024);
        self
    }

    // -------- Derived settings --------

    pub fn today(&self) -> Date {
        self.today.unwrap_or_else(|| OffsetDateTime::now_utc().date())
    }

    pub fn resolved_input_dir(&self) -> Option<PathBuf> {
        self.input_dir
            .clone()
            .or_else(|| self.output_base_dir.as_ref().map(|b| b.join("psexport")))
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output_base_dir.as_ref().map(|b| b.join("datafiles"))
    }

    /// Every school year of the configured range, oldest first.
    pub fn year_range(&self) -> Vec<SchoolYear> {
        crate::date::iter_school_years(self.first_year, SchoolYear::auto(self.today())).collect()
    }

    /// The single year to process, or `None` for a full-range run. A selected year outside
    /// the configured range falls back to the full range.
    pub fn target_year(&self) -> Option<SchoolYear> {
        let year = match self.year {
            YearSelection::All => return None,
            YearSelection::Single(y) => y,
            YearSelection::Auto => SchoolYear::auto(self.today()),
        };
        if self.year_range().contains(&year) {
            Some(year)
        } else {
            tracing::warn!(%year, "selected year is outside the configured range; processing all years");
            None
        }
    }

    /// Options from `SIS_*` environment variables on top of the defaults.
    /// - SIS_OUTPUT_BASE_DIR, SIS_INPUT_DIR: directories
    /// - SIS_YEAR: `auto`, `all` or `YY-YY`
    /// - SIS_SCHOOL: numeric school id
    /// - SIS_USE_RACE_FILE, SIS_USE_PROGRAM_FILE: `1`/`true`/`yes`
    /// - SIS_EXCLUDE_COURSES: comma/semicolon/space separated course numbers, added to the defaults
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        if let Some(dir) = env_nonempty("SIS_OUTPUT_BASE_DIR") {
            opts = opts.with_output_base_dir(dir);
        }
        if let Some(dir) = env_nonempty("SIS_INPUT_DIR") {
            opts = opts.with_input_dir(dir);
        }
        if let Some(year) = env_nonempty("SIS_YEAR") {
            match year.parse::<YearSelection>() {
                Ok(sel) => opts.year = sel,
                Err(e) => tracing::warn!("ignoring SIS_YEAR={year}: {e}"),
            }
        }
        if let Some(school) = env_nonempty("SIS_SCHOOL") {
            match school.trim().parse::<i64>() {
                Ok(id) => opts.single_school = Some(id),
                Err(_) => tracing::warn!("ignoring non-numeric SIS_SCHOOL={school}"),
            }
        }
        opts.use_race_file = env_flag("SIS_USE_RACE_FILE");
        opts.use_program_file = env_flag("SIS_USE_PROGRAM_FILE");
        if let Some(extra) = env_nonempty("SIS_EXCLUDE_COURSES") {
            merge_excluded_courses(&mut opts.excluded_courses, &extra);
        }
        opts
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str) -> bool {
    env_nonempty(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "y"))
        .unwrap_or(false)
}

/// Add separated course numbers from `extra` to `target`, then sort + dedup.
/// Course numbers are case-sensitive (`oooo` and `OOOO` are different courses).
pub fn merge_excluded_courses(target: &mut Vec<String>, extra: &str) {
    for raw in extra.split(|c: char| c == ',' || c == ';' || c.is_whitespace()) {
        let n = raw.trim();
        if !n.is_empty() {
            target.push(n.to_string());
        }
    }
    target.sort();
    target.dedup();
}
