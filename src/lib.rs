mod config;
mod context;
mod date;
mod error;
mod filters;
mod normalize;
mod output;
mod paths;
mod pipeline;
mod progress;
mod sources;
mod store;
mod tsv;
mod util;

mod courses;
mod programs;
mod races;
mod rosters;
mod students;
mod teachers;

pub use crate::config::{ETLOptions, NegativeIdPolicy, PeriodPolicy, YearSelection};
pub use crate::context::{BatchContext, EntityCounts, RowCounts};
pub use crate::date::{iter_school_years, SchoolYear};
pub use crate::error::{EtlError, SourceError};
pub use crate::filters::{Reject, RejectTally};
pub use crate::pipeline::{RosterETL, RunSummary};
pub use crate::store::{EntityStore, Program, Student};

// Row reader and typed source rows.
pub use crate::tsv::{canonical_header, for_each_present_record, for_each_record, SourceReader, SourceRecord};
pub use crate::sources::{
    CourseRow, ProgramRow, RaceRow, RosterRow, StudentRow, TeacherRow, COURSES_HEADERS, STUDENTS_HEADERS,
    STUDENT_SCHEDULES_HEADERS, TEACHERS_HEADERS,
};

// Scalar normalizers.
pub mod normalizers {
    pub use crate::normalize::*;
}

// Per-family analyzers, for driving a batch by hand.
pub mod analyzers {
    pub use crate::courses::analyze as analyze_courses;
    pub use crate::programs::analyze as analyze_programs;
    pub use crate::races::analyze as analyze_races;
    pub use crate::rosters::{analyze as analyze_rosters, screen as screen_roster_row, AcceptedRow};
    pub use crate::students::{analyze as analyze_students, enrolls_in, parent_name};
    pub use crate::teachers::analyze as analyze_teachers;
}

pub use crate::output::{
    project, projected_years, OutputReport, TsvWriter, COURSES_FILE, COURSE_FIELDS, DEMO_FIELDS, ROSTER_FIELDS,
    USER_FIELDS,
};
pub use crate::paths::InputLayout;
pub use crate::progress::ProgressScope;

// export robust file ops from util so binaries can import from crate root.
pub use crate::util::{clear_dir_files, create_with_backoff, init_tracing_once, open_with_backoff, remove_with_backoff, replace_file_atomic_backoff};
