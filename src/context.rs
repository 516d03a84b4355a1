use crate::filters::RejectTally;
use crate::progress::ProgressScope;
use crate::store::EntityStore;
use serde::Serialize;
use time::Date;

/// Rows read per source family (summed over every pass and variant file).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RowCounts {
    pub courses: u64,
    pub teachers: u64,
    pub students: u64,
    pub races: u64,
    pub programs: u64,
    pub rosters: u64,
}

/// Distinct entities held in the store after analysis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub students: usize,
    pub users: usize,
    pub courses: usize,
}

impl EntityCounts {
    pub fn of(store: &EntityStore) -> Self {
        Self { students: store.student_count(), users: store.user_count(), courses: store.course_count() }
    }
}

/// State of one batch run, owned by the orchestrator and lent to each analyzer and
/// then to the projector. Nothing outlives the run.
pub struct BatchContext {
    pub store: EntityStore,
    pub tally: RejectTally,
    pub rows: RowCounts,
    pub today: Date,
    pub progress: ProgressScope,
}

impl BatchContext {
    pub fn new(today: Date) -> Self {
        Self {
            store: EntityStore::new(),
            tally: RejectTally::default(),
            rows: RowCounts::default(),
            today,
            progress: ProgressScope::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressScope) -> Self {
        self.progress = progress;
        self
    }
}
