use crate::error::ErrorKind;

/// How a claimed run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed {
        result_set_id: i32,
        in_calibration: bool,
    },
    /// The run row was deleted while the engine was solving; nothing was stored.
    Discarded,
    /// The run was reset to ready while the engine was solving; nothing was
    /// stored and the run stays eligible.
    Requeued,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
    /// Another pass claimed the run first.
    Skipped,
    Finished(RunOutcome),
    Failed(ErrorKind),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub selected: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub total: usize,
    pub pending: usize, // not yet marked ready
    pub ready: usize,   // eligible for the next poll
    pub running: usize,
    pub complete: usize,
}
