pub mod model;
pub mod service;
pub mod worker;

pub use model::{PassSummary, Processed, RunOutcome, RunStats};
pub use service::SchedulerService;
