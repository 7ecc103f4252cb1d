pub mod infeasibility;
pub mod ingest;

pub use ingest::{IngestContext, ResultsIngestor};
