mod columns;
pub mod frame;
pub mod record_set;

pub use columns::{finite_or_null, NumericColumns, WritableColumns};
pub use frame::{DataFrame, DataRow};
pub use record_set::{project, RecordSet};
