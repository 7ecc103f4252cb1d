pub mod model;
pub mod resolver;

pub use model::{AdjustmentMap, Adjustments, AreaConstraint, LinkedOverride, Resolution};
pub use resolver::ModificationResolver;
