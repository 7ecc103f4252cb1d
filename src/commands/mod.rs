pub mod app_command;
pub mod calibration;
pub mod rerun;

pub use app_command::{AppCommand, RerunTarget, USAGE};
