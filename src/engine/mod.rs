pub mod dto;
pub mod http;
#[cfg(test)]
pub mod testing;
pub mod types;

pub use http::HttpScenarioEngine;
pub use types::{EngineError, EngineInfeasibility, EngineOutput, EngineRequest, ScenarioEngine};
