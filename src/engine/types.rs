use crate::dataset::DataFrame;
use crate::modification::Adjustments;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Everything the engine needs to solve one model run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineRequest {
    pub model_run_id: i32,
    pub model_area: String,
    pub calibration: DataFrame,
    pub rainfall: Option<DataFrame>,
    pub adjustments: Adjustments,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineInfeasibility {
    pub region: String,
    pub year: i32,
    pub description: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineOutput {
    pub results: DataFrame,
    #[serde(default)]
    pub rainfall_results: Option<DataFrame>,
    #[serde(default)]
    pub infeasibilities: Vec<EngineInfeasibility>,
}

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("missing env {0}")]
    MissingEnv(&'static str),
    #[error("http error: {0}")]
    Http(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("solve failed: {0}")]
    Failed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl EngineError {
    /// Transport problems clear up on their own; a rejected or failed solve
    /// fails the same way next time.
    pub fn retryable(&self) -> bool {
        matches!(self, EngineError::Http(_))
    }
}

/// The external optimizer. Implementations must be shareable across tasks.
#[async_trait]
pub trait ScenarioEngine: Send + Sync {
    /// Identifies the engine build; stored on every result set.
    async fn version(&self) -> Result<String, EngineError>;

    async fn run(&self, request: EngineRequest) -> Result<EngineOutput, EngineError>;
}
