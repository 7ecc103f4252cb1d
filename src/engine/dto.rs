use super::types::EngineOutput;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct SubmitResponse {
    pub id: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SolveStatus {
    pub id: String,
    pub status: String,
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub output: Option<EngineOutput>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VersionResponse {
    pub version: String,
}
