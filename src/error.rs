use crate::engine::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,  // bad modification rows or engine/data mismatch; retrying fails the same way
    Infrastructure, // storage or engine unavailable; a later poll may succeed
    Internal,       // panics and other bugs
}

#[derive(thiserror::Error, Debug)]
pub enum ModelRunError {
    #[error("model run {run_id} has no default {what} modification")]
    MissingDefault { run_id: i32, what: &'static str },
    #[error("model run {run_id} has {count} default {what} modifications, expected exactly one")]
    DuplicateDefault {
        run_id: i32,
        what: &'static str,
        count: usize,
    },
    #[error("invalid modification {id} on model run {run_id}: {reason}")]
    InvalidModification {
        run_id: i32,
        id: i32,
        reason: String,
    },
    #[error("{entity} {id} does not exist")]
    UnresolvedReference { entity: &'static str, id: i32 },
    #[error("scenario engine returned unknown {entity} code '{code}' for model area {model_area_id}")]
    UnknownCode {
        entity: &'static str,
        code: String,
        model_area_id: i32,
    },
    #[error("model run {run_id} holds regions static but has no base case with results")]
    MissingBaseCase { run_id: i32 },
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("scenario engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ModelRunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelRunError::MissingDefault { .. }
            | ModelRunError::DuplicateDefault { .. }
            | ModelRunError::InvalidModification { .. }
            | ModelRunError::UnresolvedReference { .. }
            | ModelRunError::UnknownCode { .. }
            | ModelRunError::MissingBaseCase { .. } => ErrorKind::Configuration,
            ModelRunError::Db(_) => ErrorKind::Infrastructure,
            ModelRunError::Engine(e) if e.retryable() => ErrorKind::Infrastructure,
            ModelRunError::Engine(_) => ErrorKind::Configuration,
            ModelRunError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether re-polling the same run can plausibly succeed.
    pub fn retryable(&self) -> bool {
        self.kind() == ErrorKind::Infrastructure
    }
}
