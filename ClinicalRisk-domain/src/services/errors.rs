use thiserror::Error;
use clinical_risk_data::repository::RepositoryError;

/// Stable machine-readable error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidInput,
    InvalidResponse,
    ServiceUnavailable,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::Storage => "storage_error",
        }
    }
}

/// Errors surfaced by the prediction pipeline
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PredictionError {
    /// Patient or prediction does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Caller's role is not allowed to perform the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed identifiers or update values
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The model replied, but not with a usable risk assessment
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    /// The model endpoint could not be reached in time
    #[error("Risk model unavailable: {0}")]
    ServiceUnavailable(String),

    /// Relational store failure not caused by the caller
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PredictionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictionError::NotFound(_) => ErrorKind::NotFound,
            PredictionError::Forbidden(_) => ErrorKind::Forbidden,
            PredictionError::InvalidInput(_) => ErrorKind::InvalidInput,
            PredictionError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            PredictionError::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            PredictionError::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<RepositoryError> for PredictionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => PredictionError::NotFound(msg),
            RepositoryError::Validation(msg) | RepositoryError::Conflict(msg) => PredictionError::InvalidInput(msg),
            other => PredictionError::Storage(other.to_string()),
        }
    }
}
