use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing entry not found for model: {0}")]
    NotFound(String),

    #[error("routing write failed: {0}")]
    WriteFailed(String),

    #[error("routing file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("routing file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RoutingResult<T> = Result<T, RoutingError>;
