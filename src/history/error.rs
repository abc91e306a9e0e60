use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("history task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("corrupt history row: {0}")]
    Corrupt(String),
}

pub type HistoryResult<T> = Result<T, HistoryError>;
