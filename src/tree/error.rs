use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced while loading or building the classification tree.
pub enum TreeError {
    /// The node storage could not be read.
    #[error("classification storage unavailable: {0}")]
    Storage(String),

    /// Storage returned no usable nodes.
    #[error("classification tree is empty")]
    Empty,

    /// SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Convenience result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
