use thiserror::Error;

use crate::metrics::ErrorCategory;

/// Errors from classifying a single item.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The backend call failed; `kind` is set when the backend knows the category.
    #[error("backend error: {message}")]
    Backend {
        kind: Option<ErrorCategory>,
        message: String,
    },

    /// The backend picked a code that is not a child of the current node.
    #[error("selected code not found in tree: {code} (under '{parent}')")]
    InvalidChoice { code: String, parent: String },

    /// The walk ended without a single step.
    #[error("no classification decision was made")]
    NoDecision,

    #[error("classification cancelled")]
    Cancelled,

    #[error("missing credentials: {0}")]
    MissingCredentials(String),
}

impl ClassificationError {
    pub fn backend(message: impl Into<String>) -> Self {
        ClassificationError::Backend {
            kind: None,
            message: message.into(),
        }
    }

    pub fn backend_with_kind(kind: ErrorCategory, message: impl Into<String>) -> Self {
        ClassificationError::Backend {
            kind: Some(kind),
            message: message.into(),
        }
    }

    /// Error category used for the per-model breakdown.
    ///
    /// A structured backend kind wins; otherwise the message text is matched.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClassificationError::Backend {
                kind: Some(kind), ..
            } => *kind,
            ClassificationError::Cancelled => ErrorCategory::Timeout,
            ClassificationError::MissingCredentials(_) => ErrorCategory::Auth,
            other => ErrorCategory::from_message(&other.to_string()),
        }
    }
}

pub type ClassificationResult<T> = Result<T, ClassificationError>;
