use thiserror::Error;

use crate::metrics::ErrorCategory;

/// Conditions that abort a whole run.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("no models available for benchmarking")]
    NoModelsAvailable,

    #[error("none of the requested models are available: {}", join(.requested))]
    ModelsNotAvailable { requested: Vec<String> },

    #[error("benchmark corpus is empty")]
    EmptyCorpus,

    #[error("classification backend is not configured: {0}")]
    MissingCredentials(String),

    #[error("classification tree is unavailable (storage failed or holds no nodes)")]
    TreeUnavailable,

    #[error("failed to list models ({category}): {message}{}", catalog_hint(.category))]
    Catalog {
        category: ErrorCategory,
        message: String,
    },
}

fn join(models: &[String]) -> String {
    models.join(", ")
}

fn catalog_hint(category: &ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::Auth => "; check the API key",
        ErrorCategory::Network => "; check network connectivity",
        ErrorCategory::Timeout => "; the provider timed out, retry later",
        ErrorCategory::RateLimit | ErrorCategory::QuotaExceeded => {
            "; the provider is throttling requests, retry later"
        }
        ErrorCategory::Other => "",
    }
}

impl BenchmarkError {
    pub fn catalog(message: impl Into<String>) -> Self {
        let message = message.into();
        BenchmarkError::Catalog {
            category: ErrorCategory::from_message(&message),
            message,
        }
    }
}

pub type BenchmarkResult<T> = Result<T, BenchmarkError>;
