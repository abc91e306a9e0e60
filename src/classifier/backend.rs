use std::sync::Arc;

use async_trait::async_trait;

use super::error::ClassificationResult;
use super::types::{StepDecision, StepRequest};

/// A model that resolves one level of the hierarchy at a time.
///
/// Implementations must be safe to call concurrently; the benchmark fans every
/// corpus item of a model out onto the same backend instance.
#[async_trait]
pub trait ClassificationBackend: Send + Sync {
    async fn resolve_step(&self, request: &StepRequest<'_>) -> ClassificationResult<StepDecision>;
}

/// Hands out one backend per model name.
pub trait BackendFactory: Send + Sync {
    /// Fails with `MissingCredentials` when no model could be called at all.
    fn ensure_ready(&self) -> ClassificationResult<()>;

    fn create(&self, model: &str) -> ClassificationResult<Arc<dyn ClassificationBackend>>;
}
