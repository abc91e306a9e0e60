use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::classifier::ItemClassifier;
use crate::tree::ClassificationTree;

/// Per-item retry policy and classification inputs shared by one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Attempts per item, at least 1.
    pub max_retries: u32,
    /// Base backoff; attempt `i` is followed by `retry_delay * 2^i`.
    pub retry_delay: Duration,
    pub category: String,
    /// Wall-clock budget of one model's sub-benchmark.
    pub model_timeout: Duration,
    /// Cap on concurrently running items per model; `None` is unbounded.
    pub inner_concurrency: Option<usize>,
}

impl RunSettings {
    /// Delay after failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Everything the item tasks of one model share.
///
/// Cancelling `cancel` stops every outstanding attempt and backoff sleep of
/// this model; samples already produced are kept.
pub struct ModelContext {
    pub model: String,
    pub classifier: Arc<ItemClassifier>,
    pub tree: Arc<ClassificationTree>,
    pub settings: Arc<RunSettings>,
    pub cancel: CancellationToken,
    pub(crate) inner_gate: Option<Semaphore>,
}

impl ModelContext {
    pub fn new(
        classifier: Arc<ItemClassifier>,
        tree: Arc<ClassificationTree>,
        settings: Arc<RunSettings>,
        cancel: CancellationToken,
    ) -> Self {
        let inner_gate = settings
            .inner_concurrency
            .map(|permits| Semaphore::new(permits.max(1)));
        Self {
            model: classifier.model().to_string(),
            classifier,
            tree,
            settings,
            cancel,
            inner_gate,
        }
    }
}

impl std::fmt::Debug for ModelContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelContext")
            .field("model", &self.model)
            .field("settings", &self.settings)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
