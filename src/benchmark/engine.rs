//! Run orchestration: model and corpus selection, bounded model fan-out,
//! aggregation, ranking, promotion and recording.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::config::BenchmarkConfig;
use super::context::{ModelContext, RunSettings};
use super::corpus::{CorpusSource, resolve_corpus};
use super::error::{BenchmarkError, BenchmarkResult};
use super::runner::{run_model, unavailable_model};
use super::types::{BenchmarkRun, RunStatistics};
use crate::classifier::{BackendFactory, ClassificationError, ItemClassifier};
use crate::constants::{
    DEFAULT_MIN_CONFIDENCE, DEFAULT_MODEL_TIMEOUT, FEW_MODELS_THRESHOLD,
    HIGH_ERROR_RATE_THRESHOLD, LOW_SUCCESS_RATE_THRESHOLD, MAX_MODEL_WORKERS, default_corpus,
};
use crate::history::RunRecorder;
use crate::metrics::{ModelBenchmarkResult, ModelSamples, aggregate, rank};
use crate::routing::{ModelCatalog, RoutingTable, promote_priorities};
use crate::tree::TreeCache;

/// Benchmarks every selected model over one corpus and ranks them.
pub struct BenchmarkEngine {
    catalog: Arc<dyn ModelCatalog>,
    backends: Arc<dyn BackendFactory>,
    tree_cache: Arc<TreeCache>,
    corpus_source: Option<Arc<dyn CorpusSource>>,
    routing: Option<Arc<dyn RoutingTable>>,
    recorder: Option<RunRecorder>,
    fallback_corpus: Vec<String>,
    model_timeout: Duration,
    inner_concurrency: Option<usize>,
    min_confidence: f64,
}

impl BenchmarkEngine {
    pub fn new(
        catalog: Arc<dyn ModelCatalog>,
        backends: Arc<dyn BackendFactory>,
        tree_cache: Arc<TreeCache>,
    ) -> Self {
        Self {
            catalog,
            backends,
            tree_cache,
            corpus_source: None,
            routing: None,
            recorder: None,
            fallback_corpus: default_corpus(),
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            inner_concurrency: None,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    pub fn with_corpus_source(mut self, source: Arc<dyn CorpusSource>) -> Self {
        self.corpus_source = Some(source);
        self
    }

    /// Routing table that `auto_update_priorities` writes into.
    pub fn with_routing(mut self, routing: Arc<dyn RoutingTable>) -> Self {
        self.routing = Some(routing);
        self
    }

    pub fn with_recorder(mut self, recorder: RunRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Corpus used when neither an explicit list nor the dataset yields items.
    pub fn with_fallback_corpus(mut self, corpus: Vec<String>) -> Self {
        self.fallback_corpus = corpus;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    /// Caps concurrently running items per model. Unbounded by default.
    pub fn with_inner_concurrency(mut self, limit: Option<usize>) -> Self {
        self.inner_concurrency = limit;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn tree_cache(&self) -> &Arc<TreeCache> {
        &self.tree_cache
    }

    pub async fn run(&self, config: &BenchmarkConfig) -> BenchmarkResult<BenchmarkRun> {
        self.run_with_cancel(config, CancellationToken::new()).await
    }

    /// Like [`BenchmarkEngine::run`]; cancelling `cancel` ends every model's
    /// sub-benchmark early, keeping the samples collected so far.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty))]
    pub async fn run_with_cancel(
        &self,
        config: &BenchmarkConfig,
        cancel: CancellationToken,
    ) -> BenchmarkResult<BenchmarkRun> {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let (models, models_available) = self.resolve_models(config).await?;

        let corpus =
            resolve_corpus(config, self.corpus_source.as_deref(), &self.fallback_corpus).await;
        if corpus.is_empty() {
            error!("Benchmark corpus is empty");
            return Err(BenchmarkError::EmptyCorpus);
        }
        let corpus = Arc::new(corpus);

        self.backends.ensure_ready().map_err(|e| {
            error!(error = %e, "Classification backend not ready");
            match e {
                ClassificationError::MissingCredentials(msg) => BenchmarkError::MissingCredentials(msg),
                other => BenchmarkError::MissingCredentials(other.to_string()),
            }
        })?;

        let tree = self.tree_cache.get().await.ok_or_else(|| {
            error!("Classification tree unavailable, aborting benchmark");
            BenchmarkError::TreeUnavailable
        })?;

        let settings = Arc::new(RunSettings {
            max_retries: config.max_retries(),
            retry_delay: config.retry_delay(),
            category: config.category().to_string(),
            model_timeout: self.model_timeout,
            inner_concurrency: self.inner_concurrency,
        });

        info!(
            models = models.len(),
            models_available,
            items = corpus.len(),
            max_retries = settings.max_retries,
            retry_delay_ms = settings.retry_delay.as_millis() as u64,
            "Benchmark started"
        );

        let gate = Semaphore::new(MAX_MODEL_WORKERS);
        let model_runs = models.iter().map(|model| {
            let gate = &gate;
            let tree = Arc::clone(&tree);
            let settings = Arc::clone(&settings);
            let corpus = Arc::clone(&corpus);
            let cancel = cancel.child_token();
            async move {
                // only fails if the gate is closed, which never happens
                let _permit = gate.acquire().await.ok();
                match self.backends.create(model) {
                    Ok(backend) => {
                        let classifier = Arc::new(
                            ItemClassifier::new(model.as_str(), backend)
                                .with_min_confidence(self.min_confidence),
                        );
                        let ctx = Arc::new(ModelContext::new(classifier, tree, settings, cancel));
                        run_model(ctx, corpus).await
                    }
                    Err(e) => unavailable_model(model, corpus.len(), &e),
                }
            }
        });
        let samples: Vec<ModelSamples> = join_all(model_runs).await;

        let mut results: Vec<ModelBenchmarkResult> = samples
            .iter()
            .map(|s| aggregate(s, corpus.len()))
            .collect();
        rank(&mut results);

        let promotion = match (&self.routing, config.auto_update_priorities) {
            (Some(routing), true) => Some(promote_priorities(routing.as_ref(), &results).await),
            (None, true) => {
                warn!("Priority update requested but no routing table configured");
                None
            }
            _ => None,
        };
        let priorities_updated = promotion.as_ref().is_some_and(|p| !p.updated.is_empty());

        let statistics = run_statistics(&results, corpus.len(), models_available);
        let message = status_message(&statistics);
        let timestamp = Utc::now();

        let recorded = match &self.recorder {
            Some(recorder) => match recorder
                .record(&run_id, timestamp, corpus.len(), &results)
                .await
            {
                Ok(_) => true,
                Err(e) => {
                    warn!(error = %e, "Failed to save benchmark history");
                    false
                }
            },
            None => false,
        };

        info!(
            successful_models = statistics.successful_models,
            failed_models = statistics.failed_models,
            overall_success_rate = statistics.overall_success_rate,
            priorities_updated,
            "Benchmark completed"
        );

        Ok(BenchmarkRun {
            id: run_id,
            timestamp,
            test_count: corpus.len(),
            results,
            statistics,
            priorities_updated,
            promotion,
            recorded,
            message,
        })
    }

    /// Returns the models to benchmark and the catalog size before filtering.
    async fn resolve_models(&self, config: &BenchmarkConfig) -> BenchmarkResult<(Vec<String>, usize)> {
        let available = self.catalog.available_models().await.map_err(|e| {
            error!(error = %e, "Failed to list available models");
            BenchmarkError::catalog(e.to_string())
        })?;
        if available.is_empty() {
            error!("No models available for benchmarking");
            return Err(BenchmarkError::NoModelsAvailable);
        }
        let models_available = available.len();

        let mut candidates = available;
        if let Some(provider) = config.provider_filter() {
            let provider_models = self
                .catalog
                .provider_models(provider)
                .await
                .map_err(|e| BenchmarkError::catalog(e.to_string()))?;
            if provider_models.is_empty() {
                warn!(provider, "Provider filter matched no models, keeping all");
            } else {
                info!(provider, models = provider_models.len(), "Filtered models by provider");
                candidates = provider_models;
            }
        }

        let requested = config.model_filter();
        if !requested.is_empty() {
            let selected: Vec<String> = candidates
                .into_iter()
                .filter(|m| requested.contains(m))
                .collect();
            if selected.is_empty() {
                error!(requested = ?requested, "None of the requested models are available");
                return Err(BenchmarkError::ModelsNotAvailable { requested });
            }
            candidates = selected;
        }

        Ok((candidates, models_available))
    }
}

impl std::fmt::Debug for BenchmarkEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkEngine")
            .field("tree_cache", &self.tree_cache)
            .field("has_corpus_source", &self.corpus_source.is_some())
            .field("has_routing", &self.routing.is_some())
            .field("has_recorder", &self.recorder.is_some())
            .field("model_timeout", &self.model_timeout)
            .field("inner_concurrency", &self.inner_concurrency)
            .field("min_confidence", &self.min_confidence)
            .finish()
    }
}

pub fn run_statistics(
    results: &[ModelBenchmarkResult],
    corpus_len: usize,
    models_available: usize,
) -> RunStatistics {
    let successful_models = results.iter().filter(|r| r.status.is_usable()).count();
    let total_successes: u64 = results.iter().map(|r| r.success_count).sum();
    let total_errors: u64 = results.iter().map(|r| r.error_count).sum();
    let total_requests = (corpus_len * results.len()) as u64;
    let overall_success_rate = if total_requests > 0 {
        total_successes as f64 / total_requests as f64
    } else {
        0.0
    };

    RunStatistics {
        successful_models,
        failed_models: results.len() - successful_models,
        total_successes,
        total_errors,
        total_requests,
        overall_success_rate,
        models_tested: results.len(),
        models_available,
    }
}

/// Human-readable summary with filtering and warning notes.
pub fn status_message(stats: &RunStatistics) -> String {
    let mut message = format!(
        "Benchmark completed: {} models tested, {} successful, {} failed",
        stats.models_tested, stats.successful_models, stats.failed_models
    );
    if stats.models_available > stats.models_tested {
        message.push_str(&format!(
            " (filtered from {} available models)",
            stats.models_available
        ));
    }
    if stats.overall_success_rate < LOW_SUCCESS_RATE_THRESHOLD {
        message.push_str(
            ". WARNING: Low success rate - check API keys, rate limits and quota",
        );
    }
    if stats.models_available <= FEW_MODELS_THRESHOLD {
        message.push_str(&format!(
            ". NOTE: Only {} models available - check that the catalog lists every model",
            stats.models_available
        ));
    }
    if stats.total_requests > 0
        && stats.total_errors as f64 / stats.total_requests as f64 > HIGH_ERROR_RATE_THRESHOLD
    {
        message.push_str(
            ". WARNING: High error rate - check API keys, network connectivity and provider status",
        );
    }
    message
}
