//! One model's sub-benchmark: every corpus item as its own retrying task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::context::ModelContext;
use crate::classifier::ClassificationError;
use crate::metrics::{ErrorCategory, ItemOutcome, ModelSamples};

/// Runs every item of `corpus` against one model and collects the outcomes.
///
/// All items start at once (bounded only by the optional inner gate). A
/// watchdog cancels the model's token once the timeout elapses; outcomes of
/// items that finished before that are kept. Every task is joined before the
/// samples are returned, and a panicking task counts as an `other` failure.
#[instrument(skip_all, fields(model = %ctx.model, items = corpus.len()))]
pub async fn run_model(ctx: Arc<ModelContext>, corpus: Arc<Vec<String>>) -> ModelSamples {
    let started = Instant::now();
    info!("Model benchmark started");

    let watchdog = {
        let token = ctx.cancel.clone();
        let timeout = ctx.settings.model_timeout;
        let model = ctx.model.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    warn!(model = %model, timeout_ms = timeout.as_millis() as u64, "Model timeout reached, cancelling in-flight items");
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        })
    };

    let mut tasks = JoinSet::new();
    let mut spawned_at = HashMap::with_capacity(corpus.len());
    for item in corpus.iter() {
        let ctx = Arc::clone(&ctx);
        let item = item.clone();
        let handle = tasks.spawn(async move { run_item(&ctx, &item).await });
        spawned_at.insert(handle.id(), Instant::now());
    }

    let mut outcomes = Vec::with_capacity(corpus.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                warn!(error = %e, "Item task aborted, counting as failure");
                let duration = spawned_at
                    .get(&e.id())
                    .map_or(Duration::ZERO, Instant::elapsed);
                outcomes.push(ItemOutcome::Failure {
                    duration,
                    category: ErrorCategory::Other,
                    attempts: Some(1),
                });
            }
        }
    }
    watchdog.abort();

    let elapsed = started.elapsed();
    let successes = outcomes.iter().filter(|o| o.is_success()).count();
    info!(
        successes,
        failures = outcomes.len() - successes,
        elapsed_ms = elapsed.as_millis() as u64,
        "Model benchmark finished"
    );

    ModelSamples {
        model: ctx.model.clone(),
        outcomes,
        elapsed,
    }
}

/// Samples for a model whose backend could not be created: every item failed
/// on its first attempt.
pub fn unavailable_model(model: &str, corpus_len: usize, error: &ClassificationError) -> ModelSamples {
    warn!(model, error = %error, "Backend unavailable, every item counted as failed");
    let category = error.category();
    ModelSamples {
        model: model.to_string(),
        outcomes: (0..corpus_len)
            .map(|_| ItemOutcome::Failure {
                duration: Duration::ZERO,
                category,
                attempts: Some(1),
            })
            .collect(),
        elapsed: Duration::ZERO,
    }
}

/// Classifies one item with retries until it succeeds, runs out of attempts
/// or the model is cancelled.
async fn run_item(ctx: &ModelContext, item: &str) -> ItemOutcome {
    let _permit = match &ctx.inner_gate {
        Some(gate) => tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return cancelled_before_start(item),
            permit = gate.acquire() => permit.ok(),
        },
        None => None,
    };

    let settings = &ctx.settings;
    let mut first_attempt: Option<Instant> = None;
    let mut attempts: u32 = 0;
    let mut last_error: Option<ClassificationError> = None;

    for attempt in 0..settings.max_retries {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let started = *first_attempt.get_or_insert_with(Instant::now);
        attempts += 1;

        let result = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(ClassificationError::Cancelled),
            result = ctx.classifier.classify(&ctx.tree, item, &settings.category) => result,
        };

        match result {
            Ok(classification) => {
                debug!(
                    item,
                    code = %classification.final_code,
                    confidence = classification.final_confidence,
                    attempts,
                    "Item classified"
                );
                return ItemOutcome::Success {
                    duration: started.elapsed(),
                    confidence: classification.final_confidence,
                    ai_calls: classification.ai_calls_count,
                    attempts,
                };
            }
            Err(ClassificationError::Cancelled) => {
                last_error = Some(ClassificationError::Cancelled);
                break;
            }
            Err(e) => {
                last_error = Some(e);
                if attempt + 1 < settings.max_retries {
                    let delay = settings.backoff(attempt);
                    debug!(item, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "Retrying item");
                    tokio::select! {
                        biased;
                        _ = ctx.cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    let Some(started) = first_attempt else {
        return cancelled_before_start(item);
    };
    let category = last_error
        .as_ref()
        .map_or(ErrorCategory::Timeout, ClassificationError::category);
    warn!(
        item,
        attempts,
        category = %category,
        error = %last_error.as_ref().map(ToString::to_string).unwrap_or_default(),
        "Item failed"
    );
    ItemOutcome::Failure {
        duration: started.elapsed(),
        category,
        attempts: Some(attempts),
    }
}

/// The model was cancelled before this item made a single attempt.
///
/// Counted as a `timeout` error but left out of the attempt average.
fn cancelled_before_start(item: &str) -> ItemOutcome {
    debug!(item, "Item cancelled before its first attempt");
    ItemOutcome::Failure {
        duration: Duration::ZERO,
        category: ErrorCategory::Timeout,
        attempts: None,
    }
}
