//! Root-to-leaf walk over the shared tree.

use std::sync::Arc;
use std::time::Instant;

use moka::sync::Cache;
use tracing::debug;

use super::backend::ClassificationBackend;
use super::error::{ClassificationError, ClassificationResult};
use super::types::{ClassificationStep, ItemClassification, StepChoice, StepDecision, StepRequest};
use crate::constants::{DEFAULT_MIN_CONFIDENCE, DEFAULT_STEP_CACHE_CAPACITY};
use crate::tree::{ClassificationTree, TreeNode};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StepKey {
    item: String,
    category: String,
    parent: String,
}

/// Classifies items with one backend against any tree it is handed.
///
/// Holds no reference to the tree itself, so one classifier can serve many
/// concurrent walks over the same `Arc<ClassificationTree>`.
pub struct ItemClassifier {
    model: String,
    backend: Arc<dyn ClassificationBackend>,
    min_confidence: f64,
    step_cache: Option<Cache<StepKey, StepDecision>>,
}

impl ItemClassifier {
    pub fn new(model: impl Into<String>, backend: Arc<dyn ClassificationBackend>) -> Self {
        Self {
            model: model.into(),
            backend,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            step_cache: Some(Cache::new(DEFAULT_STEP_CACHE_CAPACITY)),
        }
    }

    /// Steps below this confidence end the walk.
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_step_cache_capacity(mut self, capacity: u64) -> Self {
        self.step_cache = Some(Cache::new(capacity));
        self
    }

    pub fn without_step_cache(mut self) -> Self {
        self.step_cache = None;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Walks `tree` from the root, asking the backend to pick a child at each level.
    ///
    /// The walk ends at a leaf, on a stop decision, or after the first step whose
    /// confidence falls below the threshold. On a stop decision the final
    /// confidence is the one reported with the stop. Any backend error aborts the walk and
    /// is returned unchanged; partial paths are never returned.
    pub async fn classify(
        &self,
        tree: &ClassificationTree,
        item: &str,
        category: &str,
    ) -> ClassificationResult<ItemClassification> {
        let started = Instant::now();
        let mut current: &TreeNode = tree.root();
        let mut steps: Vec<ClassificationStep> = Vec::new();
        let mut ai_calls: u32 = 0;
        let mut cache_hits: u32 = 0;
        let mut stop_confidence: Option<f64> = None;

        while !current.is_leaf() {
            let step_started = Instant::now();
            let key = StepKey {
                item: item.to_string(),
                category: category.to_string(),
                parent: current.code().to_string(),
            };

            let cached = self.step_cache.as_ref().and_then(|c| c.get(&key));
            let from_cache = cached.is_some();
            let decision = match cached {
                Some(decision) => {
                    cache_hits += 1;
                    decision
                }
                None => {
                    let request = StepRequest {
                        item,
                        category,
                        node: current,
                        path: tree.path(current.code()),
                        candidates: tree.children(current).collect(),
                    };
                    ai_calls += 1;
                    self.backend.resolve_step(&request).await?
                }
            };

            let next = match &decision.choice {
                StepChoice::Stop => {
                    debug!(model = %self.model, item, at = current.code(), "Backend chose to stop");
                    stop_confidence = Some(decision.confidence.clamp(0.0, 1.0));
                    break;
                }
                StepChoice::Child(code) => tree
                    .children(current)
                    .find(|child| child.code() == code)
                    .ok_or_else(|| ClassificationError::InvalidChoice {
                        code: code.clone(),
                        parent: current.code().to_string(),
                    })?,
            };

            if !from_cache && let Some(cache) = &self.step_cache {
                cache.insert(key, decision.clone());
            }

            let confidence = decision.confidence.clamp(0.0, 1.0);
            steps.push(ClassificationStep {
                level: next.level(),
                code: next.code().to_string(),
                name: next.name().to_string(),
                confidence,
                reasoning: decision.reasoning,
                duration_ms: millis(step_started),
                cached: from_cache,
            });
            current = next;

            if confidence < self.min_confidence {
                debug!(
                    model = %self.model,
                    item,
                    code = current.code(),
                    confidence,
                    "Confidence below threshold, stopping walk"
                );
                break;
            }
        }

        let last = steps.last().ok_or(ClassificationError::NoDecision)?;

        Ok(ItemClassification {
            item: item.to_string(),
            category: category.to_string(),
            final_code: last.code.clone(),
            final_name: last.name.clone(),
            final_confidence: stop_confidence.unwrap_or(last.confidence),
            ai_calls_count: ai_calls,
            cache_hits,
            steps,
            duration_ms: millis(started),
        })
    }
}

impl std::fmt::Debug for ItemClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemClassifier")
            .field("model", &self.model)
            .field("min_confidence", &self.min_confidence)
            .field("step_cache", &self.step_cache.is_some())
            .finish()
    }
}

fn millis(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
