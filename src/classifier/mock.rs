//! Scriptable in-process backend for tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::backend::{BackendFactory, ClassificationBackend};
use super::error::{ClassificationError, ClassificationResult};
use super::types::{StepDecision, StepRequest};

/// How a [`MockBackend`] answers. Always picks the first candidate.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub latency: Duration,
    pub confidence: f64,
    /// Every call fails with this message.
    pub fail_with: Option<String>,
    /// The first `n` calls for each item fail with `fail_with` (or a network error).
    pub fail_first: u32,
    /// Calls for this item panic.
    pub panic_on: Option<String>,
    /// Extra latency for specific items.
    pub slow_items: HashMap<String, Duration>,
    /// Stop after this many levels.
    pub max_depth: Option<u32>,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            confidence: 0.9,
            fail_with: None,
            fail_first: 0,
            panic_on: None,
            slow_items: HashMap::new(),
            max_depth: None,
        }
    }
}

impl MockBehavior {
    pub fn succeeding(confidence: f64, latency: Duration) -> Self {
        Self {
            confidence,
            latency,
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn with_fail_first(mut self, n: u32) -> Self {
        self.fail_first = n;
        self
    }

    pub fn with_panic_on(mut self, item: &str) -> Self {
        self.panic_on = Some(item.to_string());
        self
    }

    pub fn with_slow_item(mut self, item: &str, latency: Duration) -> Self {
        self.slow_items.insert(item.to_string(), latency);
        self
    }

    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

/// Backend that records every call and answers from a [`MockBehavior`].
#[derive(Debug)]
pub struct MockBackend {
    behavior: MockBehavior,
    calls: Mutex<HashMap<String, Vec<Instant>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockBackend {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().map(Vec::len).sum()
    }

    pub fn calls_for(&self, item: &str) -> usize {
        self.calls.lock().get(item).map_or(0, Vec::len)
    }

    /// Start instants of every call for `item`, in call order.
    pub fn call_times(&self, item: &str) -> Vec<Instant> {
        self.calls.lock().get(item).cloned().unwrap_or_default()
    }

    /// Highest number of concurrently running calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClassificationBackend for MockBackend {
    async fn resolve_step(&self, request: &StepRequest<'_>) -> ClassificationResult<StepDecision> {
        let call_number = {
            let mut calls = self.calls.lock();
            let entry = calls.entry(request.item.to_string()).or_default();
            entry.push(Instant::now());
            entry.len() as u32
        };

        let now_running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_running, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let behavior = &self.behavior;
        let latency = behavior
            .slow_items
            .get(request.item)
            .copied()
            .unwrap_or(behavior.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if behavior.panic_on.as_deref() == Some(request.item) {
            panic!("mock backend panicked on '{}'", request.item);
        }

        if call_number <= behavior.fail_first {
            let message = behavior
                .fail_with
                .clone()
                .unwrap_or_else(|| "network error: connection reset".to_string());
            return Err(ClassificationError::backend(message));
        }
        if behavior.fail_first == 0
            && let Some(message) = &behavior.fail_with
        {
            return Err(ClassificationError::backend(message.clone()));
        }

        let depth = request.path.len() as u32;
        match (request.candidates.first(), behavior.max_depth) {
            (Some(_), Some(max)) if depth >= max => Ok(StepDecision::stop(behavior.confidence)),
            (Some(first), _) => Ok(StepDecision::child(first.code(), behavior.confidence)
                .with_reasoning("first candidate")),
            (None, _) => Ok(StepDecision::stop(behavior.confidence)),
        }
    }
}

/// Factory handing out [`MockBackend`]s by model name.
#[derive(Debug, Default)]
pub struct MockBackendFactory {
    behaviors: HashMap<String, MockBehavior>,
    fallback: Option<MockBehavior>,
    missing_credentials: bool,
    created: Mutex<HashMap<String, Arc<MockBackend>>>,
}

impl MockBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: &str, behavior: MockBehavior) -> Self {
        self.behaviors.insert(model.to_string(), behavior);
        self
    }

    /// Behavior for models without an explicit entry.
    pub fn with_fallback(mut self, behavior: MockBehavior) -> Self {
        self.fallback = Some(behavior);
        self
    }

    pub fn with_missing_credentials(mut self) -> Self {
        self.missing_credentials = true;
        self
    }

    /// The backend created for `model`, if any.
    pub fn backend(&self, model: &str) -> Option<Arc<MockBackend>> {
        self.created.lock().get(model).cloned()
    }

    pub fn created_models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.created.lock().keys().cloned().collect();
        models.sort();
        models
    }
}

impl BackendFactory for MockBackendFactory {
    fn ensure_ready(&self) -> ClassificationResult<()> {
        if self.missing_credentials {
            return Err(ClassificationError::MissingCredentials(
                "mock credentials disabled".to_string(),
            ));
        }
        Ok(())
    }

    fn create(&self, model: &str) -> ClassificationResult<Arc<dyn ClassificationBackend>> {
        let behavior = self
            .behaviors
            .get(model)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| ClassificationError::backend(format!("unknown mock model: {}", model)))?;

        let backend = Arc::new(MockBackend::new(behavior));
        self.created
            .lock()
            .insert(model.to_string(), Arc::clone(&backend));
        Ok(backend)
    }
}
