//! Test fixtures for integration tests.

use std::sync::Arc;
use std::time::Duration;

use verdict::benchmark::{BenchmarkConfig, BenchmarkEngine};
use verdict::classifier::{MockBackendFactory, MockBehavior};
use verdict::routing::{InMemoryRoutingTable, RoutingEntry};
use verdict::tree::{ClassificationNode, MockTreeStorage, TreeCache};

pub const ITEMS: [&str; 3] = ["hex bolt M8x40", "wood screw 4x30", "spring washer M6"];

/// Three-level fastener hierarchy under one section, plus an unrelated section.
pub fn fastener_nodes() -> Vec<ClassificationNode> {
    vec![
        ClassificationNode::new("C", "Manufacturing", None, 0),
        ClassificationNode::new("C.25", "Fabricated metal products", Some("C"), 1),
        ClassificationNode::new("C.25.94", "Fasteners and screw machine products", Some("C.25"), 2),
        ClassificationNode::new("C.25.99", "Other fabricated metal products", Some("C.25"), 2),
        ClassificationNode::new("G", "Wholesale trade", None, 0),
        ClassificationNode::new("G.46", "Wholesale of hardware", Some("G"), 1),
    ]
}

pub fn fastener_storage() -> Arc<MockTreeStorage> {
    Arc::new(MockTreeStorage::new(fastener_nodes()))
}

/// Routing entries `(provider, model)` with priorities 10, 11, ...
pub fn routing_table(models: &[(&str, &str)]) -> Arc<InMemoryRoutingTable> {
    let entries = models
        .iter()
        .enumerate()
        .map(|(i, (provider, model))| RoutingEntry::new(provider, model, 10 + i as u32))
        .collect();
    Arc::new(InMemoryRoutingTable::new(entries))
}

pub fn fast_success() -> MockBehavior {
    MockBehavior::succeeding(0.9, Duration::from_millis(1))
}

/// Request over [`ITEMS`] with immediate retries.
pub fn request() -> BenchmarkConfig {
    BenchmarkConfig::default()
        .with_test_products(&ITEMS)
        .with_retry_delay_ms(0)
}

/// Wires an engine over in-memory collaborators.
///
/// The routing table doubles as the model catalog and the promotion target.
pub struct EngineHarness {
    pub routing: Arc<InMemoryRoutingTable>,
    pub backends: Arc<MockBackendFactory>,
    pub storage: Arc<MockTreeStorage>,
}

impl EngineHarness {
    pub fn new(models: &[(&str, &str)], backends: MockBackendFactory) -> Self {
        Self {
            routing: routing_table(models),
            backends: Arc::new(backends),
            storage: fastener_storage(),
        }
    }

    pub fn engine(&self) -> BenchmarkEngine {
        let tree_cache = Arc::new(TreeCache::new(self.storage.clone()));
        BenchmarkEngine::new(self.routing.clone(), self.backends.clone(), tree_cache)
            .with_routing(self.routing.clone())
            .with_model_timeout(Duration::from_secs(10))
    }

    pub fn priority_of(&self, model: &str) -> Option<u32> {
        self.routing
            .snapshot()
            .into_iter()
            .find(|e| e.model == model)
            .map(|e| e.priority)
    }
}
