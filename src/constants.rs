//! Cross-cutting, shared constants.
//!
//! Request-level defaults live here so the request type, the orchestrator and
//! the binary agree on them.

use std::time::Duration;

/// Attempts per item when the request leaves `max_retries` unset or non-positive.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Base retry delay in milliseconds; attempt `i` waits `base * 2^i` before attempt `i + 1`.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 200;

/// Maximum number of models benchmarked at the same time.
///
/// The classification tree and history both sit on an embedded SQLite file,
/// which does not tolerate many concurrent connections.
pub const MAX_MODEL_WORKERS: usize = 2;

/// Wall-clock budget for a single model's sub-benchmark.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Items requested from the dataset source when the request gives no limit.
pub const DEFAULT_DATASET_LIMIT: usize = 50;

/// Hard cap on items fetched from the dataset source.
pub const MAX_DATASET_LIMIT: usize = 500;

/// Category passed to the classifier when the request does not name one.
pub const DEFAULT_CATEGORY: &str = "general";

/// Confidence below which the classifier stops descending.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;

/// Capacity of the per-classifier step cache.
pub const DEFAULT_STEP_CACHE_CAPACITY: u64 = 10_000;

/// Backend calls per second allowed by the chat backend's limiter.
pub const DEFAULT_RATE_LIMIT_RPS: u32 = 5;

/// Default row limit for history queries.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Overall success rate below which the run message carries a warning.
pub const LOW_SUCCESS_RATE_THRESHOLD: f64 = 0.5;

/// Error share above which the run message carries a warning.
pub const HIGH_ERROR_RATE_THRESHOLD: f64 = 0.3;

/// Available-model count at or below which the run message notes a suspiciously small catalog.
pub const FEW_MODELS_THRESHOLD: usize = 2;

/// Built-in corpus used when neither an explicit list nor a dataset is available.
pub const DEFAULT_CORPUS: &[&str] = &[
    "Bolt M8x20",
    "Nut M8",
    "Flat washer M8",
    "Self-tapping screw 4.2x16",
    "Construction nail 100mm",
    "Wood screw 4.5x50",
    "Expansion dowel 8x50",
    "Anchor bolt M10x100",
    "Metal screw 4.2x19",
    "Blind rivet 4x8",
    "Bolt with nut M10",
    "Threaded rod M12",
    "Countersunk screw",
    "Self-locking nut",
    "Spring washer",
];

/// Returns the built-in corpus as owned strings.
pub fn default_corpus() -> Vec<String> {
    DEFAULT_CORPUS.iter().map(|s| (*s).to_string()).collect()
}
