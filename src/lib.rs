//! Verdict library crate (used by the binary and integration tests).
//!
//! # Public API Surface
//!
//! ## Benchmark
//! - [`BenchmarkEngine`], [`BenchmarkConfig`], [`BenchmarkRun`] - Run orchestration
//! - [`CorpusSource`], [`HttpCorpusSource`] - Corpus selection
//!
//! ## Classification
//! - [`TreeCache`], [`ClassificationTree`], [`SqliteTreeStorage`] - Shared hierarchy
//! - [`ItemClassifier`], [`ClassificationBackend`], [`GenaiBackendFactory`] - Item walks
//!
//! ## Results
//! - [`ModelBenchmarkResult`], [`ErrorCategory`] - Per-model statistics
//! - [`RunRecorder`], [`SqliteRunStore`] - Run history
//! - [`RoutingTable`], [`ModelCatalog`], [`JsonRoutingTable`] - Model selection and promotion
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod benchmark;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod history;
pub mod metrics;
pub mod routing;
pub mod tree;

#[cfg(any(test, feature = "mock"))]
pub use benchmark::MockCorpusSource;
pub use benchmark::{
    BenchmarkConfig, BenchmarkEngine, BenchmarkError, BenchmarkResult, BenchmarkRun, CorpusError,
    CorpusSource, HttpCorpusSource, RunStatistics,
};
#[cfg(any(test, feature = "mock"))]
pub use classifier::{MockBackend, MockBackendFactory, MockBehavior};
pub use classifier::{
    BackendFactory, ClassificationBackend, ClassificationError, ClassificationResult,
    GenaiBackendFactory, ItemClassification, ItemClassifier, StepChoice, StepDecision,
    StepRequest,
};
pub use config::{Config, ConfigError};
pub use history::{
    HistoryError, HistoryRecord, HistoryResult, InMemoryRunStore, RunRecorder, RunStore,
    SqliteRunStore,
};
pub use metrics::{ErrorBreakdown, ErrorCategory, ItemOutcome, ModelBenchmarkResult, ModelStatus};
pub use routing::{
    InMemoryRoutingTable, JsonRoutingTable, ModelCatalog, PromotionReport, RoutingEntry,
    RoutingError, RoutingTable,
};
#[cfg(any(test, feature = "mock"))]
pub use tree::MockTreeStorage;
pub use tree::{
    ClassificationNode, ClassificationTree, SqliteTreeStorage, TreeCache, TreeError, TreeStorage,
};
