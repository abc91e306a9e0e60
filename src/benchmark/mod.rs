//! Concurrent multi-model benchmark.
//!
//! [`BenchmarkEngine::run`] resolves models and corpus, fetches the shared tree
//! once, benchmarks at most two models at a time and ranks the results.
//! Within a model every corpus item runs as its own retrying task; see
//! [`runner::run_model`].

pub mod config;
pub mod context;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod runner;
pub mod types;


pub use config::BenchmarkConfig;
pub use context::{ModelContext, RunSettings};
#[cfg(any(test, feature = "mock"))]
pub use corpus::MockCorpusSource;
pub use corpus::{CorpusError, CorpusResult, CorpusSource, HttpCorpusSource, resolve_corpus};
pub use engine::{BenchmarkEngine, run_statistics, status_message};
pub use error::{BenchmarkError, BenchmarkResult};
pub use runner::run_model;
pub use types::{BenchmarkRun, RunStatistics};
