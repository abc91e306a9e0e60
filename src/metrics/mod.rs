//! Per-model statistics and ranking.
//!
//! [`aggregate`] turns the raw outcomes of one model run into a
//! [`ModelBenchmarkResult`]; [`rank`] orders a run's results and assigns priorities.

pub mod aggregate;
pub mod category;
pub mod rank;
pub mod types;


pub use aggregate::{aggregate, percentile};
pub use category::{ErrorBreakdown, ErrorCategory};
pub use rank::{compare, rank};
pub use types::{ItemOutcome, ModelBenchmarkResult, ModelSamples, ModelStatus};
