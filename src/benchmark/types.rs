use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::ModelBenchmarkResult;
use crate::routing::PromotionReport;

/// Aggregate counts over every model of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Models with status `ok` or `partial`.
    pub successful_models: usize,
    pub failed_models: usize,
    pub total_successes: u64,
    pub total_errors: u64,
    /// Corpus size times models tested.
    pub total_requests: u64,
    /// `total_successes / total_requests`, in `[0, 1]`.
    pub overall_success_rate: f64,
    pub models_tested: usize,
    /// Models in the catalog before filtering.
    pub models_available: usize,
}

/// A completed benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Corpus size.
    pub test_count: usize,
    /// Ranked, best first.
    pub results: Vec<ModelBenchmarkResult>,
    pub statistics: RunStatistics,
    pub priorities_updated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PromotionReport>,
    /// Whether the run was written to history.
    pub recorded: bool,
    pub message: String,
}

impl BenchmarkRun {
    pub fn result(&self, model: &str) -> Option<&ModelBenchmarkResult> {
        self.results.iter().find(|r| r.model == model)
    }
}
