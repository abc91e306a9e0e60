use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::category::{ErrorBreakdown, ErrorCategory};

/// Outcome status of one model's sub-benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    /// No item failed.
    Ok,
    /// Some items failed, some succeeded.
    Partial,
    /// Every item failed.
    Failed,
}

impl ModelStatus {
    pub fn from_counts(success_count: u64, error_count: u64) -> Self {
        match (success_count, error_count) {
            (0, e) if e > 0 => ModelStatus::Failed,
            (_, e) if e > 0 => ModelStatus::Partial,
            _ => ModelStatus::Ok,
        }
    }

    /// `ok` and `partial` both count as a usable model.
    pub fn is_usable(&self) -> bool {
        !matches!(self, ModelStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Ok => "ok",
            ModelStatus::Partial => "partial",
            ModelStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(ModelStatus::Ok),
            "partial" => Ok(ModelStatus::Partial),
            "failed" => Ok(ModelStatus::Failed),
            _ => Err(format!("Unknown model status: {}", s)),
        }
    }
}

/// Raw per-item sample produced by a model run.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Success {
        /// Time from the first attempt until the successful one returned.
        duration: Duration,
        confidence: f64,
        ai_calls: u32,
        attempts: u32,
    },
    Failure {
        /// Time from the first attempt until the item gave up.
        duration: Duration,
        category: ErrorCategory,
        /// `None` when the item was cancelled before its first attempt.
        attempts: Option<u32>,
    },
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Success { .. })
    }

    /// Attempts made, `None` if the item never reached the backend.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            ItemOutcome::Success { attempts, .. } => Some(*attempts),
            ItemOutcome::Failure { attempts, .. } => *attempts,
        }
    }
}

/// Every outcome of one model's sub-benchmark, read only after all item tasks joined.
#[derive(Debug, Clone)]
pub struct ModelSamples {
    pub model: String,
    pub outcomes: Vec<ItemOutcome>,
    /// Wall-clock time of the whole sub-benchmark.
    pub elapsed: Duration,
}

/// Aggregated statistics for one model.
///
/// Timing and quality fields are computed over successful items only and are
/// all zero when nothing succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBenchmarkResult {
    pub model: String,
    pub status: ModelStatus,
    /// 1-based rank within the run; 0 until ranked.
    pub priority: u32,

    pub success_count: u64,
    pub error_count: u64,
    pub total_requests: u64,
    /// `success_count / total_requests`, in `[0, 1]`.
    pub success_rate: f64,

    /// Successful items per second of the model's wall-clock time.
    pub speed: f64,
    pub total_time_ms: u64,
    pub avg_response_time_ms: u64,
    pub median_response_time_ms: u64,
    pub p75_response_time_ms: u64,
    pub p90_response_time_ms: u64,
    pub p95_response_time_ms: u64,
    pub p99_response_time_ms: u64,
    pub min_response_time_ms: u64,
    pub max_response_time_ms: u64,
    /// Population stddev / mean of successful durations.
    pub coefficient_of_variation: f64,

    pub avg_confidence: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
    pub avg_ai_calls_count: f64,

    /// Mean attempts per attempted item, over successes and failures.
    pub avg_retries: f64,
    pub error_breakdown: ErrorBreakdown,
}
