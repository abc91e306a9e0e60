use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::ModelBenchmarkResult;

/// One stored row: a model's result within one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub run_id: String,
    /// Shared by every row of the same run.
    pub timestamp: DateTime<Utc>,
    /// Corpus size of the run.
    pub test_count: u64,
    #[serde(flatten)]
    pub result: ModelBenchmarkResult,
}

/// Fixed-width UTC form so lexical order is time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
