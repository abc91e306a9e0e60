use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::error::HistoryResult;
use super::store::RunStore;
use super::types::HistoryRecord;
use crate::constants::DEFAULT_HISTORY_LIMIT;
use crate::metrics::ModelBenchmarkResult;

/// Persists completed runs and replays them.
#[derive(Clone)]
pub struct RunRecorder {
    store: Arc<dyn RunStore>,
}

impl RunRecorder {
    pub fn new(store: Arc<dyn RunStore>) -> Self {
        Self { store }
    }

    /// Stores one row per model, all sharing `timestamp`.
    pub async fn record(
        &self,
        run_id: &str,
        timestamp: DateTime<Utc>,
        test_count: usize,
        results: &[ModelBenchmarkResult],
    ) -> HistoryResult<usize> {
        let records: Vec<HistoryRecord> = results
            .iter()
            .map(|result| HistoryRecord {
                run_id: run_id.to_string(),
                timestamp,
                test_count: test_count as u64,
                result: result.clone(),
            })
            .collect();

        let written = self.store.append(records).await?;
        info!(run_id, rows = written, "Benchmark run recorded");
        Ok(written)
    }

    pub async fn latest(&self) -> HistoryResult<Vec<HistoryRecord>> {
        self.store.latest_run().await
    }

    /// `limit` of `None` means the default of 100 rows.
    pub async fn history(
        &self,
        limit: Option<usize>,
        model: Option<&str>,
    ) -> HistoryResult<Vec<HistoryRecord>> {
        self.store
            .history(limit.unwrap_or(DEFAULT_HISTORY_LIMIT), model)
            .await
    }
}

impl std::fmt::Debug for RunRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunRecorder").finish_non_exhaustive()
    }
}
