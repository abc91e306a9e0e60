use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rusqlite::{Connection, Row, params};

use super::error::{HistoryError, HistoryResult};
use super::types::{HistoryRecord, format_timestamp};
use crate::metrics::{ErrorBreakdown, ModelBenchmarkResult, ModelStatus};

/// Append-only store of completed runs.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn append(&self, records: Vec<HistoryRecord>) -> HistoryResult<usize>;

    /// Every row sharing the most recent timestamp, by priority ascending.
    async fn latest_run(&self) -> HistoryResult<Vec<HistoryRecord>>;

    /// Up to `limit` rows, newest run first, optionally for one model.
    async fn history(&self, limit: usize, model: Option<&str>) -> HistoryResult<Vec<HistoryRecord>>;
}

const COLUMNS: &str = "run_id, timestamp, test_count, model, status, priority, \
    success_count, error_count, total_requests, success_rate, speed, total_time_ms, \
    avg_response_time_ms, median_response_time_ms, p75_response_time_ms, \
    p90_response_time_ms, p95_response_time_ms, p99_response_time_ms, \
    min_response_time_ms, max_response_time_ms, coefficient_of_variation, \
    avg_confidence, min_confidence, max_confidence, avg_ai_calls_count, avg_retries, \
    error_breakdown";

/// SQLite-backed history (`model_benchmark_history` table).
#[derive(Clone)]
pub struct SqliteRunStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteRunStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRunStore").finish_non_exhaustive()
    }
}

impl SqliteRunStore {
    pub fn open(path: impl AsRef<Path>) -> HistoryResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> HistoryResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> HistoryResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS model_benchmark_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                test_count INTEGER NOT NULL,
                model TEXT NOT NULL,
                status TEXT NOT NULL,
                priority INTEGER NOT NULL,
                success_count INTEGER NOT NULL,
                error_count INTEGER NOT NULL,
                total_requests INTEGER NOT NULL,
                success_rate REAL NOT NULL,
                speed REAL NOT NULL,
                total_time_ms INTEGER NOT NULL,
                avg_response_time_ms INTEGER NOT NULL,
                median_response_time_ms INTEGER NOT NULL,
                p75_response_time_ms INTEGER NOT NULL,
                p90_response_time_ms INTEGER NOT NULL,
                p95_response_time_ms INTEGER NOT NULL,
                p99_response_time_ms INTEGER NOT NULL,
                min_response_time_ms INTEGER NOT NULL,
                max_response_time_ms INTEGER NOT NULL,
                coefficient_of_variation REAL NOT NULL,
                avg_confidence REAL NOT NULL,
                min_confidence REAL NOT NULL,
                max_confidence REAL NOT NULL,
                avg_ai_calls_count REAL NOT NULL,
                avg_retries REAL NOT NULL,
                error_breakdown TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_benchmark_history_timestamp
                ON model_benchmark_history(timestamp);
            CREATE INDEX IF NOT EXISTS idx_benchmark_history_model
                ON model_benchmark_history(model);",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl RunStore for SqliteRunStore {
    async fn append(&self, records: Vec<HistoryRecord>) -> HistoryResult<usize> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || -> HistoryResult<usize> {
            let mut conn = conn.lock();
            let tx = conn.transaction()?;
            {
                let sql = format!(
                    "INSERT INTO model_benchmark_history ({}) VALUES \
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, \
                      ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)",
                    COLUMNS
                );
                let mut stmt = tx.prepare(&sql)?;
                for record in &records {
                    let r = &record.result;
                    let breakdown = serde_json::to_string(&r.error_breakdown)
                        .map_err(|e| HistoryError::Corrupt(e.to_string()))?;
                    stmt.execute(params![
                        record.run_id,
                        format_timestamp(&record.timestamp),
                        int(record.test_count),
                        r.model,
                        r.status.as_str(),
                        r.priority,
                        int(r.success_count),
                        int(r.error_count),
                        int(r.total_requests),
                        r.success_rate,
                        r.speed,
                        int(r.total_time_ms),
                        int(r.avg_response_time_ms),
                        int(r.median_response_time_ms),
                        int(r.p75_response_time_ms),
                        int(r.p90_response_time_ms),
                        int(r.p95_response_time_ms),
                        int(r.p99_response_time_ms),
                        int(r.min_response_time_ms),
                        int(r.max_response_time_ms),
                        r.coefficient_of_variation,
                        r.avg_confidence,
                        r.min_confidence,
                        r.max_confidence,
                        r.avg_ai_calls_count,
                        r.avg_retries,
                        breakdown,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(records.len())
        })
        .await?
    }

    async fn latest_run(&self) -> HistoryResult<Vec<HistoryRecord>> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || -> HistoryResult<Vec<HistoryRecord>> {
            let conn = conn.lock();
            let sql = format!(
                "SELECT {} FROM model_benchmark_history
                 WHERE timestamp = (SELECT MAX(timestamp) FROM model_benchmark_history)
                 ORDER BY priority ASC, id ASC",
                COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], read_row)?;
            collect_rows(rows)
        })
        .await?
    }

    async fn history(&self, limit: usize, model: Option<&str>) -> HistoryResult<Vec<HistoryRecord>> {
        let conn = Arc::clone(&self.conn);
        let model = model.map(str::to_string);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        tokio::task::spawn_blocking(move || -> HistoryResult<Vec<HistoryRecord>> {
            let conn = conn.lock();
            let sql = format!(
                "SELECT {} FROM model_benchmark_history
                 WHERE (?1 IS NULL OR model = ?1)
                 ORDER BY timestamp DESC, priority ASC, id ASC
                 LIMIT ?2",
                COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![model, limit], read_row)?;
            collect_rows(rows)
        })
        .await?
    }
}

/// Raw row as read back, before the text columns are parsed.
struct StoredRow {
    run_id: String,
    timestamp: String,
    test_count: i64,
    status: String,
    error_breakdown: String,
    result: ModelBenchmarkResult,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    let uint = |idx: usize| -> rusqlite::Result<u64> { Ok(row.get::<_, i64>(idx)?.max(0) as u64) };
    Ok(StoredRow {
        run_id: row.get(0)?,
        timestamp: row.get(1)?,
        test_count: row.get(2)?,
        status: row.get(4)?,
        error_breakdown: row.get(26)?,
        result: ModelBenchmarkResult {
            model: row.get(3)?,
            status: ModelStatus::Ok,
            priority: row.get(5)?,
            success_count: uint(6)?,
            error_count: uint(7)?,
            total_requests: uint(8)?,
            success_rate: row.get(9)?,
            speed: row.get(10)?,
            total_time_ms: uint(11)?,
            avg_response_time_ms: uint(12)?,
            median_response_time_ms: uint(13)?,
            p75_response_time_ms: uint(14)?,
            p90_response_time_ms: uint(15)?,
            p95_response_time_ms: uint(16)?,
            p99_response_time_ms: uint(17)?,
            min_response_time_ms: uint(18)?,
            max_response_time_ms: uint(19)?,
            coefficient_of_variation: row.get(20)?,
            avg_confidence: row.get(21)?,
            min_confidence: row.get(22)?,
            max_confidence: row.get(23)?,
            avg_ai_calls_count: row.get(24)?,
            avg_retries: row.get(25)?,
            error_breakdown: ErrorBreakdown::new(),
        },
    })
}

fn collect_rows(
    rows: impl Iterator<Item = rusqlite::Result<StoredRow>>,
) -> HistoryResult<Vec<HistoryRecord>> {
    let mut records = Vec::new();
    for row in rows {
        let stored = row?;
        let timestamp = DateTime::parse_from_rfc3339(&stored.timestamp)
            .map_err(|e| HistoryError::Corrupt(format!("timestamp '{}': {}", stored.timestamp, e)))?
            .with_timezone(&Utc);
        let mut result = stored.result;
        result.status = stored.status.parse().map_err(HistoryError::Corrupt)?;
        result.error_breakdown = serde_json::from_str(&stored.error_breakdown)
            .map_err(|e| HistoryError::Corrupt(format!("error_breakdown: {}", e)))?;
        records.push(HistoryRecord {
            run_id: stored.run_id,
            timestamp,
            test_count: stored.test_count.max(0) as u64,
            result,
        });
    }
    Ok(records)
}

fn int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Process-local history, mainly for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    records: RwLock<Vec<HistoryRecord>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn append(&self, records: Vec<HistoryRecord>) -> HistoryResult<usize> {
        let count = records.len();
        self.records.write().extend(records);
        Ok(count)
    }

    async fn latest_run(&self) -> HistoryResult<Vec<HistoryRecord>> {
        let records = self.records.read();
        let Some(latest) = records.iter().map(|r| r.timestamp).max() else {
            return Ok(Vec::new());
        };
        let mut run: Vec<HistoryRecord> = records
            .iter()
            .filter(|r| r.timestamp == latest)
            .cloned()
            .collect();
        run.sort_by_key(|r| r.result.priority);
        Ok(run)
    }

    async fn history(&self, limit: usize, model: Option<&str>) -> HistoryResult<Vec<HistoryRecord>> {
        let mut rows: Vec<HistoryRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| model.is_none_or(|m| r.result.model == m))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then(a.result.priority.cmp(&b.result.priority))
        });
        rows.truncate(limit);
        Ok(rows)
    }
}
