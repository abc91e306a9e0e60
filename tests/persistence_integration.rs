//! Benchmark runs against on-disk history, routing and tree storage.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::fixtures::{ITEMS, fast_success, fastener_nodes, request};
use tempfile::TempDir;
use tokio_test::assert_ok;
use verdict::benchmark::BenchmarkEngine;
use verdict::classifier::{MockBackendFactory, MockBehavior};
use verdict::history::{RunRecorder, SqliteRunStore};
use verdict::routing::{JsonRoutingTable, ModelCatalog, RoutingEntry, RoutingTable};
use verdict::tree::{SqliteTreeStorage, TreeCache};

struct DiskSetup {
    _dir: TempDir,
    routing: Arc<JsonRoutingTable>,
    engine: BenchmarkEngine,
    db_path: std::path::PathBuf,
}

async fn disk_setup(backends: MockBackendFactory) -> DiskSetup {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("verdict.db");
    let routing_path = dir.path().join("routing.json");

    let storage = SqliteTreeStorage::open(&db_path).unwrap();
    assert_ok!(storage.insert_nodes(fastener_nodes()).await);

    let routing = Arc::new(
        JsonRoutingTable::create(
            &routing_path,
            vec![
                RoutingEntry::new("openai", "m1", 7),
                RoutingEntry::new("anthropic", "m2", 3),
                RoutingEntry::new("anthropic", "retired", 1).disabled(),
            ],
        )
        .await
        .unwrap(),
    );
    let recorder = RunRecorder::new(Arc::new(SqliteRunStore::open(&db_path).unwrap()));

    let engine = BenchmarkEngine::new(
        routing.clone(),
        Arc::new(backends),
        Arc::new(TreeCache::new(Arc::new(storage))),
    )
    .with_routing(routing.clone())
    .with_recorder(recorder)
    .with_model_timeout(Duration::from_secs(10));

    DiskSetup {
        _dir: dir,
        routing,
        engine,
        db_path,
    }
}

fn two_model_backends() -> MockBackendFactory {
    MockBackendFactory::new()
        .with_model("m1", MockBehavior::succeeding(0.95, Duration::from_millis(1)))
        .with_model("m2", MockBehavior::succeeding(0.6, Duration::from_millis(1)))
}

#[tokio::test]
async fn test_disabled_entries_are_not_benchmarked() {
    let setup = disk_setup(two_model_backends()).await;

    let available = assert_ok!(setup.routing.available_models().await);
    assert_eq!(available, vec!["m1".to_string(), "m2".to_string()]);

    let run = assert_ok!(setup.engine.run(&request()).await);
    assert!(run.result("retired").is_none());
    assert_eq!(run.statistics.models_available, 2);
}

#[tokio::test]
async fn test_run_is_recorded_and_readable() {
    let setup = disk_setup(two_model_backends()).await;

    let run = assert_ok!(setup.engine.run(&request()).await);
    assert!(run.recorded);

    let recorder = RunRecorder::new(Arc::new(SqliteRunStore::open(&setup.db_path).unwrap()));
    let latest = assert_ok!(recorder.latest().await);

    assert_eq!(latest.len(), 2);
    assert!(latest.iter().all(|r| r.run_id == run.id));
    assert!(latest.iter().all(|r| r.test_count == ITEMS.len() as u64));
    assert_eq!(latest[0].result.model, "m1");
    assert_eq!(latest[0].result.priority, 1);
    assert_eq!(latest[1].result.model, "m2");
    assert_eq!(latest[0].result, run.results[0]);
}

#[tokio::test]
async fn test_history_orders_newest_run_first() {
    let setup = disk_setup(two_model_backends()).await;

    let first = assert_ok!(setup.engine.run(&request()).await);
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = assert_ok!(setup.engine.run(&request()).await);

    let recorder = RunRecorder::new(Arc::new(SqliteRunStore::open(&setup.db_path).unwrap()));

    let all = assert_ok!(recorder.history(None, None).await);
    assert_eq!(all.len(), 4);
    assert_eq!(all[0].run_id, second.id);
    assert_eq!(all[0].result.priority, 1);
    assert_eq!(all[1].run_id, second.id);
    assert_eq!(all[3].run_id, first.id);

    let m2_only = assert_ok!(recorder.history(Some(1), Some("m2")).await);
    assert_eq!(m2_only.len(), 1);
    assert_eq!(m2_only[0].result.model, "m2");
    assert_eq!(m2_only[0].run_id, second.id);

    let latest = assert_ok!(recorder.latest().await);
    assert!(latest.iter().all(|r| r.run_id == second.id));
}

#[tokio::test]
async fn test_promotion_persists_to_routing_file() {
    let setup = disk_setup(two_model_backends()).await;

    let run = assert_ok!(
        setup
            .engine
            .run(&request().with_auto_update_priorities(true))
            .await
    );
    assert!(run.priorities_updated);

    let reloaded = assert_ok!(JsonRoutingTable::load(setup.routing.path()).await);
    let m1 = assert_ok!(reloaded.find("m1").await).unwrap();
    let m2 = assert_ok!(reloaded.find("m2").await).unwrap();
    let retired = assert_ok!(reloaded.find("retired").await).unwrap();

    assert_eq!(m1.priority, 1);
    assert_eq!(m2.priority, 2);
    assert_eq!(retired.priority, 1);
    assert!(!retired.enabled);
}

#[tokio::test]
async fn test_failed_models_are_recorded_too() {
    let setup = disk_setup(
        MockBackendFactory::new()
            .with_model("m1", fast_success())
            .with_model("m2", MockBehavior::failing("insufficient_quota: quota exceeded")),
    )
    .await;

    let run = assert_ok!(setup.engine.run(&request().with_max_retries(1)).await);
    assert!(run.recorded);

    let recorder = RunRecorder::new(Arc::new(SqliteRunStore::open(&setup.db_path).unwrap()));
    let m2 = assert_ok!(recorder.history(None, Some("m2")).await);

    assert_eq!(m2.len(), 1);
    assert_eq!(m2[0].result.success_count, 0);
    assert_eq!(
        m2[0]
            .result
            .error_breakdown
            .get(verdict::metrics::ErrorCategory::QuotaExceeded),
        3
    );
}
