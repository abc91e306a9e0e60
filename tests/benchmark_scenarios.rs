//! End-to-end benchmark runs over mock backends.

mod common;

use std::time::{Duration, Instant};

use common::fixtures::{EngineHarness, ITEMS, fast_success, request};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;
use verdict::benchmark::{BenchmarkConfig, BenchmarkError, MockCorpusSource};
use verdict::classifier::{MockBackendFactory, MockBehavior};
use verdict::metrics::{ErrorCategory, ModelStatus};

#[tokio::test]
async fn test_rate_limited_model_fails_every_item() {
    let harness = EngineHarness::new(
        &[("openai", "m1")],
        MockBackendFactory::new().with_model("m1", MockBehavior::failing("rate limit exceeded")),
    );

    let run = assert_ok!(harness.engine().run(&request().with_max_retries(1)).await);
    let result = run.result("m1").unwrap();

    assert_eq!(result.status, ModelStatus::Failed);
    assert_eq!(result.success_count, 0);
    assert_eq!(result.error_count, 3);
    assert_eq!(result.error_breakdown.get(ErrorCategory::RateLimit), 3);
    assert_eq!(result.error_breakdown.total(), 3);
    assert_eq!(result.success_rate, 0.0);
    assert_eq!(result.speed, 0.0);
    assert_eq!(result.avg_response_time_ms, 0);
    assert_eq!(result.avg_confidence, 0.0);
    assert_eq!(result.avg_retries, 1.0);

    assert_eq!(run.statistics.failed_models, 1);
    assert!(run.message.contains("WARNING: Low success rate"));
}

#[tokio::test]
async fn test_confident_model_outranks_faster_one() {
    let harness = EngineHarness::new(
        &[("openai", "m1"), ("anthropic", "m2")],
        MockBackendFactory::new()
            .with_model("m1", MockBehavior::succeeding(0.9, Duration::from_millis(10)))
            .with_model("m2", MockBehavior::succeeding(0.5, Duration::from_millis(5))),
    );

    let run = assert_ok!(harness.engine().run(&request()).await);

    assert_eq!(run.results[0].model, "m1");
    assert_eq!(run.results[0].priority, 1);
    assert_eq!(run.results[1].model, "m2");
    assert_eq!(run.results[1].priority, 2);
    assert!(run.results.iter().all(|r| r.success_rate == 1.0));
}

#[tokio::test]
async fn test_priorities_are_dense_and_counts_cover_corpus() {
    let harness = EngineHarness::new(
        &[
            ("openai", "steady"),
            ("openai", "flaky"),
            ("anthropic", "broken"),
            ("anthropic", "slow"),
        ],
        MockBackendFactory::new()
            .with_model("steady", fast_success())
            .with_model(
                "flaky",
                MockBehavior::succeeding(0.8, Duration::from_millis(1)).with_panic_on(ITEMS[1]),
            )
            .with_model("broken", MockBehavior::failing("connection refused"))
            .with_model("slow", MockBehavior::succeeding(0.9, Duration::from_millis(15))),
    );

    let run = assert_ok!(harness.engine().run(&request().with_max_retries(2)).await);

    let mut priorities: Vec<u32> = run.results.iter().map(|r| r.priority).collect();
    priorities.sort_unstable();
    assert_eq!(priorities, vec![1, 2, 3, 4]);

    for result in &run.results {
        assert_eq!(
            result.success_count + result.error_count,
            ITEMS.len() as u64,
            "counts for {} must cover the corpus",
            result.model
        );
        assert_eq!(result.total_requests, ITEMS.len() as u64);
    }

    assert_eq!(run.result("flaky").unwrap().status, ModelStatus::Partial);
    assert_eq!(
        run.result("broken").unwrap().error_breakdown.get(ErrorCategory::Network),
        3
    );
    assert_eq!(run.results.last().unwrap().model, "broken");
    assert_eq!(run.statistics.models_tested, 4);
    assert_eq!(run.statistics.successful_models, 3);
    assert_eq!(run.statistics.total_requests, 12);
}

#[tokio::test]
async fn test_unknown_backend_model_is_reported_not_fatal() {
    let harness = EngineHarness::new(
        &[("openai", "m1"), ("openai", "ghost")],
        MockBackendFactory::new().with_model("m1", fast_success()),
    );

    let run = assert_ok!(harness.engine().run(&request()).await);

    let ghost = run.result("ghost").unwrap();
    assert_eq!(ghost.status, ModelStatus::Failed);
    assert_eq!(ghost.error_count, 3);
    assert_eq!(run.result("m1").unwrap().priority, 1);
}

#[tokio::test]
async fn test_empty_catalog_is_rejected() {
    let harness = EngineHarness::new(&[], MockBackendFactory::new().with_fallback(fast_success()));

    let err = assert_err!(harness.engine().run(&request()).await);
    assert!(matches!(err, BenchmarkError::NoModelsAvailable));
}

#[tokio::test]
async fn test_unmatched_model_filter_is_rejected() {
    let harness = EngineHarness::new(
        &[("openai", "m1")],
        MockBackendFactory::new().with_fallback(fast_success()),
    );

    let err = assert_err!(
        harness
            .engine()
            .run(&request().with_models(&["missing-model"]))
            .await
    );
    match err {
        BenchmarkError::ModelsNotAvailable { requested } => {
            assert_eq!(requested, vec!["missing-model".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_model_filter_selects_subset() {
    let harness = EngineHarness::new(
        &[("openai", "m1"), ("openai", "m2"), ("openai", "m3")],
        MockBackendFactory::new().with_fallback(fast_success()),
    );

    let run = assert_ok!(harness.engine().run(&request().with_models(&["m3", "m1"])).await);

    let mut tested: Vec<&str> = run.results.iter().map(|r| r.model.as_str()).collect();
    tested.sort_unstable();
    assert_eq!(tested, vec!["m1", "m3"]);
    assert_eq!(run.statistics.models_available, 3);
    assert!(run.message.contains("(filtered from 3 available models)"));
}

#[tokio::test]
async fn test_provider_filter() {
    let harness = EngineHarness::new(
        &[("openai", "gpt"), ("anthropic", "claude"), ("anthropic", "haiku")],
        MockBackendFactory::new().with_fallback(fast_success()),
    );
    let engine = harness.engine();

    let run = assert_ok!(engine.run(&request().with_provider("Anthropic")).await);
    assert_eq!(run.statistics.models_tested, 2);
    assert!(run.result("gpt").is_none());

    // unknown provider keeps the whole catalog
    let run = assert_ok!(engine.run(&request().with_provider("nobody")).await);
    assert_eq!(run.statistics.models_tested, 3);
}

#[tokio::test]
async fn test_empty_corpus_is_rejected() {
    let harness = EngineHarness::new(
        &[("openai", "m1")],
        MockBackendFactory::new().with_fallback(fast_success()),
    );
    let engine = harness.engine().with_fallback_corpus(Vec::new());
    let config = request().with_test_products(&["  ", ""]);

    let err = assert_err!(engine.run(&config).await);
    assert!(matches!(err, BenchmarkError::EmptyCorpus));
}

#[tokio::test]
async fn test_default_corpus_when_nothing_requested() {
    let harness = EngineHarness::new(
        &[("openai", "m1")],
        MockBackendFactory::new().with_fallback(fast_success()),
    );
    let engine = harness.engine().with_fallback_corpus(vec!["anchor bolt".to_string()]);

    let run = assert_ok!(engine.run(&BenchmarkConfig::default()).await);
    assert_eq!(run.test_count, 1);
}

#[tokio::test]
async fn test_dataset_corpus() {
    let harness = EngineHarness::new(
        &[("openai", "m1")],
        MockBackendFactory::new().with_fallback(fast_success()),
    );
    let source = std::sync::Arc::new(MockCorpusSource::new(&["rivet", "nut", "stud", "pin"]));
    let engine = harness.engine().with_corpus_source(source.clone());

    let run = assert_ok!(engine.run(&BenchmarkConfig::default().with_dataset(2)).await);
    assert_eq!(run.test_count, 2);
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_missing_credentials_abort_before_work() {
    let harness = EngineHarness::new(
        &[("openai", "m1")],
        MockBackendFactory::new()
            .with_fallback(fast_success())
            .with_missing_credentials(),
    );

    let err = assert_err!(harness.engine().run(&request()).await);
    assert!(matches!(err, BenchmarkError::MissingCredentials(_)));
    assert!(harness.backends.created_models().is_empty());
    assert_eq!(harness.storage.fetch_count(), 0);
}

#[tokio::test]
async fn test_unavailable_tree_aborts_run() {
    let harness = EngineHarness::new(
        &[("openai", "m1")],
        MockBackendFactory::new().with_fallback(fast_success()),
    );
    harness.storage.set_failing(true);

    let err = assert_err!(harness.engine().run(&request()).await);
    assert!(matches!(err, BenchmarkError::TreeUnavailable));
    assert!(harness.backends.created_models().is_empty());
}

#[tokio::test]
async fn test_tree_is_built_once_across_models_and_runs() {
    let harness = EngineHarness::new(
        &[("openai", "m1"), ("openai", "m2"), ("anthropic", "m3")],
        MockBackendFactory::new().with_fallback(fast_success()),
    );
    let engine = harness.engine();

    assert_ok!(engine.run(&request()).await);
    assert_ok!(engine.run(&request()).await);

    assert_eq!(harness.storage.fetch_count(), 1);
    assert!(engine.tree_cache().is_cached());
}

#[tokio::test]
async fn test_auto_promotion_writes_ranked_priorities() {
    let harness = EngineHarness::new(
        &[("openai", "weak"), ("openai", "strong")],
        MockBackendFactory::new()
            .with_model("weak", MockBehavior::succeeding(0.4, Duration::from_millis(1)))
            .with_model("strong", MockBehavior::succeeding(0.95, Duration::from_millis(1))),
    );

    let run = assert_ok!(
        harness
            .engine()
            .run(&request().with_auto_update_priorities(true))
            .await
    );

    assert!(run.priorities_updated);
    let report = run.promotion.as_ref().unwrap();
    assert!(report.is_complete());
    assert_eq!(harness.priority_of("strong"), Some(1));
    assert_eq!(harness.priority_of("weak"), Some(2));
}

#[tokio::test]
async fn test_failed_promotion_write_keeps_old_priority() {
    let harness = EngineHarness::new(
        &[("openai", "m1"), ("openai", "m2")],
        MockBackendFactory::new()
            .with_model("m1", MockBehavior::succeeding(0.9, Duration::from_millis(1)))
            .with_model("m2", MockBehavior::succeeding(0.6, Duration::from_millis(1))),
    );
    harness.routing.reject_updates_for("m2");

    let run = assert_ok!(
        harness
            .engine()
            .run(&request().with_auto_update_priorities(true))
            .await
    );

    let report = run.promotion.as_ref().unwrap();
    assert_eq!(report.updated, vec!["m1".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "m2");
    assert!(run.priorities_updated);
    assert_eq!(harness.priority_of("m1"), Some(1));
    assert_eq!(harness.priority_of("m2"), Some(11));
}

#[tokio::test]
async fn test_priorities_untouched_without_auto_update() {
    let harness = EngineHarness::new(
        &[("openai", "m1"), ("openai", "m2")],
        MockBackendFactory::new().with_fallback(fast_success()),
    );

    let run = assert_ok!(harness.engine().run(&request()).await);

    assert!(!run.priorities_updated);
    assert!(run.promotion.is_none());
    assert_eq!(harness.priority_of("m1"), Some(10));
    assert_eq!(harness.priority_of("m2"), Some(11));
}

#[tokio::test]
async fn test_cancelled_run_reports_timeouts() {
    let harness = EngineHarness::new(
        &[("openai", "m1")],
        MockBackendFactory::new().with_fallback(fast_success()),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let run = assert_ok!(harness.engine().run_with_cancel(&request(), cancel).await);
    let result = run.result("m1").unwrap();

    assert_eq!(result.status, ModelStatus::Failed);
    assert_eq!(result.error_count, 3);
    assert_eq!(result.error_breakdown.get(ErrorCategory::Timeout), 3);
    // no item reached the backend, so there is nothing to average
    assert_eq!(result.avg_retries, 0.0);
    assert_eq!(harness.backends.backend("m1").unwrap().total_calls(), 0);
}

#[tokio::test]
async fn test_deadline_with_gated_items_keeps_retry_average_honest() {
    let harness = EngineHarness::new(
        &[("openai", "m1")],
        MockBackendFactory::new()
            .with_model("m1", MockBehavior::succeeding(0.9, Duration::from_millis(300))),
    );
    let engine = harness
        .engine()
        .with_inner_concurrency(Some(1))
        .with_model_timeout(Duration::from_millis(100));

    let run = assert_ok!(engine.run(&request().with_max_retries(3)).await);
    let result = run.result("m1").unwrap();

    assert_eq!(result.error_count, 3);
    assert_eq!(result.error_breakdown.get(ErrorCategory::Timeout), 3);
    assert!((result.avg_retries - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_model_timeout_keeps_finished_items() {
    let harness = EngineHarness::new(
        &[("openai", "m1")],
        MockBackendFactory::new().with_model(
            "m1",
            fast_success().with_slow_item(ITEMS[2], Duration::from_secs(5)),
        ),
    );
    let engine = harness.engine().with_model_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let run = assert_ok!(engine.run(&request()).await);
    assert!(started.elapsed() < Duration::from_secs(3));

    let result = run.result("m1").unwrap();
    assert_eq!(result.status, ModelStatus::Partial);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.error_breakdown.get(ErrorCategory::Timeout), 1);
}

#[tokio::test]
async fn test_at_most_two_models_run_at_once() {
    // 3 levels x 30ms per item; four models behind a gate of two take two rounds.
    let models = [("p", "a"), ("p", "b"), ("p", "c"), ("p", "d")];
    let harness = EngineHarness::new(
        &models,
        MockBackendFactory::new()
            .with_fallback(MockBehavior::succeeding(0.9, Duration::from_millis(30))),
    );
    let config = request().with_test_products(&["hex nut"]);

    let started = Instant::now();
    let run = assert_ok!(harness.engine().run(&config).await);
    let elapsed = started.elapsed();

    assert_eq!(run.results.len(), 4);
    assert!(
        elapsed >= Duration::from_millis(170),
        "four models finished in {:?}, expected two rounds",
        elapsed
    );
}
