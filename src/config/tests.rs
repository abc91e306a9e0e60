use super::*;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_verdict_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        env::remove_var("VERDICT_DATABASE_PATH");
        env::remove_var("VERDICT_ROUTING_PATH");
        env::remove_var("VERDICT_DATASET_URL");
        env::remove_var("VERDICT_API_KEY");
        env::remove_var("VERDICT_RATE_LIMIT_RPS");
        env::remove_var("VERDICT_MODEL_TIMEOUT_SECS");
        env::remove_var("VERDICT_INNER_CONCURRENCY");
        env::remove_var("VERDICT_MIN_CONFIDENCE");
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.database_path, PathBuf::from("./.data/verdict.db"));
    assert_eq!(config.routing_path, PathBuf::from("./.data/routing.json"));
    assert!(config.dataset_url.is_none());
    assert!(config.api_key.is_none());
    assert_eq!(config.rate_limit_rps, 5);
    assert_eq!(config.model_timeout, Duration::from_secs(300));
    assert!(config.inner_concurrency.is_none());
    assert!((config.min_confidence - 0.7).abs() < f64::EPSILON);
}

#[test]
fn test_debug_redacts_api_key() {
    let config = Config {
        api_key: Some("sk-secret".to_string()),
        ..Default::default()
    };
    let debug = format!("{:?}", config);

    assert!(!debug.contains("sk-secret"));
    assert!(debug.contains("<redacted>"));
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_verdict_env();

    let config = Config::from_env().expect("should parse with defaults");

    assert_eq!(config.rate_limit_rps, 5);
    assert_eq!(config.model_timeout, Duration::from_secs(300));
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_verdict_env();

    let config = with_env_vars(
        &[
            ("VERDICT_DATABASE_PATH", "/tmp/verdict-test.db"),
            ("VERDICT_DATASET_URL", "http://localhost:9000/items"),
            ("VERDICT_API_KEY", "  sk-test  "),
            ("VERDICT_RATE_LIMIT_RPS", "12"),
            ("VERDICT_MODEL_TIMEOUT_SECS", "30"),
            ("VERDICT_INNER_CONCURRENCY", "8"),
            ("VERDICT_MIN_CONFIDENCE", "0.55"),
        ],
        Config::from_env,
    )
    .expect("should parse overrides");

    assert_eq!(config.database_path, PathBuf::from("/tmp/verdict-test.db"));
    assert_eq!(config.dataset_url.as_deref(), Some("http://localhost:9000/items"));
    assert_eq!(config.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.rate_limit_rps, 12);
    assert_eq!(config.model_timeout, Duration::from_secs(30));
    assert_eq!(config.inner_concurrency, Some(8));
    assert!((config.min_confidence - 0.55).abs() < f64::EPSILON);
}

#[test]
#[serial]
fn test_blank_optional_values_are_unset() {
    clear_verdict_env();

    let config = with_env_vars(
        &[("VERDICT_API_KEY", "   "), ("VERDICT_INNER_CONCURRENCY", "")],
        Config::from_env,
    )
    .unwrap();

    assert!(config.api_key.is_none());
    assert!(config.inner_concurrency.is_none());
}

#[test]
#[serial]
fn test_invalid_number_is_error() {
    clear_verdict_env();

    let result = with_env_vars(&[("VERDICT_RATE_LIMIT_RPS", "fast")], Config::from_env);

    match result {
        Err(ConfigError::IntParseError { name, value, .. }) => {
            assert_eq!(name, "VERDICT_RATE_LIMIT_RPS");
            assert_eq!(value, "fast");
        }
        other => panic!("expected IntParseError, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_invalid_float_is_error() {
    clear_verdict_env();

    let result = with_env_vars(&[("VERDICT_MIN_CONFIDENCE", "high")], Config::from_env);
    assert!(matches!(result, Err(ConfigError::FloatParseError { .. })));
}

#[test]
fn test_validate_rejects_zero_rate_limit() {
    let config = Config {
        rate_limit_rps: 0,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidRateLimit { value: 0 })
    ));
}

#[test]
fn test_validate_rejects_zero_timeout_and_concurrency() {
    let config = Config {
        model_timeout: Duration::ZERO,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::InvalidTimeout)));

    let config = Config {
        inner_concurrency: Some(0),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidConcurrency { value: 0 })
    ));
}

#[test]
fn test_validate_rejects_out_of_range_confidence() {
    let config = Config {
        min_confidence: 1.5,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidMinConfidence { .. })
    ));
}

#[test]
fn test_validate_rejects_directory_as_database() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = Config {
        database_path: dir.path().to_path_buf(),
        ..Default::default()
    };

    assert!(matches!(config.validate(), Err(ConfigError::NotAFile { .. })));
}
