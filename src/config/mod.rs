//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `VERDICT_*` environment variables.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_MIN_CONFIDENCE, DEFAULT_MODEL_TIMEOUT, DEFAULT_RATE_LIMIT_RPS};

/// Process configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `VERDICT_*` overrides on top of defaults.
#[derive(Clone)]
pub struct Config {
    /// SQLite file holding classification nodes and run history. Default: `./.data/verdict.db`.
    pub database_path: PathBuf,

    /// JSON routing table. Default: `./.data/routing.json`.
    pub routing_path: PathBuf,

    /// Dataset endpoint for `use_dataset` requests.
    pub dataset_url: Option<String>,

    /// API key handed to every chat provider.
    pub api_key: Option<String>,

    /// Backend calls per second per model. Default: `5`.
    pub rate_limit_rps: u32,

    /// Wall-clock budget per model. Default: 5 minutes.
    pub model_timeout: Duration,

    /// Cap on concurrently running items per model. Default: unbounded.
    pub inner_concurrency: Option<usize>,

    /// Classifier early-stop threshold. Default: `0.7`.
    pub min_confidence: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./.data/verdict.db"),
            routing_path: PathBuf::from("./.data/routing.json"),
            dataset_url: None,
            api_key: None,
            rate_limit_rps: DEFAULT_RATE_LIMIT_RPS,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            inner_concurrency: None,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("routing_path", &self.routing_path)
            .field("dataset_url", &self.dataset_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("rate_limit_rps", &self.rate_limit_rps)
            .field("model_timeout", &self.model_timeout)
            .field("inner_concurrency", &self.inner_concurrency)
            .field("min_confidence", &self.min_confidence)
            .finish()
    }
}

impl Config {
    const ENV_DATABASE_PATH: &'static str = "VERDICT_DATABASE_PATH";
    const ENV_ROUTING_PATH: &'static str = "VERDICT_ROUTING_PATH";
    const ENV_DATASET_URL: &'static str = "VERDICT_DATASET_URL";
    const ENV_API_KEY: &'static str = "VERDICT_API_KEY";
    const ENV_RATE_LIMIT_RPS: &'static str = "VERDICT_RATE_LIMIT_RPS";
    const ENV_MODEL_TIMEOUT_SECS: &'static str = "VERDICT_MODEL_TIMEOUT_SECS";
    const ENV_INNER_CONCURRENCY: &'static str = "VERDICT_INNER_CONCURRENCY";
    const ENV_MIN_CONFIDENCE: &'static str = "VERDICT_MIN_CONFIDENCE";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let database_path = Self::parse_path_from_env(Self::ENV_DATABASE_PATH, defaults.database_path);
        let routing_path = Self::parse_path_from_env(Self::ENV_ROUTING_PATH, defaults.routing_path);
        let dataset_url = Self::parse_optional_string_from_env(Self::ENV_DATASET_URL);
        let api_key = Self::parse_optional_string_from_env(Self::ENV_API_KEY);
        let rate_limit_rps =
            Self::parse_int_from_env(Self::ENV_RATE_LIMIT_RPS)?.unwrap_or(defaults.rate_limit_rps);
        let model_timeout = Self::parse_int_from_env::<u64>(Self::ENV_MODEL_TIMEOUT_SECS)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.model_timeout);
        let inner_concurrency = Self::parse_int_from_env(Self::ENV_INNER_CONCURRENCY)?;
        let min_confidence =
            Self::parse_f64_from_env(Self::ENV_MIN_CONFIDENCE)?.unwrap_or(defaults.min_confidence);

        Ok(Self {
            database_path,
            routing_path,
            dataset_url,
            api_key,
            rate_limit_rps,
            model_timeout,
            inner_concurrency,
            min_confidence,
        })
    }

    /// Validates paths and basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit_rps == 0 {
            return Err(ConfigError::InvalidRateLimit {
                value: self.rate_limit_rps,
            });
        }

        if self.model_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }

        if let Some(value) = self.inner_concurrency
            && value == 0
        {
            return Err(ConfigError::InvalidConcurrency { value });
        }

        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::InvalidMinConfidence {
                value: self.min_confidence,
            });
        }

        for path in [&self.database_path, &self.routing_path] {
            if path.exists() && !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        Ok(())
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_int_from_env<T>(var_name: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr<Err = std::num::ParseIntError>,
    {
        match Self::parse_optional_string_from_env(var_name) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::IntParseError {
                    name: var_name,
                    value,
                    source: e,
                }),
            None => Ok(None),
        }
    }

    fn parse_f64_from_env(var_name: &'static str) -> Result<Option<f64>, ConfigError> {
        match Self::parse_optional_string_from_env(var_name) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::FloatParseError {
                    name: var_name,
                    value,
                    source: e,
                }),
            None => Ok(None),
        }
    }
}
