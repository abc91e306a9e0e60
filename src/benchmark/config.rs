use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CATEGORY, DEFAULT_DATASET_LIMIT, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS,
    MAX_DATASET_LIMIT,
};

/// Options of one benchmark request.
///
/// Numeric fields are kept as sent; the accessors coerce non-positive values
/// to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Promote the ranking into live routing priorities.
    pub auto_update_priorities: bool,
    /// Explicit corpus.
    pub test_products: Vec<String>,
    /// Fetch the corpus from the dataset source when no explicit corpus is given.
    pub use_dataset: bool,
    pub dataset_limit: Option<i64>,
    pub max_retries: Option<i64>,
    pub retry_delay_ms: Option<i64>,
    /// Only benchmark these models.
    pub models: Vec<String>,
    /// Only benchmark this provider's models.
    pub provider: Option<String>,
    pub category: Option<String>,
}

impl BenchmarkConfig {
    pub fn max_retries(&self) -> u32 {
        match self.max_retries {
            Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
            _ => DEFAULT_MAX_RETRIES,
        }
    }

    pub fn retry_delay(&self) -> Duration {
        match self.retry_delay_ms {
            Some(ms) if ms > 0 => Duration::from_millis(ms as u64),
            _ => Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }

    /// Dataset item limit, capped at 500.
    pub fn dataset_limit(&self) -> usize {
        match self.dataset_limit {
            Some(n) if n > 0 => usize::try_from(n)
                .unwrap_or(MAX_DATASET_LIMIT)
                .min(MAX_DATASET_LIMIT),
            _ => DEFAULT_DATASET_LIMIT,
        }
    }

    pub fn category(&self) -> &str {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
    }

    /// Non-blank explicit corpus items, trimmed.
    pub fn explicit_corpus(&self) -> Vec<String> {
        clean_items(self.test_products.iter().map(String::as_str))
    }

    /// Non-blank model filter entries, trimmed.
    pub fn model_filter(&self) -> Vec<String> {
        clean_items(self.models.iter().map(String::as_str))
    }

    pub fn provider_filter(&self) -> Option<&str> {
        self.provider
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn with_test_products(mut self, items: &[&str]) -> Self {
        self.test_products = items.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn with_provider(mut self, provider: &str) -> Self {
        self.provider = Some(provider.to_string());
        self
    }

    pub fn with_max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_retry_delay_ms(mut self, delay_ms: i64) -> Self {
        self.retry_delay_ms = Some(delay_ms);
        self
    }

    pub fn with_auto_update_priorities(mut self, enabled: bool) -> Self {
        self.auto_update_priorities = enabled;
        self
    }

    pub fn with_dataset(mut self, limit: i64) -> Self {
        self.use_dataset = true;
        self.dataset_limit = Some(limit);
        self
    }
}

pub(crate) fn clean_items<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    items
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
