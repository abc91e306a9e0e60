use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::config::{BenchmarkConfig, clean_items};

const DATASET_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("dataset request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("dataset unavailable: {0}")]
    Unavailable(String),
}

pub type CorpusResult<T> = Result<T, CorpusError>;

/// External source of sample items.
#[async_trait]
pub trait CorpusSource: Send + Sync {
    async fn fetch(&self, limit: usize) -> CorpusResult<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct DatasetResponse {
    #[serde(default)]
    data: Vec<String>,
}

/// Fetches items from an HTTP dataset endpoint (`GET {url}?limit=N`).
///
/// The endpoint answers `{"data": ["item", ...]}`.
#[derive(Debug, Clone)]
pub struct HttpCorpusSource {
    client: reqwest::Client,
    url: String,
}

impl HttpCorpusSource {
    pub fn new(url: impl Into<String>) -> CorpusResult<Self> {
        let client = reqwest::Client::builder().timeout(DATASET_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CorpusSource for HttpCorpusSource {
    async fn fetch(&self, limit: usize) -> CorpusResult<Vec<String>> {
        let response: DatasetResponse = self
            .client
            .get(&self.url)
            .query(&[("limit", limit)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut items = clean_items(response.data.iter().map(String::as_str));
        items.truncate(limit);
        Ok(items)
    }
}

/// Fixed item list, or a source that always fails when built with `None`.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Default)]
pub struct MockCorpusSource {
    items: Option<Vec<String>>,
    fetches: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "mock"))]
impl MockCorpusSource {
    pub fn new(items: &[&str]) -> Self {
        Self {
            items: Some(items.iter().map(|s| (*s).to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl CorpusSource for MockCorpusSource {
    async fn fetch(&self, limit: usize) -> CorpusResult<Vec<String>> {
        self.fetches.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.items {
            Some(items) => Ok(items.iter().take(limit).cloned().collect()),
            None => Err(CorpusError::Unavailable("mock dataset offline".to_string())),
        }
    }
}

/// Picks the corpus: explicit items, else the dataset, else `fallback`.
///
/// Dataset errors are logged and fall through.
pub async fn resolve_corpus(
    config: &BenchmarkConfig,
    source: Option<&dyn CorpusSource>,
    fallback: &[String],
) -> Vec<String> {
    let explicit = config.explicit_corpus();
    if !explicit.is_empty() {
        info!(items = explicit.len(), "Using explicit corpus");
        return explicit;
    }

    if config.use_dataset {
        match source {
            Some(source) => match source.fetch(config.dataset_limit()).await {
                Ok(items) if !items.is_empty() => {
                    info!(items = items.len(), "Using dataset corpus");
                    return items;
                }
                Ok(_) => warn!("Dataset returned no items, using default corpus"),
                Err(e) => warn!(error = %e, "Dataset fetch failed, using default corpus"),
            },
            None => warn!("Dataset requested but no dataset source configured"),
        }
    }

    info!(items = fallback.len(), "Using default corpus");
    fallback.to_vec()
}
