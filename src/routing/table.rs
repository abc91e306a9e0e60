use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::{RoutingError, RoutingResult};
use super::types::RoutingEntry;

/// Live routing entries whose priorities a run may overwrite.
#[async_trait]
pub trait RoutingTable: Send + Sync {
    async fn entries(&self) -> RoutingResult<Vec<RoutingEntry>>;

    /// Replaces the entry with the same provider and model.
    ///
    /// Either the whole entry is written or nothing changes.
    async fn update_entry(&self, entry: &RoutingEntry) -> RoutingResult<()>;

    /// First entry routing to `model`.
    async fn find(&self, model: &str) -> RoutingResult<Option<RoutingEntry>> {
        Ok(self.entries().await?.into_iter().find(|e| e.model == model))
    }
}

/// Source of the models a run may benchmark.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Every enabled model, de-duplicated, in table order.
    async fn available_models(&self) -> RoutingResult<Vec<String>>;

    /// Enabled models of one provider (case-insensitive).
    async fn provider_models(&self, provider: &str) -> RoutingResult<Vec<String>>;
}

fn enabled_models<'a>(entries: impl Iterator<Item = &'a RoutingEntry>) -> Vec<String> {
    let mut seen = HashSet::new();
    entries
        .filter(|e| e.enabled)
        .filter(|e| seen.insert(e.model.clone()))
        .map(|e| e.model.clone())
        .collect()
}

fn replace_entry(entries: &mut [RoutingEntry], entry: &RoutingEntry) -> RoutingResult<RoutingEntry> {
    let slot = entries
        .iter_mut()
        .find(|e| e.provider == entry.provider && e.model == entry.model)
        .ok_or_else(|| RoutingError::NotFound(entry.model.clone()))?;
    Ok(std::mem::replace(slot, entry.clone()))
}

/// Process-local routing table.
#[derive(Debug, Default)]
pub struct InMemoryRoutingTable {
    entries: RwLock<Vec<RoutingEntry>>,
    rejected: RwLock<HashSet<String>>,
}

impl InMemoryRoutingTable {
    pub fn new(entries: Vec<RoutingEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            rejected: RwLock::new(HashSet::new()),
        }
    }

    /// Makes every update for `model` fail.
    #[cfg(any(test, feature = "mock"))]
    pub fn reject_updates_for(&self, model: &str) {
        self.rejected.write().insert(model.to_string());
    }

    pub fn snapshot(&self) -> Vec<RoutingEntry> {
        self.entries.read().clone()
    }
}

#[async_trait]
impl RoutingTable for InMemoryRoutingTable {
    async fn entries(&self) -> RoutingResult<Vec<RoutingEntry>> {
        Ok(self.snapshot())
    }

    async fn update_entry(&self, entry: &RoutingEntry) -> RoutingResult<()> {
        if self.rejected.read().contains(&entry.model) {
            return Err(RoutingError::WriteFailed(format!(
                "update rejected for {}",
                entry.model
            )));
        }
        replace_entry(&mut self.entries.write(), entry)?;
        Ok(())
    }
}

#[async_trait]
impl ModelCatalog for InMemoryRoutingTable {
    async fn available_models(&self) -> RoutingResult<Vec<String>> {
        Ok(enabled_models(self.entries.read().iter()))
    }

    async fn provider_models(&self, provider: &str) -> RoutingResult<Vec<String>> {
        Ok(enabled_models(
            self.entries
                .read()
                .iter()
                .filter(|e| e.provider.eq_ignore_ascii_case(provider)),
        ))
    }
}

/// Routing table persisted as a JSON array, rewritten on every update.
#[derive(Debug)]
pub struct JsonRoutingTable {
    path: PathBuf,
    entries: Mutex<Vec<RoutingEntry>>,
}

impl JsonRoutingTable {
    /// Loads the table at `path`; a missing file is an empty table.
    pub async fn load(path: impl AsRef<Path>) -> RoutingResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Routing file not found, starting empty");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), entries = entries.len(), "Routing table loaded");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Writes `entries` as the new table contents.
    pub async fn create(path: impl AsRef<Path>, entries: Vec<RoutingEntry>) -> RoutingResult<Self> {
        let table = Self {
            path: path.as_ref().to_path_buf(),
            entries: Mutex::new(entries),
        };
        {
            let entries = table.entries.lock().await;
            table.persist(&entries).await?;
        }
        Ok(table)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &[RoutingEntry]) -> RoutingResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl RoutingTable for JsonRoutingTable {
    async fn entries(&self) -> RoutingResult<Vec<RoutingEntry>> {
        Ok(self.entries.lock().await.clone())
    }

    async fn update_entry(&self, entry: &RoutingEntry) -> RoutingResult<()> {
        let mut entries = self.entries.lock().await;
        let previous = replace_entry(&mut entries, entry)?;
        if let Err(e) = self.persist(&entries).await {
            // restore the in-memory copy so it keeps matching the file
            replace_entry(&mut entries, &previous)?;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl ModelCatalog for JsonRoutingTable {
    async fn available_models(&self) -> RoutingResult<Vec<String>> {
        Ok(enabled_models(self.entries.lock().await.iter()))
    }

    async fn provider_models(&self, provider: &str) -> RoutingResult<Vec<String>> {
        let entries = self.entries.lock().await;
        Ok(enabled_models(
            entries
                .iter()
                .filter(|e| e.provider.eq_ignore_ascii_case(provider)),
        ))
    }
}
