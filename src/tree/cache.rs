//! Lazily built, shared classification tree.
//!
//! Reads take a short `parking_lot` read lock and clone an `Arc`. Builds are
//! serialized by an async mutex so concurrent first callers wait for a single
//! storage query instead of racing their own.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{error, info};

use super::error::TreeResult;
use super::storage::TreeStorage;
use super::types::ClassificationTree;

/// Construct-once, share-read-only cache of the classification tree.
pub struct TreeCache {
    storage: Arc<dyn TreeStorage>,
    current: RwLock<Option<Arc<ClassificationTree>>>,
    build_lock: Mutex<()>,
}

impl TreeCache {
    pub fn new(storage: Arc<dyn TreeStorage>) -> Self {
        Self {
            storage,
            current: RwLock::new(None),
            build_lock: Mutex::new(()),
        }
    }

    /// Returns the cached tree, building it on first use.
    ///
    /// `None` means classification is unavailable (storage failed or held no nodes);
    /// it is never an empty tree. Failures are not cached, so the next call retries.
    pub async fn get(&self) -> Option<Arc<ClassificationTree>> {
        match self.try_get().await {
            Ok(tree) => Some(tree),
            Err(e) => {
                error!(error = %e, "Failed to build classification tree");
                None
            }
        }
    }

    /// Like [`TreeCache::get`] but reports why the build failed.
    pub async fn try_get(&self) -> TreeResult<Arc<ClassificationTree>> {
        if let Some(tree) = self.cached() {
            return Ok(tree);
        }

        let _guard = self.build_lock.lock().await;

        // Another caller may have finished the build while we waited.
        if let Some(tree) = self.cached() {
            return Ok(tree);
        }

        info!("Building classification tree from storage");
        let rows = self.storage.fetch_nodes().await?;
        let tree = Arc::new(ClassificationTree::from_nodes(rows)?);

        info!(
            nodes = tree.len(),
            sections = tree.section_count(),
            "Classification tree built (cached for reuse)"
        );

        *self.current.write() = Some(Arc::clone(&tree));
        Ok(tree)
    }

    /// Returns the cached tree without building.
    pub fn cached(&self) -> Option<Arc<ClassificationTree>> {
        self.current.read().clone()
    }

    /// Returns `true` if a tree is currently cached.
    pub fn is_cached(&self) -> bool {
        self.current.read().is_some()
    }

    /// Drops the cached tree; the next [`TreeCache::get`] rebuilds from storage.
    ///
    /// Holders of the previous `Arc` keep using it until they drop it.
    pub fn invalidate(&self) {
        *self.current.write() = None;
        info!("Classification tree cache invalidated");
    }
}

impl std::fmt::Debug for TreeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeCache")
            .field("cached", &self.is_cached())
            .finish()
    }
}
