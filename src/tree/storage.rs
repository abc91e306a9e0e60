use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, params};

use super::error::{TreeError, TreeResult};
use super::types::ClassificationNode;

/// Read-mostly source of classification node rows.
#[async_trait]
pub trait TreeStorage: Send + Sync {
    /// Bulk-fetches every `(code, name, parent_code, level)` row.
    async fn fetch_nodes(&self) -> TreeResult<Vec<ClassificationNode>>;
}

/// SQLite-backed node storage (`classification_nodes` table).
#[derive(Clone)]
pub struct SqliteTreeStorage {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteTreeStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTreeStorage").finish_non_exhaustive()
    }
}

impl SqliteTreeStorage {
    /// Opens (or creates) the database at `path` and ensures the schema exists.
    pub fn open(path: impl AsRef<Path>) -> TreeResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens an in-memory database (for testing).
    pub fn in_memory() -> TreeResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> TreeResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS classification_nodes (
                code TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                parent_code TEXT,
                level INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_classification_nodes_parent
                ON classification_nodes(parent_code);",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Upserts rows in one transaction; returns the number written.
    pub async fn insert_nodes(&self, nodes: Vec<ClassificationNode>) -> TreeResult<usize> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || -> TreeResult<usize> {
            let mut conn = conn.lock();
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO classification_nodes (code, name, parent_code, level)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for node in &nodes {
                    stmt.execute(params![node.code, node.name, node.parent_code, node.level])?;
                }
            }
            tx.commit()?;
            Ok(nodes.len())
        })
        .await?
    }
}

#[async_trait]
impl TreeStorage for SqliteTreeStorage {
    async fn fetch_nodes(&self) -> TreeResult<Vec<ClassificationNode>> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || -> TreeResult<Vec<ClassificationNode>> {
            let conn = conn.lock();
            let mut stmt = conn.prepare(
                "SELECT code, name, parent_code, level FROM classification_nodes
                 ORDER BY level ASC, code ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(ClassificationNode {
                    code: row.get(0)?,
                    name: row.get(1)?,
                    parent_code: row.get(2)?,
                    level: row.get(3)?,
                })
            })?;
            let nodes = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(nodes)
        })
        .await?
    }
}

/// In-memory node storage with fetch counting and failure injection.
#[cfg(any(test, feature = "mock"))]
#[derive(Default)]
pub struct MockTreeStorage {
    nodes: parking_lot::RwLock<Vec<ClassificationNode>>,
    fetches: std::sync::atomic::AtomicUsize,
    fail: std::sync::atomic::AtomicBool,
    delay: Option<std::time::Duration>,
}

#[cfg(any(test, feature = "mock"))]
impl MockTreeStorage {
    pub fn new(nodes: Vec<ClassificationNode>) -> Self {
        Self {
            nodes: parking_lot::RwLock::new(nodes),
            ..Default::default()
        }
    }

    /// Makes every fetch sleep for `delay` first (widens the build race in tests).
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Small three-level fixture: `A > A.1 > A.1.1` plus sibling sections.
    pub fn sample() -> Self {
        Self::new(vec![
            ClassificationNode::new("A", "Agriculture", None, 0),
            ClassificationNode::new("A.1", "Crop growing", Some("A"), 1),
            ClassificationNode::new("A.1.1", "Cereals", Some("A.1"), 2),
            ClassificationNode::new("A.2", "Animal farming", Some("A"), 1),
            ClassificationNode::new("C", "Manufacturing", None, 0),
            ClassificationNode::new("C.25", "Fabricated metal products", Some("C"), 1),
            ClassificationNode::new("C.25.9", "Fasteners", Some("C.25"), 2),
        ])
    }

    pub fn set_nodes(&self, nodes: Vec<ClassificationNode>) {
        *self.nodes.write() = nodes;
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Number of `fetch_nodes` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl TreeStorage for MockTreeStorage {
    async fn fetch_nodes(&self) -> TreeResult<Vec<ClassificationNode>> {
        self.fetches.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(TreeError::Storage("mock storage offline".to_string()));
        }
        Ok(self.nodes.read().clone())
    }
}
