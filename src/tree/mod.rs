//! Shared hierarchical classification tree.
//!
//! [`TreeStorage`] supplies flat node rows, [`ClassificationTree`] links them into
//! an immutable arena, and [`TreeCache`] builds that tree once and hands out
//! `Arc` clones to every concurrent classifier.

pub mod cache;
pub mod error;
pub mod storage;
pub mod types;


pub use cache::TreeCache;
pub use error::{TreeError, TreeResult};
#[cfg(any(test, feature = "mock"))]
pub use storage::MockTreeStorage;
pub use storage::{SqliteTreeStorage, TreeStorage};
pub use types::{ClassificationNode, ClassificationTree, TreeNode};
