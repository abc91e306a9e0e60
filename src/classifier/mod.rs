//! Item classification against the shared tree.
//!
//! An [`ItemClassifier`] binds one [`ClassificationBackend`] and walks a
//! [`ClassificationTree`](crate::tree::ClassificationTree) from the root, asking
//! the backend to choose among the current node's children at each level.

pub mod backend;
pub mod chat;
pub mod classifier;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod types;


pub use backend::{BackendFactory, ClassificationBackend};
pub use chat::{GenaiBackend, GenaiBackendFactory, RateLimiter, parse_reply};
pub use classifier::ItemClassifier;
pub use error::{ClassificationError, ClassificationResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockBackend, MockBackendFactory, MockBehavior};
pub use types::{ClassificationStep, ItemClassification, StepChoice, StepDecision, StepRequest};
