//! Run history: one stored row per model per run.

pub mod error;
pub mod recorder;
pub mod store;
pub mod types;


pub use error::{HistoryError, HistoryResult};
pub use recorder::RunRecorder;
pub use store::{InMemoryRunStore, RunStore, SqliteRunStore};
pub use types::{HistoryRecord, format_timestamp};
