//! Live routing entries: the model catalog a run selects from and the sink
//! its ranking is promoted into.

pub mod error;
pub mod promote;
pub mod table;
pub mod types;


pub use error::{RoutingError, RoutingResult};
pub use promote::promote_priorities;
pub use table::{InMemoryRoutingTable, JsonRoutingTable, ModelCatalog, RoutingTable};
pub use types::{PromotionReport, RoutingEntry};
