use tracing::{info, warn};

use super::table::RoutingTable;
use super::types::{PromotionReport, RoutingEntry};
use crate::metrics::ModelBenchmarkResult;

/// Writes each ranked model's priority into its routing entry.
///
/// Entries are updated one at a time. A failed write leaves that entry at its
/// previous priority; entries already written stay written.
pub async fn promote_priorities(
    table: &dyn RoutingTable,
    results: &[ModelBenchmarkResult],
) -> PromotionReport {
    let mut report = PromotionReport::default();

    for result in results {
        let entry = match table.find(&result.model).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                warn!(model = %result.model, "No routing entry for ranked model");
                report.missing.push(result.model.clone());
                continue;
            }
            Err(e) => {
                warn!(model = %result.model, error = %e, "Failed to look up routing entry");
                report.failed.push((result.model.clone(), e.to_string()));
                continue;
            }
        };

        let updated = RoutingEntry {
            priority: result.priority,
            ..entry.clone()
        };
        match table.update_entry(&updated).await {
            Ok(()) => {
                info!(
                    model = %result.model,
                    from = entry.priority,
                    to = result.priority,
                    "Routing priority updated"
                );
                report.updated.push(result.model.clone());
            }
            Err(e) => {
                warn!(
                    model = %result.model,
                    kept = entry.priority,
                    error = %e,
                    "Routing priority update failed, entry left unchanged"
                );
                report.failed.push((result.model.clone(), e.to_string()));
            }
        }
    }

    report
}
