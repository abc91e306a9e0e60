use std::cmp::Ordering;

use super::types::ModelBenchmarkResult;

/// Ranking order: success rate, then confidence, then speed (all descending),
/// then coefficient of variation (ascending).
pub fn compare(a: &ModelBenchmarkResult, b: &ModelBenchmarkResult) -> Ordering {
    b.success_rate
        .total_cmp(&a.success_rate)
        .then_with(|| b.avg_confidence.total_cmp(&a.avg_confidence))
        .then_with(|| b.speed.total_cmp(&a.speed))
        .then_with(|| a.coefficient_of_variation.total_cmp(&b.coefficient_of_variation))
}

/// Sorts results best-first and assigns priorities `1..=n`.
///
/// The sort is stable, so fully tied models keep their input order.
pub fn rank(results: &mut [ModelBenchmarkResult]) {
    results.sort_by(compare);
    for (i, result) in results.iter_mut().enumerate() {
        result.priority = (i + 1) as u32;
    }
}
