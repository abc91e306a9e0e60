use std::time::Duration;

use tracing::warn;

use super::category::{ErrorBreakdown, ErrorCategory};
use super::types::{ItemOutcome, ModelBenchmarkResult, ModelSamples, ModelStatus};

/// Reduces one model's raw samples into a [`ModelBenchmarkResult`].
///
/// `total_requests` is the corpus size. If fewer outcomes were collected the
/// gap is counted as `other` failures so `success + error == total_requests`
/// still holds.
pub fn aggregate(samples: &ModelSamples, total_requests: usize) -> ModelBenchmarkResult {
    let mut durations: Vec<Duration> = Vec::new();
    let mut confidences: Vec<f64> = Vec::new();
    let mut ai_calls: u64 = 0;
    let mut attempts: u64 = 0;
    let mut attempted: u64 = 0;
    let mut breakdown = ErrorBreakdown::new();

    for outcome in &samples.outcomes {
        if let Some(n) = outcome.attempts() {
            attempts += u64::from(n);
            attempted += 1;
        }
        match outcome {
            ItemOutcome::Success {
                duration,
                confidence,
                ai_calls: calls,
                ..
            } => {
                durations.push(*duration);
                confidences.push(*confidence);
                ai_calls += u64::from(*calls);
            }
            ItemOutcome::Failure { category, .. } => breakdown.record(*category),
        }
    }

    let missing = total_requests.saturating_sub(samples.outcomes.len());
    if missing > 0 {
        warn!(
            model = %samples.model,
            missing,
            "Missing item outcomes, counting them as failures"
        );
        for _ in 0..missing {
            breakdown.record(ErrorCategory::Other);
        }
    }

    let success_count = durations.len() as u64;
    let error_count = breakdown.total();
    let total = success_count + error_count;

    durations.sort_unstable();
    let stats = DurationStats::from_sorted(&durations);

    let elapsed_secs = samples.elapsed.as_secs_f64();
    let speed = if success_count > 0 && elapsed_secs > 0.0 {
        success_count as f64 / elapsed_secs
    } else {
        0.0
    };

    let (avg_confidence, min_confidence, max_confidence) = confidence_stats(&confidences);

    ModelBenchmarkResult {
        model: samples.model.clone(),
        status: ModelStatus::from_counts(success_count, error_count),
        priority: 0,
        success_count,
        error_count,
        total_requests: total,
        success_rate: ratio(success_count as f64, total),
        speed,
        total_time_ms: as_millis(samples.elapsed),
        avg_response_time_ms: as_millis(stats.mean),
        median_response_time_ms: as_millis(percentile(&durations, 0.50)),
        p75_response_time_ms: as_millis(percentile(&durations, 0.75)),
        p90_response_time_ms: as_millis(percentile(&durations, 0.90)),
        p95_response_time_ms: as_millis(percentile(&durations, 0.95)),
        p99_response_time_ms: as_millis(percentile(&durations, 0.99)),
        min_response_time_ms: as_millis(stats.min),
        max_response_time_ms: as_millis(stats.max),
        coefficient_of_variation: stats.coefficient_of_variation,
        avg_confidence,
        min_confidence,
        max_confidence,
        avg_ai_calls_count: ratio(ai_calls as f64, success_count),
        avg_retries: ratio(attempts as f64, attempted),
        error_breakdown: breakdown,
    }
}

/// Nearest-rank percentile over an ascending slice: `sorted[floor(n * p)]`,
/// clamped to the last element. Zero for an empty slice.
pub fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

struct DurationStats {
    mean: Duration,
    min: Duration,
    max: Duration,
    coefficient_of_variation: f64,
}

impl DurationStats {
    fn from_sorted(sorted: &[Duration]) -> Self {
        let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
            return Self {
                mean: Duration::ZERO,
                min: Duration::ZERO,
                max: Duration::ZERO,
                coefficient_of_variation: 0.0,
            };
        };

        let total_nanos: u128 = sorted.iter().map(Duration::as_nanos).sum();
        let mean_nanos = total_nanos / sorted.len() as u128;

        let n = sorted.len() as f64;
        let mean = mean_nanos as f64;
        let variance = sorted
            .iter()
            .map(|d| (d.as_nanos() as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        let coefficient_of_variation = if mean > 0.0 {
            variance.sqrt() / mean
        } else {
            0.0
        };

        Self {
            mean: Duration::from_nanos(u64::try_from(mean_nanos).unwrap_or(u64::MAX)),
            min,
            max,
            coefficient_of_variation,
        }
    }
}

fn confidence_stats(values: &[f64]) -> (f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (avg, min, max)
}

fn ratio(numerator: f64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}

fn as_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
