//! Sync job metrics collection and reporting
//!
//! Tracks cycle duration percentiles, success rates and recent outcomes for
//! each scheduled job.

use crate::types::SyncJob;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples to keep for metrics calculation
const MAX_SAMPLES: usize = 100;

/// Metrics for a single job
#[derive(Debug, Clone, Serialize)]
pub struct JobMetrics {
    /// Job the metrics belong to
    pub job: SyncJob,
    /// 50th percentile cycle duration in milliseconds
    pub duration_p50_ms: f64,
    /// 99th percentile cycle duration in milliseconds
    pub duration_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of cycles run
    pub total_cycles: u64,
    /// Number of failed cycles
    pub failed_cycles: u64,
    /// Failures since the last successful cycle
    pub consecutive_failures: u64,
    /// When the last successful cycle finished
    pub last_success: Option<DateTime<Utc>>,
}

impl JobMetrics {
    /// Creates metrics with no data
    pub fn empty(job: SyncJob) -> Self {
        Self {
            job,
            duration_p50_ms: 0.0,
            duration_p99_ms: 0.0,
            success_rate: 1.0,
            total_cycles: 0,
            failed_cycles: 0,
            consecutive_failures: 0,
            last_success: None,
        }
    }
}

/// Internal sample for duration tracking
#[derive(Debug, Clone)]
struct CycleSample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct Counters {
    samples: VecDeque<CycleSample>,
    total: u64,
    failed: u64,
    consecutive_failures: u64,
    last_success: Option<DateTime<Utc>>,
}

/// Collects and computes metrics for one job
pub struct MetricsCollector {
    job: SyncJob,
    counters: RwLock<Counters>,
}

impl MetricsCollector {
    /// Creates a new metrics collector for a job
    pub fn new(job: SyncJob) -> Self {
        Self {
            job,
            counters: RwLock::new(Counters {
                samples: VecDeque::with_capacity(MAX_SAMPLES),
                ..Counters::default()
            }),
        }
    }

    /// Records a cycle with its duration and success status
    pub async fn record_cycle(&self, duration: Duration, success: bool) {
        let mut counters = self.counters.write().await;

        counters.total += 1;
        if success {
            counters.consecutive_failures = 0;
            counters.last_success = Some(Utc::now());
        } else {
            counters.failed += 1;
            counters.consecutive_failures += 1;
        }

        // Rolling window
        if counters.samples.len() >= MAX_SAMPLES {
            counters.samples.pop_front();
        }
        counters.samples.push_back(CycleSample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    /// Computes current metrics from collected samples
    pub async fn get_metrics(&self) -> JobMetrics {
        let counters = self.counters.read().await;

        if counters.samples.is_empty() {
            return JobMetrics::empty(self.job);
        }

        // Percentiles over successful cycles only
        let mut durations: Vec<f64> = counters
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();

        durations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let success_rate = if counters.total > 0 {
            (counters.total - counters.failed) as f64 / counters.total as f64
        } else {
            1.0
        };

        JobMetrics {
            job: self.job,
            duration_p50_ms: percentile(&durations, 50.0),
            duration_p99_ms: percentile(&durations, 99.0),
            success_rate,
            total_cycles: counters.total,
            failed_cycles: counters.failed,
            consecutive_failures: counters.consecutive_failures,
            last_success: counters.last_success,
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_collector() {
        let collector = MetricsCollector::new(SyncJob::PriceRefresh);

        collector.record_cycle(Duration::from_millis(100), true).await;
        collector.record_cycle(Duration::from_millis(200), true).await;
        collector.record_cycle(Duration::from_millis(150), false).await;

        let metrics = collector.get_metrics().await;

        assert_eq!(metrics.job, SyncJob::PriceRefresh);
        assert_eq!(metrics.total_cycles, 3);
        assert_eq!(metrics.failed_cycles, 1);
        assert_eq!(metrics.consecutive_failures, 1);
        assert!(metrics.last_success.is_some());
        assert!(metrics.success_rate > 0.6 && metrics.success_rate < 0.7);
    }

    #[tokio::test]
    async fn test_success_resets_consecutive_failures() {
        let collector = MetricsCollector::new(SyncJob::ListingRefresh);

        collector.record_cycle(Duration::from_millis(10), false).await;
        collector.record_cycle(Duration::from_millis(10), false).await;
        assert_eq!(collector.get_metrics().await.consecutive_failures, 2);

        collector.record_cycle(Duration::from_millis(10), true).await;
        assert_eq!(collector.get_metrics().await.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_empty_metrics() {
        let collector = MetricsCollector::new(SyncJob::PriceRefresh);
        let metrics = collector.get_metrics().await;

        assert_eq!(metrics.total_cycles, 0);
        assert_eq!(metrics.success_rate, 1.0);
        assert!(metrics.last_success.is_none());
    }

    #[test]
    fn test_percentile() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0];
        assert_eq!(percentile(&values, 50.0), 6.0);
        assert_eq!(percentile(&values, 99.0), 11.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
}
