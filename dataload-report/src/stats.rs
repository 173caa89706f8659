//! Run Statistics
//!
//! Aggregates a [`RunSummary`] into the numbers every output format shows.
//! Duration and memory figures come from successful records only; failed
//! records are counted but never averaged in.

use chrono::{DateTime, Utc};
use dataload_core::{RunSummary, TaskRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Per-task load duration statistics, in seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationSummary {
    /// Number of samples
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Middle value
    pub median: f64,
    /// Sample standard deviation (n - 1)
    pub std_dev: f64,
    /// Fastest load
    pub min: f64,
    /// Slowest load
    pub max: f64,
    /// 50th percentile
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
}

impl DurationSummary {
    /// Summarize `samples`; all zeros when empty
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let std_dev = if n < 2 {
            0.0
        } else {
            let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            variance.sqrt()
        };

        Self {
            count: n,
            mean,
            median: percentile_sorted(&sorted, 50.0),
            std_dev,
            min: sorted[0],
            max: sorted[n - 1],
            p50: percentile_sorted(&sorted, 50.0),
            p90: percentile_sorted(&sorted, 90.0),
            p95: percentile_sorted(&sorted, 95.0),
            p99: percentile_sorted(&sorted, 99.0),
        }
    }
}

/// Compute a percentile with linear interpolation between nearest ranks
pub fn compute_percentile(samples: &[f64], percentile: f64) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    percentile_sorted(&sorted, percentile)
}

fn percentile_sorted(sorted: &[f64], percentile: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (percentile / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let fraction = rank - lower as f64;
            sorted[lower] + fraction * (sorted[upper] - sorted[lower])
        }
    }
}

/// Everything derived from one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Records in the run
    pub total_tasks: usize,
    /// Records that loaded
    pub succeeded: usize,
    /// Records that failed
    pub failed: usize,
    /// Bytes read by successful tasks
    pub bytes_read: u64,
    /// Program start to program end
    pub wall_time_secs: f64,
    /// Earliest start among successful loads
    pub first_load_start: Option<DateTime<Utc>>,
    /// Latest end among successful loads
    pub last_load_end: Option<DateTime<Utc>>,
    /// Load durations of successful tasks
    pub durations: DurationSummary,
    /// Highest resident memory seen after a successful load
    pub peak_resident_bytes: u64,
    /// Highest virtual memory seen after a successful load
    pub peak_virtual_bytes: u64,
    /// Bytes read per second of wall time
    pub throughput_bytes_per_sec: f64,
    /// Distinct threads that executed tasks
    pub distinct_executors: usize,
}

impl RunStatistics {
    /// Aggregate a finished run
    pub fn from_summary(summary: &RunSummary) -> Self {
        let ok: Vec<&TaskRecord> = summary.succeeded().collect();
        let samples: Vec<f64> = ok.iter().map(|r| r.duration.as_secs_f64()).collect();
        let bytes_read = ok.iter().map(|r| r.bytes_read).sum::<u64>();
        let wall_time_secs = summary.wall_time().as_secs_f64();

        let throughput_bytes_per_sec = if wall_time_secs > 0.0 {
            bytes_read as f64 / wall_time_secs
        } else {
            0.0
        };

        let distinct_executors = summary
            .records
            .iter()
            .map(|r| (r.executor.pid, r.executor.tid, r.executor.name.as_deref()))
            .collect::<HashSet<_>>()
            .len();

        Self {
            total_tasks: summary.records.len(),
            succeeded: ok.len(),
            failed: summary.failed_count(),
            bytes_read,
            wall_time_secs,
            first_load_start: ok.iter().map(|r| r.start_time).min(),
            last_load_end: ok.iter().map(|r| r.end_time).max(),
            durations: DurationSummary::from_samples(&samples),
            peak_resident_bytes: ok.iter().map(|r| r.resident_memory_bytes).max().unwrap_or(0),
            peak_virtual_bytes: ok.iter().map(|r| r.virtual_memory_bytes).max().unwrap_or(0),
            throughput_bytes_per_sec,
            distinct_executors,
        }
    }
}
