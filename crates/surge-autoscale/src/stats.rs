//! Statistics buffer — recent per-replica concurrency samples.
//!
//! Samples are grouped into one-second buckets keyed by their Unix time.
//! Recording only appends; trimming to the stable window happens when a
//! decision is made, so the write path stays cheap.

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One replica's average concurrency since its previous report.
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    /// When the sample was taken.
    pub time: SystemTime,
    /// Identity of the reporting replica.
    pub replica_id: String,
    /// Average in-flight requests over the reporting interval.
    pub average_concurrency: f64,
}

impl Stat {
    pub fn new(time: SystemTime, replica_id: impl Into<String>, average_concurrency: f64) -> Self {
        Self {
            time,
            replica_id: replica_id.into(),
            average_concurrency,
        }
    }
}

/// Aggregate over the samples inside one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowAverage {
    /// Mean concurrency across every sample in the window.
    pub average_concurrency: f64,
    /// Distinct replicas that reported in the window.
    pub replicas: usize,
    /// Number of samples in the window.
    pub samples: usize,
}

impl WindowAverage {
    /// Total in-flight requests implied by the window: the per-replica
    /// mean spread over every replica that reported.
    pub fn observed_load(&self) -> f64 {
        self.average_concurrency * self.replicas as f64
    }
}

/// Time-bucketed sample store.
///
/// Not synchronized on its own; the autoscaler guards it together with
/// its mode state.
#[derive(Debug, Default)]
pub struct StatsBuffer {
    /// Unix second → samples taken within that second.
    buckets: BTreeMap<u64, Vec<Stat>>,
}

impl StatsBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample to the bucket for its second.
    pub fn record(&mut self, stat: Stat) {
        self.buckets.entry(bucket_of(stat.time)).or_default().push(stat);
    }

    /// Drop every sample older than `now - window`.
    ///
    /// Whole buckets before the cutoff second are removed; the bucket
    /// containing the cutoff is filtered by exact time. Returns the number
    /// of samples removed.
    pub fn trim(&mut self, now: SystemTime, window: Duration) -> usize {
        let cutoff = window_start(now, window);
        let cutoff_key = bucket_of(cutoff);

        let kept = self.buckets.split_off(&cutoff_key);
        let mut removed: usize = self.buckets.values().map(Vec::len).sum();
        self.buckets = kept;

        if let Some(boundary) = self.buckets.get_mut(&cutoff_key) {
            let before = boundary.len();
            boundary.retain(|s| s.time >= cutoff);
            removed += before - boundary.len();
            if boundary.is_empty() {
                self.buckets.remove(&cutoff_key);
            }
        }

        removed
    }

    /// Aggregate the samples with time in `[now - window, now)`.
    ///
    /// Returns `None` when no sample falls in the window.
    pub fn window(&self, now: SystemTime, window: Duration) -> Option<WindowAverage> {
        let start = window_start(now, window);

        let mut total = 0.0;
        let mut samples = 0usize;
        let mut replicas = HashSet::new();

        for bucket in self.buckets.range(bucket_of(start)..=bucket_of(now)).map(|(_, b)| b) {
            for stat in bucket.iter().filter(|s| s.time >= start && s.time < now) {
                total += stat.average_concurrency;
                samples += 1;
                replicas.insert(stat.replica_id.as_str());
            }
        }

        if samples == 0 {
            return None;
        }

        Some(WindowAverage {
            average_concurrency: total / samples as f64,
            replicas: replicas.len(),
            samples,
        })
    }

    /// Number of one-second buckets currently held.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

fn bucket_of(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn window_start(now: SystemTime, window: Duration) -> SystemTime {
    now.checked_sub(window).unwrap_or(UNIX_EPOCH)
}
