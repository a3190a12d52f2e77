//! In-memory time series storage.
//!
//! Holds one buffer per `(metric, instance)`, sorted by timestamp, and drops
//! samples that fall out of the retention window.

use crate::observability::metrics as obs;
use crate::types::{Datapoint, Sample, TimeSeriesResult};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

/// Instance key of a series; `None` is the scalar instance.
pub type InstanceKey = Option<i64>;

type MetricSeries = BTreeMap<InstanceKey, VecDeque<Sample>>;

/// Bounded per-metric time series buffer.
pub struct DataStore {
    /// Maximum age of samples to keep.
    retention: Duration,
    series: RwLock<HashMap<String, MetricSeries>>,
}

impl DataStore {
    /// Create a new data store keeping `retention` worth of history.
    pub fn new(retention: Duration) -> Self {
        Self { retention, series: RwLock::new(HashMap::new()) }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    fn retention_ms(&self) -> i64 {
        self.retention.as_millis() as i64
    }

    /// Append a sample to the buffer of `(metric, instance)`.
    ///
    /// Returns `false` without storing anything if the sample is not newer than
    /// the last stored one. Samples older than the retention window, measured
    /// from the new sample, are evicted from the same buffer.
    pub async fn insert(&self, metric: &str, instance: InstanceKey, sample: Sample) -> bool {
        let timestamp = sample.timestamp_ms;
        let mut series = self.series.write().await;
        let buffer = series.entry(metric.to_string()).or_default().entry(instance).or_default();

        if let Some(last) = buffer.back() {
            if timestamp <= last.timestamp_ms {
                trace!(
                    metric,
                    ?instance,
                    timestamp,
                    last = last.timestamp_ms,
                    "Dropping stale sample"
                );
                obs::record_sample_dropped("stale");
                return false;
            }
        }

        buffer.push_back(sample);
        obs::record_sample_inserted();

        let cutoff = timestamp.saturating_sub(self.retention_ms());
        while buffer.front().is_some_and(|s| s.timestamp_ms < cutoff) {
            buffer.pop_front();
        }
        true
    }

    /// Series of the given metrics with samples in `from_ms..=to_ms`.
    ///
    /// Targets are `name` for the scalar instance and `name-<instance>`
    /// otherwise. Unknown metrics and series with no samples in range are
    /// omitted.
    #[instrument(skip(self))]
    pub async fn query_time_series(
        &self,
        names: &[String],
        from_ms: i64,
        to_ms: i64,
    ) -> Vec<TimeSeriesResult> {
        let series = self.series.read().await;
        let mut results = Vec::new();

        for name in names {
            let Some(instances) = series.get(name) else {
                continue;
            };
            for (instance, buffer) in instances {
                let start = buffer.partition_point(|s| s.timestamp_ms < from_ms);
                let datapoints: Vec<Datapoint> = buffer
                    .range(start..)
                    .take_while(|s| s.timestamp_ms <= to_ms)
                    .map(Datapoint::from)
                    .collect();
                if datapoints.is_empty() {
                    continue;
                }
                results.push(TimeSeriesResult { target: target_name(name, *instance), datapoints });
            }
        }

        results
    }

    /// Drop samples older than `now_ms - retention`, then empty buffers.
    ///
    /// Returns the number of samples removed.
    pub async fn evict_expired(&self, now_ms: i64) -> usize {
        let cutoff = now_ms.saturating_sub(self.retention_ms());
        let mut series = self.series.write().await;
        let mut removed = 0;

        for instances in series.values_mut() {
            for buffer in instances.values_mut() {
                let keep_from = buffer.partition_point(|s| s.timestamp_ms < cutoff);
                buffer.drain(..keep_from);
                removed += keep_from;
            }
            instances.retain(|_, buffer| !buffer.is_empty());
        }
        series.retain(|_, instances| !instances.is_empty());

        if removed > 0 {
            debug!(removed, cutoff, "Evicted expired samples");
        }
        removed
    }

    /// Forget all series of a metric.
    pub async fn remove_metric(&self, name: &str) -> bool {
        self.series.write().await.remove(name).is_some()
    }

    /// Number of `(metric, instance)` buffers currently held.
    pub async fn series_count(&self) -> usize {
        self.series.read().await.values().map(|instances| instances.len()).sum()
    }
}

/// Display name of a series.
pub fn target_name(metric: &str, instance: InstanceKey) -> String {
    match instance {
        Some(id) => format!("{}-{}", metric, id),
        None => metric.to_string(),
    }
}
