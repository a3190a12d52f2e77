//! Subscription-driven metric polling.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ ensure_polling ┌──────────────┐   fetch    ┌──────────────┐
//! │  DataSource  │ ─────────────► │    Poller    │ ─────────► │ MetricSource │
//! │  (queries)   │                │ ├─ subs      │ ◄───────── │   (pmapi)    │
//! └──────┬───────┘                │ └─ run()     │  samples   └──────────────┘
//!        │ query_time_series      └──────┬───────┘
//!        ▼                               │ insert
//! ┌──────────────┐                       │
//! │  DataStore   │ ◄─────────────────────┘
//! └──────────────┘
//! ```
//!
//! Panels call `ensure_polling` on every refresh. Metrics nobody asked for
//! within the max age are dropped by `cleanup_expired_metrics`, which `tick`
//! runs before every fetch, whether driven by queries or by `run`.

mod subscriptions;

use crate::clock::{Clock, SystemClock};
use crate::datastore::DataStore;
use crate::error::{PcpError, Result};
use crate::observability::metrics as obs;
use crate::source::MetricSource;
use crate::types::{FetchResponse, FetchTimestamp, MetricMetadata, Sample};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use subscriptions::Subscriptions;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, instrument, warn};

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Metrics requested from the remote API; zero if the fetch was skipped.
    pub requested: usize,
    pub inserted: usize,
    /// Samples not newer than the last stored one.
    pub stale: usize,
    pub malformed: usize,
}

/// Owns the subscription set and feeds the data store.
pub struct Poller {
    source: Arc<dyn MetricSource>,
    datastore: Arc<DataStore>,
    clock: Arc<dyn Clock>,
    /// Subscriptions not requested for this long are dropped.
    max_age: Duration,
    refresh_interval_ms: AtomicU64,
    subscriptions: Mutex<Subscriptions>,
    /// Held for the duration of a poll so that fetches never overlap.
    poll_lock: Mutex<()>,
}

impl Poller {
    /// Create a poller using the system clock.
    pub fn new(
        source: Arc<dyn MetricSource>,
        datastore: Arc<DataStore>,
        refresh_interval: Duration,
        max_age: Duration,
    ) -> Self {
        Self {
            source,
            datastore,
            clock: Arc::new(SystemClock),
            max_age,
            refresh_interval_ms: AtomicU64::new(refresh_interval.as_millis() as u64),
            subscriptions: Mutex::new(Subscriptions::default()),
            poll_lock: Mutex::new(()),
        }
    }

    /// Replace the clock used for expiry and retention sweeps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn datastore(&self) -> &Arc<DataStore> {
        &self.datastore
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.load(Ordering::Relaxed))
    }

    /// Change the poll cadence; takes effect when the next cycle is scheduled.
    pub fn set_refresh_interval(&self, interval: Duration) {
        let ms = interval.as_millis().max(1) as u64;
        let previous = self.refresh_interval_ms.swap(ms, Ordering::Relaxed);
        if previous != ms {
            debug!(previous_ms = previous, refresh_ms = ms, "Refresh interval changed");
        }
    }

    /// Make sure the given metrics are polled.
    ///
    /// Refreshes the last-request time of every name and looks up metadata
    /// for those without any. A failed lookup is returned but leaves the
    /// subscriptions in place; the next call retries it.
    #[instrument(skip(self, names), fields(count = names.len()))]
    pub async fn ensure_polling(&self, names: &[String]) -> Result<()> {
        let now = self.clock.now_ms();
        let missing = {
            let mut subs = self.subscriptions.lock().await;
            let missing = subs.touch(names, now);
            obs::set_active_subscriptions(subs.len());
            missing
        };

        if missing.is_empty() {
            return Ok(());
        }

        debug!(metrics = ?missing, "Looking up metric metadata");
        let metadata = self.source.fetch_metadata(&missing).await.map_err(|e| {
            warn!(metrics = ?missing, error = %e, "Metadata lookup failed");
            e
        })?;

        let mut subs = self.subscriptions.lock().await;
        for descriptor in metadata {
            subs.set_metadata(descriptor);
        }
        Ok(())
    }

    /// Stop polling the given metrics immediately.
    pub async fn remove_metrics_from_polling(&self, names: &[String]) -> usize {
        let mut subs = self.subscriptions.lock().await;
        let removed = subs.remove(names);
        obs::set_active_subscriptions(subs.len());
        if removed > 0 {
            debug!(removed, "Removed metrics from polling");
        }
        removed
    }

    /// Drop subscriptions not requested within the max age.
    ///
    /// Returns the names of the dropped metrics.
    pub async fn cleanup_expired_metrics(&self) -> Vec<String> {
        let cutoff = self.clock.now_ms() - self.max_age.as_millis() as i64;
        let mut subs = self.subscriptions.lock().await;
        let expired = subs.expire(cutoff);
        obs::set_active_subscriptions(subs.len());

        if !expired.is_empty() {
            info!(metrics = ?expired, "Stopped polling expired metrics");
            obs::record_subscriptions_expired(expired.len());
        }
        expired
    }

    /// Names of all subscribed metrics, sorted.
    pub async fn subscribed_metrics(&self) -> Vec<String> {
        self.subscriptions.lock().await.names()
    }

    /// Cached metadata of a subscribed metric.
    pub async fn metadata(&self, name: &str) -> Option<MetricMetadata> {
        self.subscriptions.lock().await.get(name).and_then(|sub| sub.metadata.clone())
    }

    /// Fetch every subscribed metric once and store the values.
    ///
    /// Concurrent calls wait for the poll in flight to finish. With no
    /// subscriptions the fetch is skipped. A failed fetch is returned and
    /// nothing is stored.
    #[instrument(skip(self))]
    pub async fn poll(&self) -> Result<PollSummary> {
        let _in_flight = self.poll_lock.lock().await;

        let names = self.subscriptions.lock().await.names();
        if names.is_empty() {
            debug!("No metrics subscribed, skipping fetch");
            return Ok(PollSummary::default());
        }

        let started = Instant::now();
        let response = match self.source.fetch(&names, true).await {
            Ok(response) => response,
            Err(e) => {
                obs::record_poll_failure();
                warn!(metrics = names.len(), error = %e, "Fetch failed");
                return Err(e);
            }
        };
        obs::record_poll(started.elapsed().as_secs_f64());

        let mut summary = self.ingest(&response).await.map_err(|e| {
            warn!(error = %e, "Discarding fetch response");
            e
        })?;
        summary.requested = names.len();
        debug!(?summary, "Poll complete");
        Ok(summary)
    }

    /// Store every instance of a fetch response under its single timestamp.
    ///
    /// A timestamp outside the representable range rejects the whole batch.
    async fn ingest(&self, response: &FetchResponse) -> Result<PollSummary> {
        let FetchTimestamp { s, us } = response.timestamp;
        let Some(timestamp_ms) = response.timestamp.to_millis() else {
            obs::record_sample_dropped("malformed");
            return Err(PcpError::MalformedSample {
                metric: response
                    .values
                    .iter()
                    .map(|m| m.name.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                instance: None,
                reason: format!("timestamp {}s {}us out of range", s, us),
            });
        };
        let mut summary = PollSummary::default();

        for metric in &response.values {
            for instance in &metric.instances {
                let key = instance.instance_key();
                let Some(value) = instance.sample_value() else {
                    let err = PcpError::MalformedSample {
                        metric: metric.name.clone(),
                        instance: key,
                        reason: format!("unusable value {}", instance.value),
                    };
                    debug!(error = %err, "Skipping sample");
                    obs::record_sample_dropped("malformed");
                    summary.malformed += 1;
                    continue;
                };

                if self.datastore.insert(&metric.name, key, Sample::new(value, timestamp_ms)).await
                {
                    summary.inserted += 1;
                } else {
                    summary.stale += 1;
                }
            }
        }
        Ok(summary)
    }

    /// One scheduled cycle: expire subscriptions, evict old samples, poll.
    pub async fn tick(&self) -> Result<PollSummary> {
        self.cleanup_expired_metrics().await;
        self.datastore.evict_expired(self.clock.now_ms()).await;
        self.poll().await
    }

    /// Run the poll loop until `shutdown` fires or its sender is dropped.
    ///
    /// Fetch errors are logged and retried on the next tick.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(refresh = ?self.refresh_interval(), max_age = ?self.max_age, "Poller started");

        loop {
            if let Err(e) = self.tick().await {
                warn!(error = %e, "Poll cycle failed, retrying next tick");
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Poller stopped");
                    return;
                }
                _ = tokio::time::sleep(self.refresh_interval()) => {}
            }
        }
    }
}
