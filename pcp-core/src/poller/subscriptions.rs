//! Keyed set of polled metrics with last-request times.

use crate::types::MetricMetadata;
use std::collections::BTreeMap;

/// A metric under active polling.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Subscription {
    pub name: String,
    /// Clock time (ms) of the last `ensure_polling` that named this metric.
    pub last_requested_at: i64,
    /// Cached descriptor; `None` until a lookup succeeds.
    pub metadata: Option<MetricMetadata>,
}

#[derive(Debug, Default)]
pub(crate) struct Subscriptions {
    metrics: BTreeMap<String, Subscription>,
}

impl Subscriptions {
    /// Subscribe or refresh every name; returns the names still lacking metadata.
    pub fn touch(&mut self, names: &[String], now_ms: i64) -> Vec<String> {
        let mut missing = Vec::new();
        for name in names {
            let sub = self.metrics.entry(name.clone()).or_insert_with(|| Subscription {
                name: name.clone(),
                last_requested_at: now_ms,
                metadata: None,
            });
            sub.last_requested_at = now_ms;
            if sub.metadata.is_none() && !missing.contains(name) {
                missing.push(name.clone());
            }
        }
        missing
    }

    /// Cache metadata, ignoring metrics unsubscribed in the meantime.
    pub fn set_metadata(&mut self, metadata: MetricMetadata) {
        if let Some(sub) = self.metrics.get_mut(&metadata.name) {
            sub.metadata.get_or_insert(metadata);
        }
    }

    pub fn remove(&mut self, names: &[String]) -> usize {
        names.iter().filter(|name| self.metrics.remove(name.as_str()).is_some()).count()
    }

    /// Remove subscriptions last requested before `cutoff_ms`.
    pub fn expire(&mut self, cutoff_ms: i64) -> Vec<String> {
        let expired: Vec<String> = self
            .metrics
            .values()
            .filter(|sub| sub.last_requested_at < cutoff_ms)
            .map(|sub| sub.name.clone())
            .collect();
        for name in &expired {
            self.metrics.remove(name);
        }
        expired
    }

    pub fn names(&self) -> Vec<String> {
        self.metrics.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Subscription> {
        self.metrics.get(name)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }
}
