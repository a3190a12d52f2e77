//! Core metrics definitions.
//!
//! All metrics follow Prometheus naming conventions:
//! - `_total` suffix for counters
//! - `_seconds` suffix for histograms measuring duration

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Register all core metrics with descriptions.
pub fn register_core_metrics() {
    // Poll loop
    describe_counter!("pcp_poll_total", "Total number of poll cycles that issued a fetch");
    describe_counter!("pcp_poll_failures_total", "Total number of failed fetches");
    describe_histogram!("pcp_poll_duration_seconds", "Duration of a poll cycle fetch");

    // Storage
    describe_counter!("pcp_samples_inserted_total", "Total samples stored");
    describe_counter!(
        "pcp_samples_dropped_total",
        "Total samples not stored (by reason: stale, malformed)"
    );

    // Subscriptions
    describe_gauge!("pcp_subscriptions_active", "Current number of polled metrics");
    describe_counter!(
        "pcp_subscriptions_expired_total",
        "Total subscriptions dropped because nobody requested them"
    );
}

pub fn record_poll(duration_secs: f64) {
    histogram!("pcp_poll_duration_seconds").record(duration_secs);
    counter!("pcp_poll_total").increment(1);
}

pub fn record_poll_failure() {
    counter!("pcp_poll_failures_total").increment(1);
}

pub fn record_sample_inserted() {
    counter!("pcp_samples_inserted_total").increment(1);
}

pub fn record_sample_dropped(reason: &'static str) {
    counter!("pcp_samples_dropped_total", "reason" => reason).increment(1);
}

pub fn record_subscriptions_expired(count: usize) {
    counter!("pcp_subscriptions_expired_total").increment(count as u64);
}

pub fn set_active_subscriptions(count: usize) {
    gauge!("pcp_subscriptions_active").set(count as f64);
}
