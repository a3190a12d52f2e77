//! Remote metrics API abstraction.
//!
//! The poller talks to pmcd through this trait; the HTTP client lives in the
//! CLI crate and tests substitute in-memory sources.

use crate::error::Result;
use crate::types::{FetchResponse, MetricMetadata};
use async_trait::async_trait;

/// Remote metrics API.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Look up descriptors of the given metrics.
    async fn fetch_metadata(&self, names: &[String]) -> Result<Vec<MetricMetadata>>;

    /// Fetch current values of the given metrics.
    ///
    /// `values_only` skips instance names and other per-fetch metadata the
    /// caller already has cached.
    async fn fetch(&self, names: &[String], values_only: bool) -> Result<FetchResponse>;
}
