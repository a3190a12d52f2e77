//! Data source health checks.

use crate::source::MetricSource;
use crate::types::SampleValue;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Metric whose value identifies the PCP version of the remote host.
pub const VERSION_METRIC: &str = "pmcd.version";

/// Overall data source health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Health check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub message: String,
    /// PCP version reported by pmcd, if reachable.
    pub pcp_version: Option<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Check that the remote API answers a fetch of `pmcd.version`.
pub async fn check_source(source: &dyn MetricSource) -> HealthReport {
    let names = vec![VERSION_METRIC.to_string()];
    let version = match source.fetch(&names, false).await {
        Ok(response) => response
            .values
            .first()
            .and_then(|metric| metric.instances.first())
            .and_then(|instance| instance.sample_value())
            .map(|value| match value {
                SampleValue::Text(text) => text,
                other => other.to_string(),
            }),
        Err(e) => {
            warn!(error = %e, "Data source check failed");
            return HealthReport {
                status: HealthStatus::Unhealthy,
                message: format!(
                    "{}. To use this data source, please configure the URL in the query editor.",
                    e
                ),
                pcp_version: None,
            };
        }
    };

    match version {
        Some(version) => {
            info!(pcp_version = %version, "Data source is working");
            HealthReport {
                status: HealthStatus::Healthy,
                message: format!("Data source is working, using Performance Co-Pilot {}", version),
                pcp_version: Some(version),
            }
        }
        None => HealthReport {
            status: HealthStatus::Unhealthy,
            message: format!("The remote host did not report {}", VERSION_METRIC),
            pcp_version: None,
        },
    }
}
