//! Query request and response types.

use super::series::{TableResult, TimeSeriesResult};
use crate::error::{PcpError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Requested shape of query output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFormat {
    TimeSeries,
    Heatmap,
    Table,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 3] =
        [TargetFormat::TimeSeries, TargetFormat::Heatmap, TargetFormat::Table];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFormat::TimeSeries => "time_series",
            TargetFormat::Heatmap => "heatmap",
            TargetFormat::Table => "table",
        }
    }

    /// Parse a format string, failing with `InvalidFormat` on unknown values.
    pub fn parse(format: &str) -> Result<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == format).ok_or_else(|| {
            PcpError::InvalidFormat {
                format: format.to_string(),
                options: Self::ALL.map(|f| f.as_str()).join(", "),
            }
        })
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Presentation settings of a panel target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Kept as a raw string so that unknown formats surface as `InvalidFormat`.
    pub format: String,
    #[serde(default)]
    pub legend_format: Option<String>,
}

impl Target {
    pub fn new(format: TargetFormat) -> Self {
        Self { format: format.as_str().to_string(), legend_format: None }
    }

    pub fn with_legend(mut self, legend_format: impl Into<String>) -> Self {
        self.legend_format = Some(legend_format.into());
        self
    }
}

/// A single panel query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PmapiQuery {
    pub ref_id: String,
    /// Metric name to poll.
    pub expr: String,
    #[serde(flatten)]
    pub target: Target,
    #[serde(default)]
    pub hide: bool,
    #[serde(default)]
    pub hostspec: Option<String>,
}

impl PmapiQuery {
    pub fn new(ref_id: impl Into<String>, expr: impl Into<String>, target: Target) -> Self {
        Self { ref_id: ref_id.into(), expr: expr.into(), target, hide: false, hostspec: None }
    }
}

/// A dashboard refresh: time range plus the panel queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub from_ms: i64,
    pub to_ms: i64,
    pub targets: Vec<PmapiQuery>,
    /// Refresh interval of the hosting dashboard, if it has one.
    pub dashboard_refresh: Option<Duration>,
}

/// Output of a transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Frames {
    TimeSeries(Vec<TimeSeriesResult>),
    Table(Vec<TableResult>),
}

impl Frames {
    pub fn len(&self) -> usize {
        match self {
            Frames::TimeSeries(series) => series.len(),
            Frames::Table(tables) => tables.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of one panel query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub ref_id: String,
    pub frames: Frames,
}
