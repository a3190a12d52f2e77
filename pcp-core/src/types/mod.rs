//! Core domain types for the data source.

pub mod pmapi;
pub mod query;
pub mod series;

// Re-exports
pub use pmapi::{
    FetchResponse, FetchTimestamp, InstanceValue, MetricMetadata, MetricValues, SampleValue,
};
pub use query::{Frames, PmapiQuery, QueryRequest, QueryResponse, Target, TargetFormat};
pub use series::{Column, Datapoint, Sample, TableResult, TimeSeriesResult};
