//! PCP data source core library
//!
//! Polling, in-memory time series storage and query shaping for a
//! Performance Co-Pilot metrics data source.

pub mod clock;
pub mod config;
pub mod datasource;
pub mod datastore;
pub mod error;
pub mod interval;
pub mod observability;
pub mod poller;
pub mod source;
pub mod template;
pub mod transformations;
pub mod types;

// Re-export commonly used items
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use datasource::DataSource;
pub use datastore::DataStore;
pub use error::{PcpError, Result};
pub use observability::{health::HealthReport, init as init_observability};
pub use poller::{PollSummary, Poller};
pub use source::MetricSource;
pub use template::{TemplateEngine, VariableTemplates};
pub use transformations::Transformations;
pub use types::{
    FetchResponse, Frames, MetricMetadata, PmapiQuery, QueryRequest, QueryResponse, Sample,
    SampleValue, TableResult, Target, TargetFormat, TimeSeriesResult,
};
