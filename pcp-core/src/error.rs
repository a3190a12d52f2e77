//! Error types for the PCP data source.
//!
//! All errors use `thiserror` for ergonomic error handling and proper error chains.

use thiserror::Error;

/// Result type alias for data source operations.
pub type Result<T> = std::result::Result<T, PcpError>;

/// Main error type for the PCP data source.
#[derive(Error, Debug)]
pub enum PcpError {
    // Remote API errors
    #[error("Failed to fetch {names:?}: {reason}")]
    FetchFailed { names: Vec<String>, reason: String },

    #[error("Failed to look up metadata for {names:?}: {reason}")]
    MetadataFailed { names: Vec<String>, reason: String },

    // Sample errors
    #[error("Malformed sample for {metric} (instance {instance:?}): {reason}")]
    MalformedSample { metric: String, instance: Option<i64>, reason: String },

    // Query errors
    #[error("Invalid target format '{format}', possible options: {options}")]
    InvalidFormat { format: String, options: String },

    // Configuration errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Invalid interval '{interval}': {reason}")]
    InvalidInterval { interval: String, reason: String },

    #[error("I/O error at {path:?}: {source}")]
    IoError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PcpError {
    /// Create a FetchFailed error from any error type.
    pub fn fetch(names: &[String], err: impl std::fmt::Display) -> Self {
        Self::FetchFailed { names: names.to_vec(), reason: err.to_string() }
    }
}
