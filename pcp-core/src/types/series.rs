//! Series and table shapes returned by queries.

use super::pmapi::SampleValue;
use serde::{Deserialize, Serialize};

/// One observation of a metric instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: SampleValue,
    pub timestamp_ms: i64,
}

impl Sample {
    pub fn new(value: impl Into<SampleValue>, timestamp_ms: i64) -> Self {
        Self { value: value.into(), timestamp_ms }
    }
}

/// `[value, timestamp_ms]` pair, serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint(pub SampleValue, pub i64);

impl Datapoint {
    pub fn value(&self) -> &SampleValue {
        &self.0
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.1
    }
}

impl From<&Sample> for Datapoint {
    fn from(sample: &Sample) -> Self {
        Datapoint(sample.value.clone(), sample.timestamp_ms)
    }
}

/// A named series of datapoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesResult {
    pub target: String,
    pub datapoints: Vec<Datapoint>,
}

/// Table column header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub text: String,
}

/// Table parsed from a text sample.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableResult {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}
