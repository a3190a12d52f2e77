//! pmapi response shapes consumed by the poller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Timestamp of a fetch, as reported by pmcd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchTimestamp {
    pub s: i64,
    pub us: i64,
}

impl FetchTimestamp {
    /// Milliseconds since the epoch, microseconds rounded to the nearest millisecond.
    ///
    /// `None` if the result does not fit in an `i64`.
    pub fn to_millis(&self) -> Option<i64> {
        let us_ms = (self.us as f64 / 1000.0).round() as i64;
        self.s.checked_mul(1000)?.checked_add(us_ms)
    }
}

/// One instance of a fetched metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceValue {
    /// Instance id; `None` or `-1` for singular metrics.
    #[serde(default)]
    pub instance: Option<i64>,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub instance_name: Option<String>,
}

impl InstanceValue {
    /// Normalized instance key, `None` for the scalar instance.
    pub fn instance_key(&self) -> Option<i64> {
        self.instance.filter(|id| *id != -1)
    }

    /// Stored value, or `None` if the raw value is missing or not representable.
    pub fn sample_value(&self) -> Option<SampleValue> {
        match &self.value {
            serde_json::Value::Number(n) => {
                n.as_f64().filter(|v| v.is_finite()).map(SampleValue::Number)
            }
            serde_json::Value::String(s) => Some(SampleValue::Text(s.clone())),
            _ => None,
        }
    }
}

/// Values of one metric in a fetch response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValues {
    pub name: String,
    #[serde(default)]
    pub instances: Vec<InstanceValue>,
}

/// Response of a `fetch` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub timestamp: FetchTimestamp,
    #[serde(default)]
    pub values: Vec<MetricValues>,
}

/// Metric descriptor returned by the metadata lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricMetadata {
    pub name: String,
    #[serde(default)]
    pub indom: Option<String>,
    #[serde(default, rename = "type")]
    pub metric_type: Option<String>,
    /// Semantics: `counter`, `instant` or `discrete`.
    #[serde(default)]
    pub sem: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default, rename = "text-oneline")]
    pub text_oneline: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, serde_json::Value>,
}

impl MetricMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }
}

/// A stored sample value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for SampleValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for SampleValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_to_millis() {
        assert_eq!(FetchTimestamp { s: 5, us: 2000 }.to_millis(), Some(5002));
        assert_eq!(FetchTimestamp { s: 1, us: 1500 }.to_millis(), Some(1002));
        assert_eq!(FetchTimestamp { s: 1, us: 1499 }.to_millis(), Some(1001));
        assert_eq!(FetchTimestamp { s: 0, us: 999_999 }.to_millis(), Some(1000));
    }

    #[test]
    fn test_timestamp_out_of_range() {
        assert_eq!(FetchTimestamp { s: i64::MAX / 100, us: 0 }.to_millis(), None);
        assert_eq!(FetchTimestamp { s: i64::MIN / 100, us: 0 }.to_millis(), None);
        assert_eq!(FetchTimestamp { s: i64::MAX / 1000, us: i64::MAX }.to_millis(), None);
    }

    #[test]
    fn test_parse_fetch_response() {
        let json = r#"{
            "timestamp": {"s": 5, "us": 2000},
            "values": [{
                "pmid": 633356298,
                "name": "bpftrace.scripts.script1.data.scalar",
                "instances": [{"instance": -1, "value": 45200, "instanceName": null}]
            }]
        }"#;
        let response: FetchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.timestamp.to_millis(), Some(5002));

        let instance = &response.values[0].instances[0];
        assert_eq!(instance.instance_key(), None);
        assert_eq!(instance.sample_value(), Some(SampleValue::Number(45200.0)));
    }

    #[test]
    fn test_instance_value_kinds() {
        let text = InstanceValue {
            instance: Some(3),
            value: serde_json::json!("running"),
            instance_name: Some("cpu3".to_string()),
        };
        assert_eq!(text.instance_key(), Some(3));
        assert_eq!(text.sample_value(), Some(SampleValue::Text("running".to_string())));

        let missing =
            InstanceValue { instance: None, value: serde_json::Value::Null, instance_name: None };
        assert_eq!(missing.sample_value(), None);

        let nested = InstanceValue {
            instance: None,
            value: serde_json::json!({"a": 1}),
            instance_name: None,
        };
        assert_eq!(nested.sample_value(), None);
    }

    #[test]
    fn test_metadata_field_names() {
        let json = r#"{"name": "kernel.all.load", "indom": "60.2", "type": "FLOAT",
                       "sem": "instant", "units": "none", "text-oneline": "load average"}"#;
        let metadata: MetricMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.metric_type.as_deref(), Some("FLOAT"));
        assert_eq!(metadata.text_oneline.as_deref(), Some("load average"));
        assert!(metadata.labels.is_empty());
    }
}
