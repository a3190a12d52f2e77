//! HTTP client for the pmproxy REST API

use anyhow::{Context, Result};
use async_trait::async_trait;
use pcp_core::{Config, FetchResponse, MetricMetadata, MetricSource, PcpError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// pmproxy answers requests on an idle-timed-out context with this message.
const UNKNOWN_CONTEXT: &str = "unknown context identifier";

#[derive(Debug, Deserialize)]
struct ContextResponse {
    context: u32,
}

#[derive(Debug, Deserialize)]
struct MetricResponse {
    #[serde(default)]
    metrics: Vec<MetricMetadata>,
}

#[derive(Debug, Deserialize)]
struct IndomResponse {
    #[serde(default)]
    instances: Vec<IndomInstance>,
}

#[derive(Debug, Deserialize)]
struct IndomInstance {
    instance: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Outcome of a single pmapi request.
enum Reply<T> {
    Ok(T),
    ContextExpired,
}

/// pmapi client bound to one host specification
pub struct PmApiClient {
    http: reqwest::Client,
    base_url: String,
    hostspec: String,
    context: Mutex<Option<u32>>,
}

impl PmApiClient {
    /// Create a client for the pmproxy at `config.url`
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout()?)
            .user_agent(concat!("pcp-poll/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            hostspec: config.hostspec.clone(),
            context: Mutex::new(None),
        })
    }

    /// Context id for this client's hostspec, created on first use
    async fn context(&self) -> Result<u32> {
        let mut context = self.context.lock().await;
        if let Some(id) = *context {
            return Ok(id);
        }

        let params = [("hostspec", self.hostspec.clone())];
        let id = match self.get_json::<ContextResponse>("/pmapi/context", &params).await? {
            Reply::Ok(response) => response.context,
            Reply::ContextExpired => anyhow::bail!("pmproxy refused to create a context"),
        };
        debug!(context = id, hostspec = %self.hostspec, "Created pmapi context");
        *context = Some(id);
        Ok(id)
    }

    /// Issue a request within the current context, reconnecting once if it expired
    async fn call<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        for _ in 0..2 {
            let context = self.context().await?;
            let mut query = vec![("context", context.to_string())];
            query.extend(params.iter().cloned());

            match self.get_json(path, &query).await? {
                Reply::Ok(value) => return Ok(value),
                Reply::ContextExpired => {
                    debug!(context, "pmapi context expired, reconnecting");
                    *self.context.lock().await = None;
                }
            }
        }
        anyhow::bail!("pmapi context for {} expired twice in a row", self.hostspec)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Reply<T>> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if status.is_success() {
            let value = response
                .json::<T>()
                .await
                .with_context(|| format!("Invalid response from {}", path))?;
            return Ok(Reply::Ok(value));
        }

        let body = response.text().await.unwrap_or_default();
        if body.contains(UNKNOWN_CONTEXT) {
            return Ok(Reply::ContextExpired);
        }
        let message =
            serde_json::from_str::<ErrorResponse>(&body).map(|e| e.message).unwrap_or(body);
        anyhow::bail!("{} returned {}: {}", path, status, message)
    }

    /// Instance id to name mapping of a metric's instance domain
    async fn instance_names(&self, metric: &str) -> Result<HashMap<i64, String>> {
        let params = [("name", metric.to_string())];
        let response: IndomResponse = self.call("/pmapi/indom", &params).await?;
        Ok(response.instances.into_iter().map(|i| (i.instance, i.name)).collect())
    }
}

#[async_trait]
impl MetricSource for PmApiClient {
    #[instrument(skip(self), fields(count = names.len()))]
    async fn fetch_metadata(&self, names: &[String]) -> pcp_core::Result<Vec<MetricMetadata>> {
        let params = [("names", names.join(","))];
        let response: MetricResponse =
            self.call("/pmapi/metric", &params).await.map_err(|e| PcpError::MetadataFailed {
                names: names.to_vec(),
                reason: format!("{:#}", e),
            })?;
        Ok(response.metrics)
    }

    #[instrument(skip(self), fields(count = names.len()))]
    async fn fetch(&self, names: &[String], values_only: bool) -> pcp_core::Result<FetchResponse> {
        let params = [("names", names.join(","))];
        let mut response: FetchResponse = self
            .call("/pmapi/fetch", &params)
            .await
            .map_err(|e| PcpError::fetch(names, format!("{:#}", e)))?;

        if values_only {
            return Ok(response);
        }

        for metric in &mut response.values {
            if metric.instances.iter().all(|i| i.instance_key().is_none()) {
                continue;
            }
            let instance_names = self
                .instance_names(&metric.name)
                .await
                .map_err(|e| PcpError::fetch(names, format!("{:#}", e)))?;
            for instance in &mut metric.instances {
                if let Some(id) = instance.instance_key() {
                    instance.instance_name = instance_names.get(&id).cloned();
                }
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let config = Config { url: "http://pcp.example:44322/".to_string(), ..Config::default() };
        let client = PmApiClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://pcp.example:44322");
        assert_eq!(client.hostspec, "pcp://127.0.0.1");
    }

    #[test]
    fn test_rejects_bad_timeout() {
        let config = Config { api_timeout: "soon".to_string(), ..Config::default() };
        assert!(PmApiClient::new(&config).is_err());
    }

    #[test]
    fn test_parse_metric_response() {
        let body = r#"{
            "context": 348734,
            "metrics": [{
                "name": "kernel.all.load",
                "pmid": "60.2.0",
                "indom": "60.2",
                "type": "FLOAT",
                "sem": "instant",
                "units": "none",
                "labels": {"hostname": "web01"},
                "text-oneline": "1, 5 and 15 minute load average"
            }]
        }"#;
        let response: MetricResponse = serde_json::from_str(body).unwrap();
        let load = &response.metrics[0];
        assert_eq!(load.indom.as_deref(), Some("60.2"));
        assert_eq!(load.metric_type.as_deref(), Some("FLOAT"));
        assert_eq!(load.text_oneline.as_deref(), Some("1, 5 and 15 minute load average"));
    }

    #[test]
    fn test_parse_fetch_response() {
        let body = r#"{
            "context": 348734,
            "timestamp": {"s": 1547483646, "us": 2109},
            "values": [
                {"pmid": "60.2.0", "name": "kernel.all.load",
                 "instances": [{"instance": 1, "value": 0.1}, {"instance": 15, "value": 0.05}]},
                {"pmid": "2.0.23", "name": "pmcd.version",
                 "instances": [{"instance": null, "value": "6.2.0"}]}
            ]
        }"#;
        let response: FetchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.timestamp.to_millis(), Some(1_547_483_646_002));
        assert_eq!(response.values[0].instances[1].instance_key(), Some(15));
        assert_eq!(response.values[1].instances[0].instance_key(), None);
    }
}
