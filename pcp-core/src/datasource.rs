//! Query orchestration for a PCP data source.
//!
//! Per dashboard refresh: filter the panel queries, subscribe their metrics,
//! run a poll cycle, read the requested range and shape it for the panel.

use crate::config::Config;
use crate::datastore::DataStore;
use crate::error::Result;
use crate::observability::health::{self, HealthReport};
use crate::poller::Poller;
use crate::source::MetricSource;
use crate::template::TemplateEngine;
use crate::transformations::Transformations;
use crate::types::{PmapiQuery, QueryRequest, QueryResponse, SampleValue, TargetFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// An empty container selector, left behind when a container variable has no value.
static EMPTY_CONTAINER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"container=(&|$)").expect("Invalid container regex"));

/// A data source instance: one poller and one data store.
pub struct DataSource {
    source: Arc<dyn MetricSource>,
    poller: Arc<Poller>,
    templates: Arc<dyn TemplateEngine>,
    transformations: Transformations,
}

impl DataSource {
    /// Build a data source with a fresh data store and poller from `config`.
    pub fn new(
        source: Arc<dyn MetricSource>,
        config: &Config,
        templates: Arc<dyn TemplateEngine>,
    ) -> Result<Self> {
        config.validate()?;
        let datastore = Arc::new(DataStore::new(config.retention()?));
        let poller =
            Poller::new(source.clone(), datastore, config.refresh()?, config.max_age()?);
        Ok(Self::from_parts(source, Arc::new(poller), templates))
    }

    pub fn from_parts(
        source: Arc<dyn MetricSource>,
        poller: Arc<Poller>,
        templates: Arc<dyn TemplateEngine>,
    ) -> Self {
        let transformations = Transformations::new(templates.clone());
        Self { source, poller, templates, transformations }
    }

    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    /// Whether a query should be executed at all.
    ///
    /// Hidden queries, blank expressions and hostspecs with an empty
    /// `container=` selector are skipped; the latter would otherwise match
    /// every cgroup on the host.
    pub fn filter_query(query: &PmapiQuery) -> bool {
        let empty_container =
            query.hostspec.as_deref().is_some_and(|h| EMPTY_CONTAINER_REGEX.is_match(h));
        !(query.hide || query.expr.trim().is_empty() || empty_container)
    }

    /// Answer a dashboard refresh.
    ///
    /// Each refresh is one poll cycle: metrics no panel asked for within the
    /// max age are dropped and samples past retention are swept before the
    /// fetch.
    #[instrument(skip(self, request), fields(targets = request.targets.len()))]
    pub async fn query(&self, request: &QueryRequest) -> Result<Vec<QueryResponse>> {
        if let Some(refresh) = request.dashboard_refresh {
            self.poller.set_refresh_interval(refresh);
        }

        let queries: Vec<&PmapiQuery> =
            request.targets.iter().filter(|q| Self::filter_query(q)).collect();
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        for query in &queries {
            TargetFormat::parse(&query.target.format)?;
        }

        let mut names: Vec<String> = queries.iter().map(|q| q.expr.trim().to_string()).collect();
        names.sort();
        names.dedup();

        self.poller.ensure_polling(&names).await?;
        self.poller.tick().await?;

        let datastore = self.poller.datastore();
        let mut responses = Vec::with_capacity(queries.len());
        for query in queries {
            let expr = [query.expr.trim().to_string()];
            let series = datastore.query_time_series(&expr, request.from_ms, request.to_ms).await;
            let frames = self.transformations.transform(series, &query.target)?;
            responses.push(QueryResponse { ref_id: query.ref_id.clone(), frames });
        }

        debug!(responses = responses.len(), "Query complete");
        Ok(responses)
    }

    /// Check connectivity by fetching the PCP version.
    pub async fn test_datasource(&self) -> HealthReport {
        health::check_source(self.source.as_ref()).await
    }

    /// Values of all instances of one metric, e.g. for dashboard variables.
    #[instrument(skip(self))]
    pub async fn metric_find_query(&self, query: &str) -> Result<Vec<String>> {
        let name = self.templates.replace(query.trim(), &HashMap::new());
        let response = self.source.fetch(&[name], false).await?;

        let values = response
            .values
            .first()
            .map(|metric| {
                metric
                    .instances
                    .iter()
                    .filter_map(|instance| instance.sample_value())
                    .map(|value| match value {
                        SampleValue::Text(text) => text,
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(values)
    }
}
