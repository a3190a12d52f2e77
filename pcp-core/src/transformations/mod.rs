//! Post-query shaping of series into the requested panel format.

mod table;

pub use table::parse_table;

use crate::error::Result;
use crate::template::TemplateEngine;
use crate::types::{
    Datapoint, Frames, SampleValue, TableResult, Target, TargetFormat, TimeSeriesResult,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Heatmap bucket names look like `<lower>-<upper>`.
static BUCKET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)-(.+?)$").expect("Invalid heatmap bucket regex"));

/// Reshapes query results per target format.
#[derive(Clone)]
pub struct Transformations {
    templates: Arc<dyn TemplateEngine>,
}

impl Transformations {
    pub fn new(templates: Arc<dyn TemplateEngine>) -> Self {
        Self { templates }
    }

    /// Apply the transformation selected by `target.format`.
    pub fn transform(&self, series: Vec<TimeSeriesResult>, target: &Target) -> Result<Frames> {
        let frames = match TargetFormat::parse(&target.format)? {
            TargetFormat::TimeSeries => {
                Frames::TimeSeries(self.update_labels(series, target.legend_format.as_deref()))
            }
            TargetFormat::Heatmap => Frames::TimeSeries(transform_to_heatmap(series)),
            TargetFormat::Table => Frames::Table(vec![transform_to_table(&series)]),
        };
        Ok(frames)
    }

    /// Label of a series under a legend template.
    ///
    /// The template may reference `instance` (the original target) and
    /// `metric0` (its last dot-separated component).
    pub fn label(&self, target: &str, legend_format: Option<&str>) -> String {
        let Some(legend) = legend_format.filter(|l| !l.is_empty()) else {
            return target.to_string();
        };
        let metric0 = target.rsplit('.').next().unwrap_or(target);
        let vars = HashMap::from([
            ("instance".to_string(), target.to_string()),
            ("metric0".to_string(), metric0.to_string()),
        ]);
        self.templates.replace(legend, &vars)
    }

    fn update_labels(
        &self,
        series: Vec<TimeSeriesResult>,
        legend_format: Option<&str>,
    ) -> Vec<TimeSeriesResult> {
        series
            .into_iter()
            .map(|s| TimeSeriesResult { target: self.label(&s.target, legend_format), ..s })
            .collect()
    }
}

/// Label buckets by their upper bound and floor timestamps to whole seconds.
pub fn transform_to_heatmap(series: Vec<TimeSeriesResult>) -> Vec<TimeSeriesResult> {
    series
        .into_iter()
        .map(|s| {
            let target = match BUCKET_REGEX.captures(&s.target) {
                Some(caps) => caps[2].to_string(),
                None => s.target,
            };
            let datapoints = s
                .datapoints
                .into_iter()
                .map(|Datapoint(value, ts)| Datapoint(value, ts.div_euclid(1000) * 1000))
                .collect();
            TimeSeriesResult { target, datapoints }
        })
        .collect()
}

/// Parse the first value of the first series as a text table.
pub fn transform_to_table(series: &[TimeSeriesResult]) -> TableResult {
    let text = series
        .first()
        .and_then(|s| s.datapoints.first())
        .map(|point| match point.value() {
            SampleValue::Text(text) => text.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();
    parse_table(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PcpError;
    use crate::template::VariableTemplates;
    use crate::types::Column;

    fn transformations() -> Transformations {
        Transformations::new(Arc::new(VariableTemplates::new()))
    }

    fn series(target: &str, points: &[(f64, i64)]) -> TimeSeriesResult {
        TimeSeriesResult {
            target: target.to_string(),
            datapoints: points
                .iter()
                .map(|(v, ts)| Datapoint(SampleValue::Number(*v), *ts))
                .collect(),
        }
    }

    fn targets(frames: &Frames) -> Vec<String> {
        match frames {
            Frames::TimeSeries(series) => series.iter().map(|s| s.target.clone()).collect(),
            Frames::Table(_) => panic!("expected time series"),
        }
    }

    #[test]
    fn test_time_series_without_legend_keeps_targets() {
        let input = vec![series("kernel.all.load-1", &[(1.0, 1000)])];
        let frames = transformations()
            .transform(input.clone(), &Target::new(TargetFormat::TimeSeries))
            .unwrap();
        assert_eq!(frames, Frames::TimeSeries(input));

        let blank = Target::new(TargetFormat::TimeSeries).with_legend("");
        let frames = transformations().transform(vec![series("a.b", &[])], &blank).unwrap();
        assert_eq!(targets(&frames), vec!["a.b"]);
    }

    #[test]
    fn test_time_series_legend_placeholders() {
        let target = Target::new(TargetFormat::TimeSeries).with_legend("$metric0 ([[instance]])");
        let frames = transformations()
            .transform(vec![series("network.interface.in.bytes-2", &[(5.0, 1000)])], &target)
            .unwrap();
        assert_eq!(targets(&frames), vec!["bytes-2 (network.interface.in.bytes-2)"]);
    }

    #[test]
    fn test_label_without_dots() {
        assert_eq!(transformations().label("hinv", Some("$metric0")), "hinv");
    }

    #[test]
    fn test_heatmap_buckets_and_rounding() {
        let input =
            vec![series("10-20", &[(3.0, 1500), (4.0, 2999)]), series("other", &[(1.0, 999)])];
        let frames =
            transformations().transform(input, &Target::new(TargetFormat::Heatmap)).unwrap();

        let Frames::TimeSeries(output) = frames else {
            panic!("expected time series");
        };
        assert_eq!(output[0].target, "20");
        assert_eq!(
            output[0].datapoints,
            vec![
                Datapoint(SampleValue::Number(3.0), 1000),
                Datapoint(SampleValue::Number(4.0), 2000)
            ]
        );
        assert_eq!(output[1].target, "other");
        assert_eq!(output[1].datapoints[0].timestamp_ms(), 0);
    }

    #[test]
    fn test_heatmap_negative_bucket_bounds() {
        let output = transform_to_heatmap(vec![series("-10-0", &[])]);
        assert_eq!(output[0].target, "0");
    }

    #[test]
    fn test_table_from_first_value() {
        let input = vec![TimeSeriesResult {
            target: "bpftrace.scripts.script1.data.output".to_string(),
            datapoints: vec![
                Datapoint(SampleValue::Text("A  B\nval1  val2".to_string()), 1000),
                Datapoint(SampleValue::Text("C  D\nignored  too".to_string()), 2000),
            ],
        }];
        let frames =
            transformations().transform(input, &Target::new(TargetFormat::Table)).unwrap();
        assert_eq!(
            frames,
            Frames::Table(vec![TableResult {
                columns: vec![Column { text: "A".to_string() }, Column { text: "B".to_string() }],
                rows: vec![vec!["val1".to_string(), "val2".to_string()]],
            }])
        );
    }

    #[test]
    fn test_table_without_data_is_empty() {
        let frames =
            transformations().transform(vec![], &Target::new(TargetFormat::Table)).unwrap();
        assert_eq!(frames, Frames::Table(vec![TableResult::default()]));
    }

    #[test]
    fn test_invalid_format() {
        let target = Target { format: "graph".to_string(), legend_format: None };
        let err = transformations().transform(vec![], &target).unwrap_err();
        assert!(matches!(&err, PcpError::InvalidFormat { format, .. } if format == "graph"));
        let message = err.to_string();
        for option in ["time_series", "heatmap", "table"] {
            assert!(message.contains(option), "{message}");
        }
    }
}
