//! `pcp-poll watch` command
//!
//! Behaves like a dashboard: every refresh queries the watched metrics,
//! which keeps them subscribed and runs one poll cycle, then prints the
//! latest values in the requested format.

use anyhow::Result;
use colored::Colorize;
use pcp_core::{
    Clock, DataSource, Frames, PmapiQuery, QueryRequest, SystemClock, TableResult, Target,
    TargetFormat, TimeSeriesResult,
};
use std::time::Duration;
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use tokio::time::Instant;
use tracing::warn;

/// Options of a watch session
pub struct WatchOptions {
    pub metrics: Vec<String>,
    pub format: String,
    pub legend: Option<String>,
    /// Stop after this long; runs until Ctrl-C otherwise.
    pub duration: Option<Duration>,
    pub refresh: Duration,
}

#[derive(Tabled)]
struct SeriesRow {
    #[tabled(rename = "SERIES")]
    target: String,
    #[tabled(rename = "TIME (UTC)")]
    time: String,
    #[tabled(rename = "VALUE")]
    value: String,
}

/// Poll and print metrics until interrupted
pub async fn watch(datasource: &DataSource, options: WatchOptions) -> Result<()> {
    TargetFormat::parse(&options.format)?;

    let target = Target { format: options.format.clone(), legend_format: options.legend.clone() };
    let queries: Vec<PmapiQuery> = options
        .metrics
        .iter()
        .map(|metric| PmapiQuery::new(metric.clone(), metric.clone(), target.clone()))
        .collect();

    let window = datasource.poller().datastore().retention().as_millis() as i64;
    let deadline = options.duration.map(|d| Instant::now() + d);
    let clock = SystemClock;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let now = clock.now_ms();
        let request = QueryRequest {
            from_ms: now - window,
            to_ms: now,
            targets: queries.clone(),
            dashboard_refresh: Some(options.refresh),
        };

        match datasource.query(&request).await {
            Ok(responses) => {
                for response in responses {
                    println!("{}", response.ref_id.bold());
                    println!("{}", render(&response.frames));
                }
            }
            Err(e) => {
                warn!(error = %e, "Query failed");
                println!("{} {}", "✗".red().bold(), e);
            }
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = tokio::time::sleep(options.refresh) => {}
        }
    }

    Ok(())
}

fn render(frames: &Frames) -> String {
    match frames {
        Frames::TimeSeries(series) if series.is_empty() => "(no data yet)".dimmed().to_string(),
        Frames::TimeSeries(series) => {
            let mut table = Table::new(latest_rows(series));
            table.with(Style::modern());
            table.to_string()
        }
        Frames::Table(tables) => tables.iter().map(render_table).collect::<Vec<_>>().join("\n"),
    }
}

/// One row per series holding its newest datapoint
fn latest_rows(series: &[TimeSeriesResult]) -> Vec<SeriesRow> {
    series
        .iter()
        .filter_map(|s| {
            s.datapoints.last().map(|point| SeriesRow {
                target: s.target.clone(),
                time: clock_time(point.timestamp_ms()),
                value: point.value().to_string(),
            })
        })
        .collect()
}

fn render_table(result: &TableResult) -> String {
    if result.columns.is_empty() {
        return "(empty table)".dimmed().to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(result.columns.iter().map(|c| c.text.clone()));
    for row in &result.rows {
        builder.push_record(row.clone());
    }

    let mut table = builder.build();
    table.with(Style::modern());
    table.to_string()
}

/// `HH:MM:SS` of a millisecond timestamp, in UTC
fn clock_time(timestamp_ms: i64) -> String {
    let secs = timestamp_ms.div_euclid(1000);
    format!(
        "{:02}:{:02}:{:02}",
        secs.div_euclid(3600).rem_euclid(24),
        secs.div_euclid(60).rem_euclid(60),
        secs.rem_euclid(60)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcp_core::types::{Datapoint, SampleValue};

    #[test]
    fn test_clock_time() {
        assert_eq!(clock_time(0), "00:00:00");
        assert_eq!(clock_time(1_547_483_646_002), "16:34:06");
        assert_eq!(clock_time(86_399_999), "23:59:59");
    }

    #[test]
    fn test_latest_rows_skip_empty_series() {
        let series = vec![
            TimeSeriesResult {
                target: "kernel.all.load-1".to_string(),
                datapoints: vec![
                    Datapoint(SampleValue::Number(0.5), 1_000),
                    Datapoint(SampleValue::Number(0.75), 2_000),
                ],
            },
            TimeSeriesResult { target: "empty".to_string(), datapoints: vec![] },
        ];

        let rows = latest_rows(&series);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].target, "kernel.all.load-1");
        assert_eq!(rows[0].time, "00:00:02");
        assert_eq!(rows[0].value, "0.75");
    }

    #[test]
    fn test_render_table_has_headers_and_cells() {
        let result = TableResult {
            columns: vec![
                pcp_core::types::Column { text: "COMM".to_string() },
                pcp_core::types::Column { text: "COUNT".to_string() },
            ],
            rows: vec![vec!["sshd".to_string(), "4".to_string()]],
        };

        let output = render_table(&result);
        for cell in ["COMM", "COUNT", "sshd", "4"] {
            assert!(output.contains(cell), "{output}");
        }
    }
}
