//! Observability infrastructure: tracing, metrics, health checks.

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod health;
pub mod metrics;

/// Initialize logging and, when `metrics_port` is set, the Prometheus exporter.
///
/// This must be called once at application startup.
pub fn init(metrics_port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .try_init()?;

    if let Some(port) = metrics_port {
        PrometheusBuilder::new().with_http_listener(([0, 0, 0, 0], port)).install()?;
        tracing::info!(port, "Prometheus exporter listening");
    }

    metrics::register_core_metrics();

    Ok(())
}
