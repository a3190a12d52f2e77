use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pcp_core::{interval::parse_interval, Config, DataSource, VariableTemplates};
use std::sync::Arc;

mod client;
mod commands;

#[derive(Parser)]
#[command(name = "pcp-poll")]
#[command(about = "Poll Performance Co-Pilot metrics through pmproxy", long_about = None)]
struct Cli {
    /// pmproxy URL (overrides the config file)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Host specification of the monitored host (e.g. "pcp://127.0.0.1")
    #[arg(long, global = true)]
    hostspec: Option<String>,

    /// Variable for find queries and legends (KEY=VALUE, repeatable)
    #[arg(long = "var", global = true)]
    vars: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that pmproxy is reachable
    Check,

    /// List the instance values of a metric
    Find {
        /// Metric name; may contain $variables
        query: String,
    },

    /// Poll metrics and print them on every refresh
    Watch {
        /// Metric names (e.g. "kernel.all.load")
        #[arg(required = true)]
        metrics: Vec<String>,

        /// Output format: time_series, heatmap or table
        #[arg(short, long, default_value = "time_series")]
        format: String,

        /// Legend template, may reference $instance and $metric0
        #[arg(short, long)]
        legend: Option<String>,

        /// Stop after this long (e.g. "30s", "5m")
        #[arg(short, long)]
        duration: Option<String>,

        /// Refresh interval (defaults to the configured one)
        #[arg(short, long)]
        refresh: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(url) = cli.url {
        config.url = url;
    }
    if let Some(hostspec) = cli.hostspec {
        config.hostspec = hostspec;
    }
    config.validate()?;

    pcp_core::init_observability(config.metrics_port)
        .map_err(|e| anyhow::anyhow!("Failed to initialize observability: {}", e))?;

    let source = Arc::new(client::PmApiClient::new(&config)?);
    let templates = parse_vars(&cli.vars)?;
    let datasource = DataSource::new(source, &config, Arc::new(templates))?;

    match cli.command {
        Commands::Check => {
            commands::check(&datasource).await?;
        }

        Commands::Find { query } => {
            commands::find(&datasource, &query).await?;
        }

        Commands::Watch { metrics, format, legend, duration, refresh } => {
            let duration = duration.as_deref().map(parse_interval).transpose()?;
            let refresh = match refresh {
                Some(refresh) => parse_interval(&refresh)?,
                None => config.refresh()?,
            };

            let options = commands::WatchOptions { metrics, format, legend, duration, refresh };
            commands::watch(&datasource, options).await?;
        }
    }

    Ok(())
}

/// Build the template engine from `--var KEY=VALUE` arguments
fn parse_vars(vars: &[String]) -> Result<VariableTemplates> {
    vars.iter().try_fold(VariableTemplates::new(), |templates, var| {
        let parts: Vec<&str> = var.splitn(2, '=').collect();
        if parts.len() != 2 || parts[0].is_empty() {
            anyhow::bail!("Invalid variable format: {}", var);
        }
        Ok(templates.with_global(parts[0], parts[1]))
    })
}
