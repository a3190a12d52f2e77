//! `pcp-poll check` command

use anyhow::Result;
use colored::Colorize;
use pcp_core::DataSource;

/// Verify that pmproxy answers and report the PCP version
pub async fn check(datasource: &DataSource) -> Result<()> {
    let report = datasource.test_datasource().await;

    if report.is_healthy() {
        println!("{} {}", "✓".green().bold(), report.message);
        Ok(())
    } else {
        println!("{} {}", "✗".red().bold(), report.message);
        anyhow::bail!("Data source check failed")
    }
}
