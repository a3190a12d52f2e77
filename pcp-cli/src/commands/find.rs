//! `pcp-poll find` command

use anyhow::Result;
use pcp_core::DataSource;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct ValueRow {
    #[tabled(rename = "VALUE")]
    value: String,
}

/// List the instance values of a metric, as used for dashboard variables
pub async fn find(datasource: &DataSource, query: &str) -> Result<()> {
    let values = datasource.metric_find_query(query).await?;

    if values.is_empty() {
        println!("No values found for {}", query.trim());
        return Ok(());
    }

    let rows: Vec<ValueRow> = values.into_iter().map(|value| ValueRow { value }).collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());

    println!("{}", table);

    Ok(())
}
