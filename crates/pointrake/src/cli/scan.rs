use std::path::Path;

use anyhow::{bail, Context, Result};
use console::{measure_text_width, style};
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;

use pointrake_core::{ColumnSpec, Extraction, ExtractorRegistry, TransactionRecord};

use crate::config::CliConfig;

/// Wire response of the ingest endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestResponse {
    status: String,
    message: String,
    #[serde(default)]
    added_count: Option<usize>,
    #[serde(default)]
    results: Option<Vec<ResultEntry>>,
}

#[derive(Debug, Deserialize)]
struct ResultEntry {
    status: String,
}

pub async fn run(
    file: &Path,
    url: &str,
    send: bool,
    endpoint_override: Option<&str>,
    as_json: bool,
) -> Result<()> {
    let config = CliConfig::load()?;
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let document = Html::parse_document(&html);

    let registry = ExtractorRegistry::with_defaults(config.options);
    let Some(extraction) = registry.scan(url, &document) else {
        bail!("no applicable source for {url}");
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&extraction.records)?);
        return Ok(());
    }

    let statuses = if send {
        Some(send_batch(&config, endpoint_override, &extraction.records).await?)
    } else {
        None
    };

    render_table(&extraction, statuses.as_deref());
    eprintln!(
        "  {} {} record(s) from {}",
        style("→").dim(),
        extraction.records.len(),
        extraction.site
    );
    Ok(())
}

async fn send_batch(
    config: &CliConfig,
    endpoint_override: Option<&str>,
    records: &[TransactionRecord],
) -> Result<Vec<String>> {
    let endpoint = endpoint_override
        .map(ToString::to_string)
        .or_else(|| config.endpoint.clone());
    let Some(endpoint) = endpoint else {
        bail!("no ingest endpoint configured; run `prk endpoint <url>` first");
    };

    let client = reqwest::Client::new();
    let response: IngestResponse = client
        .post(&endpoint)
        .json(records)
        .send()
        .await
        .with_context(|| format!("failed to reach {endpoint}"))?
        .json()
        .await
        .context("endpoint returned an unreadable response")?;

    if response.status != "success" {
        bail!("ingest failed: {}", response.message);
    }

    eprintln!(
        "  {} {} (added {})",
        style("✓").green(),
        response.message,
        response.added_count.unwrap_or_default()
    );
    Ok(response
        .results
        .unwrap_or_default()
        .into_iter()
        .map(|entry| entry.status)
        .collect())
}

/// Render the record table with the extractor's column descriptors; when
/// per-record ingest statuses are present they are appended as an extra
/// column, aligned with the records by position.
fn render_table(extraction: &Extraction, statuses: Option<&[String]>) {
    let columns = &extraction.columns;
    let mut widths: Vec<usize> = columns
        .iter()
        .map(|col| measure_text_width(col.label))
        .collect();

    let rows: Vec<Vec<String>> = extraction
        .records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|col| cell_text(record, col))
                .collect::<Vec<_>>()
        })
        .collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(measure_text_width(cell));
        }
    }

    print_row(
        &columns.iter().map(|c| c.label.to_string()).collect::<Vec<_>>(),
        columns,
        &widths,
        None,
    );
    for (index, row) in rows.iter().enumerate() {
        let status = statuses.and_then(|s| s.get(index)).map(String::as_str);
        print_row(row, columns, &widths, status);
    }
}

fn print_row(cells: &[String], columns: &[ColumnSpec], widths: &[usize], status: Option<&str>) {
    let mut line = String::new();
    for ((cell, column), width) in cells.iter().zip(columns).zip(widths) {
        let pad = width.saturating_sub(measure_text_width(cell));
        if column.numeric {
            line.push_str(&" ".repeat(pad));
            line.push_str(cell);
        } else {
            line.push_str(cell);
            line.push_str(&" ".repeat(pad));
        }
        line.push_str("  ");
    }
    match status {
        Some("added") => println!("{line}{}", style("added").green()),
        Some("skipped") => println!("{line}{}", style("skipped").yellow()),
        Some(other) => println!("{line}{other}"),
        None => println!("{}", line.trim_end()),
    }
}

fn cell_text(record: &TransactionRecord, column: &ColumnSpec) -> String {
    match record.get(column.key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => {
            if column.numeric {
                n.as_i64().map_or_else(|| n.to_string(), group_thousands)
            } else {
                n.to_string()
            }
        }
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// 1234567 -> "1,234,567", keeping the sign.
fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
