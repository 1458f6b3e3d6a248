//! Rendering of evaluated envelopes.

use anyhow::{Context, Result};
use envelope_model::format_time;
use envelope_vopr::Evaluation;
use std::fmt::Write as _;
use std::str::FromStr;

/// Output format for an evaluated envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Aligned text table.
    Table,
    /// JSON document with rows and events.
    Json,
    /// YAML document with rows and events.
    Yaml,
    /// CSV rows only.
    Csv,
}

impl FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "csv" => Ok(Self::Csv),
            _ => anyhow::bail!("Unknown output format: {s}. Use 'table', 'json', 'yaml' or 'csv'."),
        }
    }
}

/// Renders an evaluation in the given format.
pub fn render(evaluation: &Evaluation, format: Format) -> Result<String> {
    match format {
        Format::Table => Ok(table(evaluation)),
        Format::Json => {
            let mut text = serde_json::to_string_pretty(evaluation)
                .with_context(|| "Failed to serialize envelope as JSON")?;
            text.push('\n');
            Ok(text)
        }
        Format::Yaml => serde_yaml::to_string(evaluation)
            .with_context(|| "Failed to serialize envelope as YAML"),
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for row in &evaluation.rows {
                writer
                    .serialize(row)
                    .with_context(|| "Failed to write CSV row")?;
            }
            let bytes = writer
                .into_inner()
                .with_context(|| "Failed to flush CSV output")?;
            String::from_utf8(bytes).with_context(|| "CSV output is not UTF-8")
        }
    }
}

fn table(evaluation: &Evaluation) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({} strategy, {} detector)",
        evaluation.workload, evaluation.strategy, evaluation.detector
    );
    let _ = writeln!(out, "{:>8}  {:>10}  {:>10}  status", "time", "lower", "upper");
    for row in &evaluation.rows {
        let status = match (row.violated, row.flawed) {
            (true, _) => "violated",
            (false, true) => "flawed",
            (false, false) => "ok",
        };
        let _ = writeln!(
            out,
            "{:>8}  {:>10.3}  {:>10.3}  {status}",
            format_time(row.time),
            row.lower,
            row.upper
        );
    }
    out
}
