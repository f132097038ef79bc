use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct TelemetrySummary {
    pub guesses: GuessTelemetrySummary,
    pub reveals: RevealTelemetrySummary,
    pub out_of_order_requests: usize,
}

/// Decisions logged by verbose memory bots.
#[derive(Debug, Default, Serialize)]
pub struct GuessTelemetrySummary {
    pub count: usize,
    pub avg_known_pairs: Option<f64>,
    pub avg_unknown: Option<f64>,
    pub use_known_pairs_ratio: Option<f64>,
    pub mode_counts: BTreeMap<String, usize>,
    pub phase_counts: BTreeMap<String, usize>,
}

/// Every tile the harness turned over, by the source of the guess.
#[derive(Debug, Default, Serialize)]
pub struct RevealTelemetrySummary {
    pub count: usize,
    pub avg_elapsed_ms: Option<f64>,
    pub source_counts: BTreeMap<String, usize>,
}

#[derive(Debug)]
struct Average {
    sum: f64,
    count: usize,
}

impl Average {
    fn new() -> Self {
        Self { sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

fn label(fields: &serde_json::Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("<unset>")
        .to_string()
}

/// Aggregate guess and reveal events from a run's `telemetry.jsonl`.
pub fn summarise_telemetry(path: &Path) -> Result<TelemetrySummary, TelemetryError> {
    if !path.exists() {
        return Ok(TelemetrySummary::default());
    }

    let file = File::open(path).map_err(|source| TelemetryError::Io {
        context: "opening telemetry log",
        source,
    })?;
    let reader = BufReader::new(file);

    let mut summary = TelemetrySummary::default();
    let mut known_avg = Average::new();
    let mut unknown_avg = Average::new();
    let mut use_known = Average::new();
    let mut elapsed_avg = Average::new();

    for line in reader.lines() {
        let line = line.map_err(|source| TelemetryError::Io {
            context: "reading telemetry line",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = serde_json::from_str(&line)?;
        let target = payload
            .get("target")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = payload
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match target {
            "memory_bot::guess" => {
                let guesses = &mut summary.guesses;
                guesses.count += 1;
                if let Some(known) = fields.get("known_pairs").and_then(Value::as_f64) {
                    known_avg.add(known);
                }
                if let Some(unknown) = fields.get("unknown").and_then(Value::as_f64) {
                    unknown_avg.add(unknown);
                }
                if let Some(flag) = fields.get("use_known_pairs").and_then(Value::as_bool) {
                    use_known.add(if flag { 1.0 } else { 0.0 });
                }
                *guesses.mode_counts.entry(label(&fields, "mode")).or_insert(0) += 1;
                *guesses
                    .phase_counts
                    .entry(label(&fields, "phase"))
                    .or_insert(0) += 1;
            }
            "memory_bench::reveal" => {
                let reveals = &mut summary.reveals;
                reveals.count += 1;
                if let Some(ms) = fields.get("elapsed_ms").and_then(Value::as_f64) {
                    elapsed_avg.add(ms);
                }
                *reveals
                    .source_counts
                    .entry(label(&fields, "source"))
                    .or_insert(0) += 1;
            }
            "memory_bot::turn" => summary.out_of_order_requests += 1,
            _ => {}
        }
    }

    summary.guesses.avg_known_pairs = known_avg.mean();
    summary.guesses.avg_unknown = unknown_avg.mean();
    summary.guesses.use_known_pairs_ratio = use_known.mean();
    summary.reveals.avg_elapsed_ms = elapsed_avg.mean();

    Ok(summary)
}

pub fn write_summary_outputs(
    telemetry_path: &Path,
    output_dir: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    if !telemetry_path.exists() {
        return Ok(None);
    }

    let summary = summarise_telemetry(telemetry_path)?;
    let json_path = output_dir.join("telemetry_summary.json");
    let md_path = output_dir.join("telemetry_summary.md");

    std::fs::write(&json_path, serde_json::to_vec_pretty(&summary)?).map_err(|source| {
        TelemetryError::Io {
            context: "writing telemetry summary json",
            source,
        }
    })?;

    let markdown = render_markdown(&summary, telemetry_path);
    std::fs::write(&md_path, markdown).map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary markdown",
        source,
    })?;

    Ok(Some(TelemetryOutputs {
        summary,
        json_path,
        markdown_path: md_path,
    }))
}

pub fn append_highlights_to_markdown(
    summary_path: &Path,
    outputs: &TelemetryOutputs,
) -> Result<(), TelemetryError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(summary_path)
        .map_err(|source| TelemetryError::Io {
            context: "opening summary markdown for telemetry append",
            source,
        })?;

    let mut section = String::new();
    section.push_str("\n## Telemetry Highlights\n");
    let reveals = &outputs.summary.reveals;
    section.push_str(&format!("- Reveals captured: {}\n", reveals.count));
    if let Some(value) = reveals.avg_elapsed_ms {
        section.push_str(&format!("- Avg ms per reveal decision: {value:.3}\n"));
    }
    for (source, count) in &reveals.source_counts {
        section.push_str(&format!("  - {source}: {count}\n"));
    }

    let guesses = &outputs.summary.guesses;
    section.push_str(&format!("- Bot guess events: {}\n", guesses.count));
    if let Some(value) = guesses.avg_known_pairs {
        section.push_str(&format!("- Avg known pairs held: {value:.2}\n"));
    }
    if let Some(value) = guesses.use_known_pairs_ratio {
        section.push_str(&format!("- Turns drawing on memory: {:.1}%\n", value * 100.0));
    }
    if outputs.summary.out_of_order_requests > 0 {
        section.push_str(&format!(
            "- Out-of-order guess requests: {}\n",
            outputs.summary.out_of_order_requests
        ));
    }

    write!(file, "{section}").map_err(|source| TelemetryError::Io {
        context: "writing telemetry highlights",
        source,
    })?;

    Ok(())
}

fn render_markdown(summary: &TelemetrySummary, telemetry_path: &Path) -> String {
    let mut output = String::new();
    output.push_str("# Telemetry Summary\n\n");
    output.push_str(&format!("- Source: `{}`\n", telemetry_path.display()));
    output.push('\n');

    output.push_str("## Reveals\n");
    output.push_str(&format!("- Events: {}\n", summary.reveals.count));
    if let Some(value) = summary.reveals.avg_elapsed_ms {
        output.push_str(&format!("- Avg ms per decision: {value:.3}\n"));
    }
    if !summary.reveals.source_counts.is_empty() {
        output.push_str("- Sources:\n");
        for (label, count) in &summary.reveals.source_counts {
            output.push_str(&format!("  - {label}: {count}\n"));
        }
    }
    output.push('\n');

    output.push_str("## Bot Guesses\n");
    if summary.guesses.count == 0 {
        output.push_str("- <none> (enable guess_details to record them)\n");
    } else {
        output.push_str(&format!("- Events: {}\n", summary.guesses.count));
        if let Some(value) = summary.guesses.avg_known_pairs {
            output.push_str(&format!("- Avg known pairs: {value:.2}\n"));
        }
        if let Some(value) = summary.guesses.avg_unknown {
            output.push_str(&format!("- Avg unknown positions: {value:.2}\n"));
        }
        if let Some(value) = summary.guesses.use_known_pairs_ratio {
            output.push_str(&format!("- Use-known-pairs ratio: {value:.3}\n"));
        }
        output.push_str("- Modes:\n");
        for (label, count) in &summary.guesses.mode_counts {
            output.push_str(&format!("  - {label}: {count}\n"));
        }
        output.push_str("- Phases:\n");
        for (label, count) in &summary.guesses.phase_counts {
            output.push_str(&format!("  - {label}: {count}\n"));
        }
    }
    output.push('\n');

    output.push_str(&format!(
        "## Warnings\n- Out-of-order guess requests: {}\n",
        summary.out_of_order_requests
    ));
    output
}

#[derive(Debug)]
pub struct TelemetryOutputs {
    pub summary: TelemetrySummary,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}
