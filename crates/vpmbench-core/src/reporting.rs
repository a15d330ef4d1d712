use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ReferenceGenome;
use crate::plugin::RuntimeKind;

pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// What happened to one plugin in a benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PluginOutcome {
    Completed {
        duration_ms: u64,
        scores: Vec<f64>,
        classes: Vec<u8>,
        summaries: BTreeMap<String, serde_json::Value>,
        /// `None` where a metric is undefined (zero denominator).
        metrics: BTreeMap<String, Option<f64>>,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
    Cancelled,
}

impl PluginOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One plugin's entry in the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginRunReport {
    pub plugin: String,
    pub version: String,
    pub runtime: RuntimeKind,
    #[serde(flatten)]
    pub outcome: PluginOutcome,
}

impl PluginRunReport {
    /// Summary mapping by name, if the run completed.
    pub fn summary(&self, name: &str) -> Option<&serde_json::Value> {
        match &self.outcome {
            PluginOutcome::Completed { summaries, .. } => summaries.get(name),
            _ => None,
        }
    }

    /// Metric value by name; `None` if absent, undefined or not completed.
    pub fn metric(&self, name: &str) -> Option<f64> {
        match &self.outcome {
            PluginOutcome::Completed { metrics, .. } => metrics.get(name).copied().flatten(),
            _ => None,
        }
    }
}

/// Per-status tallies of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Result artifact of one benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkReport {
    pub schema_version: String,
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// SHA-256 of the ground-truth table.
    pub dataset_digest: String,
    pub records: usize,
    pub reference_genome: ReferenceGenome,
    pub runs: Vec<PluginRunReport>,
}

impl BenchmarkReport {
    pub fn run(&self, plugin: &str) -> Option<&PluginRunReport> {
        self.runs.iter().find(|r| r.plugin == plugin)
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for run in &self.runs {
            match run.outcome {
                PluginOutcome::Completed { .. } => counts.completed += 1,
                PluginOutcome::Skipped { .. } => counts.skipped += 1,
                PluginOutcome::Failed { .. } => counts.failed += 1,
                PluginOutcome::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }
}

/// Write the report in pretty JSON format.
pub fn write_report_json(path: &Path, report: &BenchmarkReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize benchmark report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

pub fn read_report_json(path: &Path) -> Result<BenchmarkReport> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parse {:?}", path))
}

/// Render a markdown overview: one row per plugin, metrics as columns.
pub fn render_report_md(report: &BenchmarkReport) -> String {
    let mut metric_names: Vec<&str> = report
        .runs
        .iter()
        .filter_map(|run| match &run.outcome {
            PluginOutcome::Completed { metrics, .. } => Some(metrics.keys()),
            _ => None,
        })
        .flatten()
        .map(String::as_str)
        .collect();
    metric_names.sort_unstable();
    metric_names.dedup();

    let mut out = String::new();
    out.push_str("# Benchmark Report\n\n");
    out.push_str(&format!(
        "- run: `{}`\n- dataset: `{}` ({} records, {})\n- generated: {}\n\n",
        report.run_id,
        report.dataset_digest,
        report.records,
        report.reference_genome,
        report.generated_at.to_rfc3339()
    ));

    out.push_str("| Plugin | Runtime | Status |");
    for name in &metric_names {
        out.push_str(&format!(" {} |", name));
    }
    out.push_str("\n|---|---|---|");
    out.push_str(&"---|".repeat(metric_names.len()));
    out.push('\n');

    for run in &report.runs {
        out.push_str(&format!(
            "| {} {} | {} | {} |",
            run.plugin,
            run.version,
            run.runtime,
            run.outcome.status()
        ));
        for name in &metric_names {
            match run.metric(name) {
                Some(value) => out.push_str(&format!(" {:.3} |", value)),
                None => out.push_str(" - |"),
            }
        }
        out.push('\n');
    }

    let notes: Vec<String> = report
        .runs
        .iter()
        .filter_map(|run| match &run.outcome {
            PluginOutcome::Skipped { reason } => Some(format!("- {}: skipped, {}", run.plugin, reason)),
            PluginOutcome::Failed { error } => Some(format!("- {}: {}", run.plugin, error)),
            _ => None,
        })
        .collect();
    if !notes.is_empty() {
        out.push_str("\n## Notes\n");
        for note in notes {
            out.push_str(&note);
            out.push('\n');
        }
    }
    out
}

/// Write the markdown overview.
pub fn write_report_md(path: &Path, report: &BenchmarkReport) -> Result<()> {
    let md = render_report_md(report);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
