//! The evaluation workflow: extract, score, interpret, summarize.
//!
//! One [`Benchmark::run`] scores a validated table with every plugin and
//! collects one [`PluginRunReport`] per plugin, in plugin order. Failures
//! are confined to the plugin that caused them.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::BenchmarkConfig;
use crate::error::Result;
use crate::extractor::Extractor;
use crate::interpret::Score;
use crate::model::CanonicalTable;
use crate::obs;
use crate::plugin::{Plugin, PluginError};
use crate::reporting::{BenchmarkReport, PluginOutcome, PluginRunReport, REPORT_SCHEMA_VERSION};
use crate::summary::{MetricRegistry, SummaryError, SummaryRegistry};

/// Runs plugins against ground truth and summarizes their performance.
#[derive(Debug)]
pub struct Benchmark {
    config: BenchmarkConfig,
    summaries: SummaryRegistry,
    metrics: MetricRegistry,
}

impl Benchmark {
    /// A benchmark using every built-in summary and metric.
    pub fn new(config: BenchmarkConfig) -> Self {
        Self::with_registries(
            config,
            SummaryRegistry::with_builtins(),
            MetricRegistry::with_builtins(),
        )
    }

    pub fn with_registries(
        config: BenchmarkConfig,
        summaries: SummaryRegistry,
        metrics: MetricRegistry,
    ) -> Self {
        Self {
            config,
            summaries,
            metrics,
        }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Extract `path` with `extractor`, then [`run`](Self::run).
    pub async fn run_file(
        &self,
        extractor: &dyn Extractor,
        path: &Path,
        plugins: &[Plugin],
        cancel: &CancellationToken,
    ) -> Result<BenchmarkReport> {
        let table = extractor.extract(path)?;
        self.run(&table, plugins, cancel).await
    }

    /// Score `table` with every plugin.
    ///
    /// At most `max_parallel_plugins` plugins run at once; reports keep the
    /// order of `plugins`. Plugins not started when `cancel` fires are
    /// reported as cancelled, running ones are abandoned.
    ///
    /// # Errors
    ///
    /// Only for problems with the table itself: a row without ground truth
    /// or a table that can't be serialized. Plugin failures are reported
    /// per plugin.
    pub async fn run(
        &self,
        table: &CanonicalTable,
        plugins: &[Plugin],
        cancel: &CancellationToken,
    ) -> Result<BenchmarkReport> {
        let truth = table.ground_truth()?;
        let dataset_digest = table.digest()?;
        let run_id = Uuid::new_v4();
        let start = Instant::now();

        let span = obs::benchmark_span(&run_id.to_string(), &dataset_digest);
        let runs: Vec<PluginRunReport> = stream::iter(plugins)
            .map(|plugin| self.run_plugin(table, &truth, plugin, cancel))
            .buffered(self.config.max_parallel_plugins.max(1))
            .collect()
            .instrument(span)
            .await;

        let report = BenchmarkReport {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            run_id,
            generated_at: Utc::now(),
            dataset_digest,
            records: table.len(),
            reference_genome: table.reference_genome(),
            runs,
        };
        let counts = report.counts();
        obs::emit_benchmark_finished(
            &run_id.to_string(),
            start.elapsed().as_millis() as u64,
            counts.completed,
            counts.failed,
            counts.skipped,
            counts.cancelled,
        );
        Ok(report)
    }

    async fn run_plugin(
        &self,
        table: &CanonicalTable,
        truth: &[u8],
        plugin: &Plugin,
        cancel: &CancellationToken,
    ) -> PluginRunReport {
        let descriptor = plugin.descriptor();
        let outcome = match descriptor.incompatibility(table) {
            Some(reason) => {
                obs::emit_plugin_skipped(plugin.name(), &reason);
                PluginOutcome::Skipped { reason }
            }
            None => {
                let start = Instant::now();
                match plugin.score_until_cancelled(table, cancel).await {
                    Ok(score) => self
                        .evaluate(&score, truth, start.elapsed().as_millis() as u64)
                        .unwrap_or_else(|err| PluginOutcome::Failed {
                            error: format!("summary failed: {err}"),
                        }),
                    Err(PluginError::Cancelled { .. }) => PluginOutcome::Cancelled,
                    Err(err) => PluginOutcome::Failed {
                        error: err.to_string(),
                    },
                }
            }
        };

        PluginRunReport {
            plugin: descriptor.name.clone(),
            version: descriptor.version.clone(),
            runtime: plugin.runtime_kind(),
            outcome,
        }
    }

    /// Interpret `score` and run every registered summary and metric on it.
    pub fn evaluate(
        &self,
        score: &Score,
        truth: &[u8],
        duration_ms: u64,
    ) -> std::result::Result<PluginOutcome, SummaryError> {
        let mut summaries = BTreeMap::new();
        for summary in self.summaries.all() {
            summaries.insert(summary.name().to_string(), summary.calculate(score, truth)?);
        }
        let mut metrics = BTreeMap::new();
        for metric in self.metrics.all() {
            let value = metric.calculate(score, truth)?;
            metrics.insert(
                metric.name().to_string(),
                (!value.is_nan()).then_some(value),
            );
        }
        Ok(PluginOutcome::Completed {
            duration_ms,
            scores: score.values().to_vec(),
            classes: score.interpret(),
            summaries,
            metrics,
        })
    }
}

impl Default for Benchmark {
    fn default() -> Self {
        Self::new(BenchmarkConfig::default())
    }
}
