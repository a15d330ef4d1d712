//! Structured observability hooks for benchmark lifecycle events.
//!
//! This module provides:
//! - The benchmark-scoped span every plugin event of a run is recorded under
//! - Emission functions for extraction, per-plugin and benchmark events
//!
//! Events are emitted at `info!` level, failures at `warn!`. Use
//! [`crate::telemetry::init_tracing`] to choose text or JSON output.

use std::path::Path;

use tracing::{info, warn};

use crate::plugin::RuntimeKind;

/// Span tagged with the run id and dataset digest.
///
/// The run is asynchronous, so attach it with `Instrument::instrument`
/// rather than entering it.
///
/// # Example
///
/// ```ignore
/// run_plugins().instrument(obs::benchmark_span(&run_id, &digest)).await;
/// // plugin events inside are associated with run_id
/// ```
pub fn benchmark_span(run_id: &str, dataset_digest: &str) -> tracing::Span {
    tracing::info_span!(
        "vpmbench.benchmark",
        run_id = %run_id,
        dataset = %dataset_digest,
    )
}

/// Emit event: a ground-truth file was extracted and validated.
pub fn emit_extraction_finished(extractor: &str, path: &Path, rows: usize, duration_ms: u64) {
    info!(
        event = "extraction.finished",
        extractor = %extractor,
        path = %path.display(),
        rows = rows,
        duration_ms = duration_ms,
    );
}

/// Emit event: a plugin run started.
pub fn emit_plugin_started(plugin: &str, runtime: RuntimeKind, rows: usize) {
    info!(event = "plugin.started", plugin = %plugin, runtime = %runtime, rows = rows);
}

/// Emit event: a plugin run produced a complete score.
pub fn emit_plugin_finished(plugin: &str, scores: usize, duration_ms: u64) {
    info!(
        event = "plugin.finished",
        plugin = %plugin,
        scores = scores,
        duration_ms = duration_ms,
    );
}

/// Emit event: a plugin run failed (warning level).
pub fn emit_plugin_failed(plugin: &str, error: &dyn std::fmt::Display, duration_ms: u64) {
    warn!(
        event = "plugin.failed",
        plugin = %plugin,
        error = %error,
        duration_ms = duration_ms,
    );
}

/// Emit event: a plugin was not run against the dataset.
pub fn emit_plugin_skipped(plugin: &str, reason: &str) {
    info!(event = "plugin.skipped", plugin = %plugin, reason = %reason);
}

/// Emit event: benchmark finished with per-outcome counts.
pub fn emit_benchmark_finished(
    run_id: &str,
    duration_ms: u64,
    completed: usize,
    failed: usize,
    skipped: usize,
    cancelled: usize,
) {
    info!(
        event = "benchmark.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        completed = completed,
        failed = failed,
        skipped = skipped,
        cancelled = cancelled,
    );
}
