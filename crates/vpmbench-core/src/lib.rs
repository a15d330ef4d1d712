//! vpmbench core library
//!
//! Benchmarks variant pathogenicity prediction methods against curated
//! ground truth: extractors turn ClinVar/VariSNP files into a validated
//! [`CanonicalTable`], plugins score it in-process or in an isolated child,
//! and summaries and metrics compare the interpreted calls with the truth.

pub mod benchmark;
pub mod config;
pub mod error;
pub mod extractor;
pub mod interpret;
pub mod model;
pub mod obs;
pub mod plugin;
pub mod reporting;
pub mod summary;
pub mod telemetry;

pub use benchmark::Benchmark;
pub use config::{BenchmarkConfig, ConfigError};
pub use error::{BenchError, Result};
pub use extractor::{
    ClinVarClassResolver, DelimitedExtractor, ExtractError, Extractor, MultiAllelicPolicy,
    ParseError, VariSnpRowMapper, VcfExtractor,
};
pub use interpret::{interpret, CutoffSpec, Score};
pub use model::{
    CanonicalTable, Chromosome, PathogenicityClass, ReferenceGenome, ResolutionError,
    ValidationError, VariantRecord, VariationType, Violation,
};
pub use plugin::{
    ExecutionFailure, NativeRegistry, Plugin, PluginDescriptor, PluginError, PluginLoader,
    RuntimeKind,
};
pub use reporting::{
    read_report_json, render_report_md, write_report_json, write_report_md, BenchmarkReport,
    PluginOutcome, PluginRunReport,
};
pub use summary::{
    ConfusionCounts, MetricRegistry, PerformanceMetric, PerformanceSummary, SummaryError,
    SummaryRegistry,
};
pub use telemetry::init_tracing;

pub use tokio_util::sync::CancellationToken;

/// Crate version, recorded by callers alongside reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
