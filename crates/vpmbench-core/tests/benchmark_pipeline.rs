//! End-to-end runs: extract the bundled ClinVar set, load the bundled
//! plugins, benchmark, and write the report artifacts.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde_json::json;
use vpmbench_core::{
    read_report_json, write_report_json, write_report_md, Benchmark, BenchmarkConfig,
    CancellationToken, NativeRegistry, PluginLoader, PluginOutcome, RuntimeKind, VcfExtractor,
};

fn resources() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/resources")
}

fn config() -> BenchmarkConfig {
    BenchmarkConfig {
        max_parallel_plugins: 2,
        ..BenchmarkConfig::default()
    }
}

fn loader() -> PluginLoader {
    let mut native = NativeRegistry::new();
    native.register_fn("position_threshold", |table| {
        Ok(table
            .iter()
            .map(|r| if r.position >= 50_000 { 0.9 } else { 0.1 })
            .collect())
    });
    PluginLoader::new(native, config())
}

#[tokio::test]
async fn clinvar_benchmark_end_to_end() {
    let plugins = loader()
        .load_dir(&resources().join("plugins"))
        .expect("load plugins");
    let report = Benchmark::new(config())
        .run_file(
            &VcfExtractor::clinvar(),
            &resources().join("clinvar_grch37.vcf"),
            &plugins,
            &CancellationToken::new(),
        )
        .await
        .expect("benchmark run");

    assert_eq!(report.records, 10);
    assert_eq!(report.runs.len(), 5);
    let counts = report.counts();
    assert_eq!((counts.completed, counts.failed, counts.skipped), (3, 1, 1));

    let threshold = report.run("Position Threshold").expect("threshold run");
    assert_eq!(threshold.runtime, RuntimeKind::Process);
    assert_eq!(
        threshold.summary("Confusion Matrix"),
        Some(&json!({"tn": 5, "fp": 0, "fn": 0, "tp": 5}))
    );
    for metric in ["Sensitivity", "Specificity", "Accuracy", "Matthews Correlation Coefficient"] {
        assert_eq!(threshold.metric(metric), Some(1.0), "{metric}");
    }
    assert_eq!(threshold.metric("Area Under ROC Curve"), Some(1.0));

    let native = report.run("Native Position").expect("native run");
    assert_eq!(native.runtime, RuntimeKind::Native);
    assert_eq!(native.summary("ROC Curve"), threshold.summary("ROC Curve"));

    // Low scores are pathogenic here; curves are computed on raw scores.
    let ranked = report.run("Ranked Output").expect("ranked run");
    assert_eq!(ranked.metric("Accuracy"), Some(1.0));
    assert_eq!(ranked.metric("Area Under ROC Curve"), Some(0.0));

    match &report.run("Broken").expect("broken run").outcome {
        PluginOutcome::Failed { error } => assert!(error.contains("model weights not found")),
        other => panic!("expected Failed, got {other:?}"),
    }
    match &report.run("GRCh38 Only").expect("skipped run").outcome {
        PluginOutcome::Skipped { reason } => assert!(reason.contains("GRCh37")),
        other => panic!("expected Skipped, got {other:?}"),
    }
}

#[tokio::test]
async fn report_artifacts_round_trip() {
    let plugin = loader()
        .load(&resources().join("plugins/position_threshold/manifest.yaml"))
        .expect("load plugin");
    let report = Benchmark::new(config())
        .run_file(
            &VcfExtractor::clinvar(),
            &resources().join("clinvar_grch37.vcf"),
            &[plugin],
            &CancellationToken::new(),
        )
        .await
        .expect("benchmark run");

    let dir = tempfile::tempdir().expect("tempdir");
    let json_path = dir.path().join("report.json");
    let md_path = dir.path().join("report.md");
    write_report_json(&json_path, &report).expect("write json");
    write_report_md(&md_path, &report).expect("write md");

    assert_eq!(read_report_json(&json_path).expect("read json"), report);
    let md = std::fs::read_to_string(&md_path).expect("read md");
    assert!(md.contains("| Position Threshold 1.0 | process | completed |"));
    assert!(md.contains(&report.dataset_digest));
}

#[tokio::test]
async fn cancellation_stops_a_running_plugin() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("score.sh"),
        "echo \"$VPMBENCH_INPUT\" > seen\nsleep 30\n",
    )
    .expect("write script");
    let manifest = dir.path().join("manifest.yaml");
    std::fs::write(
        &manifest,
        "name: Sleeper\nversion: \"1\"\ncutoff: greater 0.5\nentry-point:\n  mode: process\n  command: [sh, score.sh]\n",
    )
    .expect("write manifest");

    let loader = loader();
    let plugins = vec![
        loader.load(&manifest).expect("load sleeper"),
        loader
            .load(&resources().join("plugins/native_position/manifest.yaml"))
            .expect("load native"),
    ];

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let report = Benchmark::new(config())
        .run_file(
            &VcfExtractor::clinvar(),
            &resources().join("clinvar_grch37.vcf"),
            &plugins,
            &cancel,
        )
        .await
        .expect("benchmark run");

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.run("Sleeper").expect("sleeper run").outcome, PluginOutcome::Cancelled);
    let input = std::fs::read_to_string(dir.path().join("seen")).expect("payload path");
    let payload_dir = Path::new(input.trim()).parent().expect("payload dir");
    assert!(!payload_dir.exists(), "payload dir survived cancellation");
    assert!(report
        .run("Native Position")
        .expect("native run")
        .outcome
        .is_completed());
}
