//! Plugin contract and runtime dispatch.
//!
//! A [`Plugin`] pairs an immutable [`PluginDescriptor`] with the
//! [`ScoringRuntime`] selected for it at load time. Callers score tables
//! through [`Plugin::score`] without knowing which runtime is behind it.
//!
//! # Modules
//!
//! - [`manifest`] - `manifest.yaml` schema, `PluginDescriptor`
//! - [`runtime`]  - the `ScoringRuntime` trait
//! - [`native`]   - in-process scorers (`NativeRegistry`, `NativeRuntime`)
//! - [`process`]  - host process and container scorers (`IsolatedRuntime`)
//! - [`payload`]  - CSV payload and score output formats
//! - [`error`]    - `PluginError` / `ExecutionFailure`

pub mod error;
pub mod manifest;
pub mod native;
pub mod payload;
pub mod process;
pub mod runtime;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::config::BenchmarkConfig;
use crate::interpret::Score;
use crate::model::CanonicalTable;
use crate::obs;

pub use error::{ExecutionFailure, PluginError};
pub use manifest::{EntryPoint, OutputChannel, PluginDescriptor, RuntimeKind};
pub use native::{NativeRegistry, NativeRuntime, ScoringFunction};
pub use process::{IsolatedRuntime, Launcher};
pub use runtime::ScoringRuntime;

/// File name looked up by [`PluginLoader::load_dir`].
pub const MANIFEST_FILE: &str = "manifest.yaml";

/// A loaded, ready-to-run scoring method.
#[derive(Clone)]
pub struct Plugin {
    descriptor: Arc<PluginDescriptor>,
    runtime: Arc<dyn ScoringRuntime>,
}

impl Plugin {
    pub fn new(descriptor: PluginDescriptor, runtime: Arc<dyn ScoringRuntime>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            runtime,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn runtime_kind(&self) -> RuntimeKind {
        self.runtime.kind()
    }

    /// Run the plugin on `table`.
    ///
    /// Returns a [`Score`] only if the run succeeded and produced exactly one
    /// finite value per record.
    pub async fn score(&self, table: &CanonicalTable) -> Result<Score, PluginError> {
        let name = self.name();
        let start = Instant::now();
        obs::emit_plugin_started(name, self.runtime.kind(), table.len());

        let result = match self.runtime.execute(table).await {
            Ok(values) if values.len() == table.len() => {
                match values.iter().position(|value| !value.is_finite()) {
                    Some(row) => Err(PluginError::Execution {
                        plugin: name.to_string(),
                        source: ExecutionFailure::InvalidOutput(format!(
                            "score {} for row {row} is not finite",
                            values[row]
                        )),
                    }),
                    None => Ok(Score::new(name, values, self.descriptor.cutoff)),
                }
            }
            Ok(values) => Err(PluginError::Contract {
                plugin: name.to_string(),
                expected: table.len(),
                actual: values.len(),
            }),
            Err(source) => Err(PluginError::Execution {
                plugin: name.to_string(),
                source,
            }),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(score) => obs::emit_plugin_finished(name, score.len(), duration_ms),
            Err(err) => obs::emit_plugin_failed(name, err, duration_ms),
        }
        result
    }

    /// [`score`](Self::score), abandoned as soon as `cancel` fires.
    ///
    /// Abandoning drops the runtime future, which kills an isolated child
    /// and removes its payload directory.
    pub async fn score_until_cancelled(
        &self,
        table: &CanonicalTable,
        cancel: &CancellationToken,
    ) -> Result<Score, PluginError> {
        let cancelled = || PluginError::Cancelled {
            plugin: self.name().to_string(),
        };
        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let err = cancelled();
                obs::emit_plugin_failed(self.name(), &err, 0);
                Err(err)
            }
            result = self.score(table) => result,
        }
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.descriptor.name)
            .field("runtime", &self.runtime.kind())
            .finish()
    }
}

/// Builds [`Plugin`]s from manifests.
#[derive(Debug, Clone, Default)]
pub struct PluginLoader {
    native: NativeRegistry,
    config: BenchmarkConfig,
}

impl PluginLoader {
    pub fn new(native: NativeRegistry, config: BenchmarkConfig) -> Self {
        Self { native, config }
    }

    pub fn native(&self) -> &NativeRegistry {
        &self.native
    }

    /// Load the plugin described by the manifest at `manifest_path`.
    pub fn load(&self, manifest_path: &Path) -> Result<Plugin, PluginError> {
        let manifest_path = std::fs::canonicalize(manifest_path)
            .map_err(|e| PluginError::load(manifest_path, e.to_string()))?;
        let manifest_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let yaml = std::fs::read_to_string(&manifest_path)
            .map_err(|e| PluginError::load(&manifest_path, e.to_string()))?;
        let descriptor = PluginDescriptor::from_yaml(&yaml, &manifest_dir)
            .map_err(|e| PluginError::load(&manifest_path, e.to_string()))?;

        let runtime = self.runtime_for(&descriptor, &manifest_path)?;
        tracing::debug!(
            plugin = %descriptor.name,
            version = %descriptor.version,
            runtime = %runtime.kind(),
            manifest = %manifest_path.display(),
            "loaded plugin"
        );
        Ok(Plugin::new(descriptor, runtime))
    }

    /// Load every `*/manifest.yaml` directly below `dir`, in path order.
    ///
    /// Fails on the first manifest that can't be loaded.
    pub fn load_dir(&self, dir: &Path) -> Result<Vec<Plugin>, PluginError> {
        let entries =
            std::fs::read_dir(dir).map_err(|e| PluginError::load(dir, e.to_string()))?;
        let mut manifests: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PluginError::load(dir, e.to_string()))?;
            let candidate = entry.path().join(MANIFEST_FILE);
            if candidate.is_file() {
                manifests.push(candidate);
            }
        }
        manifests.sort();
        manifests.iter().map(|path| self.load(path)).collect()
    }

    fn runtime_for(
        &self,
        descriptor: &PluginDescriptor,
        manifest_path: &Path,
    ) -> Result<Arc<dyn ScoringRuntime>, PluginError> {
        let timeout = Duration::from_secs(
            descriptor
                .entry_point
                .timeout_secs()
                .unwrap_or(self.config.plugin_timeout_secs),
        );

        match &descriptor.entry_point {
            EntryPoint::Native { symbol } => {
                let function = self.native.get(symbol).ok_or_else(|| {
                    PluginError::load(
                        manifest_path,
                        format!("native scorer '{symbol}' is not registered"),
                    )
                })?;
                Ok(Arc::new(NativeRuntime::new(symbol.clone(), function)))
            }
            EntryPoint::Process {
                command, output, ..
            } => {
                let (program, args) = command.split_first().ok_or_else(|| {
                    PluginError::load(manifest_path, "process entry point has an empty command")
                })?;
                let program = process::find_program(program, &descriptor.manifest_dir)
                    .ok_or_else(|| {
                        PluginError::load(manifest_path, format!("program '{program}' not found"))
                    })?;
                let launcher = Launcher::Host {
                    program,
                    args: args.to_vec(),
                    working_dir: descriptor.manifest_dir.clone(),
                };
                Ok(Arc::new(IsolatedRuntime::new(launcher, *output, timeout)))
            }
            EntryPoint::Container {
                image,
                args,
                output,
                ..
            } => {
                let engine = &self.config.container_engine;
                let engine = process::find_program(engine, &descriptor.manifest_dir)
                    .ok_or_else(|| {
                        PluginError::load(
                            manifest_path,
                            format!("container engine '{engine}' is not on PATH"),
                        )
                    })?;
                let launcher = Launcher::Container {
                    engine,
                    image: image.clone(),
                    args: args.clone(),
                };
                Ok(Arc::new(IsolatedRuntime::new(launcher, *output, timeout)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpret::CutoffSpec;
    use crate::model::{PathogenicityClass, ReferenceGenome, VariantRecord, VariationType};

    fn table(rows: usize) -> CanonicalTable {
        CanonicalTable::from_records(
            (1..=rows as u64)
                .map(|pos| {
                    VariantRecord::new(
                        "3",
                        pos,
                        "T",
                        "C",
                        PathogenicityClass::Pathogenic,
                        VariationType::Snp,
                        ReferenceGenome::GRCh38,
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    fn write_manifest(dir: &Path, name: &str, yaml: &str) -> PathBuf {
        let plugin_dir = dir.join(name);
        std::fs::create_dir_all(&plugin_dir).unwrap();
        let path = plugin_dir.join(MANIFEST_FILE);
        std::fs::write(&path, yaml).unwrap();
        path
    }

    fn loader() -> PluginLoader {
        let mut native = NativeRegistry::new();
        native.register_fn("half", |table| Ok(vec![0.5; table.len()]));
        native.register_fn("short", |_| Ok(vec![0.5]));
        native.register_fn("nan", |table| {
            let mut scores = vec![0.5; table.len()];
            scores[0] = f64::NAN;
            Ok(scores)
        });
        PluginLoader::new(native, BenchmarkConfig::default())
    }

    #[tokio::test]
    async fn test_native_plugin_scores() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            "half",
            "name: Half\ncutoff: greater 0.4\nentry-point: {mode: native, symbol: half}\n",
        );
        let plugin = loader().load(&path).unwrap();
        assert_eq!(plugin.name(), "Half");
        assert_eq!(plugin.runtime_kind(), RuntimeKind::Native);

        let score = plugin.score(&table(3)).await.unwrap();
        assert_eq!(score.values(), &[0.5, 0.5, 0.5]);
        assert_eq!(score.cutoff(), CutoffSpec::GreaterThan(0.4));
        assert_eq!(score.interpret(), vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn test_length_mismatch_is_a_contract_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            "short",
            "name: Short\ncutoff: greater 0.4\nentry-point: {mode: native, symbol: short}\n",
        );
        let err = loader().load(&path).unwrap().score(&table(2)).await.unwrap_err();
        assert!(matches!(
            err,
            PluginError::Contract {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_non_finite_scores_are_invalid_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            "nan",
            "name: NaN\ncutoff: greater 0.4\nentry-point: {mode: native, symbol: nan}\n",
        );
        let err = loader().load(&path).unwrap().score(&table(2)).await.unwrap_err();
        match err {
            PluginError::Execution {
                source: ExecutionFailure::InvalidOutput(reason),
                ..
            } => assert!(reason.contains("row 0")),
            other => panic!("expected InvalidOutput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_token_prevents_scoring() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            "half",
            "name: Half\ncutoff: 0.5\nentry-point: {mode: native, symbol: half}\n",
        );
        let plugin = loader().load(&path).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = plugin
            .score_until_cancelled(&table(1), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Cancelled { ref plugin } if plugin == "Half"));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader();

        let unregistered = write_manifest(
            dir.path(),
            "a",
            "name: A\ncutoff: 0.5\nentry-point: {mode: native, symbol: nope}\n",
        );
        let err = loader.load(&unregistered).unwrap_err();
        assert!(err.to_string().contains("'nope' is not registered"));

        let missing_program = write_manifest(
            dir.path(),
            "b",
            "name: B\ncutoff: 0.5\nentry-point: {mode: process, command: [./missing.sh]}\n",
        );
        assert!(matches!(
            loader.load(&missing_program),
            Err(PluginError::Load { .. })
        ));

        let malformed = write_manifest(dir.path(), "c", "name: [unterminated\n");
        assert!(matches!(loader.load(&malformed), Err(PluginError::Load { .. })));

        assert!(loader.load(&dir.path().join("nowhere.yaml")).is_err());
    }

    #[test]
    fn test_missing_container_engine_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            "c",
            "name: C\ncutoff: 0.5\nentry-point: {mode: container, image: org/x}\n",
        );
        let config = BenchmarkConfig {
            container_engine: "no-such-container-engine".to_string(),
            ..BenchmarkConfig::default()
        };
        let err = PluginLoader::new(NativeRegistry::new(), config)
            .load(&path)
            .unwrap_err();
        assert!(err.to_string().contains("no-such-container-engine"));
    }

    #[test]
    fn test_load_dir_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            "b-second",
            "name: Second\ncutoff: 0.5\nentry-point: {mode: native, symbol: half}\n",
        );
        write_manifest(
            dir.path(),
            "a-first",
            "name: First\ncutoff: 0.5\nentry-point: {mode: native, symbol: half}\n",
        );
        std::fs::create_dir(dir.path().join("not-a-plugin")).unwrap();

        let plugins = loader().load_dir(dir.path()).unwrap();
        let names: Vec<&str> = plugins.iter().map(Plugin::name).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }
}
