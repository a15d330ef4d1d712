//! In-process scorers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::error::ExecutionFailure;
use super::manifest::RuntimeKind;
use super::runtime::ScoringRuntime;
use crate::model::CanonicalTable;

/// A scoring method callable in-process.
///
/// Any `Fn(&CanonicalTable) -> anyhow::Result<Vec<f64>>` closure is a
/// scoring function.
pub trait ScoringFunction: Send + Sync {
    fn score(&self, table: &CanonicalTable) -> anyhow::Result<Vec<f64>>;
}

impl<F> ScoringFunction for F
where
    F: Fn(&CanonicalTable) -> anyhow::Result<Vec<f64>> + Send + Sync,
{
    fn score(&self, table: &CanonicalTable) -> anyhow::Result<Vec<f64>> {
        self(table)
    }
}

/// Symbol table resolving `entry-point.symbol` of native manifests.
#[derive(Clone, Default)]
pub struct NativeRegistry {
    functions: HashMap<String, Arc<dyn ScoringFunction>>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `symbol`, replacing any previous entry.
    pub fn register(&mut self, symbol: impl Into<String>, function: impl ScoringFunction + 'static) {
        self.functions.insert(symbol.into(), Arc::new(function));
    }

    /// Register a closure; the explicit bound lets the compiler infer the
    /// closure's argument type.
    pub fn register_fn<F>(&mut self, symbol: impl Into<String>, function: F)
    where
        F: Fn(&CanonicalTable) -> anyhow::Result<Vec<f64>> + Send + Sync + 'static,
    {
        self.register(symbol, function);
    }

    pub fn get(&self, symbol: &str) -> Option<Arc<dyn ScoringFunction>> {
        self.functions.get(symbol).cloned()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.functions.contains_key(symbol)
    }

    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}

impl std::fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeRegistry")
            .field("symbols", &self.symbols())
            .finish()
    }
}

/// Runs a registered [`ScoringFunction`] on tokio's blocking pool.
///
/// The call gets its own copy of the table, so concurrent runs overlap and a
/// cancelled run returns at once. The abandoned call still finishes in the
/// background.
pub struct NativeRuntime {
    symbol: String,
    function: Arc<dyn ScoringFunction>,
}

impl NativeRuntime {
    pub fn new(symbol: impl Into<String>, function: Arc<dyn ScoringFunction>) -> Self {
        Self {
            symbol: symbol.into(),
            function,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

#[async_trait]
impl ScoringRuntime for NativeRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Native
    }

    async fn execute(&self, table: &CanonicalTable) -> Result<Vec<f64>, ExecutionFailure> {
        tracing::debug!(symbol = %self.symbol, rows = table.len(), "calling native scorer");
        let function = Arc::clone(&self.function);
        let table = table.clone();
        tokio::task::spawn_blocking(move || function.score(&table))
            .await
            .map_err(|e| {
                ExecutionFailure::Native(anyhow::anyhow!(
                    "native scorer '{}' did not finish: {e}",
                    self.symbol
                ))
            })?
            .map_err(ExecutionFailure::Native)
    }
}
