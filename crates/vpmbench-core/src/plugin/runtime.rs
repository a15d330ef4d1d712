//! The seam between a plugin and the way it is executed.

use async_trait::async_trait;

use super::error::ExecutionFailure;
use super::manifest::RuntimeKind;
use crate::model::CanonicalTable;

/// Produces one raw score per table record.
///
/// Implementations hold no state that changes between invocations; the same
/// runtime may be executed concurrently against the same table.
#[async_trait]
pub trait ScoringRuntime: Send + Sync {
    fn kind(&self) -> RuntimeKind;

    async fn execute(&self, table: &CanonicalTable) -> Result<Vec<f64>, ExecutionFailure>;
}
