//! Error types for plugin loading and execution.

use std::path::PathBuf;

/// Why a single runtime invocation produced no scores.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionFailure {
    #[error("exited with status {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("timed out after {ms} ms")]
    Timeout { ms: u64 },

    #[error("invalid output: {0}")]
    InvalidOutput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0:#}")]
    Native(anyhow::Error),
}

/// Errors surfaced by [`PluginLoader`](super::PluginLoader) and
/// [`Plugin::score`](super::Plugin::score).
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("can't load plugin from '{}': {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("plugin '{plugin}' failed: {source}")]
    Execution {
        plugin: String,
        #[source]
        source: ExecutionFailure,
    },

    #[error("plugin '{plugin}' returned {actual} scores for {expected} records")]
    Contract {
        plugin: String,
        expected: usize,
        actual: usize,
    },

    #[error("plugin '{plugin}' was cancelled")]
    Cancelled { plugin: String },
}

impl PluginError {
    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Name of the plugin involved, when it got far enough to have one.
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::Execution { plugin, .. }
            | Self::Contract { plugin, .. }
            | Self::Cancelled { plugin } => Some(plugin),
            Self::Load { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_plugin() {
        let err = PluginError::Execution {
            plugin: "CADD".to_string(),
            source: ExecutionFailure::NonZeroExit {
                code: Some(2),
                stderr: "missing model".to_string(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("CADD"));
        assert!(msg.contains("missing model"));
        assert_eq!(err.plugin(), Some("CADD"));
    }

    #[test]
    fn test_native_failure_shows_the_context_chain() {
        let failure = ExecutionFailure::Native(
            anyhow::anyhow!("model file missing").context("loading weights"),
        );
        assert_eq!(failure.to_string(), "loading weights: model file missing");
    }
}
