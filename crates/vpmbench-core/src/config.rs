//! Benchmark configuration.
//!
//! Defaults, optionally replaced by a YAML file, optionally overridden by
//! `VPMBENCH_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const ENV_PLUGIN_TIMEOUT_SECS: &str = "VPMBENCH_PLUGIN_TIMEOUT_SECS";
pub const ENV_CONTAINER_ENGINE: &str = "VPMBENCH_CONTAINER_ENGINE";
pub const ENV_MAX_PARALLEL_PLUGINS: &str = "VPMBENCH_MAX_PARALLEL_PLUGINS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("can't read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Wall-clock limit for one isolated plugin run, unless the manifest
    /// sets its own.
    pub plugin_timeout_secs: u64,
    /// Program used to run container plugins (`docker`, `podman`, ...).
    pub container_engine: String,
    /// Plugins scored concurrently by one benchmark run.
    pub max_parallel_plugins: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            plugin_timeout_secs: 600,
            container_engine: "docker".to_string(),
            max_parallel_plugins: 1,
        }
    }
}

impl BenchmarkConfig {
    pub fn from_yaml(yaml: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml, path)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env()
    }

    /// Apply `VPMBENCH_*` overrides from the process environment.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_PLUGIN_TIMEOUT_SECS) {
            self.plugin_timeout_secs = parse_number(ENV_PLUGIN_TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = lookup(ENV_CONTAINER_ENGINE) {
            self.container_engine = value.trim().to_string();
        }
        if let Some(value) = lookup(ENV_MAX_PARALLEL_PLUGINS) {
            self.max_parallel_plugins = parse_number(ENV_MAX_PARALLEL_PLUGINS, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plugin_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "plugin_timeout_secs",
                value: "0".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.max_parallel_plugins == 0 {
            return Err(ConfigError::Invalid {
                key: "max_parallel_plugins",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.container_engine.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "container_engine",
                value: self.container_engine.clone(),
                reason: "must name a program".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
