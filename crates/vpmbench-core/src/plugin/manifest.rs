//! Plugin manifests (`manifest.yaml`).
//!
//! ```yaml
//! name: My Method
//! version: "1.0"
//! supported-variations: [snp]
//! reference-genome: GRCh37
//! cutoff: greater 0.5
//! entry-point:
//!   mode: process
//!   command: [sh, score.sh, "{input}"]
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::interpret::CutoffSpec;
use crate::model::{CanonicalTable, ReferenceGenome, VariationType};

/// Where an isolated plugin writes its scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputChannel {
    #[default]
    Stdout,
    /// The file passed through `{output}` / `VPMBENCH_OUTPUT`.
    File,
}

/// How a plugin is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    Native,
    Process,
    Container,
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Native => "native",
            Self::Process => "process",
            Self::Container => "container",
        })
    }
}

/// The `entry-point` section of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum EntryPoint {
    /// A scorer registered in-process under `symbol`.
    Native { symbol: String },
    /// A host command, run in the manifest directory.
    Process {
        command: Vec<String>,
        #[serde(default)]
        output: OutputChannel,
        #[serde(default, rename = "timeout-secs")]
        timeout_secs: Option<u64>,
    },
    /// A container image run by the configured engine.
    Container {
        image: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        output: OutputChannel,
        #[serde(default, rename = "timeout-secs")]
        timeout_secs: Option<u64>,
    },
}

impl EntryPoint {
    pub fn kind(&self) -> RuntimeKind {
        match self {
            Self::Native { .. } => RuntimeKind::Native,
            Self::Process { .. } => RuntimeKind::Process,
            Self::Container { .. } => RuntimeKind::Container,
        }
    }

    /// Per-plugin timeout override, isolated runtimes only.
    pub fn timeout_secs(&self) -> Option<u64> {
        match self {
            Self::Native { .. } => None,
            Self::Process { timeout_secs, .. } | Self::Container { timeout_secs, .. } => {
                *timeout_secs
            }
        }
    }
}

/// Everything a manifest declares about a plugin. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginDescriptor {
    pub name: String,
    #[serde(default, deserialize_with = "version_string")]
    pub version: String,
    /// Empty means any variation type.
    #[serde(default, deserialize_with = "one_or_many")]
    pub supported_variations: Vec<VariationType>,
    /// Empty means any genome build.
    #[serde(default, rename = "reference-genome", deserialize_with = "one_or_many")]
    pub reference_genomes: Vec<ReferenceGenome>,
    pub cutoff: CutoffSpec,
    pub entry_point: EntryPoint,
    /// Directory holding the manifest; process commands run here.
    #[serde(skip)]
    pub manifest_dir: PathBuf,
}

impl PluginDescriptor {
    pub fn from_yaml(yaml: &str, manifest_dir: &Path) -> Result<Self, serde_yaml::Error> {
        let mut descriptor: Self = serde_yaml::from_str(yaml)?;
        descriptor.manifest_dir = manifest_dir.to_path_buf();
        Ok(descriptor)
    }

    pub fn runtime_kind(&self) -> RuntimeKind {
        self.entry_point.kind()
    }

    /// Why this plugin can't score `table`, if it can't.
    pub fn incompatibility(&self, table: &CanonicalTable) -> Option<String> {
        let genome = table.reference_genome();
        if !self.reference_genomes.is_empty() && !self.reference_genomes.contains(&genome) {
            return Some(format!("reference genome {genome} is not supported"));
        }
        if self.supported_variations.is_empty() {
            return None;
        }
        let unsupported: Vec<&str> = table
            .variation_types()
            .into_iter()
            .filter(|t| !self.supported_variations.contains(t))
            .map(|t| t.as_str())
            .collect();
        if unsupported.is_empty() {
            None
        } else {
            Some(format!(
                "variation types {} are not supported",
                unsupported.join(", ")
            ))
        }
    }

    pub fn is_compatible_with(&self, table: &CanonicalTable) -> bool {
        self.incompatibility(table).is_none()
    }
}

fn version_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "version must be a string or number, got {other:?}"
        ))),
    }
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        Some(OneOrMany::One(item)) => vec![item],
        Some(OneOrMany::Many(items)) => items,
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PathogenicityClass, VariantRecord};

    const PROCESS_MANIFEST: &str = r#"
name: Shell Method
version: "1.0"
supported-variations: [snp, mnp]
reference-genome: GRCh37
cutoff: greater 0.5
entry-point:
  mode: process
  command: [sh, score.sh, "{input}"]
  output: file
  timeout-secs: 30
"#;

    fn table(alt: &str, variation_type: VariationType) -> CanonicalTable {
        CanonicalTable::from_records(vec![VariantRecord::new(
            "1",
            10,
            "A",
            alt,
            PathogenicityClass::Benign,
            variation_type,
            ReferenceGenome::GRCh37,
        )])
        .unwrap()
    }

    #[test]
    fn test_parse_process_manifest() {
        let d = PluginDescriptor::from_yaml(PROCESS_MANIFEST, Path::new("/plugins/shell")).unwrap();
        assert_eq!(d.name, "Shell Method");
        assert_eq!(d.version, "1.0");
        assert_eq!(d.supported_variations, vec![VariationType::Snp, VariationType::Mnp]);
        assert_eq!(d.reference_genomes, vec![ReferenceGenome::GRCh37]);
        assert_eq!(d.cutoff, CutoffSpec::GreaterThan(0.5));
        assert_eq!(d.runtime_kind(), RuntimeKind::Process);
        assert_eq!(d.entry_point.timeout_secs(), Some(30));
        assert_eq!(d.manifest_dir, PathBuf::from("/plugins/shell"));
        match &d.entry_point {
            EntryPoint::Process { command, output, .. } => {
                assert_eq!(command[0], "sh");
                assert_eq!(*output, OutputChannel::File);
            }
            other => panic!("expected process entry point, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_native_and_container_manifests() {
        let native = PluginDescriptor::from_yaml(
            "name: N\ncutoff: 0.5\nentry-point: {mode: native, symbol: constant}\n",
            Path::new("."),
        )
        .unwrap();
        assert_eq!(native.cutoff, CutoffSpec::Direct);
        assert!(native.supported_variations.is_empty());
        assert_eq!(native.runtime_kind(), RuntimeKind::Native);

        let container = PluginDescriptor::from_yaml(
            "name: C\ncutoff: less 0.05\nentry-point:\n  mode: container\n  image: org/sift:6\n",
            Path::new("."),
        )
        .unwrap();
        assert_eq!(container.runtime_kind(), RuntimeKind::Container);
        assert_eq!(container.entry_point.timeout_secs(), None);
    }

    #[test]
    fn test_unknown_cutoff_keyword_fails() {
        let err = PluginDescriptor::from_yaml(
            "name: N\ncutoff: around 0.5\nentry-point: {mode: native, symbol: s}\n",
            Path::new("."),
        )
        .unwrap_err();
        assert!(err.to_string().contains("cutoff"));
    }

    #[test]
    fn test_compatibility_checks_types_and_genome() {
        let d = PluginDescriptor::from_yaml(PROCESS_MANIFEST, Path::new(".")).unwrap();
        assert!(d.is_compatible_with(&table("G", VariationType::Snp)));

        let reason = d
            .incompatibility(&table("ATT", VariationType::Insertion))
            .unwrap();
        assert!(reason.contains("insertion"));
    }
}
