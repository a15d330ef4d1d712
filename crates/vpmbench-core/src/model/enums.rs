//! Closed value domains of the canonical record model and their resolution
//! tables.
//!
//! Every `resolve` is total over its table and fails with a
//! [`ResolutionError`] naming the raw value otherwise. Nothing defaults.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ResolutionError;

/// Ground-truth clinical significance of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PathogenicityClass {
    Benign,
    Pathogenic,
    Unknown,
}

impl PathogenicityClass {
    /// Resolve a clinical-significance annotation (case-insensitive).
    pub fn resolve(raw: &str) -> Result<Self, ResolutionError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pathogenic" | "likely_pathogenic" | "pathogenic/likely_pathogenic" => {
                Ok(Self::Pathogenic)
            }
            "benign" | "likely_benign" | "benign/likely_benign" => Ok(Self::Benign),
            "uncertain_significance"
            | "not_provided"
            | "conflicting_interpretations_of_pathogenicity" => Ok(Self::Unknown),
            _ => Err(ResolutionError::new("pathogenicity class", raw)),
        }
    }

    /// 1 for pathogenic, 0 for benign, `None` when there is no ground truth.
    pub fn as_binary(&self) -> Option<u8> {
        match self {
            Self::Pathogenic => Some(1),
            Self::Benign => Some(0),
            Self::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Benign => "benign",
            Self::Pathogenic => "pathogenic",
            Self::Unknown => "unknown",
        }
    }
}

/// Structural kind of a variant, derived from its alleles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VariationType {
    Snp,
    Mnp,
    Insertion,
    Deletion,
    Indel,
    StructuralVariant,
}

impl VariationType {
    /// Classify a REF/ALT pair. Alleles are expected upper-cased.
    pub fn classify(reference: &str, alternate: &str) -> Self {
        if alternate.starts_with('<') || alternate.contains(['[', ']']) || alternate == "*" {
            return Self::StructuralVariant;
        }
        match (reference.len(), alternate.len()) {
            (1, 1) => Self::Snp,
            (r, a) if r == a => Self::Mnp,
            (r, a) if r < a && alternate.starts_with(reference) => Self::Insertion,
            (r, a) if r > a && reference.starts_with(alternate) => Self::Deletion,
            _ => Self::Indel,
        }
    }

    pub fn resolve(raw: &str) -> Result<Self, ResolutionError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "snp" | "snv" => Ok(Self::Snp),
            "mnp" => Ok(Self::Mnp),
            "insertion" | "ins" => Ok(Self::Insertion),
            "deletion" | "del" => Ok(Self::Deletion),
            "indel" => Ok(Self::Indel),
            "sv" | "structural_variant" => Ok(Self::StructuralVariant),
            _ => Err(ResolutionError::new("variation type", raw)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snp => "snp",
            Self::Mnp => "mnp",
            Self::Insertion => "insertion",
            Self::Deletion => "deletion",
            Self::Indel => "indel",
            Self::StructuralVariant => "sv",
        }
    }
}

/// Genome build the coordinates refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReferenceGenome {
    GRCh37,
    GRCh38,
}

impl ReferenceGenome {
    pub fn resolve(raw: &str) -> Result<Self, ResolutionError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "grch37" | "grch37.p13" | "hg19" | "b37" => Ok(Self::GRCh37),
            "grch38" | "grch38.p13" | "grch38.p14" | "hg38" | "b38" => Ok(Self::GRCh38),
            _ => Err(ResolutionError::new("reference genome", raw)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GRCh37 => "GRCh37",
            Self::GRCh38 => "GRCh38",
        }
    }
}

/// One of the 24 canonical human chromosomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chromosome {
    Autosome(u8),
    X,
    Y,
}

impl Chromosome {
    /// Numeric chromosome code: 1-22 autosomes, 23 X, 24 Y.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1..=22 => Some(Self::Autosome(code as u8)),
            23 => Some(Self::X),
            24 => Some(Self::Y),
            _ => None,
        }
    }

    /// Best-effort normalization of a chromosome label.
    ///
    /// Strips a `chr` prefix and leading zeros, maps codes 23/24 to X/Y.
    /// Labels that don't name a canonical chromosome come back trimmed but
    /// otherwise untouched so validation can report them.
    pub fn normalize(raw: &str) -> String {
        let trimmed = raw.trim();
        let label = match trimmed.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &trimmed[3..],
            _ => trimmed,
        };
        let parsed = if label.eq_ignore_ascii_case("x") {
            Some(Self::X)
        } else if label.eq_ignore_ascii_case("y") {
            Some(Self::Y)
        } else {
            label.parse::<u32>().ok().and_then(Self::from_code)
        };
        match parsed {
            Some(chrom) => chrom.to_string(),
            None => trimmed.to_string(),
        }
    }
}

impl FromStr for Chromosome {
    type Err = ResolutionError;

    /// Strict parse of the canonical symbols only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "X" => Ok(Self::X),
            "Y" => Ok(Self::Y),
            _ if !s.starts_with('0') => s
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=22).contains(n))
                .map(Self::Autosome)
                .ok_or_else(|| ResolutionError::new("chromosome", s)),
            _ => Err(ResolutionError::new("chromosome", s)),
        }
    }
}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Autosome(n) => write!(f, "{n}"),
            Self::X => f.write_str("X"),
            Self::Y => f.write_str("Y"),
        }
    }
}

macro_rules! string_conversions {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ResolutionError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::resolve(&value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.as_str().to_string()
            }
        }
    )*};
}

string_conversions!(PathogenicityClass, VariationType, ReferenceGenome);
