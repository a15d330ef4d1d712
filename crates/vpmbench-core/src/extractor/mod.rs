//! Extractors: format adapters from ground-truth files to a validated
//! [`CanonicalTable`].
//!
//! An extractor only implements the format hook [`Extractor::read_records`];
//! path resolution, error wrapping and validation live once in the provided
//! [`Extractor::extract`].
//!
//! # Modules
//!
//! - [`delimited`] - `DelimitedExtractor` + `RowMapper` strategies (VariSNP)
//! - [`vcf`]       - `VcfExtractor` + `ClassResolver` strategies (ClinVar)
//! - [`error`]     - `ParseError` / `ExtractError`

pub mod delimited;
pub mod error;
pub mod vcf;

use std::path::Path;
use std::time::Instant;

use crate::model::{CanonicalTable, VariantRecord};
use crate::obs;

pub use delimited::{DelimitedExtractor, Row, RowMapper, VariSnpRowMapper};
pub use error::{ExtractError, ParseError};
pub use vcf::{ClassResolver, ClinVarClassResolver, MultiAllelicPolicy, VcfExtractor, VcfRecord};

/// A format-specific source of canonical records.
pub trait Extractor: Send + Sync {
    /// Human-readable name used in diagnostics.
    fn name(&self) -> &str;

    /// Parse the file at `path` into records, without validating them.
    fn read_records(&self, path: &Path) -> Result<Vec<VariantRecord>, ParseError>;

    /// Parse and validate the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::Extraction`] if the file can't be read or parsed,
    /// - [`ExtractError::Resolution`] if a raw value has no canonical mapping,
    /// - [`ExtractError::Validation`] if the records violate the model.
    fn extract(&self, path: &Path) -> Result<CanonicalTable, ExtractError> {
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let start = Instant::now();

        let records = self
            .read_records(&path)
            .map_err(|err| ExtractError::from_parse(self.name(), path.clone(), err))?;
        tracing::debug!(
            extractor = self.name(),
            path = %path.display(),
            rows = records.len(),
            first = ?records.first(),
            "extracted records"
        );

        let table = CanonicalTable::from_records(records).map_err(|source| {
            ExtractError::Validation {
                extractor: self.name().to_string(),
                path: path.clone(),
                source,
            }
        })?;

        obs::emit_extraction_finished(
            self.name(),
            &path,
            table.len(),
            start.elapsed().as_millis() as u64,
        );
        Ok(table)
    }
}
