//! Validated collection of canonical records.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use super::enums::{ReferenceGenome, VariationType};
use super::error::{ValidationError, Violation};
use super::record::VariantRecord;

/// Header of [`CanonicalTable::to_csv`].
pub const CSV_COLUMNS: [&str; 7] = ["UID", "CHROM", "POS", "REF", "ALT", "TYPE", "RG"];

/// A non-empty, schema-valid, read-only table of variant records.
///
/// # Invariants
///
/// Every row satisfies the record invariants (position > 0, canonical
/// chromosome, nucleotide alleles) and all rows share one reference genome.
/// A `CanonicalTable` can only be obtained through [`from_records`], so
/// holding one is proof of validity. It is never mutated afterwards and may
/// be shared across concurrent plugin runs.
///
/// [`from_records`]: CanonicalTable::from_records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTable {
    records: Vec<VariantRecord>,
}

impl CanonicalTable {
    /// Validate `records` and assemble them into a table.
    ///
    /// Either all records are accepted or none: the error lists every
    /// violation found across the whole input.
    pub fn from_records(records: Vec<VariantRecord>) -> Result<Self, ValidationError> {
        let mut violations = Vec::new();

        let Some(first) = records.first() else {
            return Err(ValidationError {
                violations: vec![Violation::EmptyTable],
            });
        };
        let genome = first.reference_genome;

        for (row, record) in records.iter().enumerate() {
            violations.extend(record.violations(row));
            if record.reference_genome != genome {
                violations.push(Violation::MixedReferenceGenome {
                    row,
                    expected: genome.to_string(),
                    found: record.reference_genome.to_string(),
                });
            }
        }

        if violations.is_empty() {
            Ok(Self { records })
        } else {
            Err(ValidationError { violations })
        }
    }

    pub fn records(&self) -> &[VariantRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VariantRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The genome build shared by all rows.
    pub fn reference_genome(&self) -> ReferenceGenome {
        self.records[0].reference_genome
    }

    /// Distinct variation types present in the table.
    pub fn variation_types(&self) -> BTreeSet<VariationType> {
        self.records.iter().map(|r| r.variation_type).collect()
    }

    /// Binary ground truth (1 = pathogenic, 0 = benign), row-aligned.
    ///
    /// Rows without a ground truth class are an error, they are never
    /// dropped or guessed.
    pub fn ground_truth(&self) -> Result<Vec<u8>, ValidationError> {
        let mut truth = Vec::with_capacity(self.records.len());
        let mut violations = Vec::new();
        for (row, record) in self.records.iter().enumerate() {
            match record.pathogenicity_class.as_binary() {
                Some(label) => truth.push(label),
                None => violations.push(Violation::UnlabelledRecord { row }),
            }
        }
        if violations.is_empty() {
            Ok(truth)
        } else {
            Err(ValidationError { violations })
        }
    }

    /// CSV with header [`CSV_COLUMNS`], one row per record, UID being the
    /// zero-based row index. Ground truth is left out.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_COLUMNS)?;
        for (uid, record) in self.records.iter().enumerate() {
            let uid = uid.to_string();
            let position = record.position.to_string();
            let row: [&str; 7] = [
                &uid,
                &record.chromosome,
                &position,
                &record.reference_allele,
                &record.alternate_allele,
                record.variation_type.as_str(),
                record.reference_genome.as_str(),
            ];
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))
    }

    /// SHA-256 hex digest of [`to_csv`](Self::to_csv) plus the ground truth
    /// column.
    pub fn digest(&self) -> Result<String, csv::Error> {
        let bytes = self.to_csv()?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        for record in &self.records {
            hasher.update(record.pathogenicity_class.as_str().as_bytes());
            hasher.update(b"\n");
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

impl<'a> IntoIterator for &'a CanonicalTable {
    type Item = &'a VariantRecord;
    type IntoIter = std::slice::Iter<'a, VariantRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
