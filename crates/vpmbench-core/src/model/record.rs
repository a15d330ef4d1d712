//! The canonical variant record.

use serde::{Deserialize, Serialize};

use super::enums::{Chromosome, PathogenicityClass, ReferenceGenome, VariationType};
use super::error::Violation;

/// One ground-truth variant in canonical form.
///
/// Construct with [`VariantRecord::new`]; checks run when records are
/// assembled into a [`CanonicalTable`](super::CanonicalTable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// "1".."22", "X" or "Y".
    pub chromosome: String,
    /// 1-based position.
    pub position: u64,
    pub reference_allele: String,
    pub alternate_allele: String,
    pub pathogenicity_class: PathogenicityClass,
    pub variation_type: VariationType,
    pub reference_genome: ReferenceGenome,
}

impl VariantRecord {
    pub fn new(
        chromosome: impl Into<String>,
        position: u64,
        reference_allele: impl Into<String>,
        alternate_allele: impl Into<String>,
        pathogenicity_class: PathogenicityClass,
        variation_type: VariationType,
        reference_genome: ReferenceGenome,
    ) -> Self {
        Self {
            chromosome: chromosome.into(),
            position,
            reference_allele: reference_allele.into(),
            alternate_allele: alternate_allele.into(),
            pathogenicity_class,
            variation_type,
            reference_genome,
        }
    }

    /// Per-row invariant checks; `row` is only used to label violations.
    pub(crate) fn violations(&self, row: usize) -> Vec<Violation> {
        let mut found = Vec::new();
        if self.position == 0 {
            found.push(Violation::NonPositivePosition { row });
        }
        if self.chromosome.parse::<Chromosome>().is_err() {
            found.push(Violation::NonCanonicalChromosome {
                row,
                value: self.chromosome.clone(),
            });
        }
        for (field, value) in [
            ("reference", &self.reference_allele),
            ("alternate", &self.alternate_allele),
        ] {
            if !is_nucleotide_string(value) {
                found.push(Violation::InvalidAllele {
                    row,
                    field,
                    value: value.clone(),
                });
            }
        }
        found
    }
}

fn is_nucleotide_string(allele: &str) -> bool {
    !allele.is_empty() && allele.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'N'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snp(chrom: &str, pos: u64, reference: &str, alternate: &str) -> VariantRecord {
        VariantRecord::new(
            chrom,
            pos,
            reference,
            alternate,
            PathogenicityClass::Benign,
            VariationType::Snp,
            ReferenceGenome::GRCh38,
        )
    }

    #[test]
    fn test_valid_record_has_no_violations() {
        assert!(snp("X", 100, "A", "G").violations(0).is_empty());
    }

    #[test]
    fn test_each_broken_invariant_is_reported() {
        let violations = snp("MT", 0, "", "g").violations(3);
        assert_eq!(violations.len(), 4);
        assert!(violations.contains(&Violation::NonPositivePosition { row: 3 }));
        assert!(violations.contains(&Violation::NonCanonicalChromosome {
            row: 3,
            value: "MT".into()
        }));
    }

    #[test]
    fn test_symbolic_alleles_are_not_nucleotides() {
        assert!(!is_nucleotide_string("<DEL>"));
        assert!(!is_nucleotide_string("."));
        assert!(is_nucleotide_string("ACGTN"));
    }
}
