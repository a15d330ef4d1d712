//! Delimited-text extractors.

use std::path::Path;
use std::str::FromStr;

use csv::StringRecord;

use super::error::ParseError;
use super::Extractor;
use crate::model::{
    Chromosome, PathogenicityClass, ReferenceGenome, VariantRecord, VariationType,
};

/// One data row of a delimited file, addressed by column name.
pub struct Row<'r> {
    line: u64,
    headers: &'r StringRecord,
    record: &'r StringRecord,
}

impl<'r> Row<'r> {
    /// 1-based line number in the source file.
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn get(&self, column: &str) -> Result<&'r str, ParseError> {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|idx| self.record.get(idx))
            .ok_or_else(|| ParseError::MissingColumn {
                line: self.line,
                column: column.to_string(),
            })
    }

    pub fn parse<T>(&self, column: &str) -> Result<T, ParseError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.get(column)?;
        raw.parse().map_err(|e| {
            ParseError::malformed(self.line, format!("column '{column}' value '{raw}': {e}"))
        })
    }
}

/// Maps one delimited row to a canonical record.
///
/// Any `Fn(&Row) -> Result<VariantRecord, ParseError>` closure is a mapper.
pub trait RowMapper: Send + Sync {
    fn map_row(&self, row: &Row<'_>) -> Result<VariantRecord, ParseError>;
}

impl<F> RowMapper for F
where
    F: Fn(&Row<'_>) -> Result<VariantRecord, ParseError> + Send + Sync,
{
    fn map_row(&self, row: &Row<'_>) -> Result<VariantRecord, ParseError> {
        self(row)
    }
}

/// Extractor for delimited text with a header line.
pub struct DelimitedExtractor {
    name: String,
    delimiter: u8,
    mapper: Box<dyn RowMapper>,
}

impl DelimitedExtractor {
    pub fn new(name: impl Into<String>, delimiter: u8, mapper: impl RowMapper + 'static) -> Self {
        Self {
            name: name.into(),
            delimiter,
            mapper: Box::new(mapper),
        }
    }

    /// Build an extractor from a mapping closure.
    pub fn from_fn<F>(name: impl Into<String>, delimiter: u8, mapper: F) -> Self
    where
        F: Fn(&Row<'_>) -> Result<VariantRecord, ParseError> + Send + Sync + 'static,
    {
        Self::new(name, delimiter, mapper)
    }

    /// Tab-delimited VariSNP benign-variant catalog.
    pub fn varisnp() -> Self {
        Self::new("VariSNP", b'\t', VariSnpRowMapper)
    }
}

impl Extractor for DelimitedExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_records(&self, path: &Path) -> Result<Vec<VariantRecord>, ParseError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_path(path)?;
        let headers = reader.headers()?.clone();

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let row = Row {
                line,
                headers: &headers,
                record: &record,
            };
            records.push(self.mapper.map_row(&row)?);
        }
        Ok(records)
    }
}

/// Row mapping for the VariSNP catalog.
///
/// VariSNP lists benign dbSNP variants on GRCh38 with zero-based
/// coordinates. The chromosome is encoded in the RefSeq accession of the
/// first HGVS name (`NC_000023.11:g...` is chromosome X).
#[derive(Debug, Clone, Copy, Default)]
pub struct VariSnpRowMapper;

impl VariSnpRowMapper {
    fn chromosome(row: &Row<'_>) -> Result<Chromosome, ParseError> {
        let hgvs = row.get("hgvs_names")?;
        let name = hgvs.split(';').next().unwrap_or_default();
        let accession = name.split(':').next().unwrap_or_default();
        let code = accession
            .get(3..9)
            .and_then(|digits| digits.parse::<u32>().ok())
            .ok_or_else(|| {
                ParseError::malformed(
                    row.line(),
                    format!("can't read a chromosome number from HGVS name '{name}'"),
                )
            })?;
        Chromosome::from_code(code).ok_or_else(|| {
            ParseError::malformed(
                row.line(),
                format!("chromosome code {code} in '{name}' is outside 1-24"),
            )
        })
    }
}

impl RowMapper for VariSnpRowMapper {
    fn map_row(&self, row: &Row<'_>) -> Result<VariantRecord, ParseError> {
        let chromosome = Self::chromosome(row)?;
        let position = row
            .parse::<u64>("asn_to")?
            .checked_add(1)
            .ok_or_else(|| ParseError::malformed(row.line(), "asn_to overflows"))?;
        Ok(VariantRecord::new(
            chromosome.to_string(),
            position,
            row.get("reference_allele")?.to_ascii_uppercase(),
            row.get("minor_allele")?.to_ascii_uppercase(),
            PathogenicityClass::Benign,
            VariationType::Snp,
            ReferenceGenome::GRCh38,
        ))
    }
}
