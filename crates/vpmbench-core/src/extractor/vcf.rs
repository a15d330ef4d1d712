//! Variant Call Format extractors.
//!
//! Plain and gzip/BGZF-compressed VCF files are read with `noodles-vcf`.
//! File-level `##key=value` metadata supplies the reference genome, the INFO
//! column supplies the ground truth through a pluggable [`ClassResolver`].

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles_vcf as vcf;
use serde::{Deserialize, Serialize};

use super::error::ParseError;
use super::Extractor;
use crate::model::{
    Chromosome, PathogenicityClass, ReferenceGenome, VariantRecord, VariationType,
};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// What to do with a record that lists more than one ALT allele.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiAllelicPolicy {
    /// Fail extraction; inputs must be split into single-allele records first.
    #[default]
    Reject,
    /// Keep the first ALT allele and ignore the rest.
    FirstAllele,
}

/// One VCF data line, with the fields resolvers work on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcfRecord {
    /// 1-based line number in the decompressed file.
    pub line: u64,
    pub chrom: String,
    pub pos: u64,
    pub id: String,
    pub reference: String,
    /// Empty when ALT is `.`.
    pub alternates: Vec<String>,
    info: HashMap<String, String>,
}

impl VcfRecord {
    /// Raw INFO value for `key`; flags map to an empty string.
    pub fn info(&self, key: &str) -> Option<&str> {
        self.info.get(key).map(String::as_str)
    }

    fn from_record(line: u64, record: &vcf::Record) -> Result<Self, ParseError> {
        let pos = match record.variant_start() {
            Some(Ok(position)) => usize::from(position) as u64,
            Some(Err(e)) => return Err(ParseError::malformed(line, format!("POS: {e}"))),
            // POS 0 marks a telomere; validation rejects it as non-positive.
            None => 0,
        };
        let alternates = match field(&record.alternate_bases()) {
            "" | "." => Vec::new(),
            alt => alt.split(',').map(str::to_string).collect(),
        };
        let info = match field(&record.info()) {
            "" | "." => HashMap::new(),
            raw => raw
                .split(';')
                .filter(|entry| !entry.is_empty())
                .map(|entry| match entry.split_once('=') {
                    Some((key, value)) => (key.to_string(), value.to_string()),
                    None => (entry.to_string(), String::new()),
                })
                .collect(),
        };

        Ok(Self {
            line,
            chrom: field(&record.reference_sequence_name()).to_string(),
            pos,
            id: field(&record.ids()).to_string(),
            reference: field(&record.reference_bases()).to_string(),
            alternates,
            info,
        })
    }
}

/// Raw text of a lazily parsed record or header field.
fn field<T: AsRef<str> + ?Sized>(value: &T) -> &str {
    value.as_ref()
}

/// Derives the ground-truth class of a VCF record.
///
/// Any `Fn(&VcfRecord) -> Result<PathogenicityClass, ParseError>` closure is
/// a resolver.
pub trait ClassResolver: Send + Sync {
    fn resolve_class(&self, record: &VcfRecord) -> Result<PathogenicityClass, ParseError>;
}

impl<F> ClassResolver for F
where
    F: Fn(&VcfRecord) -> Result<PathogenicityClass, ParseError> + Send + Sync,
{
    fn resolve_class(&self, record: &VcfRecord) -> Result<PathogenicityClass, ParseError> {
        self(record)
    }
}

/// ClinVar convention: the first `INFO/CLNSIG` value, lower-cased.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClinVarClassResolver;

impl ClassResolver for ClinVarClassResolver {
    fn resolve_class(&self, record: &VcfRecord) -> Result<PathogenicityClass, ParseError> {
        let clnsig = record
            .info("CLNSIG")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ParseError::malformed(record.line, "missing INFO/CLNSIG"))?;
        let first = clnsig.split([',', '|']).next().unwrap_or(clnsig).trim();
        PathogenicityClass::resolve(&first.to_lowercase())
            .map_err(ParseError::resolution(record.line))
    }
}

/// Extractor for VCF files, plain or gzip/BGZF-compressed.
pub struct VcfExtractor {
    name: String,
    resolver: Box<dyn ClassResolver>,
    multi_allelic: MultiAllelicPolicy,
}

impl VcfExtractor {
    pub fn new(name: impl Into<String>, resolver: impl ClassResolver + 'static) -> Self {
        Self {
            name: name.into(),
            resolver: Box::new(resolver),
            multi_allelic: MultiAllelicPolicy::default(),
        }
    }

    /// ClinVar VCF releases.
    pub fn clinvar() -> Self {
        Self::new("ClinVar VCF", ClinVarClassResolver)
    }

    pub fn with_multi_allelic(mut self, policy: MultiAllelicPolicy) -> Self {
        self.multi_allelic = policy;
        self
    }

    fn alternate(&self, record: &VcfRecord) -> Result<String, ParseError> {
        match record.alternates.as_slice() {
            [] => Ok(String::new()),
            [only] => Ok(only.clone()),
            [first, ..] => match self.multi_allelic {
                MultiAllelicPolicy::FirstAllele => Ok(first.clone()),
                MultiAllelicPolicy::Reject => Err(ParseError::malformed(
                    record.line,
                    format!(
                        "multi-allelic ALT '{}' is not supported, split the record first",
                        record.alternates.join(",")
                    ),
                )),
            },
        }
    }

    fn to_canonical(
        &self,
        record: &VcfRecord,
        genome: ReferenceGenome,
    ) -> Result<VariantRecord, ParseError> {
        let reference = record.reference.to_ascii_uppercase();
        let alternate = self.alternate(record)?.to_ascii_uppercase();
        let class = self.resolver.resolve_class(record)?;
        let variation_type = VariationType::classify(&reference, &alternate);
        Ok(VariantRecord::new(
            Chromosome::normalize(&record.chrom),
            record.pos,
            reference,
            alternate,
            class,
            variation_type,
            genome,
        ))
    }
}

impl Extractor for VcfExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_records(&self, path: &Path) -> Result<Vec<VariantRecord>, ParseError> {
        let bytes = decompress(std::fs::read(path)?)?;
        // VCF headers in the wild are not always valid UTF-8; latin-1 maps
        // every byte to a char.
        let text: String = bytes.iter().map(|&b| b as char).collect();
        let header_end = header_line_count(&text)?;

        let mut reader = vcf::io::Reader::new(text.as_bytes());
        let header = reader.read_header().map_err(|e| {
            ParseError::malformed(header_end, format!("invalid VCF header: {e}"))
        })?;

        let mut genome: Option<ReferenceGenome> = None;
        let mut records = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let line_no = header_end + idx as u64 + 1;
            let record = result.map_err(|e| ParseError::malformed(line_no, e.to_string()))?;

            let genome = match genome {
                Some(genome) => genome,
                None => {
                    let raw = reference_metadata(&header).ok_or_else(|| {
                        ParseError::malformed(line_no, "missing ##reference header")
                    })?;
                    let resolved =
                        ReferenceGenome::resolve(raw).map_err(ParseError::resolution(line_no))?;
                    *genome.insert(resolved)
                }
            };

            let record = VcfRecord::from_record(line_no, &record)?;
            records.push(self.to_canonical(&record, genome)?);
        }
        Ok(records)
    }
}

/// Inflates gzip input; BGZF is multi-member gzip. Anything else passes through.
fn decompress(bytes: Vec<u8>) -> std::io::Result<Vec<u8>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes);
    }
    let mut inflated = Vec::new();
    MultiGzDecoder::new(bytes.as_slice()).read_to_end(&mut inflated)?;
    Ok(inflated)
}

/// Number of lines up to and including `#CHROM`, so record errors can name
/// their source line.
fn header_line_count(text: &str) -> Result<u64, ParseError> {
    for (idx, line) in text.lines().enumerate() {
        let line_no = idx as u64 + 1;
        if line.starts_with("#CHROM") {
            return Ok(line_no);
        }
        if !line.starts_with("##") {
            return Err(ParseError::malformed(line_no, "data line before #CHROM header"));
        }
    }
    Err(ParseError::malformed(0, "no #CHROM header line found"))
}

/// First `##reference=` value of the header.
fn reference_metadata(header: &vcf::Header) -> Option<&str> {
    header
        .other_records()
        .iter()
        .find(|(key, _)| field(*key) == "reference")
        .and_then(|(_, collection)| {
            if let vcf::header::record::value::Collection::Unstructured(values) = collection {
                values.first().map(String::as_str)
            } else {
                None
            }
        })
}
