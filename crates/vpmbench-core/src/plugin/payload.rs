//! Wire format between the benchmark and isolated plugins.
//!
//! Input is a CSV file with header `UID,CHROM,POS,REF,ALT,TYPE,RG`, one row
//! per table record, UID being the zero-based row index. Output is one of
//!
//! - a JSON array of numbers,
//! - a headerless single column of numbers,
//! - CSV with a `score` column; an optional `UID` column restores row order.

use std::collections::HashMap;

use super::error::ExecutionFailure;
use crate::model::{CanonicalTable, CSV_COLUMNS};

pub const PAYLOAD_SCHEMA_VERSION: &str = "1";

pub const PAYLOAD_COLUMNS: [&str; 7] = CSV_COLUMNS;

/// Serialize `table` as the payload CSV.
pub fn encode_table(table: &CanonicalTable) -> Result<Vec<u8>, csv::Error> {
    table.to_csv()
}

/// Parse plugin output into one score per record.
///
/// `expected` is the table length; it is only used to validate `UID`s, the
/// length check itself belongs to the caller.
pub fn parse_scores(raw: &str, expected: usize) -> Result<Vec<f64>, ExecutionFailure> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<f64>>(trimmed)
            .map_err(|e| ExecutionFailure::InvalidOutput(format!("JSON scores: {e}")));
    }

    let first = trimmed.lines().next().unwrap_or_default();
    if first.trim().parse::<f64>().is_ok() {
        return parse_column(trimmed);
    }
    parse_csv(trimmed, expected)
}

fn parse_column(raw: &str) -> Result<Vec<f64>, ExecutionFailure> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(idx, line)| {
            line.parse::<f64>().map_err(|e| {
                ExecutionFailure::InvalidOutput(format!("line {}: '{line}': {e}", idx + 1))
            })
        })
        .collect()
}

fn parse_csv(raw: &str, expected: usize) -> Result<Vec<f64>, ExecutionFailure> {
    let invalid = |e: csv::Error| ExecutionFailure::InvalidOutput(format!("CSV scores: {e}"));

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());
    let headers = reader.headers().map_err(invalid)?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let score_idx = column("score").ok_or_else(|| {
        ExecutionFailure::InvalidOutput("output has a header but no 'score' column".to_string())
    })?;
    let uid_idx = column("UID");

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(invalid)?;
        let score_raw = field(&record, score_idx, idx + 1, "score")?;
        let score = score_raw.parse::<f64>().map_err(|e| {
            ExecutionFailure::InvalidOutput(format!("row {}: score '{score_raw}': {e}", idx + 1))
        })?;
        let uid = match uid_idx {
            Some(i) => {
                let uid_raw = field(&record, i, idx + 1, "UID")?;
                Some(uid_raw.parse::<usize>().map_err(|e| {
                    ExecutionFailure::InvalidOutput(format!(
                        "row {}: UID '{uid_raw}': {e}",
                        idx + 1
                    ))
                })?)
            }
            None => None,
        };
        rows.push((uid, score));
    }

    if uid_idx.is_none() {
        return Ok(rows.into_iter().map(|(_, score)| score).collect());
    }

    let mut by_uid: HashMap<usize, f64> = HashMap::with_capacity(rows.len());
    for (uid, score) in rows.into_iter().filter_map(|(uid, s)| uid.map(|u| (u, s))) {
        if uid >= expected {
            return Err(ExecutionFailure::InvalidOutput(format!(
                "UID {uid} is outside the payload (0..{expected})"
            )));
        }
        if by_uid.insert(uid, score).is_some() {
            return Err(ExecutionFailure::InvalidOutput(format!("duplicate UID {uid}")));
        }
    }
    // Missing UIDs surface as a length mismatch at the caller.
    let mut ordered: Vec<(usize, f64)> = by_uid.into_iter().collect();
    ordered.sort_by_key(|(uid, _)| *uid);
    Ok(ordered.into_iter().map(|(_, score)| score).collect())
}

fn field<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    row: usize,
    what: &str,
) -> Result<&'r str, ExecutionFailure> {
    record
        .get(idx)
        .ok_or_else(|| ExecutionFailure::InvalidOutput(format!("row {row}: missing {what}")))
}
