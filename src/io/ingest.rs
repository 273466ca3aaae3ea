//! CSV ingest and normalization.
//!
//! Turns a cleaned job-posting CSV into `Record`s that are safe to encode.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (input order is preserved)

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::Record;
use crate::error::AppError;

pub const TEXT_COLUMN: &str = "string";
pub const LOWER_COLUMN: &str = "target_l";
pub const UPPER_COLUMN: &str = "target_u";

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Summary stats about the records actually kept.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_records: usize,
    pub lower_min: f64,
    pub upper_max: f64,
    pub mean_width: f64,
}

/// Ingest output: records + stats + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub records: Vec<Record>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl IngestedData {
    /// Wrap records that did not come from a file (e.g. synthetic data).
    pub fn from_records(records: Vec<Record>) -> Result<Self, AppError> {
        let stats = compute_stats(&records)
            .ok_or_else(|| AppError::insufficient_data("No records to process."))?;
        let rows_read = records.len();
        Ok(Self {
            records,
            stats,
            row_errors: Vec::new(),
            rows_read,
        })
    }
}

/// Load records from the CSV at `path`.
pub fn load_records(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_records(file)
}

/// Load records from any CSV reader.
pub fn read_records<R: Read>(input: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let outcome = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, &header_map));
        match outcome {
            Ok(record) => records.push(record),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        tracing::warn!(
            skipped = row_errors.len(),
            rows_read,
            "some CSV rows were rejected during ingest"
        );
    }

    let stats = compute_stats(&records).ok_or_else(|| {
        AppError::insufficient_data("No valid rows remain after ingest.")
    })?;

    Ok(IngestedData {
        records,
        stats,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for name in [TEXT_COLUMN, LOWER_COLUMN, UPPER_COLUMN] {
        if !header_map.contains_key(name) {
            return Err(AppError::input(format!("Missing required column: `{name}`")));
        }
    }
    Ok(())
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<Record, String> {
    let text = normalize_text(get_required(record, header_map, TEXT_COLUMN)?);
    if text.is_empty() {
        return Err(format!("Empty `{TEXT_COLUMN}` value."));
    }

    let target_lower = parse_f64(get_required(record, header_map, LOWER_COLUMN)?, LOWER_COLUMN)?;
    let target_upper = parse_f64(get_required(record, header_map, UPPER_COLUMN)?, UPPER_COLUMN)?;
    if target_lower > target_upper {
        return Err(format!(
            "`{LOWER_COLUMN}` ({target_lower}) is greater than `{UPPER_COLUMN}` ({target_upper})."
        ));
    }

    Ok(Record {
        text,
        target_lower,
        target_upper,
    })
}

/// Collapse whitespace runs (newlines, tabs) into single spaces.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    let v = s
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{name}` value '{s}'."))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite `{name}` value."))
    }
}

fn compute_stats(records: &[Record]) -> Option<DatasetStats> {
    if records.is_empty() {
        return None;
    }

    let mut lower_min = f64::INFINITY;
    let mut upper_max = f64::NEG_INFINITY;
    let mut width_sum = 0.0;
    for r in records {
        lower_min = lower_min.min(r.target_lower);
        upper_max = upper_max.max(r.target_upper);
        width_sum += r.target_upper - r.target_lower;
    }

    Some(DatasetStats {
        n_records: records.len(),
        lower_min,
        upper_max,
        mean_width: width_sum / records.len() as f64,
    })
}
