//! Bulk staff import from an uploaded CSV file.
//!
//! Every row is parsed and validated before anything is written. A batch
//! with a single bad row is rejected as a whole, and a batch that passes
//! validation is handed to the directory as one all-or-nothing upsert keyed
//! by `staff_id`.

use std::path::Path;

use chrono::{DateTime, Utc};
use csv::{ErrorKind, ReaderBuilder, StringRecord};
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::db::{StaffDirectory, StoreError};
use crate::models::staff::{clean_field, RecordStatus, StaffFields, StaffWrite, TaxIds};

pub const REQUIRED_COLUMNS: [&str; 2] = ["staff_id", "name"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const UNTERMINATED_QUOTE: &str = "quoted field is not terminated";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("File must be a CSV")]
    UnsupportedFormat,
    #[error("CSV parsing failed: {}", .0.join("; "))]
    Parse(Vec<String>),
    #[error("CSV file is empty")]
    EmptyInput,
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("Validation failed: {} row error(s)", .0.len())]
    ValidationFailed(Vec<String>),
    #[error("Failed to insert {attempted} staff records: {source}")]
    Store { attempted: usize, source: StoreError },
}

/// One validated data row.
#[derive(Debug, Clone, PartialEq)]
pub struct StaffRow {
    pub staff_id: String,
    pub name: String,
    pub department: Option<String>,
    pub tax_ids: TaxIds,
}

impl StaffRow {
    /// Same derivation as a single admin create: imported rows are always pending.
    fn into_write(self, now: DateTime<Utc>) -> StaffWrite {
        let fields = StaffFields {
            staff_id: self.staff_id,
            name: self.name,
            department: self.department,
            tax_ids: self.tax_ids,
            status: RecordStatus::Pending,
        };
        StaffWrite::derive(fields, None, now)
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub attempted: usize,
    pub applied: usize,
}

/// "Staff  ID " and "staff_id" name the same column.
pub fn normalize_header(header: &str) -> String {
    header
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

pub fn check_filename(filename: &str) -> Result<(), IngestError> {
    match Path::new(filename.trim()).extension() {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(()),
        _ => Err(IngestError::UnsupportedFormat),
    }
}

fn describe_parse_error(row: usize, err: &csv::Error) -> String {
    match err.kind() {
        ErrorKind::UnequalLengths { expected_len, len, .. } => {
            format!("Row {}: expected {} fields but found {}", row, expected_len, len)
        }
        ErrorKind::Utf8 { .. } => format!("Row {}: contains invalid UTF-8", row),
        _ => format!("Row {}: {}", row, err),
    }
}

/// The csv reader runs an open quote to end of input instead of failing, so
/// the swallowed line breaks end up inside a cell.
fn spans_lines(record: &StringRecord) -> bool {
    record
        .iter()
        .any(|field| field.contains(|c: char| c == '\n' || c == '\r'))
}

/// Parses and validates the whole file. Row numbers in messages count the
/// header as row 1, so the first data row is row 2.
pub fn parse_staff_csv(bytes: &[u8]) -> Result<Vec<StaffRow>, IngestError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);

    let header_record = reader
        .headers()
        .map_err(|err| IngestError::Parse(vec![describe_parse_error(1, &err)]))?
        .clone();
    if spans_lines(&header_record) {
        return Err(IngestError::Parse(vec![format!("Row 1: {}", UNTERMINATED_QUOTE)]));
    }
    let headers: Vec<String> = header_record.iter().map(normalize_header).collect();

    let mut records: Vec<StringRecord> = Vec::new();
    let mut parse_errors = Vec::new();
    for (index, result) in reader.records().enumerate() {
        match result {
            Ok(record) if spans_lines(&record) => {
                parse_errors.push(format!("Row {}: {}", index + 2, UNTERMINATED_QUOTE))
            }
            Ok(record) => records.push(record),
            Err(err) => parse_errors.push(describe_parse_error(index + 2, &err)),
        }
    }
    // An open quote on the last line leaves no line break behind, but it
    // does leave an odd number of quote characters.
    if parse_errors.is_empty() && bytes.iter().filter(|&&b| b == b'"').count() % 2 == 1 {
        parse_errors.push(format!("Row {}: {}", records.len() + 1, UNTERMINATED_QUOTE));
    }
    if !parse_errors.is_empty() {
        return Err(IngestError::Parse(parse_errors));
    }

    if records.is_empty() {
        return Err(IngestError::EmptyInput);
    }

    let column = |name: &str| headers.iter().position(|h| h == name);
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|&required| column(required).is_none())
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns(missing));
    }

    let (staff_id_col, name_col) = (column("staff_id"), column("name"));
    let department_col = column("department");
    let tin_col = column("national_tin");
    let fct_col = column("fct_irs_tax_id");
    let cell = |record: &StringRecord, col: Option<usize>| {
        clean_field(col.and_then(|c| record.get(c)))
    };

    let mut rows = Vec::with_capacity(records.len());
    let mut errors = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let row_number = index + 2;
        let Some(staff_id) = cell(record, staff_id_col) else {
            errors.push(format!("Row {}: staff_id is required", row_number));
            continue;
        };
        let Some(name) = cell(record, name_col) else {
            errors.push(format!("Row {}: name is required", row_number));
            continue;
        };
        rows.push(StaffRow {
            staff_id,
            name,
            department: cell(record, department_col),
            tax_ids: TaxIds {
                national_tin: cell(record, tin_col),
                fct_irs_tax_id: cell(record, fct_col),
            },
        });
    }

    if !errors.is_empty() {
        return Err(IngestError::ValidationFailed(errors));
    }
    Ok(rows)
}

pub async fn ingest(
    staff: &dyn StaffDirectory,
    bytes: &[u8],
    filename: &str,
    now: DateTime<Utc>,
) -> Result<IngestSummary, IngestError> {
    check_filename(filename)?;

    let rows = parse_staff_csv(bytes).map_err(|err| {
        warn!("Rejected staff upload {}: {}", filename, err);
        err
    })?;

    let writes: Vec<StaffWrite> = rows.into_iter().map(|row| row.into_write(now)).collect();
    let attempted = writes.len();
    let applied = staff
        .upsert_batch(&writes, now)
        .await
        .map_err(|source| IngestError::Store { attempted, source })?;

    info!("Imported {} of {} staff rows from {}", applied, attempted, filename);
    Ok(IngestSummary { attempted, applied })
}
