//! CSV import: declarative column mapping and row mapper
//!
//! A [`ColumnMapping`] says which source column feeds which patent field.
//! [`map_rows`] applies it to every data row and never stops on a bad row;
//! each failure is reported with its file line (the header is line 1).

use crate::errors::{AppError, Result};
use crate::fields::{PatentField, PatentFields};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;

/// Target field → source column header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: BTreeMap<PatentField, String>,
}

impl ColumnMapping {
    pub fn new(columns: BTreeMap<PatentField, String>) -> Self {
        Self { columns }
    }

    /// Parse the multipart `mapping` part: `{ "patentNo": "特許番号", ... }`.
    /// Empty column names are dropped.
    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: HashMap<String, String> = serde_json::from_str(raw).map_err(|e| AppError::Validation {
            message: format!("mapping must be a JSON object of field to column: {}", e),
            field: Some("mapping".to_string()),
        })?;

        let mut columns = BTreeMap::new();
        for (key, column) in entries {
            let field: PatentField = key.parse().map_err(|message| AppError::Validation {
                message,
                field: Some("mapping".to_string()),
            })?;
            let column = column.trim();
            if !column.is_empty() {
                columns.insert(field, column.to_string());
            }
        }

        if columns.is_empty() {
            return Err(AppError::Validation {
                message: "mapping does not name any column".to_string(),
                field: Some("mapping".to_string()),
            });
        }

        Ok(Self { columns })
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Resolve header names to indices; every mapped column must be present.
    fn resolve(&self, headers: &csv::StringRecord) -> Result<Vec<(PatentField, usize)>> {
        let index: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().trim_start_matches('\u{feff}'), i))
            .collect();

        self.columns
            .iter()
            .map(|(field, column)| {
                index
                    .get(column.as_str())
                    .map(|i| (*field, *i))
                    .ok_or_else(|| AppError::Validation {
                        message: format!("column '{}' mapped to {} is not in the file header", column, field),
                        field: Some("mapping".to_string()),
                    })
            })
            .collect()
    }
}

/// One rejected row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based file line; the header is line 1
    pub row: usize,
    pub message: String,
}

/// Summary returned to the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub fn record_success(&mut self) {
        self.imported += 1;
    }

    pub fn record_failure(&mut self, row: usize, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(RowError {
            row,
            message: message.into(),
        });
    }
}

/// Rows that mapped cleanly, plus the partially filled report
#[derive(Debug, Default)]
pub struct MappedRows {
    pub rows: Vec<(usize, PatentFields)>,
    pub report: ImportReport,
}

/// Delimiter implied by the upload's extension
pub fn delimiter_for(extension: &str) -> u8 {
    if extension.eq_ignore_ascii_case("tsv") {
        b'\t'
    } else {
        b','
    }
}

/// Map every data row of `reader` through `mapping`.
///
/// Header problems fail the whole import; row problems are collected.
pub fn map_rows<R: Read>(reader: R, delimiter: u8, mapping: &ColumnMapping) -> Result<MappedRows> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(header_error)?.clone();
    let columns = mapping.resolve(&headers)?;

    let mut mapped = MappedRows::default();

    for (index, record) in csv_reader.records().enumerate() {
        let line = index + 2;

        let record = match record {
            Ok(record) => record,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => {
                mapped.report.record_failure(line, "row is not valid UTF-8");
                continue;
            }
            Err(e) => {
                mapped.report.record_failure(line, format!("unreadable row: {}", e));
                continue;
            }
        };

        match map_record(&record, &columns) {
            Ok(fields) => mapped.rows.push((line, fields)),
            Err(message) => mapped.report.record_failure(line, message),
        }
    }

    Ok(mapped)
}

/// The header row is client input; only I/O failures stay server errors
fn header_error(e: csv::Error) -> AppError {
    let message = match e.kind() {
        csv::ErrorKind::Io(_) => return e.into(),
        csv::ErrorKind::Utf8 { .. } => "file is not UTF-8 encoded; save the CSV as UTF-8".to_string(),
        _ => format!("unreadable header row: {}", e),
    };
    AppError::Validation {
        message,
        field: Some("file".to_string()),
    }
}

fn map_record(record: &csv::StringRecord, columns: &[(PatentField, usize)]) -> std::result::Result<PatentFields, String> {
    let mut fields = PatentFields::default();
    let mut problems = Vec::new();

    for (field, index) in columns {
        let raw = record.get(*index).unwrap_or("");
        if let Err(message) = fields.set(*field, raw) {
            problems.push(message);
        }
    }

    if !fields.has_identifier() {
        problems.push("row has none of patent no, application no, publication no, registration no".to_string());
    }

    if problems.is_empty() {
        Ok(fields)
    } else {
        Err(problems.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> ColumnMapping {
        ColumnMapping::from_json(
            r#"{"patentNo":"特許番号","applicationNo":"出願番号","applicationDate":"出願日","applicant":"出願人"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_bad_row_is_isolated() {
        let csv = "特許番号,出願番号,出願日,出願人\n\
                   P-1,2020-001,2020/01/10,Acme\n\
                   ,,2020/02/10,Nobody\n\
                   P-3,2020-003,2020年3月1日,Acme\n";

        let mapped = map_rows(csv.as_bytes(), b',', &mapping()).unwrap();

        assert_eq!(mapped.rows.len(), 2);
        assert_eq!(mapped.report.failed, 1);
        assert_eq!(mapped.report.errors.len(), 1);
        assert_eq!(mapped.report.errors[0].row, 3);
        assert_eq!(mapped.rows[0].0, 2);
        assert_eq!(mapped.rows[1].0, 4);
        assert_eq!(mapped.rows[1].1.applicant.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_shift_jis_header_is_rejected_as_input() {
        // 特許番号 in Shift_JIS
        let mut bytes = vec![0x93, 0xc1, 0x8b, 0x96, 0x94, 0xd4, 0x8d, 0x86];
        bytes.extend_from_slice(b"\nP-1\n");

        let err = map_rows(bytes.as_slice(), b',', &mapping()).unwrap_err();

        assert!(matches!(err, AppError::Validation { field: Some(ref f), .. } if f == "file"));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_non_utf8_row_is_row_error() {
        let mut bytes = "特許番号,出願番号,出願日,出願人\nP-1,,,\n".as_bytes().to_vec();
        bytes.extend_from_slice(&[0x93, 0xc1, b',', b',', b',', b'\n']);

        let mapped = map_rows(bytes.as_slice(), b',', &mapping()).unwrap();

        assert_eq!(mapped.rows.len(), 1);
        assert_eq!(mapped.report.errors[0].row, 3);
        assert_eq!(mapped.report.errors[0].message, "row is not valid UTF-8");
    }

    #[test]
    fn test_bad_date_reports_row() {
        let csv = "特許番号,出願番号,出願日,出願人\nP-1,,not a date,Acme\n";
        let mapped = map_rows(csv.as_bytes(), b',', &mapping()).unwrap();
        assert!(mapped.rows.is_empty());
        assert_eq!(mapped.report.errors[0].row, 2);
        assert!(mapped.report.errors[0].message.contains("出願日"));
    }

    #[test]
    fn test_missing_header_column_fails_whole_import() {
        let csv = "特許番号,出願人\nP-1,Acme\n";
        let err = map_rows(csv.as_bytes(), b',', &mapping()).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_bom_and_tabs() {
        let tsv = "\u{feff}特許番号\t出願番号\t出願日\t出願人\nP-9\t\t\tAcme\n";
        let mapped = map_rows(tsv.as_bytes(), delimiter_for("TSV"), &mapping()).unwrap();
        assert_eq!(mapped.rows.len(), 1);
        assert_eq!(mapped.rows[0].1.patent_no.as_deref(), Some("P-9"));
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let csv = "特許番号,出願番号,出願日,出願人\nP-1\n";
        let mapped = map_rows(csv.as_bytes(), b',', &mapping()).unwrap();
        assert_eq!(mapped.rows.len(), 1);
    }

    #[test]
    fn test_mapping_rejects_unknown_field() {
        let err = ColumnMapping::from_json(r#"{"colour":"色"}"#).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(ColumnMapping::from_json("[1,2]").is_err());
        assert!(ColumnMapping::from_json(r#"{"patentNo":" "}"#).is_err());
    }
}
