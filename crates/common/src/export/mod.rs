//! Patent export serialisation

use crate::db::models::Patent;
use crate::errors::{AppError, Result};
use crate::fields::{cell, PatentField};
use serde::{Deserialize, Serialize};

/// UTF-8 byte order mark so spreadsheet tools detect the encoding
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

/// Requested columns, or every field when none were named
pub fn resolve_fields(requested: Option<&[String]>) -> Result<Vec<PatentField>> {
    match requested {
        None => Ok(PatentField::ALL.to_vec()),
        Some([]) => Ok(PatentField::ALL.to_vec()),
        Some(keys) => keys
            .iter()
            .map(|k| {
                k.parse::<PatentField>().map_err(|message| AppError::Validation {
                    message,
                    field: Some("fields".to_string()),
                })
            })
            .collect(),
    }
}

/// CSV with a label header row
pub fn to_csv(patents: &[Patent], fields: &[PatentField]) -> Result<Vec<u8>> {
    let mut out = UTF8_BOM.to_vec();
    {
        let mut writer = csv::Writer::from_writer(&mut out);
        writer.write_record(fields.iter().map(|f| f.label()))?;
        for patent in patents {
            writer.write_record(fields.iter().map(|f| cell(patent, *f)))?;
        }
        writer.flush()?;
    }
    Ok(out)
}

/// One JSON object per patent keyed by field key
pub fn to_json(patents: &[Patent], fields: &[PatentField]) -> Vec<serde_json::Map<String, serde_json::Value>> {
    patents
        .iter()
        .map(|patent| {
            fields
                .iter()
                .map(|f| (f.key().to_string(), serde_json::Value::String(cell(patent, *f))))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn patent() -> Patent {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into();
        Patent {
            id: Uuid::from_u128(1),
            title_id: Uuid::from_u128(2),
            patent_no: Some("P-100".to_string()),
            application_no: None,
            application_date: NaiveDate::from_ymd_opt(2023, 4, 1),
            publication_no: None,
            publication_date: None,
            registration_no: None,
            registration_date: None,
            invention_title: Some("Widget, improved".to_string()),
            applicant: None,
            inventor: None,
            ipc: None,
            abstract_text: None,
            claims: None,
            legal_status: None,
            evaluation_status: "未評価".to_string(),
            memo: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_csv_has_bom_labels_and_quoting() {
        let requested = vec![
            "patentNo".to_string(),
            "applicationDate".to_string(),
            "inventionTitle".to_string(),
        ];
        let fields = resolve_fields(Some(requested.as_slice())).unwrap();
        let bytes = to_csv(&[patent()], &fields).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("特許番号,出願日,発明の名称"));
        assert_eq!(lines.next(), Some("P-100,2023-04-01,\"Widget, improved\""));
    }

    #[test]
    fn test_resolve_fields_defaults_and_rejects_unknown() {
        assert_eq!(resolve_fields(None).unwrap().len(), PatentField::ALL.len());
        let unknown = vec!["nope".to_string()];
        assert!(resolve_fields(Some(unknown.as_slice())).is_err());
    }

    #[test]
    fn test_json_rows() {
        let rows = to_json(&[patent()], &[PatentField::PatentNo, PatentField::EvaluationStatus]);
        assert_eq!(rows[0]["patentNo"], "P-100");
        assert_eq!(rows[0]["evaluationStatus"], "未評価");
    }
}
