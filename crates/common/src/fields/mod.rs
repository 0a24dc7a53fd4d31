//! Patent field catalogue
//!
//! [`PatentField`] names every user-editable patent column once; import
//! mappings, export column lists and API bodies all refer to it.

use crate::db::models::Patent;
use chrono::NaiveDate;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatentField {
    PatentNo,
    ApplicationNo,
    ApplicationDate,
    PublicationNo,
    PublicationDate,
    RegistrationNo,
    RegistrationDate,
    InventionTitle,
    Applicant,
    Inventor,
    Ipc,
    AbstractText,
    Claims,
    LegalStatus,
    EvaluationStatus,
    Memo,
}

impl PatentField {
    pub const ALL: [PatentField; 16] = [
        PatentField::PatentNo,
        PatentField::ApplicationNo,
        PatentField::ApplicationDate,
        PatentField::PublicationNo,
        PatentField::PublicationDate,
        PatentField::RegistrationNo,
        PatentField::RegistrationDate,
        PatentField::InventionTitle,
        PatentField::Applicant,
        PatentField::Inventor,
        PatentField::Ipc,
        PatentField::AbstractText,
        PatentField::Claims,
        PatentField::LegalStatus,
        PatentField::EvaluationStatus,
        PatentField::Memo,
    ];

    /// Fields of which a record needs at least one
    pub const IDENTIFIERS: [PatentField; 4] = [
        PatentField::PatentNo,
        PatentField::ApplicationNo,
        PatentField::PublicationNo,
        PatentField::RegistrationNo,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PatentField::PatentNo => "patentNo",
            PatentField::ApplicationNo => "applicationNo",
            PatentField::ApplicationDate => "applicationDate",
            PatentField::PublicationNo => "publicationNo",
            PatentField::PublicationDate => "publicationDate",
            PatentField::RegistrationNo => "registrationNo",
            PatentField::RegistrationDate => "registrationDate",
            PatentField::InventionTitle => "inventionTitle",
            PatentField::Applicant => "applicant",
            PatentField::Inventor => "inventor",
            PatentField::Ipc => "ipc",
            PatentField::AbstractText => "abstractText",
            PatentField::Claims => "claims",
            PatentField::LegalStatus => "legalStatus",
            PatentField::EvaluationStatus => "evaluationStatus",
            PatentField::Memo => "memo",
        }
    }

    /// Column heading used in exports
    pub fn label(self) -> &'static str {
        match self {
            PatentField::PatentNo => "特許番号",
            PatentField::ApplicationNo => "出願番号",
            PatentField::ApplicationDate => "出願日",
            PatentField::PublicationNo => "公開番号",
            PatentField::PublicationDate => "公開日",
            PatentField::RegistrationNo => "登録番号",
            PatentField::RegistrationDate => "登録日",
            PatentField::InventionTitle => "発明の名称",
            PatentField::Applicant => "出願人",
            PatentField::Inventor => "発明者",
            PatentField::Ipc => "IPC",
            PatentField::AbstractText => "要約",
            PatentField::Claims => "請求の範囲",
            PatentField::LegalStatus => "法的状態",
            PatentField::EvaluationStatus => "評価ステータス",
            PatentField::Memo => "メモ",
        }
    }

    pub fn is_date(self) -> bool {
        matches!(
            self,
            PatentField::ApplicationDate | PatentField::PublicationDate | PatentField::RegistrationDate
        )
    }
}

impl fmt::Display for PatentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PatentField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatentField::ALL
            .iter()
            .copied()
            .find(|f| f.key() == s)
            .ok_or_else(|| format!("unknown patent field: {}", s))
    }
}

/// Entry of the `GET /export/fields` catalogue
#[derive(Debug, Clone, Serialize)]
pub struct FieldInfo {
    pub key: &'static str,
    pub label: &'static str,
}

pub fn catalogue() -> Vec<FieldInfo> {
    PatentField::ALL
        .iter()
        .map(|f| FieldInfo {
            key: f.key(),
            label: f.label(),
        })
        .collect()
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4})\s*[-/.年]\s*(\d{1,2})\s*[-/.月]\s*(\d{1,2})\s*日?$")
            .expect("date pattern is valid")
    })
}

/// Accepts `2024-01-05`, `2024/1/5`, `2024.01.05`, `2024年1月5日` and `20240105`
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(raw, "%Y%m%d").ok();
    }
    let caps = date_pattern().captures(raw)?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let day = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Editable patent columns, all optional.
///
/// Used as the create/update request body and as the output of the import
/// row mapper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PatentFields {
    #[validate(length(max = 100))]
    pub patent_no: Option<String>,
    #[validate(length(max = 100))]
    pub application_no: Option<String>,
    pub application_date: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub publication_no: Option<String>,
    pub publication_date: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub registration_no: Option<String>,
    pub registration_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub invention_title: Option<String>,
    pub applicant: Option<String>,
    pub inventor: Option<String>,
    pub ipc: Option<String>,
    pub abstract_text: Option<String>,
    pub claims: Option<String>,
    pub legal_status: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub evaluation_status: Option<String>,
    pub memo: Option<String>,
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl PatentFields {
    pub fn has_identifier(&self) -> bool {
        non_blank(&self.patent_no)
            || non_blank(&self.application_no)
            || non_blank(&self.publication_no)
            || non_blank(&self.registration_no)
    }

    /// Date the reporting buckets are derived from
    pub fn classification_date(&self) -> Option<NaiveDate> {
        self.publication_date.or(self.application_date)
    }

    /// Assign one raw cell. Blank cells leave the field unset.
    pub fn set(&mut self, field: PatentField, raw: &str) -> Result<(), String> {
        let value = raw.trim();
        if value.is_empty() {
            return Ok(());
        }

        if field.is_date() {
            let date = parse_date(value)
                .ok_or_else(|| format!("{}: invalid date '{}'", field.label(), value))?;
            match field {
                PatentField::ApplicationDate => self.application_date = Some(date),
                PatentField::PublicationDate => self.publication_date = Some(date),
                _ => self.registration_date = Some(date),
            }
            return Ok(());
        }

        let text = Some(value.to_string());
        match field {
            PatentField::PatentNo => self.patent_no = text,
            PatentField::ApplicationNo => self.application_no = text,
            PatentField::PublicationNo => self.publication_no = text,
            PatentField::RegistrationNo => self.registration_no = text,
            PatentField::InventionTitle => self.invention_title = text,
            PatentField::Applicant => self.applicant = text,
            PatentField::Inventor => self.inventor = text,
            PatentField::Ipc => self.ipc = text,
            PatentField::AbstractText => self.abstract_text = text,
            PatentField::Claims => self.claims = text,
            PatentField::LegalStatus => self.legal_status = text,
            PatentField::EvaluationStatus => self.evaluation_status = text,
            PatentField::Memo => self.memo = text,
            PatentField::ApplicationDate | PatentField::PublicationDate | PatentField::RegistrationDate => {
                unreachable!("date fields handled above")
            }
        }
        Ok(())
    }
}

/// Export cell for one field of a stored patent
pub fn cell(patent: &Patent, field: PatentField) -> String {
    let date = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
    let text = |s: &Option<String>| s.clone().unwrap_or_default();
    match field {
        PatentField::PatentNo => text(&patent.patent_no),
        PatentField::ApplicationNo => text(&patent.application_no),
        PatentField::ApplicationDate => date(patent.application_date),
        PatentField::PublicationNo => text(&patent.publication_no),
        PatentField::PublicationDate => date(patent.publication_date),
        PatentField::RegistrationNo => text(&patent.registration_no),
        PatentField::RegistrationDate => date(patent.registration_date),
        PatentField::InventionTitle => text(&patent.invention_title),
        PatentField::Applicant => text(&patent.applicant),
        PatentField::Inventor => text(&patent.inventor),
        PatentField::Ipc => text(&patent.ipc),
        PatentField::AbstractText => text(&patent.abstract_text),
        PatentField::Claims => text(&patent.claims),
        PatentField::LegalStatus => text(&patent.legal_status),
        PatentField::EvaluationStatus => patent.evaluation_status.clone(),
        PatentField::Memo => text(&patent.memo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert_eq!(parse_date("2024-01-05"), expected);
        assert_eq!(parse_date("2024/1/5"), expected);
        assert_eq!(parse_date("2024.01.05"), expected);
        assert_eq!(parse_date("2024年1月5日"), expected);
        assert_eq!(parse_date("20240105"), expected);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_field_keys_roundtrip() {
        for field in PatentField::ALL {
            assert_eq!(field.key().parse::<PatentField>(), Ok(field));
        }
        assert!("title".parse::<PatentField>().is_err());
    }

    #[test]
    fn test_set_ignores_blank_and_rejects_bad_dates() {
        let mut fields = PatentFields::default();
        fields.set(PatentField::PatentNo, "  ").unwrap();
        assert!(!fields.has_identifier());

        fields.set(PatentField::ApplicationNo, " 2020-123456 ").unwrap();
        assert_eq!(fields.application_no.as_deref(), Some("2020-123456"));
        assert!(fields.has_identifier());

        let err = fields.set(PatentField::PublicationDate, "2020/13/01").unwrap_err();
        assert!(err.contains("公開日"));
    }

    #[test]
    fn test_classification_date_prefers_publication() {
        let mut fields = PatentFields {
            application_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            ..Default::default()
        };
        assert_eq!(fields.classification_date(), NaiveDate::from_ymd_opt(2020, 1, 1));
        fields.publication_date = NaiveDate::from_ymd_opt(2021, 7, 1);
        assert_eq!(fields.classification_date(), NaiveDate::from_ymd_opt(2021, 7, 1));
    }
}
