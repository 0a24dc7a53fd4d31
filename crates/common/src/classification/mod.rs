//! Reporting buckets derived from a patent date
//!
//! Every date maps to exactly three labels: calendar year, `YYYY/MM` and the
//! ISO-8601 week (`YYYY-Www`). A week belongs to the year holding its
//! Thursday, so late-December and early-January dates can land in the
//! neighbouring year.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationType {
    Year,
    Month,
    Week,
}

impl ClassificationType {
    pub const ALL: [ClassificationType; 3] = [
        ClassificationType::Year,
        ClassificationType::Month,
        ClassificationType::Week,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ClassificationType::Year => "year",
            ClassificationType::Month => "month",
            ClassificationType::Week => "week",
        }
    }
}

impl fmt::Display for ClassificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "year" => Ok(ClassificationType::Year),
            "month" => Ok(ClassificationType::Month),
            "week" => Ok(ClassificationType::Week),
            other => Err(format!("unknown classification type: {}", other)),
        }
    }
}

/// One (type, value) label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bucket {
    pub kind: ClassificationType,
    pub value: String,
}

pub fn year_label(date: NaiveDate) -> String {
    format!("{:04}", date.year())
}

pub fn month_label(date: NaiveDate) -> String {
    format!("{:04}/{:02}", date.year(), date.month())
}

/// `chrono`'s ISO week already applies the Thursday rule
pub fn week_label(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{:04}-W{:02}", week.year(), week.week())
}

/// Year, month and week buckets, in that order
pub fn classify(date: NaiveDate) -> [Bucket; 3] {
    [
        Bucket {
            kind: ClassificationType::Year,
            value: year_label(date),
        },
        Bucket {
            kind: ClassificationType::Month,
            value: month_label(date),
        },
        Bucket {
            kind: ClassificationType::Week,
            value: week_label(date),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_rolls_forward_into_next_year() {
        // Tuesday; that week's Thursday is 2025-01-02
        assert_eq!(week_label(date(2024, 12, 31)), "2025-W01");
        assert_eq!(year_label(date(2024, 12, 31)), "2024");
        assert_eq!(month_label(date(2024, 12, 31)), "2024/12");
    }

    #[test]
    fn test_week_rolls_back_into_previous_year() {
        // Sunday; that week's Thursday is 2022-12-29
        assert_eq!(week_label(date(2023, 1, 1)), "2022-W52");
    }

    #[test]
    fn test_week_53() {
        assert_eq!(week_label(date(2020, 12, 31)), "2020-W53");
        assert_eq!(week_label(date(2021, 1, 3)), "2020-W53");
        assert_eq!(week_label(date(2021, 1, 4)), "2021-W01");
    }

    #[test]
    fn test_zero_padding() {
        let buckets = classify(date(2024, 3, 5));
        assert_eq!(buckets[0].value, "2024");
        assert_eq!(buckets[1].value, "2024/03");
        assert_eq!(buckets[2].value, "2024-W10");
    }

    #[test]
    fn test_classify_is_deterministic() {
        let d = date(2022, 7, 15);
        assert_eq!(classify(d), classify(d));
        let kinds: Vec<_> = classify(d).iter().map(|b| b.kind).collect();
        assert_eq!(kinds, ClassificationType::ALL.to_vec());
    }

    #[test]
    fn test_type_parse() {
        assert_eq!("week".parse::<ClassificationType>(), Ok(ClassificationType::Week));
        assert!("quarter".parse::<ClassificationType>().is_err());
    }
}
