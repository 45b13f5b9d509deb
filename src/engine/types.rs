use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use crate::error::UploaderError;

/// Shared context passed in by the host, a JSON-compatible key-value store.
pub type Context = HashMap<String, serde_json::Value>;

/// Output returned by a node execution, merged into the host context.
pub type NodeOutput = HashMap<String, serde_json::Value>;

/// One input row. Field order is the order the host supplied it in.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Record field that carries the identifier in auto-discovery mode.
pub const IDENTIFIER_FIELD: &str = "io_id";

pub const NOT_FOUND_BRAND_GROUP_ID: &str = "NotFoundBrandGroupID";
pub const UNKNOWN_BRAND_NAME: &str = "Unknown Brand";

/// Brand-group primary key. Numeric in the lookup database, textual for the
/// not-found placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BrandGroupId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for BrandGroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrandGroupId::Number(n) => write!(f, "{}", n),
            BrandGroupId::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandGroup {
    pub id: BrandGroupId,
    pub name: String,
}

impl BrandGroup {
    /// Placeholder used for identifiers the lookup could not resolve.
    pub fn not_found() -> Self {
        Self {
            id: BrandGroupId::Text(NOT_FOUND_BRAND_GROUP_ID.to_string()),
            name: UNKNOWN_BRAND_NAME.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(&self.id, BrandGroupId::Text(id) if id == NOT_FOUND_BRAND_GROUP_ID)
    }
}

/// Which stage of the scraper produced the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadType {
    /// Fetcher/translator output, before processor rules. Carries one
    /// explicit identifier.
    Translated,
    /// Output after processor rules. Identifiers are discovered from records.
    Processed,
}

impl std::fmt::Display for UploadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadType::Translated => write!(f, "Translated"),
            UploadType::Processed => write!(f, "Processed"),
        }
    }
}

impl FromStr for UploadType {
    type Err = UploaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Translated" => Ok(UploadType::Translated),
            "Processed" => Ok(UploadType::Processed),
            other => Err(UploaderError::Configuration(format!(
                "Invalid upload type '{}'. Use 'Translated' or 'Processed'",
                other
            ))),
        }
    }
}

/// Reporting period used in destination keys, rendered `YYYY/MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Parse a `YYYY/MM` override. The month may be given without padding.
    pub fn parse(value: &str) -> Result<Self, UploaderError> {
        let invalid = || {
            UploaderError::Configuration(format!(
                "Invalid year/month override '{}' (expected YYYY/MM, e.g. 2025/11)",
                value
            ))
        };

        let (year, month) = value.trim().split_once('/').ok_or_else(invalid)?;
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }

    /// The calendar month before the one containing `today`.
    pub fn previous_month(today: NaiveDate) -> Self {
        if today.month() == 1 {
            Self {
                year: today.year() - 1,
                month: 12,
            }
        } else {
            Self {
                year: today.year(),
                month: today.month() - 1,
            }
        }
    }

    /// Use the override when one is given, otherwise the previous month in
    /// local time.
    pub fn resolve(override_value: Option<&str>) -> Result<Self, UploaderError> {
        match override_value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => Self::parse(value),
            None => Ok(Self::previous_month(Local::now().date_naive())),
        }
    }

    pub fn year_str(&self) -> String {
        self.year.to_string()
    }

    pub fn month_str(&self) -> String {
        format!("{:02}", self.month)
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{:02}", self.year, self.month)
    }
}

/// How the identifiers for one invocation were obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierMode {
    /// A single identifier supplied by the caller; every record belongs to it.
    Explicit(String),
    /// Distinct `io_id` values found in the records, in first-seen order.
    Discovered(Vec<String>),
}

impl IdentifierMode {
    /// Pick the mode for an upload type. Fails when no identifier can be
    /// determined, before any I/O happens.
    pub fn for_upload(
        upload_type: UploadType,
        explicit: Option<&str>,
        records: &[Record],
    ) -> Result<Self, UploaderError> {
        let mode = match upload_type {
            UploadType::Translated => match explicit.filter(|id| !id.trim().is_empty()) {
                Some(id) => IdentifierMode::Explicit(id.to_string()),
                None => IdentifierMode::Discovered(Vec::new()),
            },
            UploadType::Processed => IdentifierMode::Discovered(discover_identifiers(records)),
        };

        if mode.identifiers().is_empty() {
            return Err(UploaderError::Configuration(
                "No IO IDs found. For Translated, provide IO ID parameter. For Processed, ensure data contains io_id field."
                    .to_string(),
            ));
        }
        Ok(mode)
    }

    pub fn identifiers(&self) -> &[String] {
        match self {
            IdentifierMode::Explicit(id) => std::slice::from_ref(id),
            IdentifierMode::Discovered(ids) => ids,
        }
    }

    /// Records belonging to `identifier`, in input order.
    pub fn select<'a>(&self, identifier: &str, records: &'a [Record]) -> Vec<&'a Record> {
        match self {
            IdentifierMode::Explicit(_) => records.iter().collect(),
            IdentifierMode::Discovered(_) => records
                .iter()
                .filter(|record| record_identifier(record).as_deref() == Some(identifier))
                .collect(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IdentifierMode::Explicit(_) => "explicit",
            IdentifierMode::Discovered(_) => "auto_discovery",
        }
    }
}

/// Identifier carried by a record, if any. Empty strings and non-scalar
/// values do not count.
pub fn record_identifier(record: &Record) -> Option<String> {
    match record.get(IDENTIFIER_FIELD)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Whole-valued floats within `i64` range as integers, so `10.0` compares and
/// renders the same as `10`.
pub fn normalize_number(n: &serde_json::Number) -> serde_json::Number {
    match n.as_f64() {
        Some(f)
            if n.is_f64()
                && f.fract() == 0.0
                && f >= i64::MIN as f64
                && f < i64::MAX as f64 =>
        {
            serde_json::Number::from(f as i64)
        }
        _ => n.clone(),
    }
}

/// [`normalize_number`] applied to every number inside `value`.
pub fn normalize_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Number(n) => serde_json::Value::Number(normalize_number(n)),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(normalize_value).collect())
        }
        serde_json::Value::Object(fields) => serde_json::Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), normalize_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Distinct identifiers in order of first appearance.
pub fn discover_identifiers(records: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(record_identifier)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
