//! Table Mapper Registry.
//!
//! Each EHI export table gets one mapping strategy converting a raw
//! row into zero-or-one FHIR-shaped resource. The registry is a closed
//! lookup over the known table names — adding a table means adding a
//! mapper and a match arm, not runtime registration.

pub mod documents;
pub mod encounters;
pub mod medications;
pub mod problems;
pub mod results;

pub use documents::DocInformationMapper;
pub use encounters::PatEncMapper;
pub use medications::OrderMedMapper;
pub use problems::{MedicalHxMapper, ProblemListMapper};
pub use results::OrderResultsMapper;

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

/// One row of a tabular export, keyed by column header. Absent
/// columns are simply missing, not null-padded.
pub type RowFields = HashMap<String, String>;

/// Per-table mapping strategy.
pub trait TableMapper: Send + Sync {
    /// Map a single row to a FHIR-shaped resource.
    ///
    /// Returns `None` when the row lacks the minimum identifying field
    /// for its resource kind — never a partially-populated resource.
    fn to_fhir(&self, row: &RowFields) -> Option<Value>;
}

/// Resolve a mapper by table name (case-normalized).
pub fn mapper_for_table(table: &str) -> Option<&'static dyn TableMapper> {
    match table.to_uppercase().as_str() {
        "PROBLEM_LIST" | "PROBLEM_LIST_ALL" => Some(&ProblemListMapper),
        "MEDICAL_HX" => Some(&MedicalHxMapper),
        "ORDER_MED" => Some(&OrderMedMapper),
        "ORDER_RESULTS" => Some(&OrderResultsMapper),
        "PAT_ENC" => Some(&PatEncMapper),
        "DOC_INFORMATION" => Some(&DocInformationMapper),
        _ => None,
    }
}

/// Trimmed field lookup; missing fields read as empty.
pub(crate) fn field<'a>(row: &'a RowFields, key: &str) -> &'a str {
    row.get(key).map(|v| v.trim()).unwrap_or("")
}

const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %I:%M:%S %p",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

/// Parse an export date string like "5/21/2024 12:00:00 AM".
///
/// Tries each supported format in order; unparseable values yield
/// `None`, never an error.
pub fn parse_export_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Render a parsed date back into the resource's datetime form.
pub(crate) fn fhir_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
pub(crate) fn row_of(pairs: &[(&str, &str)]) -> RowFields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
