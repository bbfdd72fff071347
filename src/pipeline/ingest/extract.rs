//! Resource Field Extractors.
//!
//! Pure functions that pull normalized columns out of a FHIR-shaped
//! resource, independent of which mapper produced it. Missing nested
//! keys always yield `None`/empty — never an error.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Field paths checked for the effective date, in priority order.
const EFFECTIVE_DATE_FIELDS: &[&[&str]] = &[
    &["effectiveDateTime"],
    &["date"],
    &["period", "start"],
    &["authoredOn"],
    &["onsetDateTime"],
];

const EFFECTIVE_DATE_END_FIELDS: &[&[&str]] = &[&["period", "end"], &["abatementDateTime"]];

fn str_at<'a>(resource: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut value = resource;
    for key in path {
        value = value.get(key)?;
    }
    value.as_str()
}

fn parse_fhir_datetime(value: &str) -> Option<NaiveDateTime> {
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// First present, parseable date among the resource's datetime fields.
pub fn effective_date(resource: &Value) -> Option<NaiveDateTime> {
    EFFECTIVE_DATE_FIELDS
        .iter()
        .find_map(|path| str_at(resource, path).and_then(parse_fhir_datetime))
}

pub fn effective_date_end(resource: &Value) -> Option<NaiveDateTime> {
    EFFECTIVE_DATE_END_FIELDS
        .iter()
        .find_map(|path| str_at(resource, path).and_then(parse_fhir_datetime))
}

/// The resource's own status-like field, if any.
pub fn status(resource: &Value) -> Option<String> {
    if let Some(s) = resource.get("status").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    // Conditions carry status under clinicalStatus
    resource
        .get("clinicalStatus")?
        .get("coding")?
        .get(0)?
        .get("code")?
        .as_str()
        .map(str::to_string)
}

/// Display text of every category coding, order-preserving.
pub fn categories(resource: &Value) -> Vec<String> {
    let mut tags = Vec::new();
    let Some(entries) = resource.get("category").and_then(Value::as_array) else {
        return tags;
    };
    for entry in entries {
        if let Some(codings) = entry.get("coding").and_then(Value::as_array) {
            for coding in codings {
                if let Some(display) = coding.get("display").and_then(Value::as_str) {
                    tags.push(display.to_string());
                }
            }
        }
        if let Some(text) = entry.get("text").and_then(Value::as_str) {
            tags.push(text.to_string());
        }
    }
    tags
}

/// Representative (system, code, display) triple from the resource's
/// primary code field. With no coding array at all, the display slot
/// falls back to the code field's free text.
pub fn coding(resource: &Value) -> (Option<String>, Option<String>, Option<String>) {
    let Some(code_field) = resource
        .get("code")
        .or_else(|| resource.get("medicationCodeableConcept"))
    else {
        return (None, None, None);
    };

    if let Some(first) = code_field
        .get("coding")
        .and_then(Value::as_array)
        .and_then(|codings| codings.first())
    {
        return (
            first.get("system").and_then(Value::as_str).map(str::to_string),
            first.get("code").and_then(Value::as_str).map(str::to_string),
            first.get("display").and_then(Value::as_str).map(str::to_string),
        );
    }

    (
        None,
        None,
        code_field.get("text").and_then(Value::as_str).map(str::to_string),
    )
}

/// Human-readable label fallback chain. Callers fall back to the
/// resource kind when every candidate is absent, so the stored label
/// is never empty.
pub fn display_text(resource: &Value) -> Option<String> {
    const CANDIDATES: &[&[&str]] = &[
        &["code", "text"],
        &["medicationCodeableConcept", "text"],
        &["type", "text"],
        &["description"],
    ];
    CANDIDATES.iter().find_map(|path| {
        str_at(resource, path)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn effective_date_prefers_explicit_datetime() {
        let resource = json!({
            "effectiveDateTime": "2024-04-02T08:30:00",
            "period": {"start": "2024-01-01T00:00:00"},
            "onsetDateTime": "2023-01-01T00:00:00",
        });
        assert_eq!(
            effective_date(&resource).unwrap().to_string(),
            "2024-04-02 08:30:00"
        );
    }

    #[test]
    fn effective_date_walks_priority_chain() {
        let resource = json!({"period": {"start": "2024-02-14T10:00:00"}});
        assert_eq!(
            effective_date(&resource).unwrap().to_string(),
            "2024-02-14 10:00:00"
        );

        let resource = json!({"onsetDateTime": "2024-05-21T00:00:00"});
        assert!(effective_date(&resource).is_some());

        let resource = json!({"code": {"text": "no dates here"}});
        assert!(effective_date(&resource).is_none());
    }

    #[test]
    fn invalid_candidate_falls_through_to_next() {
        let resource = json!({
            "effectiveDateTime": "garbage",
            "onsetDateTime": "2024-05-21T00:00:00",
        });
        assert_eq!(
            effective_date(&resource).unwrap().to_string(),
            "2024-05-21 00:00:00"
        );
    }

    #[test]
    fn date_only_values_parse_at_midnight() {
        let resource = json!({"effectiveDateTime": "2024-05-21"});
        assert_eq!(
            effective_date(&resource).unwrap().to_string(),
            "2024-05-21 00:00:00"
        );
    }

    #[test]
    fn end_date_from_period_or_abatement() {
        let resource = json!({"period": {"end": "2024-02-14T11:30:00"}});
        assert!(effective_date_end(&resource).is_some());

        let resource = json!({"abatementDateTime": "2024-06-01T00:00:00"});
        assert!(effective_date_end(&resource).is_some());

        assert!(effective_date_end(&json!({})).is_none());
    }

    #[test]
    fn status_reads_top_level_then_clinical_status() {
        assert_eq!(status(&json!({"status": "final"})).unwrap(), "final");

        let condition = json!({
            "clinicalStatus": {"coding": [{"code": "resolved"}]}
        });
        assert_eq!(status(&condition).unwrap(), "resolved");

        assert!(status(&json!({})).is_none());
        assert!(status(&json!({"clinicalStatus": {}})).is_none());
    }

    #[test]
    fn categories_collect_displays_and_text_in_order() {
        let resource = json!({
            "category": [
                {"coding": [{"code": "problem-list-item", "display": "Problem List Item"}]},
                {"text": "chronic"},
            ]
        });
        assert_eq!(categories(&resource), vec!["Problem List Item", "chronic"]);

        assert!(categories(&json!({})).is_empty());
    }

    #[test]
    fn coding_picks_first_entry() {
        let resource = json!({
            "code": {
                "text": "Hemoglobin A1c",
                "coding": [
                    {"system": "http://loinc.org", "code": "4548-4", "display": "HbA1c"},
                    {"system": "urn:other", "code": "X1"},
                ]
            }
        });
        let (system, code, display) = coding(&resource);
        assert_eq!(system.as_deref(), Some("http://loinc.org"));
        assert_eq!(code.as_deref(), Some("4548-4"));
        assert_eq!(display.as_deref(), Some("HbA1c"));
    }

    #[test]
    fn coding_falls_back_to_free_text() {
        let resource = json!({"code": {"text": "Essential hypertension"}});
        let (system, code, display) = coding(&resource);
        assert!(system.is_none());
        assert!(code.is_none());
        assert_eq!(display.as_deref(), Some("Essential hypertension"));

        assert_eq!(coding(&json!({})), (None, None, None));
    }

    #[test]
    fn coding_reads_medication_concept() {
        let resource = json!({
            "medicationCodeableConcept": {
                "coding": [{"system": "rxnorm", "code": "860975"}]
            }
        });
        let (_, code, _) = coding(&resource);
        assert_eq!(code.as_deref(), Some("860975"));
    }

    #[test]
    fn display_text_fallback_chain() {
        assert_eq!(
            display_text(&json!({"code": {"text": "Hypertension"}})).unwrap(),
            "Hypertension"
        );
        assert_eq!(
            display_text(&json!({"medicationCodeableConcept": {"text": "Metformin"}})).unwrap(),
            "Metformin"
        );
        assert_eq!(
            display_text(&json!({"type": {"text": "Discharge Summary"}})).unwrap(),
            "Discharge Summary"
        );
        assert_eq!(
            display_text(&json!({"description": "Outside records"})).unwrap(),
            "Outside records"
        );
        assert!(display_text(&json!({"code": {"text": ""}})).is_none());
        assert!(display_text(&json!({})).is_none());
    }
}
