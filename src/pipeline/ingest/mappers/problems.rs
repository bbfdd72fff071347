use serde_json::{json, Value};

use super::{field, fhir_datetime, parse_export_date, RowFields, TableMapper};

/// Maps PROBLEM_LIST rows to Condition resources.
pub struct ProblemListMapper;

impl TableMapper for ProblemListMapper {
    fn to_fhir(&self, row: &RowFields) -> Option<Value> {
        let dx_name = field(row, "DX_ID_DX_NAME");
        let description = match field(row, "DESCRIPTION") {
            "" => dx_name,
            d => d,
        };
        if description.is_empty() {
            return None;
        }

        let noted_date = parse_export_date(field(row, "NOTED_DATE"));
        let resolved_date = parse_export_date(field(row, "RESOLVED_DATE"));
        let status_raw = field(row, "PROBLEM_STATUS_C_NAME").to_lowercase();

        let clinical_status = if status_raw.contains("resolved") || resolved_date.is_some() {
            "resolved"
        } else if status_raw.contains("inactive") {
            "inactive"
        } else {
            "active"
        };

        let mut resource = json!({
            "resourceType": "Condition",
            "code": {"text": description},
            "clinicalStatus": {
                "coding": [{
                    "system": "http://terminology.hl7.org/CodeSystem/condition-clinical",
                    "code": clinical_status,
                }]
            },
            "category": [{
                "coding": [{
                    "system": "http://terminology.hl7.org/CodeSystem/condition-category",
                    "code": "problem-list-item",
                    "display": "Problem List Item",
                }]
            }],
        });

        if let Some(dt) = noted_date {
            resource["onsetDateTime"] = json!(fhir_datetime(&dt));
        }
        if let Some(dt) = resolved_date {
            resource["abatementDateTime"] = json!(fhir_datetime(&dt));
        }

        if field(row, "CHRONIC_YN") == "Y" {
            if let Some(categories) = resource["category"].as_array_mut() {
                categories.push(json!({"text": "chronic"}));
            }
        }

        let comment = field(row, "PROBLEM_CMT");
        if !comment.is_empty() {
            resource["note"] = json!([{"text": comment}]);
        }

        Some(resource)
    }
}

/// Maps MEDICAL_HX rows to Condition resources.
pub struct MedicalHxMapper;

impl TableMapper for MedicalHxMapper {
    fn to_fhir(&self, row: &RowFields) -> Option<Value> {
        let dx_name = field(row, "DX_ID_DX_NAME");
        if dx_name.is_empty() {
            return None;
        }

        let hx_date = parse_export_date(field(row, "MEDICAL_HX_DATE"));

        let mut resource = json!({
            "resourceType": "Condition",
            "code": {"text": dx_name},
            "clinicalStatus": {
                "coding": [{
                    "system": "http://terminology.hl7.org/CodeSystem/condition-clinical",
                    "code": "active",
                }]
            },
            "category": [{
                "coding": [{
                    "system": "http://terminology.hl7.org/CodeSystem/condition-category",
                    "code": "problem-list-item",
                }],
                "text": "Medical History",
            }],
        });

        if let Some(dt) = hx_date {
            resource["onsetDateTime"] = json!(fhir_datetime(&dt));
        }

        let annotation = field(row, "MED_HX_ANNOTATION");
        if !annotation.is_empty() {
            resource["note"] = json!([{"text": annotation}]);
        }

        Some(resource)
    }
}
