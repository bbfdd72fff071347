use serde_json::{json, Value};

use super::{field, fhir_datetime, parse_export_date, RowFields, TableMapper};

/// Maps PAT_ENC rows to Encounter resources.
pub struct PatEncMapper;

impl TableMapper for PatEncMapper {
    fn to_fhir(&self, row: &RowFields) -> Option<Value> {
        // An encounter without a contact date is not identifiable.
        let contact_date = parse_export_date(field(row, "CONTACT_DATE"))?;

        let status_raw = field(row, "APPT_STATUS_C_NAME").to_lowercase();
        let status = if status_raw.contains("complete") {
            "finished"
        } else if status_raw.contains("cancelled")
            || status_raw.contains("canceled")
            || status_raw.contains("no show")
        {
            "cancelled"
        } else if status_raw.contains("scheduled") {
            "planned"
        } else {
            "finished"
        };

        let fin_class = field(row, "FIN_CLASS_C_NAME").to_lowercase();
        let enc_class = if fin_class.contains("inpatient") {
            "IMP"
        } else if fin_class.contains("emergency") {
            "EMER"
        } else {
            "AMB"
        };

        let mut resource = json!({
            "resourceType": "Encounter",
            "status": status,
            "class": {"code": enc_class},
            "period": {"start": fhir_datetime(&contact_date)},
        });

        let dept = field(row, "DEPARTMENT_ID_EXTERNAL_NAME");
        if !dept.is_empty() {
            resource["location"] = json!([{"location": {"display": dept}}]);
        }

        let provider = field(row, "VISIT_PROV_ID_PROV_NAME");
        if !provider.is_empty() {
            let title = field(row, "VISIT_PROV_TITLE_NAME");
            let display = if title.is_empty() {
                provider.to_string()
            } else {
                format!("{provider}, {title}")
            };
            resource["participant"] = json!([{"individual": {"display": display}}]);
        }

        if let Some(discharge) = parse_export_date(field(row, "HOSP_DISCHRG_TIME")) {
            resource["period"]["end"] = json!(fhir_datetime(&discharge));
        }

        let reason = field(row, "CONTACT_COMMENT");
        if !reason.is_empty() {
            resource["reasonCode"] = json!([{"text": reason}]);
        }

        Some(resource)
    }
}
