use serde_json::{json, Map, Value};

use super::{field, fhir_datetime, parse_export_date, RowFields, TableMapper};

/// Maps ORDER_MED rows to MedicationRequest resources.
pub struct OrderMedMapper;

impl TableMapper for OrderMedMapper {
    fn to_fhir(&self, row: &RowFields) -> Option<Value> {
        let description = field(row, "DESCRIPTION");
        if description.is_empty() {
            return None;
        }

        let ordering_date = parse_export_date(field(row, "ORDERING_DATE"));
        let start_date = parse_export_date(field(row, "START_DATE"));
        let end_date = parse_export_date(field(row, "END_DATE"));
        let status_raw = field(row, "ORDER_STATUS_C_NAME").to_lowercase();

        let status = if status_raw.contains("discontinu") || status_raw.contains("cancel") {
            "stopped"
        } else if status_raw.contains("complete") {
            "completed"
        } else {
            "active"
        };

        let mut resource = json!({
            "resourceType": "MedicationRequest",
            "status": status,
            "intent": "order",
            "medicationCodeableConcept": {"text": description},
        });

        if let Some(dt) = ordering_date {
            resource["authoredOn"] = json!(fhir_datetime(&dt));
        }

        if start_date.is_some() || end_date.is_some() {
            let mut period = Map::new();
            if let Some(dt) = start_date {
                period.insert("start".into(), json!(fhir_datetime(&dt)));
            }
            if let Some(dt) = end_date {
                period.insert("end".into(), json!(fhir_datetime(&dt)));
            }
            resource["period"] = Value::Object(period);
        }

        let sig = field(row, "SIG");
        let route = field(row, "MED_ROUTE_C_NAME");
        let freq = field(row, "HV_DISCR_FREQ_ID_FREQ_NAME");
        if !sig.is_empty() || !route.is_empty() || !freq.is_empty() {
            let mut dosage = Map::new();
            if !sig.is_empty() {
                dosage.insert("text".into(), json!(sig));
            }
            if !route.is_empty() {
                dosage.insert("route".into(), json!({"text": route}));
            }
            if !freq.is_empty() {
                dosage.insert("timing".into(), json!({"code": {"text": freq}}));
            }
            resource["dosageInstruction"] = json!([Value::Object(dosage)]);
        }

        let quantity = field(row, "QUANTITY");
        let refills = field(row, "REFILLS");
        if !quantity.is_empty() || !refills.is_empty() {
            let mut dispense = Map::new();
            if !quantity.is_empty() {
                dispense.insert("quantity".into(), json!({"value": quantity}));
            }
            if let Ok(n) = refills.parse::<i64>() {
                dispense.insert("numberOfRepeatsAllowed".into(), json!(n));
            }
            resource["dispenseRequest"] = Value::Object(dispense);
        }

        Some(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::super::row_of;
    use super::*;

    #[test]
    fn order_maps_to_medication_request() {
        let row = row_of(&[
            ("DESCRIPTION", "METFORMIN 500 MG TABLET"),
            ("ORDERING_DATE", "3/10/2024 09:00:00 AM"),
            ("START_DATE", "3/11/2024"),
            ("END_DATE", "9/11/2024"),
            ("ORDER_STATUS_C_NAME", "Sent"),
            ("SIG", "Take 1 tablet twice daily"),
            ("MED_ROUTE_C_NAME", "Oral"),
        ]);
        let resource = OrderMedMapper.to_fhir(&row).unwrap();
        assert_eq!(resource["resourceType"], "MedicationRequest");
        assert_eq!(resource["status"], "active");
        assert_eq!(
            resource["medicationCodeableConcept"]["text"],
            "METFORMIN 500 MG TABLET"
        );
        assert_eq!(resource["authoredOn"], "2024-03-10T09:00:00");
        assert_eq!(resource["period"]["start"], "2024-03-11T00:00:00");
        assert_eq!(resource["period"]["end"], "2024-09-11T00:00:00");
        assert_eq!(
            resource["dosageInstruction"][0]["text"],
            "Take 1 tablet twice daily"
        );
        assert_eq!(resource["dosageInstruction"][0]["route"]["text"], "Oral");
    }

    #[test]
    fn order_without_description_declines() {
        let row = row_of(&[("ORDERING_DATE", "3/10/2024"), ("ORDER_STATUS_C_NAME", "Sent")]);
        assert!(OrderMedMapper.to_fhir(&row).is_none());
    }

    #[test]
    fn discontinued_and_cancelled_map_to_stopped() {
        for status in ["Discontinued", "Canceled", "Cancelled by provider"] {
            let row = row_of(&[
                ("DESCRIPTION", "LISINOPRIL 10 MG TABLET"),
                ("ORDER_STATUS_C_NAME", status),
            ]);
            let resource = OrderMedMapper.to_fhir(&row).unwrap();
            assert_eq!(resource["status"], "stopped", "status {status}");
        }
    }

    #[test]
    fn completed_order_maps_to_completed() {
        let row = row_of(&[
            ("DESCRIPTION", "AMOXICILLIN 875 MG TABLET"),
            ("ORDER_STATUS_C_NAME", "Completed"),
        ]);
        let resource = OrderMedMapper.to_fhir(&row).unwrap();
        assert_eq!(resource["status"], "completed");
    }

    #[test]
    fn refills_parsed_leniently() {
        let row = row_of(&[
            ("DESCRIPTION", "ATORVASTATIN 20 MG TABLET"),
            ("QUANTITY", "90"),
            ("REFILLS", "three"),
        ]);
        let resource = OrderMedMapper.to_fhir(&row).unwrap();
        assert_eq!(resource["dispenseRequest"]["quantity"]["value"], "90");
        assert!(resource["dispenseRequest"]
            .get("numberOfRepeatsAllowed")
            .is_none());
    }
}
