use serde_json::{json, Map, Value};

use super::{field, fhir_datetime, parse_export_date, RowFields, TableMapper};

/// Maps ORDER_RESULTS rows to Observation resources.
pub struct OrderResultsMapper;

impl TableMapper for OrderResultsMapper {
    fn to_fhir(&self, row: &RowFields) -> Option<Value> {
        let component_name = field(row, "COMPONENT_ID_NAME");
        if component_name.is_empty() {
            return None;
        }

        let result_date = parse_export_date(field(row, "RESULT_DATE"));
        let value = field(row, "ORD_VALUE");
        let num_value = field(row, "ORD_NUM_VALUE");
        let unit = field(row, "REFERENCE_UNIT");
        let ref_low = field(row, "REFERENCE_LOW");
        let ref_high = field(row, "REFERENCE_HIGH");
        let flag = field(row, "RESULT_FLAG_C_NAME");
        let status_raw = field(row, "RESULT_STATUS_C_NAME").to_lowercase();

        let status = if status_raw.contains("preliminary") {
            "preliminary"
        } else if status_raw.contains("corrected") {
            "corrected"
        } else {
            "final"
        };

        let mut resource = json!({
            "resourceType": "Observation",
            "status": status,
            "category": [{
                "coding": [{
                    "system": "http://terminology.hl7.org/CodeSystem/observation-category",
                    "code": "laboratory",
                    "display": "Laboratory",
                }]
            }],
            "code": {"text": component_name},
        });

        let loinc = field(row, "COMPON_LNC_ID_LNC_LONG_NAME");
        if !loinc.is_empty() {
            resource["code"]["coding"] =
                json!([{"system": "http://loinc.org", "display": loinc}]);
        }

        if let Some(dt) = result_date {
            resource["effectiveDateTime"] = json!(fhir_datetime(&dt));
        }

        if !num_value.is_empty() {
            match num_value.parse::<f64>() {
                Ok(n) => {
                    resource["valueQuantity"] = json!({"value": n, "unit": unit});
                }
                Err(_) => {
                    resource["valueString"] = json!(value);
                }
            }
        } else if !value.is_empty() {
            resource["valueString"] = json!(value);
        }

        if !ref_low.is_empty() || !ref_high.is_empty() {
            let mut range = Map::new();
            if let Ok(low) = ref_low.parse::<f64>() {
                range.insert("low".into(), json!({"value": low, "unit": unit}));
            }
            if let Ok(high) = ref_high.parse::<f64>() {
                range.insert("high".into(), json!({"value": high, "unit": unit}));
            }
            if !range.is_empty() {
                resource["referenceRange"] = json!([Value::Object(range)]);
            }
        }

        if !flag.is_empty() {
            let flag_lower = flag.to_lowercase();
            let interpretation = if flag_lower.contains("high") || flag_lower == "h" {
                "H"
            } else if flag_lower.contains("low") || flag_lower == "l" {
                "L"
            } else if flag_lower.contains("abnormal") {
                "A"
            } else {
                "N"
            };
            resource["interpretation"] = json!([{
                "coding": [{
                    "system": "http://terminology.hl7.org/CodeSystem/v3-ObservationInterpretation",
                    "code": interpretation,
                }]
            }]);
        }

        Some(resource)
    }
}
