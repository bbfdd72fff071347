use serde_json::{json, Value};

use super::{field, fhir_datetime, parse_export_date, RowFields, TableMapper};

/// Maps DOC_INFORMATION rows to DocumentReference resources.
pub struct DocInformationMapper;

impl TableMapper for DocInformationMapper {
    fn to_fhir(&self, row: &RowFields) -> Option<Value> {
        let doc_type = field(row, "DOC_INFO_TYPE_C_NAME");
        if doc_type.is_empty() {
            return None;
        }

        let doc_date = parse_export_date(field(row, "DOC_RECV_TIME"));
        let status_raw = field(row, "DOC_STAT_C_NAME").to_lowercase();

        let status = if status_raw.contains("inactive") || status_raw.contains("deleted") {
            "superseded"
        } else {
            "current"
        };

        let description = match field(row, "DOC_DESCR") {
            "" => doc_type,
            d => d,
        };

        let mut resource = json!({
            "resourceType": "DocumentReference",
            "status": status,
            "type": {"text": doc_type},
            "description": description,
        });

        if let Some(dt) = doc_date {
            resource["date"] = json!(fhir_datetime(&dt));
        }

        let author = field(row, "RECV_BY_USER_ID_NAME");
        if !author.is_empty() {
            resource["author"] = json!([{"display": author}]);
        }

        if field(row, "IS_SCANNED_YN") == "Y" {
            resource["category"] = json!([{"text": "scanned"}]);
        }

        Some(resource)
    }
}
