use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::enums::RecordType;

/// A canonical health record — the normalized shape every mapped row
/// is forced into before it reaches the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    pub id: Uuid,
    pub account_id: Uuid,
    pub patient_id: Uuid,
    pub record_type: RecordType,
    /// Originating FHIR resource kind, e.g. "Condition".
    pub fhir_resource_type: String,
    /// The full mapped resource, retained verbatim for traceability.
    pub fhir_resource: Value,
    /// Ingestion channel tag, e.g. "epic_ehi".
    pub source_format: String,
    pub source_file_id: Option<Uuid>,
    pub effective_date: Option<NaiveDateTime>,
    pub effective_date_end: Option<NaiveDateTime>,
    pub status: Option<String>,
    pub category: Vec<String>,
    pub code_system: Option<String>,
    pub code_value: Option<String>,
    pub code_display: Option<String>,
    /// Short human-readable label; never empty.
    pub display_text: String,
    pub confidence_score: Option<f32>,
    pub ai_extracted: bool,
    pub is_duplicate: bool,
    pub deleted_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// A mapped row before the batch writer assigns identity and
/// lifecycle fields.
#[derive(Debug, Clone)]
pub struct MappedRecord {
    pub account_id: Uuid,
    pub patient_id: Uuid,
    pub record_type: RecordType,
    pub fhir_resource_type: String,
    pub fhir_resource: Value,
    pub source_format: String,
    pub source_file_id: Option<Uuid>,
    pub effective_date: Option<NaiveDateTime>,
    pub effective_date_end: Option<NaiveDateTime>,
    pub status: Option<String>,
    pub category: Vec<String>,
    pub code_system: Option<String>,
    pub code_value: Option<String>,
    pub code_display: Option<String>,
    pub display_text: String,
    pub confidence_score: Option<f32>,
    pub ai_extracted: bool,
}
