use chrono::Local;
use rusqlite::Connection;
use uuid::Uuid;

use super::IngestError;
use crate::db::repository;
use crate::models::{HealthRecord, MappedRecord};

/// Insert a batch of mapped records into the caller's open transaction.
///
/// Each record gets a fresh identity; the whole batch is validated up
/// front and rejected before any insert when a required field is
/// missing. Commit boundaries belong to the caller — pass the
/// `Transaction` (derefs to `Connection`) and commit after.
///
/// Returns the number of records added.
pub fn insert_batch(conn: &Connection, records: &[MappedRecord]) -> Result<usize, IngestError> {
    if records.is_empty() {
        return Ok(0);
    }

    for record in records {
        validate(record)?;
    }

    let now = Local::now().naive_local();
    for record in records {
        let canonical = HealthRecord {
            id: Uuid::new_v4(),
            account_id: record.account_id,
            patient_id: record.patient_id,
            record_type: record.record_type.clone(),
            fhir_resource_type: record.fhir_resource_type.clone(),
            fhir_resource: record.fhir_resource.clone(),
            source_format: record.source_format.clone(),
            source_file_id: record.source_file_id,
            effective_date: record.effective_date,
            effective_date_end: record.effective_date_end,
            status: record.status.clone(),
            category: record.category.clone(),
            code_system: record.code_system.clone(),
            code_value: record.code_value.clone(),
            code_display: record.code_display.clone(),
            display_text: record.display_text.clone(),
            confidence_score: record.confidence_score,
            ai_extracted: record.ai_extracted,
            is_duplicate: false,
            deleted_at: None,
            created_at: now,
        };
        repository::insert_record(conn, &canonical)?;
    }

    tracing::debug!(count = records.len(), "Bulk inserted records");
    Ok(records.len())
}

fn validate(record: &MappedRecord) -> Result<(), IngestError> {
    if record.display_text.trim().is_empty() {
        return Err(IngestError::Validation("display_text"));
    }
    if record.patient_id.is_nil() {
        return Err(IngestError::Validation("patient_id"));
    }
    if record.account_id.is_nil() {
        return Err(IngestError::Validation("account_id"));
    }
    Ok(())
}
