use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection};
use uuid::Uuid;

use super::DatabaseError;
use crate::models::{DedupCandidate, HealthRecord, RecordFilter, RecordPage, RecordType};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const RECORD_COLUMNS: &str = "id, account_id, patient_id, record_type, fhir_resource_type, \
     fhir_resource, source_format, source_file_id, effective_date, effective_date_end, \
     status, category, code_system, code_value, code_display, display_text, \
     confidence_score, ai_extracted, is_duplicate, deleted_at, created_at";

fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

// ═══════════════════════════════════════════
// Health Record Repository
// ═══════════════════════════════════════════

/// Insert a single canonical record. Callers control the transaction
/// boundary — pass a `Transaction` (derefs to `Connection`) to batch.
pub fn insert_record(conn: &Connection, rec: &HealthRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO health_records (id, account_id, patient_id, record_type, fhir_resource_type,
         fhir_resource, source_format, source_file_id, effective_date, effective_date_end,
         status, category, code_system, code_value, code_display, display_text,
         confidence_score, ai_extracted, is_duplicate, deleted_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
        params![
            rec.id.to_string(),
            rec.account_id.to_string(),
            rec.patient_id.to_string(),
            rec.record_type.as_str(),
            rec.fhir_resource_type,
            serde_json::to_string(&rec.fhir_resource)?,
            rec.source_format,
            rec.source_file_id.map(|id| id.to_string()),
            rec.effective_date.as_ref().map(format_datetime),
            rec.effective_date_end.as_ref().map(format_datetime),
            rec.status,
            serde_json::to_string(&rec.category)?,
            rec.code_system,
            rec.code_value,
            rec.code_display,
            rec.display_text,
            rec.confidence_score,
            rec.ai_extracted as i32,
            rec.is_duplicate as i32,
            rec.deleted_at.as_ref().map(format_datetime),
            format_datetime(&rec.created_at),
        ],
    )?;
    Ok(())
}

/// Fetch one record scoped to its owning account.
pub fn get_record(
    conn: &Connection,
    account_id: &Uuid,
    id: &Uuid,
) -> Result<Option<HealthRecord>, DatabaseError> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM health_records
         WHERE id = ?1 AND account_id = ?2 AND deleted_at IS NULL"
    );
    let mut stmt = conn.prepare(&sql)?;
    let result = stmt.query_row(params![id.to_string(), account_id.to_string()], read_row);

    match result {
        Ok(row) => Ok(Some(record_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All records for a patient that are neither soft-deleted nor flagged
/// duplicate, ordered by effective date with dateless records last.
pub fn active_records_for_patient(
    conn: &Connection,
    account_id: &Uuid,
    patient_id: &Uuid,
    ascending: bool,
) -> Result<Vec<HealthRecord>, DatabaseError> {
    let direction = if ascending { "ASC" } else { "DESC" };
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM health_records
         WHERE account_id = ?1 AND patient_id = ?2
           AND deleted_at IS NULL AND is_duplicate = 0
         ORDER BY effective_date {direction} NULLS LAST"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![account_id.to_string(), patient_id.to_string()],
        read_row,
    )?;

    let mut records = Vec::new();
    for row in rows {
        records.push(record_from_row(row?)?);
    }
    Ok(records)
}

/// Paginated listing with optional type/category/search filters.
pub fn list_records(
    conn: &Connection,
    account_id: &Uuid,
    filter: &RecordFilter,
) -> Result<RecordPage, DatabaseError> {
    let mut where_sql =
        String::from("account_id = ?1 AND deleted_at IS NULL AND is_duplicate = 0");
    let mut args: Vec<String> = vec![account_id.to_string()];

    if let Some(record_type) = &filter.record_type {
        args.push(record_type.clone());
        where_sql.push_str(&format!(" AND record_type = ?{}", args.len()));
    }
    if let Some(category) = &filter.category {
        // category is stored as a JSON array of tags
        args.push(format!("%\"{category}\"%"));
        where_sql.push_str(&format!(" AND category LIKE ?{}", args.len()));
    }
    if let Some(search) = &filter.search {
        args.push(format!("%{search}%"));
        let n = args.len();
        where_sql.push_str(&format!(
            " AND (display_text LIKE ?{n} OR code_display LIKE ?{n})"
        ));
    }

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM health_records WHERE {where_sql}"),
        params_from_iter(args.iter()),
        |row| row.get(0),
    )?;

    let page = filter.page.max(1);
    let offset = (page - 1) * filter.page_size;
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM health_records WHERE {where_sql}
         ORDER BY effective_date DESC NULLS LAST
         LIMIT {} OFFSET {}",
        filter.page_size, offset
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter()), read_row)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(record_from_row(row?)?);
    }

    Ok(RecordPage {
        items,
        total: total as usize,
        page,
        page_size: filter.page_size,
    })
}

/// Substring search over display_text / code_display, newest first.
pub fn search_records(
    conn: &Connection,
    account_id: &Uuid,
    query: &str,
) -> Result<Vec<HealthRecord>, DatabaseError> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM health_records
         WHERE account_id = ?1 AND deleted_at IS NULL
           AND (display_text LIKE ?2 OR code_display LIKE ?2)
         ORDER BY effective_date DESC NULLS LAST
         LIMIT 50"
    );
    let mut stmt = conn.prepare(&sql)?;
    let pattern = format!("%{query}%");
    let rows = stmt.query_map(params![account_id.to_string(), pattern], read_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(record_from_row(row?)?);
    }
    Ok(records)
}

/// Soft-delete a record, scoped to its owning account.
pub fn soft_delete_record(
    conn: &Connection,
    account_id: &Uuid,
    id: &Uuid,
    deleted_at: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE health_records SET deleted_at = ?1
         WHERE id = ?2 AND account_id = ?3 AND deleted_at IS NULL",
        params![
            format_datetime(&deleted_at),
            id.to_string(),
            account_id.to_string()
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "health_record".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for HealthRecord mapping
struct HealthRecordRow {
    id: String,
    account_id: String,
    patient_id: String,
    record_type: String,
    fhir_resource_type: String,
    fhir_resource: String,
    source_format: String,
    source_file_id: Option<String>,
    effective_date: Option<String>,
    effective_date_end: Option<String>,
    status: Option<String>,
    category: String,
    code_system: Option<String>,
    code_value: Option<String>,
    code_display: Option<String>,
    display_text: String,
    confidence_score: Option<f32>,
    ai_extracted: i32,
    is_duplicate: i32,
    deleted_at: Option<String>,
    created_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HealthRecordRow> {
    Ok(HealthRecordRow {
        id: row.get(0)?,
        account_id: row.get(1)?,
        patient_id: row.get(2)?,
        record_type: row.get(3)?,
        fhir_resource_type: row.get(4)?,
        fhir_resource: row.get(5)?,
        source_format: row.get(6)?,
        source_file_id: row.get(7)?,
        effective_date: row.get(8)?,
        effective_date_end: row.get(9)?,
        status: row.get(10)?,
        category: row.get(11)?,
        code_system: row.get(12)?,
        code_value: row.get(13)?,
        code_display: row.get(14)?,
        display_text: row.get(15)?,
        confidence_score: row.get(16)?,
        ai_extracted: row.get(17)?,
        is_duplicate: row.get(18)?,
        deleted_at: row.get(19)?,
        created_at: row.get(20)?,
    })
}

fn record_from_row(row: HealthRecordRow) -> Result<HealthRecord, DatabaseError> {
    Ok(HealthRecord {
        id: parse_uuid(&row.id)?,
        account_id: parse_uuid(&row.account_id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        record_type: RecordType::from(row.record_type),
        fhir_resource_type: row.fhir_resource_type,
        fhir_resource: serde_json::from_str(&row.fhir_resource)?,
        source_format: row.source_format,
        source_file_id: row.source_file_id.and_then(|s| Uuid::parse_str(&s).ok()),
        effective_date: row.effective_date.as_deref().and_then(parse_datetime),
        effective_date_end: row.effective_date_end.as_deref().and_then(parse_datetime),
        status: row.status,
        category: serde_json::from_str(&row.category)?,
        code_system: row.code_system,
        code_value: row.code_value,
        code_display: row.code_display,
        display_text: row.display_text,
        confidence_score: row.confidence_score,
        ai_extracted: row.ai_extracted != 0,
        is_duplicate: row.is_duplicate != 0,
        deleted_at: row.deleted_at.as_deref().and_then(parse_datetime),
        created_at: parse_datetime(&row.created_at).unwrap_or_default(),
    })
}

// ═══════════════════════════════════════════
// Dedup Candidate Repository
// ═══════════════════════════════════════════

pub fn insert_candidate(conn: &Connection, cand: &DedupCandidate) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO dedup_candidates (id, record_a_id, record_b_id, similarity_score,
         match_reasons, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            cand.id.to_string(),
            cand.record_a_id.to_string(),
            cand.record_b_id.to_string(),
            cand.similarity_score,
            serde_json::to_string(&cand.match_reasons)?,
            format_datetime(&cand.created_at),
        ],
    )?;
    Ok(())
}

/// Whether a candidate already exists for this exact ordered pair.
pub fn candidate_exists(
    conn: &Connection,
    record_a_id: &Uuid,
    record_b_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM dedup_candidates WHERE record_a_id = ?1 AND record_b_id = ?2)",
        params![record_a_id.to_string(), record_b_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists != 0)
}

pub fn get_candidate(
    conn: &Connection,
    record_a_id: &Uuid,
    record_b_id: &Uuid,
) -> Result<Option<DedupCandidate>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, record_a_id, record_b_id, similarity_score, match_reasons, created_at
         FROM dedup_candidates WHERE record_a_id = ?1 AND record_b_id = ?2",
    )?;
    let result = stmt.query_row(
        params![record_a_id.to_string(), record_b_id.to_string()],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        },
    );

    match result {
        Ok((id, a, b, score, reasons, created_at)) => Ok(Some(DedupCandidate {
            id: parse_uuid(&id)?,
            record_a_id: parse_uuid(&a)?,
            record_b_id: parse_uuid(&b)?,
            similarity_score: score,
            match_reasons: serde_json::from_str(&reasons)?,
            created_at: parse_datetime(&created_at).unwrap_or_default(),
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
