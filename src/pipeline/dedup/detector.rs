//! Duplicate Detector.
//!
//! Scans one patient's active records, scores every same-type pair,
//! and persists new candidates above the threshold. Re-runs are
//! idempotent: pairs already flagged are skipped, and the UNIQUE pair
//! index backs that up at the store level. Callers serialize detection
//! per patient — the existence check is not safe against a concurrent
//! run for the same patient.

use std::collections::BTreeMap;

use chrono::Local;
use rusqlite::Connection;
use uuid::Uuid;

use super::scorer::compare_records;
use super::DedupError;
use crate::db::repository;
use crate::models::{DedupCandidate, HealthRecord};

/// Minimum score for a pair to be flagged.
pub const SIMILARITY_THRESHOLD: f64 = 0.7;

/// Scan for duplicate records and persist new dedup candidates.
///
/// Returns the number of candidates created by this run.
pub fn detect_duplicates(
    conn: &mut Connection,
    account_id: &Uuid,
    patient_id: &Uuid,
) -> Result<usize, DedupError> {
    let records = repository::active_records_for_patient(conn, account_id, patient_id, true)?;
    if records.len() < 2 {
        return Ok(0);
    }

    // Only same-type pairs are comparable
    let mut by_type: BTreeMap<&str, Vec<&HealthRecord>> = BTreeMap::new();
    for record in &records {
        by_type
            .entry(record.record_type.as_str())
            .or_default()
            .push(record);
    }

    let mut candidates: Vec<DedupCandidate> = Vec::new();
    for group in by_type.values() {
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                let (a, b) = (group[i], group[j]);
                let similarity = compare_records(a, b);
                if similarity.score < SIMILARITY_THRESHOLD {
                    continue;
                }
                if repository::candidate_exists(conn, &a.id, &b.id)? {
                    continue;
                }
                candidates.push(DedupCandidate {
                    id: Uuid::new_v4(),
                    record_a_id: a.id,
                    record_b_id: b.id,
                    similarity_score: similarity.score,
                    match_reasons: similarity.reasons,
                    created_at: Local::now().naive_local(),
                });
            }
        }
    }

    let found = candidates.len();
    if found > 0 {
        let tx = conn
            .transaction()
            .map_err(crate::db::DatabaseError::from)?;
        for candidate in &candidates {
            repository::insert_candidate(&tx, candidate)?;
        }
        tx.commit().map_err(crate::db::DatabaseError::from)?;
    }

    tracing::info!(
        candidates = found,
        patient = %patient_id,
        "Duplicate detection complete"
    );
    Ok(found)
}
