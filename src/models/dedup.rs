use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted, scored claim that two records may describe the same
/// real-world fact. Created by the duplicate detector, never mutated
/// by it; review tooling acts on it downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupCandidate {
    pub id: Uuid,
    pub record_a_id: Uuid,
    pub record_b_id: Uuid,
    /// In [0, 1].
    pub similarity_score: f64,
    /// Named signals that fired, e.g. "code_match" → true.
    pub match_reasons: BTreeMap<String, bool>,
    pub created_at: NaiveDateTime,
}
