//! Pairwise similarity scoring for canonical records.
//!
//! An additive weighted rule set over a handful of signals, clamped
//! to 1.0. The weights are design constants, not tunable at call time.

use std::collections::{BTreeMap, HashSet};

use crate::models::HealthRecord;

const CODE_MATCH_WEIGHT: f64 = 0.4;
const TEXT_EXACT_WEIGHT: f64 = 0.3;
const TEXT_FUZZY_WEIGHT: f64 = 0.2;
const DATE_PROXIMITY_WEIGHT: f64 = 0.2;
const STATUS_MATCH_WEIGHT: f64 = 0.1;
const CROSS_SOURCE_WEIGHT: f64 = 0.1;

/// Fuzzy text fires only above this Jaccard similarity (strict).
const TEXT_FUZZY_THRESHOLD: f64 = 0.8;
const DATE_PROXIMITY_SECONDS: i64 = 86_400;

/// Outcome of comparing two records.
#[derive(Debug, Clone)]
pub struct Similarity {
    /// In [0, 1].
    pub score: f64,
    /// Which signals fired.
    pub reasons: BTreeMap<String, bool>,
}

/// Score two records of the same type for likely duplication.
///
/// Pure and symmetric: `compare_records(a, b)` equals
/// `compare_records(b, a)`.
pub fn compare_records(a: &HealthRecord, b: &HealthRecord) -> Similarity {
    let mut score = 0.0;
    let mut reasons = BTreeMap::new();

    // Same code is the strongest signal
    if let (Some(code_a), Some(code_b)) = (&a.code_value, &b.code_value) {
        if !code_a.is_empty() && code_a == code_b {
            score += CODE_MATCH_WEIGHT;
            reasons.insert("code_match".to_string(), true);
        }
    }

    if !a.display_text.is_empty() && !b.display_text.is_empty() {
        if a.display_text.to_lowercase() == b.display_text.to_lowercase() {
            score += TEXT_EXACT_WEIGHT;
            reasons.insert("text_exact_match".to_string(), true);
        } else if token_jaccard(&a.display_text, &b.display_text) > TEXT_FUZZY_THRESHOLD {
            score += TEXT_FUZZY_WEIGHT;
            reasons.insert("text_fuzzy_match".to_string(), true);
        }
    }

    if let (Some(date_a), Some(date_b)) = (a.effective_date, b.effective_date) {
        if (date_a - date_b).num_seconds().abs() < DATE_PROXIMITY_SECONDS {
            score += DATE_PROXIMITY_WEIGHT;
            reasons.insert("date_proximity".to_string(), true);
        }
    }

    if let (Some(status_a), Some(status_b)) = (&a.status, &b.status) {
        if !status_a.is_empty() && status_a == status_b {
            score += STATUS_MATCH_WEIGHT;
            reasons.insert("status_match".to_string(), true);
        }
    }

    // Two sources agreeing on the same fact beats one source
    // repeating itself
    if a.source_format != b.source_format {
        score += CROSS_SOURCE_WEIGHT;
        reasons.insert("cross_source".to_string(), true);
    }

    Similarity {
        score: score.min(1.0),
        reasons,
    }
}

/// Word-level set similarity: |intersection| / |union| over
/// lowercased whitespace-split tokens. 0 when either set is empty.
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let set_a: HashSet<&str> = a.split_whitespace().collect();
    let set_b: HashSet<&str> = b.split_whitespace().collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordType;
    use chrono::NaiveDate;
    use serde_json::json;
    use uuid::Uuid;

    fn record(label: &str) -> HealthRecord {
        HealthRecord {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            record_type: RecordType::Observation,
            fhir_resource_type: "Observation".into(),
            fhir_resource: json!({"resourceType": "Observation"}),
            source_format: "epic_ehi".into(),
            source_file_id: None,
            effective_date: None,
            effective_date_end: None,
            status: None,
            category: Vec::new(),
            code_system: None,
            code_value: None,
            code_display: None,
            display_text: label.into(),
            confidence_score: None,
            ai_extracted: false,
            is_duplicate: false,
            deleted_at: None,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    fn at(h: u32) -> Option<chrono::NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 4, 2).unwrap().and_hms_opt(h, 0, 0)
    }

    #[test]
    fn all_signals_clamp_to_one() {
        let mut a = record("Hemoglobin A1c");
        a.code_value = Some("4548-4".into());
        a.effective_date = at(8);
        a.status = Some("final".into());

        let mut b = record("HEMOGLOBIN A1C");
        b.code_value = Some("4548-4".into());
        b.effective_date = at(10);
        b.status = Some("final".into());

        let similarity = compare_records(&a, &b);
        // 0.4 + 0.3 + 0.2 + 0.1, same source so no cross_source
        assert!((similarity.score - 1.0).abs() < 1e-9);
        let fired: Vec<&str> = similarity.reasons.keys().map(String::as_str).collect();
        assert_eq!(
            fired,
            vec!["code_match", "date_proximity", "status_match", "text_exact_match"]
        );
    }

    #[test]
    fn oversum_clamps_exactly_to_one() {
        let mut a = record("Hemoglobin A1c");
        a.code_value = Some("4548-4".into());
        a.effective_date = at(8);
        a.status = Some("final".into());

        let mut b = record("hemoglobin a1c");
        b.code_value = Some("4548-4".into());
        b.effective_date = at(9);
        b.status = Some("final".into());
        b.source_format = "document_upload".into();

        let similarity = compare_records(&a, &b);
        assert_eq!(similarity.score, 1.0);
        assert!(similarity.reasons["cross_source"]);
    }

    #[test]
    fn scoring_is_symmetric() {
        let mut a = record("Lipid panel");
        a.code_value = Some("24331-1".into());
        a.effective_date = at(8);
        let mut b = record("Lipid panel fasting");
        b.effective_date = at(20);
        b.status = Some("final".into());

        let ab = compare_records(&a, &b);
        let ba = compare_records(&b, &a);
        assert_eq!(ab.score, ba.score);
        assert_eq!(ab.reasons, ba.reasons);
    }

    #[test]
    fn score_bounds_hold() {
        let pairs = [
            (record("x"), record("y")),
            (record("same text"), record("same text")),
        ];
        for (a, b) in &pairs {
            let s = compare_records(a, b).score;
            assert!((0.0..=1.0).contains(&s), "score {s}");
        }
    }

    #[test]
    fn exact_text_beats_fuzzy_branch() {
        let a = record("Basic metabolic panel");
        let b = record("BASIC METABOLIC PANEL");
        let similarity = compare_records(&a, &b);
        assert!(similarity.reasons.contains_key("text_exact_match"));
        assert!(!similarity.reasons.contains_key("text_fuzzy_match"));
    }

    #[test]
    fn jaccard_exactly_point_eight_does_not_fire() {
        // 4 shared tokens of 5 total: similarity exactly 0.8
        let a = record("alpha beta gamma delta");
        let b = record("alpha beta gamma delta epsilon");
        assert!((token_jaccard(&a.display_text, &b.display_text) - 0.8).abs() < 1e-12);

        let similarity = compare_records(&a, &b);
        assert!(!similarity.reasons.contains_key("text_fuzzy_match"));
        assert!(!similarity.reasons.contains_key("text_exact_match"));
        assert_eq!(similarity.score, 0.0);
    }

    #[test]
    fn jaccard_above_point_eight_fires() {
        // 5 shared tokens of 6 total: ~0.833
        let a = record("alpha beta gamma delta epsilon");
        let b = record("alpha beta gamma delta epsilon zeta");
        let similarity = compare_records(&a, &b);
        assert!(similarity.reasons.contains_key("text_fuzzy_match"));
        assert!((similarity.score - TEXT_FUZZY_WEIGHT).abs() < 1e-9);
    }

    #[test]
    fn date_proximity_respects_24h_window() {
        let mut a = record("x");
        let mut b = record("y");
        a.effective_date = NaiveDate::from_ymd_opt(2024, 4, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0);
        b.effective_date = NaiveDate::from_ymd_opt(2024, 4, 3)
            .unwrap()
            .and_hms_opt(0, 0, 0);
        // Exactly 24h apart — strict less-than, does not fire
        assert!(!compare_records(&a, &b)
            .reasons
            .contains_key("date_proximity"));

        b.effective_date = NaiveDate::from_ymd_opt(2024, 4, 2)
            .unwrap()
            .and_hms_opt(23, 59, 59);
        assert!(compare_records(&a, &b)
            .reasons
            .contains_key("date_proximity"));
    }

    #[test]
    fn empty_code_values_do_not_match() {
        let mut a = record("x");
        let mut b = record("y");
        a.code_value = Some(String::new());
        b.code_value = Some(String::new());
        assert!(!compare_records(&a, &b).reasons.contains_key("code_match"));
    }

    #[test]
    fn cross_source_signal_fires_alone() {
        let a = record("x");
        let mut b = record("y");
        b.source_format = "document_upload".into();
        let similarity = compare_records(&a, &b);
        assert!((similarity.score - CROSS_SOURCE_WEIGHT).abs() < 1e-9);
        assert!(similarity.reasons["cross_source"]);
    }

    #[test]
    fn jaccard_of_empty_strings_is_zero() {
        assert_eq!(token_jaccard("", ""), 0.0);
        assert_eq!(token_jaccard("word", ""), 0.0);
    }
}
