use serde::{Deserialize, Serialize};

/// Canonical record classification.
///
/// A closed vocabulary for the FHIR resource kinds the pipeline knows
/// about; anything else is carried through as the lowercased kind
/// string so unmapped resources are stored, not rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum RecordType {
    Condition,
    Medication,
    Observation,
    Encounter,
    Document,
    Immunization,
    Procedure,
    Allergy,
    Other(String),
}

impl RecordType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Condition => "condition",
            Self::Medication => "medication",
            Self::Observation => "observation",
            Self::Encounter => "encounter",
            Self::Document => "document",
            Self::Immunization => "immunization",
            Self::Procedure => "procedure",
            Self::Allergy => "allergy",
            Self::Other(kind) => kind,
        }
    }

    /// Classify a FHIR resource kind (e.g. "MedicationRequest").
    pub fn from_fhir_kind(kind: &str) -> Self {
        match kind {
            "Condition" => Self::Condition,
            "MedicationRequest" => Self::Medication,
            "Observation" => Self::Observation,
            "Encounter" => Self::Encounter,
            "DocumentReference" => Self::Document,
            "Immunization" => Self::Immunization,
            "Procedure" => Self::Procedure,
            "AllergyIntolerance" => Self::Allergy,
            other => Self::Other(other.to_lowercase()),
        }
    }
}

impl From<String> for RecordType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "condition" => Self::Condition,
            "medication" => Self::Medication,
            "observation" => Self::Observation,
            "encounter" => Self::Encounter,
            "document" => Self::Document,
            "immunization" => Self::Immunization,
            "procedure" => Self::Procedure,
            "allergy" => Self::Allergy,
            _ => Self::Other(s),
        }
    }
}

impl From<RecordType> for String {
    fn from(t: RecordType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
