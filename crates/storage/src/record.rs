use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                $name(id)
            }
        }
    };
}

id_type!(
    /// Identifier of an observable symptom.
    SymptomId
);
id_type!(
    /// Identifier of a diagnosable disease.
    DiseaseId
);
id_type!(
    /// Identifier of an inference rule.
    RuleId
);

fn active() -> bool {
    true
}

/// An observable symptom as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomRecord {
    pub id: SymptomId,
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    /// Grouping shown to users when picking symptoms (leaf, stem, grain, ...).
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRecord {
    pub id: DiseaseId,
    pub name: String,
    #[serde(default)]
    pub disease_type: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
}

/// A rule associating a set of symptoms (its conditions) with a disease.
///
/// Conditions are stored separately as [`RuleConditionRecord`] rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: RuleId,
    pub disease_id: DiseaseId,
    /// Base certainty factor, conventionally in [-1.0, 1.0].
    pub certainty: f64,
    #[serde(default)]
    pub explanation: String,
    #[serde(default = "active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConditionRecord {
    pub rule_id: RuleId,
    pub symptom_id: SymptomId,
    #[serde(default = "active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentRecord {
    pub id: u32,
    pub disease_id: DiseaseId,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub treatment_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
}

impl TreatmentRecord {
    /// Short label for display: the method if present, else the treatment type.
    pub fn label(&self) -> &str {
        match self.method.as_deref() {
            Some(m) if !m.is_empty() => m,
            _ => &self.treatment_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreventionRecord {
    pub id: u32,
    pub disease_id: DiseaseId,
    #[serde(default)]
    pub prevention_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
}

/// Bulk-prefetch form of the whole knowledge catalog.
///
/// This is also the on-disk JSON format read by `JsonFileStore`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub symptoms: Vec<SymptomRecord>,
    #[serde(default)]
    pub diseases: Vec<DiseaseRecord>,
    #[serde(default)]
    pub rules: Vec<RuleRecord>,
    #[serde(default)]
    pub conditions: Vec<RuleConditionRecord>,
    #[serde(default)]
    pub treatments: Vec<TreatmentRecord>,
    #[serde(default)]
    pub preventions: Vec<PreventionRecord>,
}

impl Catalog {
    pub fn active_treatments(&self, disease_id: DiseaseId) -> Vec<TreatmentRecord> {
        let mut rows: Vec<_> = self
            .treatments
            .iter()
            .filter(|t| t.disease_id == disease_id && t.is_active)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.id);
        rows
    }

    pub fn active_preventions(&self, disease_id: DiseaseId) -> Vec<PreventionRecord> {
        let mut rows: Vec<_> = self
            .preventions
            .iter()
            .filter(|p| p.disease_id == disease_id && p.is_active)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.id);
        rows
    }
}

/// A persisted summary of one diagnosis.
///
/// Consumers store the winning disease, its certainty and the symptoms
/// that were selected; the full rule trace is not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    /// Assigned by the store on insert; 0 before that.
    #[serde(default)]
    pub id: u64,
    pub user_name: String,
    pub disease_id: DiseaseId,
    pub selected_symptoms: Vec<SymptomId>,
    /// Final certainty factor of the diagnosed disease.
    pub confidence: f64,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub recorded_at: String,
}
