//! Caller-facing views over an inference result.
//!
//! Nothing here performs inference. It ranks and formats conclusions,
//! joins catalog data (treatments, preventions) for a chosen disease, and
//! builds the summary record that callers persist as diagnosis history.

use serde::{Deserialize, Serialize};
use verdant_storage::{
    DiagnosisRecord, DiseaseId, DiseaseRecord, KnowledgeStore, PreventionRecord, SymptomId,
    TreatmentRecord,
};

use crate::engine::{FactSet, Inference};
use crate::error::EngineError;
use crate::knowledge::KnowledgeBase;
use crate::trace::TraceEntry;

/// One row of the ranked result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDiagnosis {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub disease_id: DiseaseId,
    pub disease_name: String,
    pub certainty: f64,
    /// Certainty as a percentage rounded to one decimal.
    pub certainty_percentage: f64,
    /// Explanation of the rule that contributed most.
    pub top_explanation: Option<String>,
    pub rules_fired: usize,
}

/// Certainty as a percentage with one decimal, e.g. 0.7634 -> 76.3.
pub fn certainty_percentage(cf: f64) -> f64 {
    (cf * 1000.0).round() / 10.0
}

/// Produce the ranked list in the order the engine ranked conclusions.
pub fn rank(inference: &Inference) -> Vec<RankedDiagnosis> {
    inference
        .conclusions
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let entries = inference.trace.entries(c.disease_id).unwrap_or_default();
            // Largest contribution wins; the earliest entry on a tie.
            let top = entries
                .iter()
                .fold(None, |best: Option<&TraceEntry>, e| match best {
                    Some(b) if b.contribution >= e.contribution => Some(b),
                    _ => Some(e),
                })
                .map(|e| e.explanation.clone())
                .filter(|s| !s.is_empty());
            RankedDiagnosis {
                rank: i + 1,
                disease_id: c.disease_id,
                disease_name: c.disease_name.clone(),
                certainty: c.certainty,
                certainty_percentage: certainty_percentage(c.certainty),
                top_explanation: top,
                rules_fired: c.contributing_rules.len(),
            }
        })
        .collect()
}

/// A disease together with what to do about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseReport {
    pub disease: DiseaseRecord,
    pub treatments: Vec<TreatmentRecord>,
    pub preventions: Vec<PreventionRecord>,
}

/// Resolve treatments and preventions for a disease known to `kb`.
pub async fn resolve_report<S>(
    kb: &KnowledgeBase,
    store: &S,
    disease_id: DiseaseId,
) -> Result<DiseaseReport, EngineError>
where
    S: KnowledgeStore + ?Sized,
{
    let disease = kb
        .disease(disease_id)
        .cloned()
        .ok_or(EngineError::UnknownDisease { disease_id })?;
    let treatments = store.list_treatments(disease_id).await?;
    let preventions = store.list_preventions(disease_id).await?;
    Ok(DiseaseReport {
        disease,
        treatments,
        preventions,
    })
}

/// Build the history summary for one ranked diagnosis.
///
/// The notes carry the names of the symptoms that matched rules for the
/// disease; the full trace is not persisted.
pub fn history_record(
    inference: &Inference,
    diagnosis: &RankedDiagnosis,
    facts: &FactSet,
    user_name: &str,
) -> DiagnosisRecord {
    let mut matched: Vec<String> = Vec::new();
    for entry in inference
        .trace
        .entries(diagnosis.disease_id)
        .unwrap_or_default()
    {
        for name in &entry.matched_symptom_names {
            if !matched.contains(name) {
                matched.push(name.clone());
            }
        }
    }

    let recorded_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());

    DiagnosisRecord {
        id: 0,
        user_name: user_name.to_string(),
        disease_id: diagnosis.disease_id,
        selected_symptoms: facts.iter().collect::<Vec<SymptomId>>(),
        confidence: diagnosis.certainty,
        notes: if matched.is_empty() {
            None
        } else {
            Some(format!("Matched: {}", matched.join(", ")))
        },
        status: "Completed".to_string(),
        recorded_at,
    }
}
