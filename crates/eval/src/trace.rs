//! Per-disease rule traces and their replay.
//!
//! Every time a rule contributes to a disease, the engine appends a
//! `TraceEntry` holding the contribution and the certainty before and
//! after combining it. Replaying `combine` over the contributions, in
//! trace order, reproduces each stored `cf_after` exactly.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use verdant_storage::{DiseaseId, RuleId, SymptomId};

use crate::certainty::Combination;
use crate::error::EngineError;

/// One rule firing for one disease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub rule_id: RuleId,
    pub matched_symptoms: Vec<SymptomId>,
    pub matched_symptom_names: Vec<String>,
    /// Number of conditions on the rule, matched or not.
    pub conditions_total: usize,
    /// The rule's base certainty before match weighting.
    pub rule_certainty: f64,
    /// What the rule actually contributed after match weighting.
    pub contribution: f64,
    pub cf_before: f64,
    pub cf_after: f64,
    pub explanation: String,
}

/// Ordered trace entries per disease.
///
/// Serializes as a JSON object keyed by disease id so that callers can
/// keep it in a session store between diagnosis and explanation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace(BTreeMap<DiseaseId, Vec<TraceEntry>>);

impl Trace {
    pub fn new() -> Self {
        Trace(BTreeMap::new())
    }

    /// Append an entry to a disease's trace.
    pub fn record(&mut self, disease_id: DiseaseId, entry: TraceEntry) {
        self.0.entry(disease_id).or_default().push(entry);
    }

    pub fn entries(&self, disease_id: DiseaseId) -> Option<&[TraceEntry]> {
        self.0.get(&disease_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Look up the ordered trace entries for a disease.
///
/// Returns `EngineError::NotInTrace` when no rule fired for the disease,
/// which is distinct from a disease that was investigated and ended with
/// low or zero certainty.
pub fn explain(disease_id: DiseaseId, trace: &Trace) -> Result<&[TraceEntry], EngineError> {
    match trace.entries(disease_id) {
        Some(entries) if !entries.is_empty() => Ok(entries),
        _ => Err(EngineError::NotInTrace { disease_id }),
    }
}

/// One recomputed step of an explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationStep {
    pub rule_id: RuleId,
    pub contribution: f64,
    pub cf_before: f64,
    pub cf_after: f64,
    /// `cf_after` as stored in the trace, for comparison with the replay.
    pub recorded_cf_after: f64,
    pub matched_symptom_names: Vec<String>,
    pub conditions_total: usize,
    pub explanation: String,
}

/// A replayed explanation of how a disease reached its certainty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub disease_id: DiseaseId,
    pub combination: Combination,
    pub certainty: f64,
    pub steps: Vec<ExplanationStep>,
}

impl Explanation {
    /// Recompute the certainty path from contributions alone.
    pub fn replay(disease_id: DiseaseId, entries: &[TraceEntry], combination: Combination) -> Self {
        let mut cf = 0.0;
        let steps = entries
            .iter()
            .map(|entry| {
                let before = cf;
                cf = combination.apply(cf, entry.contribution);
                ExplanationStep {
                    rule_id: entry.rule_id,
                    contribution: entry.contribution,
                    cf_before: before,
                    cf_after: cf,
                    recorded_cf_after: entry.cf_after,
                    matched_symptom_names: entry.matched_symptom_names.clone(),
                    conditions_total: entry.conditions_total,
                    explanation: entry.explanation.clone(),
                }
            })
            .collect();
        Explanation {
            disease_id,
            combination,
            certainty: cf,
            steps,
        }
    }

    /// True when every replayed step reproduces the stored value exactly.
    pub fn is_consistent(&self) -> bool {
        self.steps
            .iter()
            .all(|s| s.cf_after.to_bits() == s.recorded_cf_after.to_bits())
    }

    /// Human-readable cause-and-effect log. Values are shown to three
    /// decimals.
    pub fn render(&self, disease_name: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} (#{}): certainty {:.3} via {} rule(s), {} combination",
            disease_name,
            self.disease_id,
            self.certainty,
            self.steps.len(),
            self.combination.name()
        );
        for (i, step) in self.steps.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. rule {} matched {}/{} [{}]: contributes {:.3}, certainty {:.3} -> {:.3}",
                i + 1,
                step.rule_id,
                step.matched_symptom_names.len(),
                step.conditions_total,
                step.matched_symptom_names.join(", "),
                step.contribution,
                step.cf_before,
                step.cf_after
            );
            if !step.explanation.is_empty() {
                let _ = writeln!(out, "     {}", step.explanation);
            }
        }
        out
    }
}
