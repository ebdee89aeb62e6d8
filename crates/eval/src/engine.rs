//! Forward-chaining inference over a knowledge base snapshot.
//!
//! Rules are evaluated once each, in ascending rule id order. A rule that
//! fires contributes `certainty * matched / total` (partial policy) or its
//! full certainty (exact-subset policy) to its disease, merged into the
//! disease's running certainty with the knowledge base's combination
//! function. Every firing is traced; every non-firing rule is reported as
//! skipped; malformed rules are excluded and counted.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use verdant_storage::{DiseaseId, RuleId, SymptomId};

use crate::config::MatchPolicy;
use crate::knowledge::{KbMetadata, KbRule, KnowledgeBase};
use crate::trace::{Trace, TraceEntry};

/// Symptoms observed in one diagnostic session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactSet(BTreeSet<SymptomId>);

impl FactSet {
    pub fn new() -> Self {
        FactSet(BTreeSet::new())
    }

    pub fn insert(&mut self, id: SymptomId) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: SymptomId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SymptomId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<SymptomId> for FactSet {
    fn from_iter<I: IntoIterator<Item = SymptomId>>(iter: I) -> Self {
        FactSet(iter.into_iter().collect())
    }
}

impl FromIterator<u32> for FactSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        FactSet(iter.into_iter().map(SymptomId).collect())
    }
}

/// Accumulated belief in one disease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conclusion {
    pub disease_id: DiseaseId,
    pub disease_name: String,
    pub certainty: f64,
    /// Rules that fired for this disease, in firing order.
    pub contributing_rules: Vec<RuleId>,
}

/// A well-formed rule that did not fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRule {
    pub rule_id: RuleId,
    pub disease_id: DiseaseId,
    pub disease_name: String,
    pub missing_symptoms: Vec<SymptomId>,
    pub missing_symptom_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// The rule has no active conditions.
    EmptyConditions,
    /// The rule targets a disease that is not in the catalog.
    MissingDisease,
    /// The rule targets a disease that is switched off.
    InactiveDisease,
}

impl ExclusionReason {
    pub fn name(self) -> &'static str {
        match self {
            ExclusionReason::EmptyConditions => "empty_conditions",
            ExclusionReason::MissingDisease => "missing_disease",
            ExclusionReason::InactiveDisease => "inactive_disease",
        }
    }
}

/// A malformed or orphaned rule left out of evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedRule {
    pub rule_id: RuleId,
    pub disease_id: DiseaseId,
    pub reason: ExclusionReason,
}

/// Everything one inference call produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inference {
    /// Ranked by certainty descending, then disease id ascending.
    pub conclusions: Vec<Conclusion>,
    pub trace: Trace,
    pub skipped: Vec<SkippedRule>,
    pub excluded: Vec<ExcludedRule>,
    pub metadata: KbMetadata,
}

impl Inference {
    pub fn conclusion(&self, disease_id: DiseaseId) -> Option<&Conclusion> {
        self.conclusions.iter().find(|c| c.disease_id == disease_id)
    }

    pub fn top(&self) -> Option<&Conclusion> {
        self.conclusions.first()
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Evaluate every rule of `kb` against `facts`.
///
/// Never fails: an empty fact set skips every well-formed rule, and
/// malformed rules are reported in `excluded` rather than raised.
pub fn infer(kb: &KnowledgeBase, facts: &FactSet) -> Inference {
    let metadata = *kb.metadata();
    let combination = metadata.combination;

    for id in facts.iter() {
        if kb.symptom(id).is_none() {
            debug!(symptom_id = %id, "observed symptom is not in the knowledge base");
        }
    }

    let mut conclusions: BTreeMap<DiseaseId, Conclusion> = BTreeMap::new();
    let mut trace = Trace::new();
    let mut skipped = Vec::new();
    let mut excluded = Vec::new();

    for rule in kb.rules() {
        let disease = match kb.disease(rule.disease_id) {
            Some(d) if d.is_active => d,
            found => {
                let reason = if found.is_some() {
                    ExclusionReason::InactiveDisease
                } else {
                    ExclusionReason::MissingDisease
                };
                excluded.push(exclude(rule, reason));
                continue;
            }
        };
        if rule.conditions.is_empty() {
            excluded.push(exclude(rule, ExclusionReason::EmptyConditions));
            continue;
        }

        let matched: Vec<SymptomId> = rule
            .conditions
            .iter()
            .copied()
            .filter(|s| facts.contains(*s))
            .collect();
        let total = rule.conditions.len();

        let fires = match metadata.policy {
            MatchPolicy::Partial => !matched.is_empty(),
            MatchPolicy::ExactSubset => matched.len() == total,
        };

        if !fires {
            let missing: Vec<SymptomId> = rule
                .conditions
                .iter()
                .copied()
                .filter(|s| !facts.contains(*s))
                .collect();
            debug!(rule_id = %rule.id, matched = matched.len(), total, "rule skipped");
            skipped.push(SkippedRule {
                rule_id: rule.id,
                disease_id: disease.id,
                disease_name: disease.name.clone(),
                missing_symptom_names: missing.iter().map(|s| kb.symptom_name(*s)).collect(),
                missing_symptoms: missing,
            });
            continue;
        }

        let contribution = rule.certainty * (matched.len() as f64 / total as f64);
        let conclusion = conclusions
            .entry(disease.id)
            .or_insert_with(|| Conclusion {
                disease_id: disease.id,
                disease_name: disease.name.clone(),
                certainty: 0.0,
                contributing_rules: Vec::new(),
            });

        let cf_before = conclusion.certainty;
        let cf_after = combination.apply(cf_before, contribution);
        conclusion.certainty = cf_after;
        conclusion.contributing_rules.push(rule.id);

        debug!(
            rule_id = %rule.id,
            disease_id = %disease.id,
            contribution,
            cf_before,
            cf_after,
            "rule fired"
        );

        trace.record(
            disease.id,
            TraceEntry {
                rule_id: rule.id,
                matched_symptom_names: matched.iter().map(|s| kb.symptom_name(*s)).collect(),
                matched_symptoms: matched,
                conditions_total: total,
                rule_certainty: rule.certainty,
                contribution,
                cf_before,
                cf_after,
                explanation: rule.explanation.clone(),
            },
        );
    }

    if !excluded.is_empty() {
        warn!(
            excluded = excluded.len(),
            rules = ?excluded.iter().map(|e| e.rule_id.0).collect::<Vec<_>>(),
            "malformed rules excluded from evaluation"
        );
    }

    let conclusions = rank_conclusions(conclusions.into_values().collect());

    info!(
        facts = facts.len(),
        rules = kb.rules().len(),
        conclusions = conclusions.len(),
        skipped = skipped.len(),
        excluded = excluded.len(),
        combination = metadata.combination.name(),
        policy = metadata.policy.name(),
        "inference complete"
    );

    Inference {
        conclusions,
        trace,
        skipped,
        excluded,
        metadata,
    }
}

fn exclude(rule: &KbRule, reason: ExclusionReason) -> ExcludedRule {
    ExcludedRule {
        rule_id: rule.id,
        disease_id: rule.disease_id,
        reason,
    }
}

/// Certainty descending; ties broken by disease id ascending.
fn rank_conclusions(mut conclusions: Vec<Conclusion>) -> Vec<Conclusion> {
    conclusions.sort_by(|a, b| {
        b.certainty
            .total_cmp(&a.certainty)
            .then_with(|| a.disease_id.cmp(&b.disease_id))
    });
    conclusions
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
