//! In-memory `KnowledgeStore`, used by tests and embedders that build
//! their catalog programmatically.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::{
    Catalog, DiagnosisRecord, DiseaseId, DiseaseRecord, PreventionRecord, RuleConditionRecord,
    RuleId, RuleRecord, SymptomId, SymptomRecord, TreatmentRecord,
};
use crate::traits::KnowledgeStore;

#[derive(Debug, Default)]
struct Inner {
    catalog: Catalog,
    version: u64,
    history: Vec<DiagnosisRecord>,
}

impl Inner {
    fn bump(&mut self) {
        self.version += 1;
    }
}

/// A catalog held behind a single lock.
///
/// Every mutator bumps the catalog version, so caches keyed on
/// `catalog_version` observe administrative edits.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            inner: RwLock::new(Inner {
                catalog,
                version: 1,
                history: Vec::new(),
            }),
        }
    }

    /// Insert or replace a symptom by id.
    pub async fn upsert_symptom(&self, symptom: SymptomRecord) {
        let mut inner = self.inner.write().await;
        let rows = &mut inner.catalog.symptoms;
        match rows.iter_mut().find(|s| s.id == symptom.id) {
            Some(existing) => *existing = symptom,
            None => rows.push(symptom),
        }
        inner.bump();
    }

    /// Insert or replace a disease by id.
    pub async fn upsert_disease(&self, disease: DiseaseRecord) {
        let mut inner = self.inner.write().await;
        let rows = &mut inner.catalog.diseases;
        match rows.iter_mut().find(|d| d.id == disease.id) {
            Some(existing) => *existing = disease,
            None => rows.push(disease),
        }
        inner.bump();
    }

    /// Insert or replace a rule by id.
    pub async fn upsert_rule(&self, rule: RuleRecord) {
        let mut inner = self.inner.write().await;
        let rows = &mut inner.catalog.rules;
        match rows.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => rows.push(rule),
        }
        inner.bump();
    }

    /// Attach an active symptom condition to a rule.
    pub async fn add_condition(&self, rule_id: RuleId, symptom_id: SymptomId) {
        let mut inner = self.inner.write().await;
        inner.catalog.conditions.push(RuleConditionRecord {
            rule_id,
            symptom_id,
            is_active: true,
        });
        inner.bump();
    }

    pub async fn set_rule_active(
        &self,
        rule_id: RuleId,
        is_active: bool,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        let rule = inner
            .catalog
            .rules
            .iter_mut()
            .find(|r| r.id == rule_id)
            .ok_or(StorageError::NotFound {
                kind: "rule",
                id: rule_id.0,
            })?;
        rule.is_active = is_active;
        inner.bump();
        Ok(())
    }

    pub async fn add_treatment(&self, treatment: TreatmentRecord) {
        let mut inner = self.inner.write().await;
        inner.catalog.treatments.push(treatment);
        inner.bump();
    }

    pub async fn add_prevention(&self, prevention: PreventionRecord) {
        let mut inner = self.inner.write().await;
        inner.catalog.preventions.push(prevention);
        inner.bump();
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    async fn load_catalog(&self) -> Result<Catalog, StorageError> {
        Ok(self.inner.read().await.catalog.clone())
    }

    async fn catalog_version(&self) -> Result<u64, StorageError> {
        Ok(self.inner.read().await.version)
    }

    async fn list_treatments(
        &self,
        disease_id: DiseaseId,
    ) -> Result<Vec<TreatmentRecord>, StorageError> {
        Ok(self.inner.read().await.catalog.active_treatments(disease_id))
    }

    async fn list_preventions(
        &self,
        disease_id: DiseaseId,
    ) -> Result<Vec<PreventionRecord>, StorageError> {
        Ok(self.inner.read().await.catalog.active_preventions(disease_id))
    }

    async fn insert_diagnosis(&self, mut record: DiagnosisRecord) -> Result<u64, StorageError> {
        let mut inner = self.inner.write().await;
        let id = inner.history.len() as u64 + 1;
        record.id = id;
        inner.history.push(record);
        Ok(id)
    }

    async fn list_diagnoses(&self, limit: usize) -> Result<Vec<DiagnosisRecord>, StorageError> {
        let inner = self.inner.read().await;
        let take = if limit == 0 { inner.history.len() } else { limit };
        Ok(inner.history.iter().rev().take(take).cloned().collect())
    }
}
