//! Knowledge base snapshot and its cache.
//!
//! A `KnowledgeBase` is an immutable, fully-prefetched copy of the
//! catalog taken from one `load_catalog` call. The engine only ever reads
//! from a snapshot, so concurrent edits to the store cannot change the
//! rules in the middle of an inference.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use verdant_storage::{
    Catalog, DiseaseId, DiseaseRecord, KnowledgeStore, RuleConditionRecord, RuleId, RuleRecord,
    SymptomId, SymptomRecord,
};

use crate::certainty::Combination;
use crate::config::{EngineConfig, MatchPolicy};
use crate::error::EngineError;

/// A rule with its active condition set resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct KbRule {
    pub id: RuleId,
    pub disease_id: DiseaseId,
    pub certainty: f64,
    pub explanation: String,
    /// Required symptoms. May be empty for a malformed rule; the engine
    /// excludes such rules.
    pub conditions: BTreeSet<SymptomId>,
}

/// Versioning metadata of a snapshot: which catalog revision it was
/// built from, and the combination and firing policy every rule in it
/// is evaluated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbMetadata {
    pub version: u64,
    pub combination: Combination,
    pub policy: MatchPolicy,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    rules: Vec<KbRule>,
    diseases: BTreeMap<DiseaseId, DiseaseRecord>,
    symptoms: BTreeMap<SymptomId, SymptomRecord>,
    metadata: KbMetadata,
}

impl KnowledgeBase {
    /// Build a snapshot from a catalog.
    ///
    /// Inactive rules and inactive conditions are dropped here. Diseases
    /// and symptoms are kept regardless of their active flag so that the
    /// engine can report why a rule was excluded and still name symptoms.
    pub fn from_catalog(catalog: Catalog, config: &EngineConfig, version: u64) -> Self {
        let mut conditions: BTreeMap<RuleId, BTreeSet<SymptomId>> = BTreeMap::new();
        for RuleConditionRecord {
            rule_id,
            symptom_id,
            is_active,
        } in catalog.conditions
        {
            if is_active {
                conditions.entry(rule_id).or_default().insert(symptom_id);
            }
        }

        let mut rules: Vec<KbRule> = catalog
            .rules
            .into_iter()
            .filter(|r| r.is_active)
            .map(|r| KbRule {
                conditions: conditions.remove(&r.id).unwrap_or_default(),
                id: r.id,
                disease_id: r.disease_id,
                certainty: r.certainty,
                explanation: r.explanation,
            })
            .collect();
        rules.sort_by_key(|r| r.id);
        rules.dedup_by_key(|r| r.id);

        let diseases = catalog.diseases.into_iter().map(|d| (d.id, d)).collect();
        let symptoms = catalog.symptoms.into_iter().map(|s| (s.id, s)).collect();

        KnowledgeBase {
            rules,
            diseases,
            symptoms,
            metadata: KbMetadata {
                version,
                combination: config.combination,
                policy: config.policy,
            },
        }
    }

    /// Load a snapshot from a store with a single catalog read.
    ///
    /// The version is read before the catalog: if an edit lands between
    /// the two reads the snapshot is newer than its recorded version, and
    /// a cache holding it reloads on the next request.
    pub async fn load<S>(store: &S, config: &EngineConfig) -> Result<Self, EngineError>
    where
        S: KnowledgeStore + ?Sized,
    {
        let version = store.catalog_version().await?;
        let catalog = store.load_catalog().await?;
        let kb = KnowledgeBase::from_catalog(catalog, config, version);
        debug!(
            version,
            rules = kb.rules.len(),
            diseases = kb.diseases.len(),
            symptoms = kb.symptoms.len(),
            "knowledge base loaded"
        );
        Ok(kb)
    }

    pub fn builder() -> KnowledgeBaseBuilder {
        KnowledgeBaseBuilder::default()
    }

    /// Active rules in ascending id order.
    pub fn rules(&self) -> &[KbRule] {
        &self.rules
    }

    pub fn disease(&self, id: DiseaseId) -> Option<&DiseaseRecord> {
        self.diseases.get(&id)
    }

    pub fn symptom(&self, id: SymptomId) -> Option<&SymptomRecord> {
        self.symptoms.get(&id)
    }

    /// Display name of a symptom; unknown ids render as `#<id>`.
    pub fn symptom_name(&self, id: SymptomId) -> String {
        match self.symptoms.get(&id) {
            Some(s) => s.name.clone(),
            None => format!("#{}", id),
        }
    }

    pub fn metadata(&self) -> &KbMetadata {
        &self.metadata
    }
}

/// In-memory construction of a knowledge base, mostly for tests.
#[derive(Debug, Default)]
pub struct KnowledgeBaseBuilder {
    catalog: Catalog,
    config: EngineConfig,
    version: u64,
}

impl KnowledgeBaseBuilder {
    pub fn symptom(mut self, id: u32, name: &str) -> Self {
        self.catalog.symptoms.push(SymptomRecord {
            id: SymptomId(id),
            code: None,
            name: name.to_string(),
            group: String::new(),
            description: None,
            is_active: true,
        });
        self
    }

    pub fn disease(self, id: u32, name: &str) -> Self {
        self.disease_with_status(id, name, true)
    }

    pub fn disease_with_status(mut self, id: u32, name: &str, is_active: bool) -> Self {
        self.catalog.diseases.push(DiseaseRecord {
            id: DiseaseId(id),
            name: name.to_string(),
            disease_type: String::new(),
            severity: String::new(),
            description: None,
            is_active,
        });
        self
    }

    /// Add an active rule with the given condition symptoms.
    pub fn rule(
        mut self,
        id: u32,
        disease_id: u32,
        certainty: f64,
        explanation: &str,
        conditions: &[u32],
    ) -> Self {
        self.catalog.rules.push(RuleRecord {
            id: RuleId(id),
            disease_id: DiseaseId(disease_id),
            certainty,
            explanation: explanation.to_string(),
            is_active: true,
        });
        for &symptom in conditions {
            self.catalog.conditions.push(RuleConditionRecord {
                rule_id: RuleId(id),
                symptom_id: SymptomId(symptom),
                is_active: true,
            });
        }
        self
    }

    pub fn combination(mut self, combination: Combination) -> Self {
        self.config.combination = combination;
        self
    }

    pub fn policy(mut self, policy: MatchPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn build(self) -> KnowledgeBase {
        KnowledgeBase::from_catalog(self.catalog, &self.config, self.version)
    }
}

/// Process-wide cache of the current knowledge base.
///
/// `get` hands out the cached snapshot while the store's catalog version
/// is unchanged and reloads otherwise. `invalidate` drops the snapshot
/// unconditionally; callers fire it after administrative edits to rules,
/// symptoms or diseases.
#[derive(Debug, Default)]
pub struct KnowledgeCache {
    config: EngineConfig,
    slot: RwLock<Option<Arc<KnowledgeBase>>>,
}

impl KnowledgeCache {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            slot: RwLock::new(None),
        }
    }

    pub async fn get<S>(&self, store: &S) -> Result<Arc<KnowledgeBase>, EngineError>
    where
        S: KnowledgeStore + ?Sized,
    {
        let current = store.catalog_version().await?;

        if let Some(kb) = self.fresh(current).await {
            return Ok(kb);
        }

        let mut slot = self.slot.write().await;
        // Another caller may have reloaded while we waited for the lock.
        if let Some(kb) = slot.as_ref() {
            if kb.metadata.version == current {
                return Ok(Arc::clone(kb));
            }
        }

        let kb = Arc::new(KnowledgeBase::load(store, &self.config).await?);
        info!(
            version = kb.metadata.version,
            rules = kb.rules.len(),
            "knowledge base cache refreshed"
        );
        *slot = Some(Arc::clone(&kb));
        Ok(kb)
    }

    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        if slot.take().is_some() {
            debug!("knowledge base cache invalidated");
        }
    }

    async fn fresh(&self, version: u64) -> Option<Arc<KnowledgeBase>> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|kb| kb.metadata.version == version)
            .map(Arc::clone)
    }
}
