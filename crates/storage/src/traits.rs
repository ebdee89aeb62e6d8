use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{Catalog, DiagnosisRecord, DiseaseId, PreventionRecord, TreatmentRecord};

/// The read interface the diagnosis engine consumes, plus the diagnosis
/// history it hands results back to.
///
/// ## Snapshot Semantics
///
/// `load_catalog` is the isolation boundary: a single call must return a
/// consistent view of symptoms, diseases, rules and conditions (one read
/// transaction, or a copy taken under one lock). The engine never reads
/// the store again during an inference call.
///
/// ## Versioning
///
/// `catalog_version` must change whenever any catalog row changes. Caches
/// compare it against the version they loaded to decide when to reload.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` so that one store can
/// be shared across request handlers.
#[async_trait]
pub trait KnowledgeStore: Send + Sync + 'static {
    // ── Catalog reads ─────────────────────────────────────────────────────────

    /// Load the full catalog in one consistent read.
    async fn load_catalog(&self) -> Result<Catalog, StorageError>;

    /// Current catalog revision.
    async fn catalog_version(&self) -> Result<u64, StorageError>;

    /// Active treatments for a disease, ascending by id.
    async fn list_treatments(
        &self,
        disease_id: DiseaseId,
    ) -> Result<Vec<TreatmentRecord>, StorageError>;

    /// Active preventions for a disease, ascending by id.
    async fn list_preventions(
        &self,
        disease_id: DiseaseId,
    ) -> Result<Vec<PreventionRecord>, StorageError>;

    // ── Diagnosis history ─────────────────────────────────────────────────────

    /// Persist a diagnosis summary. Returns the assigned record id.
    async fn insert_diagnosis(&self, record: DiagnosisRecord) -> Result<u64, StorageError>;

    /// Most recent diagnoses first. `limit` of 0 means no limit.
    async fn list_diagnoses(&self, limit: usize) -> Result<Vec<DiagnosisRecord>, StorageError>;
}
