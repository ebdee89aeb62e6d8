mod error;
mod history;
mod json_file;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use history::HistoryLog;
pub use json_file::JsonFileStore;
pub use memory::InMemoryStore;
pub use record::{
    Catalog, DiagnosisRecord, DiseaseId, DiseaseRecord, PreventionRecord, RuleConditionRecord,
    RuleId, RuleRecord, SymptomId, SymptomRecord, TreatmentRecord,
};
pub use traits::KnowledgeStore;
