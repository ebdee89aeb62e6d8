use std::fmt;

use verdant_storage::{DiseaseId, StorageError};

/// Errors surfaced by the diagnosis engine.
///
/// Malformed rules are never errors; they are excluded and reported on
/// the inference result instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The knowledge store failed to produce a catalog. Distinct from a
    /// catalog that loads fine but matches nothing.
    KnowledgeBaseUnavailable { message: String },
    /// `explain` was asked about a disease with no trace entries, i.e. one
    /// that no rule fired for in this diagnosis.
    NotInTrace { disease_id: DiseaseId },
    /// A disease id that is not in the knowledge base.
    UnknownDisease { disease_id: DiseaseId },
    /// Invalid engine configuration.
    Config { message: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::KnowledgeBaseUnavailable { message } => {
                write!(f, "knowledge base unavailable: {}", message)
            }
            EngineError::NotInTrace { disease_id } => {
                write!(f, "disease {} not found in trace", disease_id)
            }
            EngineError::UnknownDisease { disease_id } => {
                write!(f, "unknown disease: {}", disease_id)
            }
            EngineError::Config { message } => {
                write!(f, "invalid engine config: {}", message)
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        EngineError::KnowledgeBaseUnavailable {
            message: err.to_string(),
        }
    }
}
