/// All errors that can be returned by a KnowledgeStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backing store could not be reached or read at all.
    #[error("knowledge store unavailable: {0}")]
    Unavailable(String),

    /// The store was read but its contents could not be decoded.
    #[error("malformed catalog at {path}: {message}")]
    Malformed { path: String, message: String },

    /// A referenced catalog row does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: u32 },

    /// A backend-specific storage error.
    #[error("storage backend error: {0}")]
    Backend(String),
}
