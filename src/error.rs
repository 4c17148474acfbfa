use thiserror::Error;

/// Errors produced by the retrieval engine and its collaborators.
#[derive(Debug, Error)]
pub enum RagError {
    /// A caller passed a malformed argument. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No persisted index exists yet. A normal state before the first
    /// indexing run; `RagEngine::search` maps this to an empty result.
    #[error("no index found, run the index command first")]
    IndexNotFound,

    /// The persisted index could not be read back. Recovery is re-indexing.
    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    /// A chunk batch and its embedding batch disagree in length.
    #[error("chunk count ({chunks}) does not match embedding count ({embeddings})")]
    LengthMismatch { chunks: usize, embeddings: usize },

    /// An embedding vector has the wrong dimensionality, e.g. after the
    /// embedding model changed between indexing and querying.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An embedding or generation request to the model failed.
    #[error("model request failed: {0}")]
    Model(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;
