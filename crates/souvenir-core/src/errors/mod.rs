mod embedding_error;
mod extraction_error;
mod storage_error;

pub use embedding_error::EmbeddingError;
pub use extraction_error::ExtractionError;
pub use storage_error::StorageError;

/// Top-level error type returned by every public Souvenir operation.
#[derive(Debug, thiserror::Error)]
pub enum SouvenirError {
    /// A public method was called before `Engine::initialize`.
    #[error("engine used before initialize()")]
    Uninitialised,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// A fatal configuration error, e.g. compaction requested with a
    /// `deduplication_threshold` but no embedding provider configured.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

pub type SouvenirResult<T> = Result<T, SouvenirError>;
