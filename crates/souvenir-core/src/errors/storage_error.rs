/// Storage-layer errors surfaced by a `MemoryRepository` / `EpisodeRepository`
/// implementation. Constraint violations and corruption are never silently
/// coerced into empty results.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("backend error: {message}")]
    Backend { message: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("row failed to decode: {details}")]
    SchemaError { details: String },

    #[error("memory not found: {id}")]
    MemoryNotFound { id: String },

    #[error("episode not found: {id}")]
    EpisodeNotFound { id: String },

    #[error("lexical index out of sync: {details}")]
    IndexCorruption { details: String },

    #[error("operation rejected: {reason}")]
    Busy { reason: String },
}
