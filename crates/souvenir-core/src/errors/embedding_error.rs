/// Errors from the embedding provider. Always recovered: the affected
/// memory keeps a nil embedding and stays discoverable via lexical and
/// graph signals.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding provider failed: {reason}")]
    ProviderFailed { reason: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
