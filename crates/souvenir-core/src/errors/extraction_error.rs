/// Errors raised while turning a language-model reply into extracted facts.
///
/// Every variant here is recovered locally by the consolidation pipeline:
/// the offending session is skipped and its episodes stay unconsolidated
/// for the next run. Storage errors are deliberately a different type —
/// they are never this tolerant.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("language model callback failed: {reason}")]
    LmFailed { reason: String },

    #[error("language model reply was not valid JSON: {reason}")]
    MalformedJson { reason: String },

    #[error("language model reply missing required field: {field}")]
    MissingField { field: String },
}
