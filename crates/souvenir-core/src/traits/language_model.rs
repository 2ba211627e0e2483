use async_trait::async_trait;

use crate::errors::ExtractionError;

/// External language-model collaborator invoked once per (component, session
/// bucket) during consolidation. `system` is component-specific; `user` is
/// the built transcript.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ExtractionError>;
}
