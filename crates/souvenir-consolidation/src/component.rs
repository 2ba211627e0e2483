//! The `Component` trait registered on a `ConsolidationPipeline`, and the
//! shared shape every component's JSON reply is mapped into before the
//! entity-resolution/conflict-policy logic in `extraction` runs.

use souvenir_core::config::ConsolidationSettings;

/// How the extracted item relates to anything already in the store, per the
/// LM's own hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictHint {
    Duplicate,
    Update,
    Contradiction,
}

#[derive(Debug, Clone)]
pub struct ExtractedEntityRef {
    pub name: String,
    pub entity_type: String,
}

#[derive(Debug, Clone)]
pub struct ExtractedFact {
    pub content: String,
    pub category: String,
    pub importance: f64,
    pub entities: Vec<ExtractedEntityRef>,
    pub conflict: Option<ConflictHint>,
}

#[derive(Debug, Clone)]
pub struct ExtractedRelationship {
    pub from: String,
    pub to: String,
    pub relation: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractedBatch {
    pub facts: Vec<ExtractedFact>,
    pub relationships: Vec<ExtractedRelationship>,
}

/// A registered extraction target. Each owns its system prompt and policy;
/// the pipeline treats every component identically beyond that.
pub trait Component: Send + Sync {
    fn name(&self) -> &str;

    /// Session-scoped components get `expireSession` called on the
    /// previously-seen session as soon as a new one appears.
    fn session_scoped(&self) -> bool;

    fn system_prompt(&self) -> &str;

    fn settings(&self) -> &ConsolidationSettings;

    /// Parse this component's JSON shape out of the already fence-stripped,
    /// already-an-object LM reply.
    fn parse_reply(&self, value: &serde_json::Value) -> Result<ExtractedBatch, souvenir_core::errors::ExtractionError>;
}
