use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::new_id;

/// A named node in the shared entity graph. Names are unique case-insensitively
/// within the store; `upsert_entity` on a name conflict updates `entity_type`
/// in place and keeps the id stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    /// Free-form tag such as `person`, `project`, `concept`, `preference`.
    /// Never validated against a closed set.
    pub entity_type: String,
}

impl Entity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            entity_type: entity_type.into(),
        }
    }
}

/// A directed, typed edge between two entities. Identity is the composite
/// `(from_entity_id, to_entity_id, relation)`; an upsert on that key
/// replaces `confidence` and `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub from_entity_id: String,
    pub to_entity_id: String,
    pub relation: String,
    pub confidence: f64,
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    pub fn new(from_entity_id: impl Into<String>, to_entity_id: impl Into<String>, relation: impl Into<String>) -> Self {
        Self {
            from_entity_id: from_entity_id.into(),
            to_entity_id: to_entity_id.into(),
            relation: relation.into(),
            confidence: 1.0,
            updated_at: Utc::now(),
        }
    }
}
