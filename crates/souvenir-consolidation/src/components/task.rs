//! The `task` built-in component: session-scoped working memory that
//! expires as soon as the session it belongs to is superseded.

use souvenir_core::config::ConsolidationSettings;
use souvenir_core::errors::ExtractionError;

use crate::component::{Component, ConflictHint, ExtractedBatch, ExtractedFact};

const SYSTEM_PROMPT: &str = r#"You extract working-memory items scoped to the current task from a
conversation transcript. Respond with a single JSON object:
{
  "items": [ { "content": string, "category": string, "importance": number, "action": "new" | "merge" } ]
}
Use "merge" when an item updates something already established earlier in this same session."#;

pub struct TaskComponent {
    settings: ConsolidationSettings,
}

impl TaskComponent {
    pub fn new(settings: ConsolidationSettings) -> Self {
        Self { settings }
    }
}

impl Default for TaskComponent {
    fn default() -> Self {
        Self::new(ConsolidationSettings::default())
    }
}

impl Component for TaskComponent {
    fn name(&self) -> &str {
        "task"
    }

    fn session_scoped(&self) -> bool {
        true
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }

    fn settings(&self) -> &ConsolidationSettings {
        &self.settings
    }

    fn parse_reply(&self, value: &serde_json::Value) -> Result<ExtractedBatch, ExtractionError> {
        let facts = value
            .get("items")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().map(parse_item).collect::<Result<Vec<_>, _>>())
            .transpose()?
            .unwrap_or_default();

        Ok(ExtractedBatch { facts, relationships: Vec::new() })
    }
}

fn parse_item(v: &serde_json::Value) -> Result<ExtractedFact, ExtractionError> {
    let content = v
        .get("content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| ExtractionError::MissingField { field: "content".to_string() })?
        .to_string();

    let category = v.get("category").and_then(|c| c.as_str()).unwrap_or("task").to_string();
    let importance = v.get("importance").and_then(|i| i.as_f64()).unwrap_or(0.5).clamp(0.0, 1.0);

    let conflict = match v.get("action").and_then(|c| c.as_str()) {
        Some("merge") => Some(ConflictHint::Update),
        _ => None,
    };

    Ok(ExtractedFact { content, category, importance, entities: Vec::new(), conflict })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_action_has_no_conflict_hint() {
        let reply = serde_json::json!({"items": [{"content": "draft PR description", "category": "task", "importance": 0.4, "action": "new"}]});
        let batch = TaskComponent::default().parse_reply(&reply).unwrap();
        assert_eq!(batch.facts.len(), 1);
        assert!(batch.facts[0].conflict.is_none());
    }

    #[test]
    fn merge_action_hints_update() {
        let reply = serde_json::json!({"items": [{"content": "draft PR description v2", "category": "task", "importance": 0.5, "action": "merge"}]});
        let batch = TaskComponent::default().parse_reply(&reply).unwrap();
        assert_eq!(batch.facts[0].conflict, Some(ConflictHint::Update));
    }
}
