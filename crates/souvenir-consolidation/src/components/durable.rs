//! The `durable` built-in component: long-lived facts and relationships
//! that outlive any one session.

use souvenir_core::config::ConsolidationSettings;
use souvenir_core::errors::ExtractionError;

use crate::component::{Component, ConflictHint, ExtractedBatch, ExtractedEntityRef, ExtractedFact, ExtractedRelationship};

const SYSTEM_PROMPT: &str = r#"You extract durable facts about the user and their environment from a
conversation transcript. Respond with a single JSON object:
{
  "facts": [ { "content": string, "entities": [{"name": string, "type": string}],
               "importance": number, "conflict": null | "duplicate" | "update" | "contradiction" } ],
  "relationships": [ { "from": string, "to": string, "relation": string, "confidence": number } ]
}
Only include facts worth remembering across sessions. Omit anything trivial or task-specific."#;

pub struct DurableComponent {
    settings: ConsolidationSettings,
}

impl DurableComponent {
    pub fn new(settings: ConsolidationSettings) -> Self {
        Self { settings }
    }
}

impl Default for DurableComponent {
    fn default() -> Self {
        Self::new(ConsolidationSettings::default())
    }
}

impl Component for DurableComponent {
    fn name(&self) -> &str {
        "durable"
    }

    fn session_scoped(&self) -> bool {
        false
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }

    fn settings(&self) -> &ConsolidationSettings {
        &self.settings
    }

    fn parse_reply(&self, value: &serde_json::Value) -> Result<ExtractedBatch, ExtractionError> {
        let facts = value
            .get("facts")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().map(parse_fact).collect::<Result<Vec<_>, _>>())
            .transpose()?
            .unwrap_or_default();

        let relationships = value
            .get("relationships")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().map(parse_relationship).collect::<Result<Vec<_>, _>>())
            .transpose()?
            .unwrap_or_default();

        Ok(ExtractedBatch { facts, relationships })
    }
}

fn parse_fact(v: &serde_json::Value) -> Result<ExtractedFact, ExtractionError> {
    let content = v
        .get("content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| ExtractionError::MissingField { field: "content".to_string() })?
        .to_string();

    let entities = v
        .get("entities")
        .and_then(|e| e.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|e| {
                    let name = e.get("name")?.as_str()?.to_string();
                    let entity_type = e.get("type").and_then(|t| t.as_str()).unwrap_or("concept").to_string();
                    Some(ExtractedEntityRef { name, entity_type })
                })
                .collect()
        })
        .unwrap_or_default();

    let importance = v.get("importance").and_then(|i| i.as_f64()).unwrap_or(0.5).clamp(0.0, 1.0);

    let conflict = match v.get("conflict").and_then(|c| c.as_str()) {
        Some("duplicate") => Some(ConflictHint::Duplicate),
        Some("update") => Some(ConflictHint::Update),
        Some("contradiction") => Some(ConflictHint::Contradiction),
        _ => None,
    };

    Ok(ExtractedFact { content, category: "fact".to_string(), importance, entities, conflict })
}

fn parse_relationship(v: &serde_json::Value) -> Result<ExtractedRelationship, ExtractionError> {
    let from = v.get("from").and_then(|c| c.as_str()).ok_or_else(|| ExtractionError::MissingField { field: "from".to_string() })?;
    let to = v.get("to").and_then(|c| c.as_str()).ok_or_else(|| ExtractionError::MissingField { field: "to".to_string() })?;
    let relation = v
        .get("relation")
        .and_then(|c| c.as_str())
        .ok_or_else(|| ExtractionError::MissingField { field: "relation".to_string() })?;
    let confidence = v.get("confidence").and_then(|c| c.as_f64()).unwrap_or(1.0).clamp(0.0, 1.0);

    Ok(ExtractedRelationship { from: from.to_string(), to: to.to_string(), relation: relation.to_string(), confidence })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_facts_and_relationships() {
        let reply = serde_json::json!({
            "facts": [{"content": "likes tea", "entities": [{"name": "tea", "type": "preference"}], "importance": 0.6, "conflict": null}],
            "relationships": [{"from": "user", "to": "tea", "relation": "likes", "confidence": 0.9}],
        });
        let component = DurableComponent::default();
        let batch = component.parse_reply(&reply).unwrap();
        assert_eq!(batch.facts.len(), 1);
        assert_eq!(batch.relationships.len(), 1);
        assert_eq!(batch.facts[0].content, "likes tea");
    }

    #[test]
    fn missing_facts_key_yields_empty_batch() {
        let reply = serde_json::json!({});
        let component = DurableComponent::default();
        let batch = component.parse_reply(&reply).unwrap();
        assert!(batch.facts.is_empty());
        assert!(batch.relationships.is_empty());
    }
}
