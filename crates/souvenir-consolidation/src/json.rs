//! Fence-stripping and JSON-object parsing shared by every component.

use souvenir_core::errors::ExtractionError;

/// Strips a leading/trailing triple-backtick fence if present. The opening
/// fence may carry a language tag on its own line (e.g. ```json); the
/// closing fence must be the final non-whitespace line.
fn strip_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    body.strip_suffix("```").map(str::trim).unwrap_or(body.trim())
}

pub fn parse_object(reply: &str) -> Result<serde_json::Value, ExtractionError> {
    let stripped = strip_fences(reply);
    let value: serde_json::Value =
        serde_json::from_str(stripped).map_err(|e| ExtractionError::MalformedJson { reason: e.to_string() })?;
    if !value.is_object() {
        return Err(ExtractionError::MalformedJson { reason: "reply was not a JSON object".to_string() });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_a_labelled_fence() {
        let reply = "```json\n{\"facts\": []}\n```";
        let value = parse_object(reply).unwrap();
        assert!(value.get("facts").is_some());
    }

    #[test]
    fn parses_bare_json_with_no_fence() {
        let value = parse_object("{\"items\": []}").unwrap();
        assert!(value.get("items").is_some());
    }

    #[test]
    fn rejects_non_object_json() {
        assert!(parse_object("[1,2,3]").is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_object("not json at all").is_err());
    }
}
