//! Extraction of a JSON object from free-form model text.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*\n?(.*?)```").expect("valid regex"));

/// Pulls the first JSON object out of `text`.
///
/// Tries the whole text, then a fenced code block, then the span between the
/// first `{` and the last `}`.
///
/// # Errors
///
/// Returns a description of why no object could be read.
pub fn extract_json_object(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("model returned no text".to_string());
    }

    let mut candidates: Vec<&str> = vec![trimmed];
    if let Some(block) = FENCED_BLOCK.captures(trimmed).and_then(|c| c.get(1)) {
        candidates.push(block.as_str().trim());
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            candidates.push(&trimmed[start..=end]);
        }
    }

    let mut non_object = None;
    for candidate in candidates {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value @ Value::Object(_)) => return Ok(value),
            Ok(other) => non_object = Some(other),
            Err(_) => {}
        }
    }

    Err(match non_object {
        Some(value) => format!("expected a JSON object, found {}", kind(&value)),
        None => "no JSON object found in model output".to_string(),
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_object() {
        let value = extract_json_object(r#" {"a": 1} "#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_fenced_object() {
        let text = "Here you go:\n```json\n{\"en\": \"Hello\"}\n```\nDone.";
        assert_eq!(extract_json_object(text).unwrap(), json!({"en": "Hello"}));
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let text = "Sure! {\"title\": \"x\", \"nested\": {\"k\": 2}} hope that helps";
        assert_eq!(
            extract_json_object(text).unwrap(),
            json!({"title": "x", "nested": {"k": 2}})
        );
    }

    #[test]
    fn test_failures() {
        assert_eq!(
            extract_json_object("   ").unwrap_err(),
            "model returned no text"
        );
        assert_eq!(
            extract_json_object("I cannot do that.").unwrap_err(),
            "no JSON object found in model output"
        );
        assert_eq!(
            extract_json_object("[1, 2]").unwrap_err(),
            "expected a JSON object, found array"
        );
    }
}
