//! Tests for stage values and failure sentinels.

#[cfg(test)]
mod tests {
    use crate::contracts::{FieldType, SchemaContract};
    use crate::core::{RawContent, StageValue, FAILURE_MARKER};

    #[test]
    fn test_sentinel_format() {
        let raw = RawContent::from_failure("fetch_url", "HTTP 404");
        assert_eq!(raw.as_str(), "[ERROR] fetch_url: HTTP 404");
        assert!(raw.is_failure_sentinel());
        assert!(raw.as_str().starts_with(FAILURE_MARKER));
    }

    #[test]
    fn test_plain_text_is_not_a_sentinel() {
        assert!(!RawContent::new("Bonjour le monde").is_failure_sentinel());
        assert!(!RawContent::new("").is_failure_sentinel());
        assert!(!RawContent::new("An [ERROR] in the middle").is_failure_sentinel());
    }

    #[test]
    fn test_raw_value_accessors() {
        let value = StageValue::raw("hello");
        assert_eq!(value.as_context_text(), "hello");
        assert!(value.as_structured().is_none());
        assert_eq!(value.as_raw().map(RawContent::as_str), Some("hello"));
        assert!(!value.is_failure_sentinel());

        let failed = StageValue::from(RawContent::from_failure("t", "boom"));
        assert!(failed.is_failure_sentinel());
    }

    #[test]
    fn test_structured_value_context_text() {
        let structured = SchemaContract::new("c", "")
            .field("title", FieldType::NonEmptyString, "")
            .validate(&serde_json::json!({"title": "Example"}))
            .unwrap();
        let value = StageValue::from(structured);

        assert!(value.as_raw().is_none());
        assert!(!value.is_failure_sentinel());
        assert!(value.as_context_text().contains("\"title\": \"Example\""));
    }

    #[test]
    fn test_stage_value_serialization() {
        let json = serde_json::to_value(StageValue::raw("x")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "raw", "value": "x"}));
    }
}
