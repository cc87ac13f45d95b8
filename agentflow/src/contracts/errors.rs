//! Contract error types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Structured metadata for surfaced contract violations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractErrorInfo {
    /// Stable identifier for the violation.
    pub code: String,
    /// Human-readable description of the issue.
    pub summary: String,
    /// Optional remediation guidance that can be surfaced to users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
    /// Arbitrary structured data that helps downstream tooling render rich errors.
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Adds a fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds context data.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Serialize the metadata for logging or API responses.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut dict = HashMap::new();
        dict.insert("code".to_string(), serde_json::json!(self.code));
        dict.insert("summary".to_string(), serde_json::json!(self.summary));
        dict.insert("fix_hint".to_string(), serde_json::json!(self.fix_hint));
        dict.insert("context".to_string(), serde_json::json!(self.context));
        dict
    }
}

/// Common contract error codes.
pub mod codes {
    /// Empty pipeline error.
    pub const EMPTY: &str = "CONTRACT-EMPTY";
    /// Two stages share a name.
    pub const DUPLICATE: &str = "CONTRACT-DUPLICATE";
    /// A pipeline or stage name is blank.
    pub const NAME: &str = "CONTRACT-NAME";
}

/// A single field whose value has the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMismatch {
    /// Field name.
    pub field: String,
    /// Declared type, as rendered by [`super::FieldType`]'s `Display`.
    pub expected: String,
    /// What was found instead.
    pub found: String,
}

impl TypeMismatch {
    /// Creates a new mismatch record.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' expected {}, found {}", self.field, self.expected, self.found)
    }
}

/// Error returned when a candidate value does not satisfy a contract.
///
/// Every offending field is reported, not just the first one found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Contract that rejected the value.
    pub contract: String,
    /// Required fields that were absent or null.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
    /// Fields present with the wrong shape.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_mismatches: Vec<TypeMismatch>,
    /// Undeclared fields (strict contracts only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unexpected_fields: Vec<String>,
    /// Set when the candidate could not be read as an object at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub malformed: Option<String>,
}

impl ValidationError {
    /// Creates an empty error for a contract; fill it with the `record_*` methods.
    #[must_use]
    pub fn new(contract: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            ..Default::default()
        }
    }

    /// Creates an error for output that is not a JSON object.
    #[must_use]
    pub fn malformed(contract: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            malformed: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Records a missing field.
    pub fn record_missing(&mut self, field: impl Into<String>) {
        self.missing_fields.push(field.into());
    }

    /// Records a type mismatch.
    pub fn record_mismatch(&mut self, mismatch: TypeMismatch) {
        self.type_mismatches.push(mismatch);
    }

    /// Records an undeclared field.
    pub fn record_unexpected(&mut self, field: impl Into<String>) {
        self.unexpected_fields.push(field.into());
    }

    /// True when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missing_fields.is_empty()
            && self.type_mismatches.is_empty()
            && self.unexpected_fields.is_empty()
            && self.malformed.is_none()
    }

    /// True when `field` is reported as missing or mistyped.
    #[must_use]
    pub fn mentions(&self, field: &str) -> bool {
        self.missing_fields.iter().any(|f| f == field)
            || self.type_mismatches.iter().any(|m| m.field == field)
            || self.unexpected_fields.iter().any(|f| f == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "contract '{}' not satisfied", self.contract)?;

        if let Some(ref reason) = self.malformed {
            return write!(f, ": malformed output ({reason})");
        }

        let mut parts = Vec::new();
        if !self.missing_fields.is_empty() {
            parts.push(format!("missing fields [{}]", self.missing_fields.join(", ")));
        }
        if !self.type_mismatches.is_empty() {
            let rendered: Vec<String> =
                self.type_mismatches.iter().map(ToString::to_string).collect();
            parts.push(format!("type mismatches [{}]", rendered.join("; ")));
        }
        if !self.unexpected_fields.is_empty() {
            parts.push(format!(
                "unexpected fields [{}]",
                self.unexpected_fields.join(", ")
            ));
        }

        if parts.is_empty() {
            Ok(())
        } else {
            write!(f, ": {}", parts.join(", "))
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_error_info_builder() {
        let info = ContractErrorInfo::new("TEST-001", "Test error")
            .with_fix_hint("Try this fix")
            .with_context("stage", serde_json::json!("fetch"));

        assert_eq!(info.fix_hint, Some("Try this fix".to_string()));
        assert_eq!(info.context.get("stage"), Some(&serde_json::json!("fetch")));

        let dict = info.to_dict();
        assert_eq!(dict.get("code"), Some(&serde_json::json!("TEST-001")));
    }

    #[test]
    fn test_validation_error_display_lists_every_problem() {
        let mut err = ValidationError::new("bilingual_text");
        err.record_missing("en");
        err.record_missing("zh_tw");
        err.record_mismatch(TypeMismatch::new("source", "non-empty string", "number"));

        let message = err.to_string();
        assert_eq!(
            message,
            "contract 'bilingual_text' not satisfied: missing fields [en, zh_tw], \
             type mismatches ['source' expected non-empty string, found number]"
        );
        assert!(err.mentions("zh_tw"));
        assert!(err.mentions("source"));
        assert!(!err.mentions("title"));
    }

    #[test]
    fn test_malformed_error() {
        let err = ValidationError::malformed("resource_summary", "no JSON object found");
        assert!(!err.is_empty());
        assert!(err.to_string().contains("malformed output (no JSON object found)"));
    }

    #[test]
    fn test_validation_error_serialization_skips_empty() {
        let mut err = ValidationError::new("c");
        err.record_missing("a");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json, serde_json::json!({"contract": "c", "missing_fields": ["a"]}));
    }
}
