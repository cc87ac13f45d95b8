//! Validated structured values.

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::ValidationError;

/// An immutable record that satisfied a named [`super::SchemaContract`].
///
/// Only [`super::SchemaContract::validate`] constructs these, so holding one
/// means the fields were checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredValue {
    contract: String,
    fields: Map<String, Value>,
}

impl StructuredValue {
    pub(crate) fn new(contract: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            contract: contract.into(),
            fields,
        }
    }

    /// Name of the contract this value satisfied.
    #[must_use]
    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns a string field.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Returns the accepted fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Converts to a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Deserializes the fields into a typed record.
    ///
    /// # Errors
    ///
    /// Returns a malformed [`ValidationError`] when the fields do not fit `T`.
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T, ValidationError> {
        serde_json::from_value(self.to_json())
            .map_err(|e| ValidationError::malformed(&self.contract, e.to_string()))
    }

    /// Renders the value as context text for a downstream stage.
    #[must_use]
    pub fn to_context_text(&self) -> String {
        serde_json::to_string_pretty(&self.fields).unwrap_or_else(|_| format!("{:?}", self.fields))
    }
}

impl Serialize for StructuredValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use crate::contracts::{FieldType, SchemaContract};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pair {
        a: String,
        b: String,
    }

    fn pair() -> super::StructuredValue {
        SchemaContract::new("pair", "two strings")
            .field("a", FieldType::String, "first")
            .field("b", FieldType::String, "second")
            .validate(&json!({"a": "x", "b": "y"}))
            .unwrap()
    }

    #[test]
    fn test_accessors() {
        let value = pair();
        assert_eq!(value.contract(), "pair");
        assert_eq!(value.get_str("a"), Some("x"));
        assert_eq!(value.get("c"), None);
        assert_eq!(value.fields().len(), 2);
    }

    #[test]
    fn test_to_typed() {
        let typed: Pair = pair().to_typed().unwrap();
        assert_eq!(
            typed,
            Pair {
                a: "x".to_string(),
                b: "y".to_string()
            }
        );
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let json = serde_json::to_value(pair()).unwrap();
        assert_eq!(json, json!({"a": "x", "b": "y"}));
        assert!(pair().to_context_text().contains("\"a\": \"x\""));
    }
}
