//! Declarative schema contracts checked field by field.

use super::{StructuredValue, TypeMismatch, ValidationError};
use serde_json::{Map, Value};
use std::fmt;
use url::Url;

/// Semantic type of a contract field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Any string, including the empty string.
    String,
    /// A string with at least one non-whitespace character.
    NonEmptyString,
    /// An absolute URL.
    Url,
    /// A string whose character count lies in `min..=max`.
    BoundedString {
        /// Minimum characters.
        min: usize,
        /// Maximum characters.
        max: usize,
    },
    /// Prose whose sentence count lies in `min..=max`.
    Sentences {
        /// Minimum sentences.
        min: usize,
        /// Maximum sentences, unbounded when `None`.
        max: Option<usize>,
    },
    /// One of a fixed set of string literals.
    Enum(Vec<String>),
}

impl FieldType {
    /// Convenience constructor for [`FieldType::Enum`].
    #[must_use]
    pub fn one_of<I, S>(literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum(literals.into_iter().map(Into::into).collect())
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        let Some(text) = value.as_str() else {
            return Err(describe(value).to_string());
        };

        match self {
            Self::String => Ok(()),
            Self::NonEmptyString => {
                if text.trim().is_empty() {
                    Err("empty string".to_string())
                } else {
                    Ok(())
                }
            }
            Self::Url => match Url::parse(text.trim()) {
                Ok(_) => Ok(()),
                Err(e) => Err(format!("unparseable URL ({e})")),
            },
            Self::BoundedString { min, max } => {
                let len = text.chars().count();
                if (*min..=*max).contains(&len) {
                    Ok(())
                } else {
                    Err(format!("string of {len} characters"))
                }
            }
            Self::Sentences { min, max } => {
                let count = count_sentences(text);
                let within = count >= *min && max.map_or(true, |max| count <= max);
                if count > 0 && within {
                    Ok(())
                } else {
                    Err(format!("{count} sentence(s)"))
                }
            }
            Self::Enum(allowed) => {
                if allowed.iter().any(|a| a == text) {
                    Ok(())
                } else {
                    Err(format!("'{text}'"))
                }
            }
        }
    }

    fn json_schema(&self) -> Value {
        match self {
            Self::String => serde_json::json!({"type": "string"}),
            Self::NonEmptyString => serde_json::json!({"type": "string", "minLength": 1}),
            Self::Url => serde_json::json!({"type": "string", "format": "uri"}),
            Self::BoundedString { min, max } => {
                serde_json::json!({"type": "string", "minLength": min, "maxLength": max})
            }
            Self::Sentences { .. } => serde_json::json!({"type": "string", "minLength": 1}),
            Self::Enum(allowed) => serde_json::json!({"type": "string", "enum": allowed}),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::NonEmptyString => write!(f, "non-empty string"),
            Self::Url => write!(f, "URL"),
            Self::BoundedString { min, max } => write!(f, "string of {min}-{max} characters"),
            Self::Sentences { min, max: Some(max) } => write!(f, "{min}-{max} sentences"),
            Self::Sentences { min, max: None } => write!(f, "at least {min} sentence(s)"),
            Self::Enum(allowed) => write!(f, "one of [{}]", allowed.join(", ")),
        }
    }
}

/// A single declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name as it appears in the emitted object.
    pub name: String,
    /// Semantic type.
    pub field_type: FieldType,
    /// Description used both for documentation and for instructing the model.
    pub description: String,
    /// Whether absence is a violation.
    pub required: bool,
}

/// A named structured value type.
///
/// Contracts are immutable once built and are shared read-only across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaContract {
    name: String,
    description: String,
    fields: Vec<FieldSpec>,
    strict: bool,
}

impl SchemaContract {
    /// Creates a contract with no fields.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            fields: Vec::new(),
            strict: false,
        }
    }

    /// Declares a required field. Redeclaring a name replaces the earlier spec.
    #[must_use]
    pub fn field(
        self,
        name: impl Into<String>,
        field_type: FieldType,
        description: impl Into<String>,
    ) -> Self {
        self.push_field(FieldSpec {
            name: name.into(),
            field_type,
            description: description.into(),
            required: true,
        })
    }

    /// Declares an optional field.
    #[must_use]
    pub fn optional_field(
        self,
        name: impl Into<String>,
        field_type: FieldType,
        description: impl Into<String>,
    ) -> Self {
        self.push_field(FieldSpec {
            name: name.into(),
            field_type,
            description: description.into(),
            required: false,
        })
    }

    /// Rejects undeclared fields instead of dropping them.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    fn push_field(mut self, spec: FieldSpec) -> Self {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == spec.name) {
            *existing = spec;
        } else {
            self.fields.push(spec);
        }
        self
    }

    /// Returns the contract name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the contract description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Returns true if the contract rejects undeclared fields.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Validates a candidate value.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every missing, mistyped or (for
    /// strict contracts) undeclared field. A candidate that is not an object
    /// is reported as malformed.
    pub fn validate(&self, candidate: &Value) -> Result<StructuredValue, ValidationError> {
        let Some(object) = candidate.as_object() else {
            return Err(ValidationError::malformed(
                &self.name,
                format!("expected a JSON object, found {}", describe(candidate)),
            ));
        };

        let mut error = ValidationError::new(&self.name);
        let mut accepted = Map::new();

        for spec in &self.fields {
            match object.get(&spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        error.record_missing(&spec.name);
                    }
                }
                Some(value) => match spec.field_type.check(value) {
                    Ok(()) => {
                        accepted.insert(spec.name.clone(), value.clone());
                    }
                    Err(found) => error.record_mismatch(TypeMismatch::new(
                        &spec.name,
                        spec.field_type.to_string(),
                        found,
                    )),
                },
            }
        }

        if self.strict {
            for key in object.keys() {
                if !self.fields.iter().any(|f| &f.name == key) {
                    error.record_unexpected(key);
                }
            }
        }

        if error.is_empty() {
            Ok(StructuredValue::new(&self.name, accepted))
        } else {
            Err(error)
        }
    }

    /// Re-validates an already structured value against this contract.
    ///
    /// # Errors
    ///
    /// Fails when the value was produced by a different contract or no longer
    /// satisfies this one.
    pub fn revalidate(&self, value: &StructuredValue) -> Result<StructuredValue, ValidationError> {
        if value.contract() != self.name {
            return Err(ValidationError::malformed(
                &self.name,
                format!("value conforms to contract '{}'", value.contract()),
            ));
        }
        self.validate(&value.to_json())
    }

    /// Renders the contract as a JSON Schema object.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for spec in &self.fields {
            let mut property = spec.field_type.json_schema();
            if let Some(obj) = property.as_object_mut() {
                obj.insert("description".to_string(), Value::String(spec.description.clone()));
            }
            properties.insert(spec.name.clone(), property);
            if spec.required {
                required.push(Value::String(spec.name.clone()));
            }
        }

        serde_json::json!({
            "title": self.name,
            "description": self.description,
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": !self.strict,
        })
    }

    /// Renders the field list as instructions for a language model.
    #[must_use]
    pub fn prompt_hint(&self) -> String {
        let mut hint = format!(
            "Respond with a single JSON object (no prose, no code fences) matching `{}`: {}\nFields:",
            self.name, self.description
        );
        for spec in &self.fields {
            let presence = if spec.required { "required" } else { "optional" };
            hint.push_str(&format!(
                "\n- \"{}\" ({}, {}): {}",
                spec.name, spec.field_type, presence, spec.description
            ));
        }
        hint
    }
}

/// Counts sentences in prose written in Latin or CJK scripts.
///
/// Full-width terminators always end a sentence; ASCII `.`, `!` and `?` end
/// one only when followed by whitespace or the end of the text, so decimals
/// and dotted abbreviations inside a word are not split.
#[must_use]
pub fn count_sentences(text: &str) -> usize {
    let mut count = 0;
    let mut has_content = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let ends_sentence = match c {
            '。' | '！' | '？' => true,
            '.' | '!' | '?' => chars.peek().map_or(true, |next| next.is_whitespace()),
            _ => false,
        };

        if ends_sentence {
            if has_content {
                count += 1;
                has_content = false;
            }
        } else if !c.is_whitespace() && !is_closing_mark(c) {
            has_content = true;
        }
    }

    if has_content {
        count += 1;
    }
    count
}

fn is_closing_mark(c: char) -> bool {
    matches!(c, '」' | '』' | '"' | '\'' | '）' | ')' | '”' | '’')
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
