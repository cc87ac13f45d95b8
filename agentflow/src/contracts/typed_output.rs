//! Typed records backed by a schema contract.
//!
//! A [`StructuredRecord`] pairs a plain serde struct with the contract that
//! validates it, so callers can move between the dynamic [`StructuredValue`]
//! flowing through a pipeline and a Rust type.

use serde::{de::DeserializeOwned, Serialize};

use super::{SchemaContract, StructuredValue, ValidationError};

/// A Rust type whose instances correspond to a contract's values.
pub trait StructuredRecord: Serialize + DeserializeOwned {
    /// Returns the contract for this record type.
    fn contract() -> SchemaContract;

    /// Converts a validated value into the record.
    ///
    /// # Errors
    ///
    /// Fails when the value came from a different contract or does not
    /// deserialize into `Self`.
    fn from_structured(value: &StructuredValue) -> Result<Self, ValidationError> {
        let contract = Self::contract();
        if value.contract() != contract.name() {
            return Err(ValidationError::malformed(
                contract.name(),
                format!("value conforms to contract '{}'", value.contract()),
            ));
        }
        value.to_typed()
    }

    /// Validates the record against its contract.
    ///
    /// # Errors
    ///
    /// Fails when serialization fails or the record breaks its contract
    /// (e.g. an empty required string).
    fn to_structured(&self) -> Result<StructuredValue, ValidationError> {
        let contract = Self::contract();
        let json = serde_json::to_value(self)
            .map_err(|e| ValidationError::malformed(contract.name(), e.to_string()))?;
        contract.validate(&json)
    }
}
