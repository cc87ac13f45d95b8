//! Schema contracts and the structured values they produce.

mod errors;
mod parsing;
mod schema;
mod typed_output;
mod value;

pub use errors::{codes, ContractErrorInfo, TypeMismatch, ValidationError};
pub use parsing::extract_json_object;
pub use schema::{count_sentences, FieldSpec, FieldType, SchemaContract};
pub use typed_output::StructuredRecord;
pub use value::StructuredValue;
