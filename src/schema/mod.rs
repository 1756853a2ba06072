//! Operator schema model and document validation.

pub mod types;
pub mod validator;

pub use types::{FieldSchema, FieldType, OperatorSchema, UnknownFieldPolicy, Violation};
pub use validator::{SchemaValidator, ValidationReport};
