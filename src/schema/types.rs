//! Schema data model for operator parameter blocks.
//!
//! Each operator declares an [`OperatorSchema`] describing the fields its
//! deployment specs may carry. The model is deliberately small: five value
//! shapes, a required flag, and optional nested schemas for mappings.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value shapes a declared field can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Mapping,
    Sequence,
}

impl FieldType {
    /// Lowercase name used in violation messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Mapping => "mapping",
            FieldType::Sequence => "sequence",
        }
    }

    /// Whether a concrete document value has this shape. Integers and
    /// floats both count as numbers.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Mapping => value.is_object(),
            FieldType::Sequence => value.is_array(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How the validator treats document fields the schema does not declare.
///
/// The default keeps unknown fields out of the failure path: they are
/// surfaced as warnings so operators can evolve their schemas without
/// breaking existing specs. Operators that want strict input switch to
/// [`UnknownFieldPolicy::Deny`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFieldPolicy {
    #[default]
    Warn,
    Deny,
}

/// Declared shape of a single field in an operator schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Expected value shape.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field must be present in every document.
    #[serde(default)]
    pub required: bool,
    /// Nested field declarations. Only meaningful when `field_type` is
    /// [`FieldType::Mapping`]; a mapping without declared fields accepts
    /// any keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, FieldSchema>>,
    /// Human-readable description, used by interactive generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSchema {
    /// An optional field of the given shape.
    pub fn optional(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            fields: None,
            description: None,
        }
    }

    /// A required field of the given shape.
    pub fn required(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
            fields: None,
            description: None,
        }
    }

    /// Attach nested field declarations to a mapping field.
    pub fn with_fields(mut self, fields: BTreeMap<String, FieldSchema>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Attach a description.
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The full parameter schema an operator exports for its spec block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorSchema {
    /// Declared fields, keyed by field name.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSchema>,
    /// Policy for fields present in a document but absent from `fields`.
    #[serde(default)]
    pub unknown_fields: UnknownFieldPolicy,
}

impl OperatorSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field declaration.
    pub fn with_field<S: Into<String>>(mut self, name: S, field: FieldSchema) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Reject documents that carry undeclared fields.
    pub fn deny_unknown_fields(mut self) -> Self {
        self.unknown_fields = UnknownFieldPolicy::Deny;
        self
    }
}

/// One problem found while checking a document against a schema.
///
/// `path` is the dotted location of the offending field (`resources.memory`),
/// `reason` a short human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub path: String,
    pub reason: String,
}

impl Violation {
    pub fn new<P: Into<String>, R: Into<String>>(path: P, reason: R) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}
