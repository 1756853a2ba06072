//! Document validation against operator schemas.
//!
//! Validation never stops at the first problem. The whole document is
//! walked and every violation is collected, so a user fixing a deployment
//! spec sees all of it at once instead of replaying the command per field.

use log::warn;
use serde_json::{Map, Value};

use super::types::{FieldSchema, OperatorSchema, UnknownFieldPolicy, Violation};

/// Outcome of validating one document.
///
/// Violations fail the document; warnings (unknown fields under the
/// default policy) do not.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    violations: Vec<Violation>,
    warnings: Vec<Violation>,
}

impl ValidationReport {
    /// True when the document satisfies the schema.
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn warnings(&self) -> &[Violation] {
        &self.warnings
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Log every warning through the standard logger.
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!("deployment spec: {}", warning);
        }
    }
}

/// Validates documents against one operator's declared schema.
pub struct SchemaValidator<'a> {
    schema: &'a OperatorSchema,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(schema: &'a OperatorSchema) -> Self {
        Self { schema }
    }

    /// Walk the document and report every violation and warning found.
    pub fn validate(&self, document: &Map<String, Value>) -> ValidationReport {
        let mut report = ValidationReport::default();
        check_mapping(
            document,
            &self.schema.fields,
            self.schema.unknown_fields,
            "",
            &mut report,
        );
        report
    }
}

/// Dotted path for a field nested under `prefix`.
fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Lowercase shape name of a concrete document value.
pub(crate) fn value_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

fn check_mapping(
    document: &Map<String, Value>,
    fields: &std::collections::BTreeMap<String, FieldSchema>,
    policy: UnknownFieldPolicy,
    prefix: &str,
    report: &mut ValidationReport,
) {
    for (name, field) in fields {
        let path = join_path(prefix, name);
        match document.get(name) {
            None => {
                if field.required {
                    report
                        .violations
                        .push(Violation::new(path, "required field is missing"));
                }
            }
            Some(value) => check_value(value, field, &path, policy, report),
        }
    }

    for name in document.keys() {
        if fields.contains_key(name) {
            continue;
        }
        let violation = Violation::new(join_path(prefix, name), "unknown field");
        match policy {
            UnknownFieldPolicy::Warn => report.warnings.push(violation),
            UnknownFieldPolicy::Deny => report.violations.push(violation),
        }
    }
}

fn check_value(
    value: &Value,
    field: &FieldSchema,
    path: &str,
    policy: UnknownFieldPolicy,
    report: &mut ValidationReport,
) {
    if !field.field_type.matches(value) {
        report.violations.push(Violation::new(
            path,
            format!("expected {}, got {}", field.field_type, value_shape(value)),
        ));
        return;
    }

    // Descend into mappings that declare their own fields. A mapping
    // without declared fields is free-form.
    if let (Some(nested_fields), Some(nested_doc)) = (&field.fields, value.as_object()) {
        check_mapping(nested_doc, nested_fields, policy, path, report);
    }
}
