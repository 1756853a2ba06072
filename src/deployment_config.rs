//! Parsing and validating deployment spec documents.
//!
//! [`DeploymentConfig`] is the gate between raw user input and the
//! lifecycle layer: constructing one resolves the operator and validates
//! the operator-specific block against its schema, so holding a value of
//! this type means the document already passed every check.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use serde_json::{Map, Value};

use crate::error::{BentoctlError, BentoctlResult};
use crate::operator::{Operator, OperatorRegistry, OperatorSpec};
use crate::schema::types::Violation;
use crate::schema::validator::{value_shape, SchemaValidator};

/// Top-level keys owned by the tool rather than the operator.
pub const RESERVED_KEYS: [&str; 3] = ["name", "operator", "bento"];

/// A fully validated deployment spec bound to its resolved operator.
#[derive(Debug)]
pub struct DeploymentConfig {
    deployment_name: String,
    bento_path: PathBuf,
    operator_name: String,
    operator: Arc<Operator>,
    operator_spec: OperatorSpec,
    raw_spec: Value,
}

impl DeploymentConfig {
    /// Read and validate a deployment spec file. The file may be YAML or
    /// JSON; both parse through the same path.
    pub fn from_file(path: &Path, registry: &OperatorRegistry) -> BentoctlResult<Self> {
        if !path.is_file() {
            return Err(BentoctlError::DeploymentSpecNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = fs::read_to_string(path)?;
        let document: Value = serde_yaml::from_str(&contents).map_err(|e| {
            BentoctlError::invalid_spec(format!("error while parsing deployment spec: {}", e))
        })?;
        debug!("parsed deployment spec from {}", path.display());
        Self::from_document(document, registry)
    }

    /// Validate an already parsed spec document.
    ///
    /// Checks run in order: document shape, reserved keys, operator
    /// resolution, then schema validation of the operator block. Reserved
    /// key problems are collected together so one failure reports them all.
    pub fn from_document(document: Value, registry: &OperatorRegistry) -> BentoctlResult<Self> {
        let mapping = document.as_object().ok_or_else(|| {
            BentoctlError::invalid_spec(format!(
                "deployment spec must be a mapping, got {}",
                value_shape(&document)
            ))
        })?;

        let mut violations = Vec::new();
        let deployment_name = take_string(mapping, "name", &mut violations);
        let operator_name = take_string(mapping, "operator", &mut violations);
        let bento_path = take_bento(mapping, &mut violations);
        if !violations.is_empty() {
            return Err(BentoctlError::spec_violations(violations));
        }

        // The collectors above pushed a violation for every None.
        let (deployment_name, operator_name, bento_path) =
            match (deployment_name, operator_name, bento_path) {
                (Some(n), Some(o), Some(b)) => (n, o, b),
                _ => {
                    return Err(BentoctlError::invalid_spec(
                        "deployment spec is missing required keys",
                    ))
                }
            };

        let operator = registry.get(&operator_name)?;

        let operator_spec: OperatorSpec = mapping
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let report = SchemaValidator::new(operator.schema()).validate(&operator_spec);
        report.log_warnings();
        if !report.is_ok() {
            return Err(BentoctlError::spec_violations(report.into_violations()));
        }

        debug!(
            "deployment spec '{}' validated against operator '{}'",
            deployment_name, operator_name
        );
        Ok(Self {
            deployment_name,
            bento_path,
            operator_name,
            operator,
            operator_spec,
            raw_spec: document,
        })
    }

    pub fn deployment_name(&self) -> &str {
        &self.deployment_name
    }

    pub fn bento_path(&self) -> &Path {
        &self.bento_path
    }

    pub fn operator_name(&self) -> &str {
        &self.operator_name
    }

    pub fn operator(&self) -> &Arc<Operator> {
        &self.operator
    }

    /// Operator-specific block, stripped of the reserved keys.
    pub fn operator_spec(&self) -> &OperatorSpec {
        &self.operator_spec
    }

    /// The original document, as parsed.
    pub fn to_document(&self) -> &Value {
        &self.raw_spec
    }

    /// Write the original document back out as YAML.
    pub fn save(&self, path: &Path) -> BentoctlResult<()> {
        let rendered = serde_yaml::to_string(&self.raw_spec)
            .map_err(|e| BentoctlError::Serialization(e.to_string()))?;
        fs::write(path, rendered)?;
        Ok(())
    }
}

/// Pull a required non-empty string out of the top level, pushing a
/// violation instead of failing early.
fn take_string(
    mapping: &Map<String, Value>,
    key: &str,
    violations: &mut Vec<Violation>,
) -> Option<String> {
    match mapping.get(key) {
        None => {
            violations.push(Violation::new(key, "required field is missing"));
            None
        }
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            violations.push(Violation::new(key, "must be a non-empty string"));
            None
        }
        Some(other) => {
            violations.push(Violation::new(
                key,
                format!("expected string, got {}", value_shape(other)),
            ));
            None
        }
    }
}

/// The bento reference is either a plain string or a mapping with a
/// `path` key.
fn take_bento(mapping: &Map<String, Value>, violations: &mut Vec<Violation>) -> Option<PathBuf> {
    match mapping.get("bento") {
        None => {
            violations.push(Violation::new("bento", "required field is missing"));
            None
        }
        Some(Value::String(s)) if !s.is_empty() => Some(PathBuf::from(s)),
        Some(Value::String(_)) => {
            violations.push(Violation::new("bento", "must be a non-empty string"));
            None
        }
        Some(Value::Object(inner)) => match inner.get("path") {
            Some(Value::String(s)) if !s.is_empty() => Some(PathBuf::from(s)),
            Some(other) => {
                violations.push(Violation::new(
                    "bento.path",
                    format!("expected string, got {}", value_shape(other)),
                ));
                None
            }
            None => {
                violations.push(Violation::new("bento.path", "required field is missing"));
                None
            }
        },
        Some(other) => {
            violations.push(Violation::new(
                "bento",
                format!("expected string or mapping, got {}", value_shape(other)),
            ));
            None
        }
    }
}
