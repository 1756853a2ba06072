//! Unified error type for the crate.
//!
//! Every failure the core can raise funnels into [`BentoctlError`] so the
//! CLI can catch one kind and render any of them as a single user-facing
//! line. Operator-internal failures are the exception: they pass through
//! the [`BentoctlError::Operator`] variant with their message untouched,
//! because the core has no knowledge of what a given operator's failures
//! mean.

use std::path::PathBuf;

use crate::schema::types::Violation;

/// Errors raised by the deployment core.
#[derive(Debug, thiserror::Error)]
pub enum BentoctlError {
    /// Operator directory exists but lacks its configuration unit.
    #[error("`operator_config.json` not found inside {}", .path.display())]
    OperatorConfigNotFound { path: PathBuf },

    /// Configuration unit present but the operator could not be loaded or
    /// does not satisfy the lifecycle contract. All underlying load
    /// failures are normalized into this kind.
    #[error("failed to load operator: {0}")]
    OperatorLoadException(String),

    /// Registry name collision on install.
    #[error("operator '{name}' exists!")]
    OperatorExists { name: String },

    /// Registry lookup miss. Carries the requested name so callers can
    /// point the user at `bentoctl operator list`.
    #[error(
        "operator '{name}' not found! Check that the operator is already added. \
         Use `bentoctl operator list` to see all available operators"
    )]
    OperatorNotFound { name: String },

    /// Mutation attempted on a protected built-in operator.
    #[error("operator '{name}' is built in and cannot be removed or replaced")]
    OperatorIsLocal { name: String },

    /// An installed operator could not be replaced with new content.
    #[error("operator not updated: {0}")]
    OperatorNotUpdated(String),

    /// Deployment spec parse failure or schema-validation failure. The
    /// violation list is empty for parse failures, whose location context
    /// lives in `reason` instead.
    #[error("invalid deployment spec: {reason}")]
    InvalidDeploymentSpec {
        reason: String,
        violations: Vec<Violation>,
    },

    /// Referenced deployment spec file does not exist.
    #[error("deployment spec file not found at {}", .path.display())]
    DeploymentSpecNotFound { path: PathBuf },

    /// Bento artifact missing at the point of dispatch.
    #[error("bento not found at {}", .path.display())]
    BentoNotFound { path: PathBuf },

    /// Errors raised inside the registry itself (invalid names, lock
    /// failures, unusable storage roots).
    #[error("operator registry error: {0}")]
    Registry(String),

    /// Errors locating or preparing the bentoctl home.
    #[error("configuration error: {0}")]
    Config(String),

    /// Errors re-serializing a spec document.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Errors related to IO operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A failure raised inside an operator's own lifecycle call. Displayed
    /// as-is, never re-labeled by the core.
    #[error(transparent)]
    Operator(#[from] anyhow::Error),
}

impl BentoctlError {
    /// Create a [`BentoctlError::OperatorLoadException`] with context.
    pub fn load<S: Into<String>>(msg: S) -> Self {
        Self::OperatorLoadException(msg.into())
    }

    /// Create a [`BentoctlError::InvalidDeploymentSpec`] from a free-form
    /// reason, with no structured violations attached.
    pub fn invalid_spec<S: Into<String>>(msg: S) -> Self {
        Self::InvalidDeploymentSpec {
            reason: msg.into(),
            violations: Vec::new(),
        }
    }

    /// Create a [`BentoctlError::InvalidDeploymentSpec`] from a violation
    /// list. The rendered reason repeats every violation so the one-line
    /// CLI message still pinpoints each offending field.
    pub fn spec_violations(violations: Vec<Violation>) -> Self {
        let reason = violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self::InvalidDeploymentSpec { reason, violations }
    }

    /// Create a [`BentoctlError::Registry`] with context.
    pub fn registry<S: Into<String>>(msg: S) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a [`BentoctlError::Config`] with context.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Structured violations carried by this error, if any.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::InvalidDeploymentSpec { violations, .. } => violations,
            _ => &[],
        }
    }
}

/// Result type alias for operations that can fail with a [`BentoctlError`].
pub type BentoctlResult<T> = Result<T, BentoctlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_violations_render_each_field() {
        let err = BentoctlError::spec_violations(vec![
            Violation::new("replica_count", "expected number, got string"),
            Violation::new("env.region", "required field is missing"),
        ]);

        let msg = err.to_string();
        assert!(msg.contains("replica_count"));
        assert!(msg.contains("env.region"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_operator_not_found_mentions_listing() {
        let err = BentoctlError::OperatorNotFound {
            name: "aws-lambda".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("aws-lambda"));
        assert!(msg.contains("operator list"));
    }

    #[test]
    fn test_operator_errors_pass_through_unchanged() {
        let inner = anyhow::anyhow!("credentials rejected by provider");
        let err = BentoctlError::from(inner);
        assert_eq!(err.to_string(), "credentials rejected by provider");
    }
}
