//! Loading and dispatching a single operator.
//!
//! An operator directory is discovered through its configuration unit,
//! `operator_config.json`, which names the code unit to resolve. Loading
//! runs inside a resolution scope for that directory and ends in a
//! capability check; only fully equipped operators come out the other side.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::module::{ModuleExports, ModuleHandle, OperatorSpec, OPERATOR_CONFIG_FILE};
use super::resolver::ModuleResolver;
use crate::error::{BentoctlError, BentoctlResult};
use crate::schema::types::OperatorSchema;

/// Parsed contents of an operator's configuration unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Name of the code unit to resolve for this operator.
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Where an operator came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorOrigin {
    /// Installed under the registry root at the given directory.
    Installed { path: PathBuf },
    /// Compiled into the binary; has no backing directory.
    Builtin,
}

/// A loaded operator: identity, origin, schema, and a dispatchable handle
/// to its lifecycle hooks.
pub struct Operator {
    name: String,
    module_name: String,
    origin: OperatorOrigin,
    handle: ModuleHandle,
    schema: OperatorSchema,
}

impl Operator {
    /// Load the operator rooted at `path`.
    ///
    /// The operator's name is the base name of its directory. A missing
    /// configuration unit fails with
    /// [`BentoctlError::OperatorConfigNotFound`]; everything else that can
    /// go wrong during loading is normalized into
    /// [`BentoctlError::OperatorLoadException`].
    pub fn load(path: &Path, resolver: &ModuleResolver) -> BentoctlResult<Operator> {
        let config_path = path.join(OPERATOR_CONFIG_FILE);
        if !config_path.is_file() {
            return Err(BentoctlError::OperatorConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let raw = fs::read_to_string(&config_path).map_err(|e| {
            BentoctlError::load(format!("failed to read {}: {}", config_path.display(), e))
        })?;
        let config: OperatorConfig = serde_json::from_str(&raw).map_err(|e| {
            BentoctlError::load(format!("malformed {}: {}", config_path.display(), e))
        })?;

        let name = operator_name_from_path(path)?;
        debug!(
            "loading operator '{}' (module '{}') from {}",
            name,
            config.module,
            path.display()
        );

        // The scope guard keeps directory-bound constructors visible for
        // the duration of the load and pops on every exit path.
        let _scope = resolver.enter_scope(path)?;
        let exports = resolver.instantiate(&config.module, path)?;

        Self::from_exports(
            name,
            config.module,
            OperatorOrigin::Installed {
                path: path.to_path_buf(),
            },
            exports,
        )
    }

    /// Build a built-in operator directly from an export surface. Built-ins
    /// go through the same capability check as installed operators.
    pub fn builtin(name: &str, exports: ModuleExports) -> BentoctlResult<Operator> {
        Self::from_exports(
            name.to_string(),
            name.to_string(),
            OperatorOrigin::Builtin,
            exports,
        )
    }

    fn from_exports(
        name: String,
        module_name: String,
        origin: OperatorOrigin,
        exports: ModuleExports,
    ) -> BentoctlResult<Operator> {
        let (handle, schema) = ModuleHandle::from_exports(exports).map_err(|missing| {
            let listed = missing
                .iter()
                .map(|c| c.name())
                .collect::<Vec<_>>()
                .join(", ");
            BentoctlError::load(format!(
                "module '{}' does not provide required capabilities: {}",
                module_name, listed
            ))
        })?;

        Ok(Operator {
            name,
            module_name,
            origin,
            handle,
            schema,
        })
    }

    /// Operator name, derived from the directory base name for installed
    /// operators.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the code unit this operator resolved.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn origin(&self) -> &OperatorOrigin {
        &self.origin
    }

    /// Backing directory, when the operator is installed on disk.
    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            OperatorOrigin::Installed { path } => Some(path),
            OperatorOrigin::Builtin => None,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.origin, OperatorOrigin::Builtin)
    }

    /// The parameter schema this operator validates deployment specs with.
    pub fn schema(&self) -> &OperatorSchema {
        &self.schema
    }

    /// Stage a deployable for a new deployment. Returns the staging path
    /// the caller must clean up, if the operator left one behind.
    pub fn deploy(
        &self,
        bento_path: &Path,
        deployment_name: &str,
        deployment_spec: &OperatorSpec,
    ) -> BentoctlResult<Option<PathBuf>> {
        debug!("operator '{}': deploy '{}'", self.name, deployment_name);
        Ok(self.handle.deploy(bento_path, deployment_name, deployment_spec)?)
    }

    /// Stage a deployable against an existing deployment. Same cleanup
    /// contract as [`Operator::deploy`].
    pub fn update(
        &self,
        bento_path: &Path,
        deployment_name: &str,
        deployment_spec: &OperatorSpec,
    ) -> BentoctlResult<Option<PathBuf>> {
        debug!("operator '{}': update '{}'", self.name, deployment_name);
        Ok(self.handle.update(bento_path, deployment_name, deployment_spec)?)
    }

    /// Current properties of a deployment, as reported by the operator.
    pub fn describe(
        &self,
        deployment_name: &str,
        deployment_spec: &OperatorSpec,
    ) -> BentoctlResult<Value> {
        debug!("operator '{}': describe '{}'", self.name, deployment_name);
        Ok(self.handle.describe(deployment_name, deployment_spec)?)
    }

    /// Tear a deployment down.
    pub fn delete(
        &self,
        deployment_name: &str,
        deployment_spec: &OperatorSpec,
    ) -> BentoctlResult<()> {
        debug!("operator '{}': delete '{}'", self.name, deployment_name);
        Ok(self.handle.delete(deployment_name, deployment_spec)?)
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("name", &self.name)
            .field("module_name", &self.module_name)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Base name of an operator directory. Fails for paths with no usable
/// final segment.
fn operator_name_from_path(path: &Path) -> BentoctlResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .ok_or_else(|| {
            BentoctlError::load(format!(
                "cannot derive an operator name from {}",
                path.display()
            ))
        })
}
