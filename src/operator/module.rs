//! The lifecycle surface an operator code unit must export.
//!
//! A code unit hands the loader a [`ModuleExports`] with each hook as an
//! optional slot. Loading turns that into a [`ModuleHandle`] only when
//! every capability is present, so dispatch paths never meet a partially
//! implemented operator.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::schema::types::OperatorSchema;

/// File name of the configuration unit inside every operator directory.
pub const OPERATOR_CONFIG_FILE: &str = "operator_config.json";

/// Operator-specific parameter block, already stripped of the reserved
/// top-level keys.
pub type OperatorSpec = Map<String, Value>;

/// Stages a deployable for a deployment. Returns the staging directory to
/// be cleaned up by the caller, or `None` when nothing was left on disk.
pub type DeployFn =
    Box<dyn Fn(&Path, &str, &OperatorSpec) -> anyhow::Result<Option<PathBuf>> + Send + Sync>;

/// Re-stages a deployable for an existing deployment. Same contract as
/// [`DeployFn`].
pub type UpdateFn =
    Box<dyn Fn(&Path, &str, &OperatorSpec) -> anyhow::Result<Option<PathBuf>> + Send + Sync>;

/// Returns the current properties of a deployment as a JSON document.
pub type DescribeFn = Box<dyn Fn(&str, &OperatorSpec) -> anyhow::Result<Value> + Send + Sync>;

/// Tears a deployment down.
pub type DeleteFn = Box<dyn Fn(&str, &OperatorSpec) -> anyhow::Result<()> + Send + Sync>;

/// The capabilities every operator must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Deploy,
    Update,
    Describe,
    Delete,
    Schema,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::Deploy => "deploy",
            Capability::Update => "update",
            Capability::Describe => "describe",
            Capability::Delete => "delete",
            Capability::Schema => "schema",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Raw surface of a loaded code unit, before capability checking.
#[derive(Default)]
pub struct ModuleExports {
    pub deploy: Option<DeployFn>,
    pub update: Option<UpdateFn>,
    pub describe: Option<DescribeFn>,
    pub delete: Option<DeleteFn>,
    pub schema: Option<OperatorSchema>,
}

impl ModuleExports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capabilities this surface fails to provide, in contract order.
    pub fn missing_capabilities(&self) -> Vec<Capability> {
        let mut missing = Vec::new();
        if self.deploy.is_none() {
            missing.push(Capability::Deploy);
        }
        if self.update.is_none() {
            missing.push(Capability::Update);
        }
        if self.describe.is_none() {
            missing.push(Capability::Describe);
        }
        if self.delete.is_none() {
            missing.push(Capability::Delete);
        }
        if self.schema.is_none() {
            missing.push(Capability::Schema);
        }
        missing
    }
}

impl fmt::Debug for ModuleExports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleExports")
            .field("deploy", &self.deploy.is_some())
            .field("update", &self.update.is_some())
            .field("describe", &self.describe.is_some())
            .field("delete", &self.delete.is_some())
            .field("schema", &self.schema.is_some())
            .finish()
    }
}

/// Capability-checked handle to a loaded code unit. Every hook is present
/// by construction.
pub struct ModuleHandle {
    deploy: DeployFn,
    update: UpdateFn,
    describe: DescribeFn,
    delete: DeleteFn,
}

impl ModuleHandle {
    /// Split a raw export surface into a dispatchable handle and the
    /// operator's schema. Fails with the list of missing capabilities when
    /// the surface is incomplete.
    pub fn from_exports(
        exports: ModuleExports,
    ) -> Result<(ModuleHandle, OperatorSchema), Vec<Capability>> {
        let missing = exports.missing_capabilities();
        if !missing.is_empty() {
            return Err(missing);
        }

        let ModuleExports {
            deploy,
            update,
            describe,
            delete,
            schema,
        } = exports;

        // Presence was checked above.
        let handle = ModuleHandle {
            deploy: deploy.ok_or_else(|| vec![Capability::Deploy])?,
            update: update.ok_or_else(|| vec![Capability::Update])?,
            describe: describe.ok_or_else(|| vec![Capability::Describe])?,
            delete: delete.ok_or_else(|| vec![Capability::Delete])?,
        };
        let schema = schema.ok_or_else(|| vec![Capability::Schema])?;
        Ok((handle, schema))
    }

    pub fn deploy(
        &self,
        bento_path: &Path,
        deployment_name: &str,
        deployment_spec: &OperatorSpec,
    ) -> anyhow::Result<Option<PathBuf>> {
        (self.deploy)(bento_path, deployment_name, deployment_spec)
    }

    pub fn update(
        &self,
        bento_path: &Path,
        deployment_name: &str,
        deployment_spec: &OperatorSpec,
    ) -> anyhow::Result<Option<PathBuf>> {
        (self.update)(bento_path, deployment_name, deployment_spec)
    }

    pub fn describe(
        &self,
        deployment_name: &str,
        deployment_spec: &OperatorSpec,
    ) -> anyhow::Result<Value> {
        (self.describe)(deployment_name, deployment_spec)
    }

    pub fn delete(
        &self,
        deployment_name: &str,
        deployment_spec: &OperatorSpec,
    ) -> anyhow::Result<()> {
        (self.delete)(deployment_name, deployment_spec)
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle").finish_non_exhaustive()
    }
}
