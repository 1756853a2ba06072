//! Built-in operator that stages deployables on the local filesystem.
//!
//! `local` exists so the tool works out of the box: it packages the bento
//! and a small manifest into a temp directory and reports what it staged.
//! It follows the same lifecycle contract as any installed operator,
//! including returning its staging path for the caller to clean up.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::module::{ModuleExports, OperatorSpec};
use super::resolver::ModuleResolver;
use crate::error::BentoctlResult;
use crate::schema::types::{FieldSchema, FieldType, OperatorSchema};

/// Name the built-in local operator registers under.
pub const LOCAL_OPERATOR_NAME: &str = "local";

/// Manifest file written into every staged deployable.
pub const DEPLOYABLE_MANIFEST: &str = "deployable.json";

/// Register the local operator's constructor on a resolver.
pub fn register(resolver: &ModuleResolver) -> BentoctlResult<()> {
    resolver.register(LOCAL_OPERATOR_NAME, Arc::new(|_ctx| Ok(exports())))
}

fn exports() -> ModuleExports {
    ModuleExports {
        deploy: Some(Box::new(stage_deployable)),
        update: Some(Box::new(stage_deployable)),
        describe: Some(Box::new(|deployment_name, spec| {
            Ok(json!({
                "deployment_name": deployment_name,
                "operator": LOCAL_OPERATOR_NAME,
                "spec": spec.clone(),
            }))
        })),
        delete: Some(Box::new(|_deployment_name, _spec| Ok(()))),
        schema: Some(schema()),
    }
}

fn schema() -> OperatorSchema {
    OperatorSchema::new()
        .with_field(
            "port",
            FieldSchema::optional(FieldType::Number)
                .with_description("port the service is expected to listen on"),
        )
        .with_field(
            "env",
            FieldSchema::optional(FieldType::Mapping)
                .with_description("environment variables passed to the service"),
        )
}

/// Stage the bento and a manifest into a fresh temp directory. Returns the
/// directory so the lifecycle layer can remove it after the deployment
/// step finishes.
fn stage_deployable(
    bento_path: &Path,
    deployment_name: &str,
    spec: &OperatorSpec,
) -> anyhow::Result<Option<PathBuf>> {
    let deployable = env::temp_dir().join(format!("bentoctl-deployable-{}", Uuid::new_v4()));
    fs::create_dir_all(&deployable)
        .with_context(|| format!("failed to create deployable at {}", deployable.display()))?;

    copy_bento(bento_path, &deployable)?;

    let manifest = json!({
        "deployment_name": deployment_name,
        "bento": bento_path.display().to_string(),
        "spec": spec.clone(),
        "staged_at": Utc::now().to_rfc3339(),
    });
    fs::write(
        deployable.join(DEPLOYABLE_MANIFEST),
        serde_json::to_string_pretty(&manifest)?,
    )
    .with_context(|| format!("failed to write manifest in {}", deployable.display()))?;

    Ok(Some(deployable))
}

fn copy_bento(bento_path: &Path, deployable: &Path) -> anyhow::Result<()> {
    if bento_path.is_dir() {
        copy_tree(bento_path, &deployable.join("bento"))
            .with_context(|| format!("failed to copy bento from {}", bento_path.display()))
    } else if bento_path.is_file() {
        let file_name = bento_path
            .file_name()
            .context("bento path has no file name")?;
        fs::copy(bento_path, deployable.join(file_name))
            .with_context(|| format!("failed to copy bento from {}", bento_path.display()))?;
        Ok(())
    } else {
        // Existence is checked before dispatch; an operator invoked
        // directly just stages the manifest.
        Ok(())
    }
}

fn copy_tree(source: &Path, dest: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
