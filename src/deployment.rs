//! Deployment lifecycle entry points.
//!
//! Thin orchestration over a validated [`DeploymentConfig`]: check the
//! bento exists where the operator will need it, dispatch the lifecycle
//! hook, and clean up any deployable the operator staged. Operator
//! failures pass through untouched.

use std::fs;
use std::io;
use std::path::PathBuf;

use log::{debug, info};
use serde_json::Value;

use crate::deployment_config::DeploymentConfig;
use crate::error::{BentoctlError, BentoctlResult};

/// Deploy a bento according to a validated config.
pub fn deploy(config: &DeploymentConfig) -> BentoctlResult<()> {
    ensure_bento_exists(config)?;
    info!(
        "deploying '{}' with operator '{}'",
        config.deployment_name(),
        config.operator_name()
    );
    let deployable = config.operator().deploy(
        config.bento_path(),
        config.deployment_name(),
        config.operator_spec(),
    )?;
    cleanup_deployable(deployable)
}

/// Update an existing deployment with the bento and spec in `config`.
pub fn update(config: &DeploymentConfig) -> BentoctlResult<()> {
    ensure_bento_exists(config)?;
    info!(
        "updating '{}' with operator '{}'",
        config.deployment_name(),
        config.operator_name()
    );
    let deployable = config.operator().update(
        config.bento_path(),
        config.deployment_name(),
        config.operator_spec(),
    )?;
    cleanup_deployable(deployable)
}

/// Current properties of the deployment, as a JSON document.
pub fn describe(config: &DeploymentConfig) -> BentoctlResult<Value> {
    config
        .operator()
        .describe(config.deployment_name(), config.operator_spec())
}

/// Tear the deployment down. Returns the deployment name for reporting.
pub fn delete(config: &DeploymentConfig) -> BentoctlResult<String> {
    info!(
        "deleting '{}' with operator '{}'",
        config.deployment_name(),
        config.operator_name()
    );
    config
        .operator()
        .delete(config.deployment_name(), config.operator_spec())?;
    Ok(config.deployment_name().to_string())
}

/// The bento must exist before dispatch; operators assume it does.
fn ensure_bento_exists(config: &DeploymentConfig) -> BentoctlResult<()> {
    if !config.bento_path().exists() {
        return Err(BentoctlError::BentoNotFound {
            path: config.bento_path().to_path_buf(),
        });
    }
    Ok(())
}

/// Remove a staged deployable, if the operator left one behind. A path
/// that is already gone counts as cleaned up.
fn cleanup_deployable(deployable: Option<PathBuf>) -> BentoctlResult<()> {
    let Some(path) = deployable else {
        return Ok(());
    };
    debug!("removing deployable at {}", path.display());
    match fs::remove_dir_all(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BentoctlError::from(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_accepts_none() {
        cleanup_deployable(None).unwrap();
    }

    #[test]
    fn test_cleanup_removes_directory() {
        let tmp = TempDir::new().unwrap();
        let staged = tmp.path().join("staged");
        fs::create_dir(&staged).unwrap();
        fs::write(staged.join("artifact"), "x").unwrap();

        cleanup_deployable(Some(staged.clone())).unwrap();
        assert!(!staged.exists());
    }

    #[test]
    fn test_cleanup_tolerates_already_removed_path() {
        let tmp = TempDir::new().unwrap();
        cleanup_deployable(Some(tmp.path().join("never-created"))).unwrap();
    }
}
