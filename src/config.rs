//! Locating the bentoctl home directory.
//!
//! All persistent state lives under one home directory, `~/.bentoctl` by
//! default. The `BENTOCTL_HOME` environment variable overrides it, which
//! is also how tests point the tool at a scratch directory.

use std::env;
use std::fs;
use std::path::PathBuf;

use crate::error::{BentoctlError, BentoctlResult};

/// Environment variable overriding the home directory.
pub const HOME_ENV_VAR: &str = "BENTOCTL_HOME";

const HOME_DIR_NAME: &str = ".bentoctl";
const OPERATOR_DIR_NAME: &str = "operators";

/// The bentoctl home directory, without creating it.
pub fn bentoctl_home() -> BentoctlResult<PathBuf> {
    if let Some(dir) = env::var_os(HOME_ENV_VAR) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().ok_or_else(|| {
        BentoctlError::config(format!(
            "could not determine a home directory; set {}",
            HOME_ENV_VAR
        ))
    })?;
    Ok(home.join(HOME_DIR_NAME))
}

/// Storage root for installed operators.
pub fn operator_registry_root() -> BentoctlResult<PathBuf> {
    Ok(bentoctl_home()?.join(OPERATOR_DIR_NAME))
}

/// Create the home directory layout if it does not exist yet. Returns the
/// home directory.
pub fn ensure_bentoctl_home() -> BentoctlResult<PathBuf> {
    let home = bentoctl_home()?;
    fs::create_dir_all(home.join(OPERATOR_DIR_NAME))?;
    Ok(home)
}
