//! Named-constructor resolution for operator code units.
//!
//! Runtime code loading is rendered as a table of named constructors:
//! embedders register a constructor per module name, and loading an
//! operator directory resolves the name its configuration unit references.
//! While a directory is being loaded, a temporary resolution scope for that
//! directory sits on top of the process-wide table, so two operators can
//! reference the same module name without colliding. Scopes are popped by
//! an RAII guard on every exit path, including load failures.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::debug;

use super::module::ModuleExports;
use crate::error::{BentoctlError, BentoctlResult};

/// Context handed to a constructor while it runs.
pub struct ModuleContext<'a> {
    /// Directory of the operator being loaded. For built-in operators
    /// this is the registry root.
    pub operator_dir: &'a Path,
    /// The resolver itself, for units that resolve helpers of their own.
    pub resolver: &'a ModuleResolver,
}

/// Constructor for a named code unit.
pub type ModuleCtor =
    Arc<dyn Fn(&ModuleContext<'_>) -> anyhow::Result<ModuleExports> + Send + Sync>;

/// Process-wide resolution table plus a stack of directory-bound scopes.
pub struct ModuleResolver {
    builtin: Mutex<HashMap<String, ModuleCtor>>,
    bound: Mutex<HashMap<PathBuf, HashMap<String, ModuleCtor>>>,
    scopes: Mutex<Vec<PathBuf>>,
}

impl ModuleResolver {
    pub fn new() -> Self {
        Self {
            builtin: Mutex::new(HashMap::new()),
            bound: Mutex::new(HashMap::new()),
            scopes: Mutex::new(Vec::new()),
        }
    }

    /// Register a process-wide constructor under `name`. Names are unique;
    /// a second registration under the same name fails.
    pub fn register(&self, name: &str, ctor: ModuleCtor) -> BentoctlResult<()> {
        let mut builtin = self
            .builtin
            .lock()
            .map_err(|_| BentoctlError::registry("failed to acquire resolver lock"))?;
        if builtin.contains_key(name) {
            return Err(BentoctlError::registry(format!(
                "module '{}' is already registered",
                name
            )));
        }
        builtin.insert(name.to_string(), ctor);
        Ok(())
    }

    /// Bind a constructor to `name` for one operator directory. The binding
    /// is only visible while a scope for that directory is active, and it
    /// shadows any process-wide constructor with the same name.
    pub fn bind(&self, dir: &Path, name: &str, ctor: ModuleCtor) -> BentoctlResult<()> {
        let mut bound = self
            .bound
            .lock()
            .map_err(|_| BentoctlError::registry("failed to acquire resolver lock"))?;
        let entries = bound.entry(dir.to_path_buf()).or_default();
        if entries.contains_key(name) {
            return Err(BentoctlError::registry(format!(
                "module '{}' is already bound for {}",
                name,
                dir.display()
            )));
        }
        entries.insert(name.to_string(), ctor);
        Ok(())
    }

    /// Push a resolution scope for `dir`. The returned guard pops the scope
    /// when dropped.
    pub fn enter_scope(&self, dir: &Path) -> BentoctlResult<ScopeGuard<'_>> {
        let mut scopes = self
            .scopes
            .lock()
            .map_err(|_| BentoctlError::registry("failed to acquire resolver lock"))?;
        scopes.push(dir.to_path_buf());
        debug!("entered module scope for {}", dir.display());
        Ok(ScopeGuard { resolver: self })
    }

    /// Resolve `name` and run its constructor for the operator rooted at
    /// `operator_dir`. Resolution misses and constructor failures are both
    /// normalized into load errors.
    pub fn instantiate(&self, name: &str, operator_dir: &Path) -> BentoctlResult<ModuleExports> {
        let ctor = self.resolve_ctor(name)?.ok_or_else(|| {
            BentoctlError::load(format!("module '{}' is not registered", name))
        })?;

        let context = ModuleContext {
            operator_dir,
            resolver: self,
        };
        ctor(&context).map_err(|e| {
            BentoctlError::load(format!("module '{}' failed to initialize: {:#}", name, e))
        })
    }

    /// Look `name` up in the innermost active scopes first, then in the
    /// process-wide table. The constructor is cloned out so no lock is held
    /// while it runs.
    fn resolve_ctor(&self, name: &str) -> BentoctlResult<Option<ModuleCtor>> {
        {
            let scopes = self
                .scopes
                .lock()
                .map_err(|_| BentoctlError::registry("failed to acquire resolver lock"))?;
            let bound = self
                .bound
                .lock()
                .map_err(|_| BentoctlError::registry("failed to acquire resolver lock"))?;
            for dir in scopes.iter().rev() {
                if let Some(ctor) = bound.get(dir).and_then(|entries| entries.get(name)) {
                    return Ok(Some(ctor.clone()));
                }
            }
        }

        let builtin = self
            .builtin
            .lock()
            .map_err(|_| BentoctlError::registry("failed to acquire resolver lock"))?;
        Ok(builtin.get(name).cloned())
    }

    fn pop_scope(&self) {
        if let Ok(mut scopes) = self.scopes.lock() {
            if let Some(dir) = scopes.pop() {
                debug!("left module scope for {}", dir.display());
            }
        }
    }

    #[cfg(test)]
    fn scope_depth(&self) -> usize {
        self.scopes.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for ModuleResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Active resolution scope. Dropping it pops the scope it pushed.
pub struct ScopeGuard<'a> {
    resolver: &'a ModuleResolver,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.resolver.pop_scope();
    }
}
