//! Catalog of installed operators.
//!
//! The registry owns one storage root. Every subdirectory carrying a
//! configuration unit is an installed operator whose name is the directory
//! base name. Operators load lazily on first access and are memoized for
//! the rest of the process; built-in operators live only in the memo map
//! and are protected from removal.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, info};

use super::module::OPERATOR_CONFIG_FILE;
use super::operator::Operator;
use super::resolver::ModuleResolver;
use crate::error::{BentoctlError, BentoctlResult};

/// Registry of operators under one storage root.
pub struct OperatorRegistry {
    root: PathBuf,
    resolver: Arc<ModuleResolver>,
    loaded: Mutex<HashMap<String, Arc<Operator>>>,
}

impl OperatorRegistry {
    /// Open (and create, if needed) the registry rooted at `root`.
    pub fn open<P: Into<PathBuf>>(root: P, resolver: Arc<ModuleResolver>) -> BentoctlResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!("operator registry opened at {}", root.display());
        Ok(Self {
            root,
            resolver,
            loaded: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolver(&self) -> &Arc<ModuleResolver> {
        &self.resolver
    }

    /// Instantiate a registered module as a built-in operator. Built-ins
    /// occupy their name like installed operators do, but have no backing
    /// directory and cannot be removed or replaced.
    pub fn install_builtin(&self, name: &str) -> BentoctlResult<Arc<Operator>> {
        let mut loaded = self.lock_loaded()?;
        if loaded.contains_key(name) || self.operator_dir(name).is_dir() {
            return Err(BentoctlError::OperatorExists {
                name: name.to_string(),
            });
        }

        let exports = self.resolver.instantiate(name, &self.root)?;
        let operator = Arc::new(Operator::builtin(name, exports)?);
        loaded.insert(name.to_string(), operator.clone());
        debug!("installed built-in operator '{}'", name);
        Ok(operator)
    }

    /// Get an operator by name, loading it from disk on first access.
    pub fn get(&self, name: &str) -> BentoctlResult<Arc<Operator>> {
        let mut loaded = self.lock_loaded()?;
        if let Some(operator) = loaded.get(name) {
            return Ok(operator.clone());
        }

        let dir = self.operator_dir(name);
        if !dir.is_dir() {
            return Err(BentoctlError::OperatorNotFound {
                name: name.to_string(),
            });
        }

        let operator = Arc::new(Operator::load(&dir, &self.resolver)?);
        loaded.insert(name.to_string(), operator.clone());
        Ok(operator)
    }

    /// Names of all available operators, sorted: built-ins plus every
    /// directory under the root that carries a configuration unit.
    pub fn list(&self) -> BentoctlResult<Vec<String>> {
        let loaded = self.lock_loaded()?;
        let mut names: BTreeSet<String> = loaded.keys().cloned().collect();
        drop(loaded);

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() && path.join(OPERATOR_CONFIG_FILE).is_file() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.insert(name.to_string());
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    /// Whether `name` is taken, by a built-in, a loaded operator, or any
    /// directory under the root (even a broken one still occupies its name).
    pub fn contains(&self, name: &str) -> BentoctlResult<bool> {
        let loaded = self.lock_loaded()?;
        Ok(loaded.contains_key(name) || self.operator_dir(name).is_dir())
    }

    /// Install the operator at `source` under `name`.
    ///
    /// The source directory is copied below the registry root and then
    /// loaded. A failed load rolls the copy back so a bad source never
    /// occupies a name.
    pub fn add(&self, name: &str, source: &Path) -> BentoctlResult<Arc<Operator>> {
        validate_operator_name(name)?;
        if !source.is_dir() {
            return Err(BentoctlError::registry(format!(
                "operator source {} is not a directory",
                source.display()
            )));
        }

        let mut loaded = self.lock_loaded()?;
        let dest = self.operator_dir(name);
        if loaded.contains_key(name) || dest.is_dir() {
            return Err(BentoctlError::OperatorExists {
                name: name.to_string(),
            });
        }

        copy_dir_recursive(source, &dest)?;
        match Operator::load(&dest, &self.resolver) {
            Ok(operator) => {
                let operator = Arc::new(operator);
                loaded.insert(name.to_string(), operator.clone());
                info!("added operator '{}' from {}", name, source.display());
                Ok(operator)
            }
            Err(e) => {
                // Roll the copy back; the name stays free.
                let _ = fs::remove_dir_all(&dest);
                Err(e)
            }
        }
    }

    /// Remove the installed operator `name` and its directory.
    pub fn remove(&self, name: &str) -> BentoctlResult<()> {
        let mut loaded = self.lock_loaded()?;
        if let Some(operator) = loaded.get(name) {
            if operator.is_builtin() {
                return Err(BentoctlError::OperatorIsLocal {
                    name: name.to_string(),
                });
            }
        }

        let dir = self.operator_dir(name);
        if !dir.is_dir() {
            return Err(BentoctlError::OperatorNotFound {
                name: name.to_string(),
            });
        }

        fs::remove_dir_all(&dir)?;
        loaded.remove(name);
        info!("removed operator '{}'", name);
        Ok(())
    }

    /// Replace the installed operator `name` with the content at `source`.
    ///
    /// The new content is staged next to the old directory and swapped in
    /// with a rename, then reloaded. Failures while staging, swapping, or
    /// reloading surface as [`BentoctlError::OperatorNotUpdated`].
    pub fn update(&self, name: &str, source: &Path) -> BentoctlResult<Arc<Operator>> {
        let mut loaded = self.lock_loaded()?;
        if let Some(operator) = loaded.get(name) {
            if operator.is_builtin() {
                return Err(BentoctlError::OperatorIsLocal {
                    name: name.to_string(),
                });
            }
        }

        let dest = self.operator_dir(name);
        if !dest.is_dir() {
            return Err(BentoctlError::OperatorNotFound {
                name: name.to_string(),
            });
        }
        if !source.is_dir() {
            return Err(BentoctlError::OperatorNotUpdated(format!(
                "operator source {} is not a directory",
                source.display()
            )));
        }

        let staging = self.root.join(format!(".{}.staging", name));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }

        let swapped = copy_dir_recursive(source, &staging)
            .map_err(BentoctlError::from)
            .and_then(|_| {
                fs::remove_dir_all(&dest)?;
                fs::rename(&staging, &dest)?;
                Ok(())
            });
        if let Err(e) = swapped {
            let _ = fs::remove_dir_all(&staging);
            return Err(BentoctlError::OperatorNotUpdated(e.to_string()));
        }

        // The memoized handle is stale either way; drop it before reload.
        loaded.remove(name);
        match Operator::load(&dest, &self.resolver) {
            Ok(operator) => {
                let operator = Arc::new(operator);
                loaded.insert(name.to_string(), operator.clone());
                info!("updated operator '{}' from {}", name, source.display());
                Ok(operator)
            }
            Err(e) => Err(BentoctlError::OperatorNotUpdated(e.to_string())),
        }
    }

    fn operator_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn lock_loaded(
        &self,
    ) -> BentoctlResult<std::sync::MutexGuard<'_, HashMap<String, Arc<Operator>>>> {
        self.loaded
            .lock()
            .map_err(|_| BentoctlError::registry("failed to acquire registry lock"))
    }
}

/// Operator names become directory names under the root, so path
/// separators and relative segments are rejected up front.
fn validate_operator_name(name: &str) -> BentoctlResult<()> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(BentoctlError::registry(format!(
            "invalid operator name '{}': use alphanumerics, '-' or '_'",
            name
        )))
    }
}

fn copy_dir_recursive(source: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::module::ModuleExports;
    use crate::schema::types::OperatorSchema;
    use tempfile::TempDir;

    fn exports() -> ModuleExports {
        ModuleExports {
            deploy: Some(Box::new(|_, _, _| Ok(None))),
            update: Some(Box::new(|_, _, _| Ok(None))),
            describe: Some(Box::new(|_, _| Ok(serde_json::json!({})))),
            delete: Some(Box::new(|_, _| Ok(()))),
            schema: Some(OperatorSchema::new()),
        }
    }

    fn resolver_with_main() -> Arc<ModuleResolver> {
        let resolver = Arc::new(ModuleResolver::new());
        resolver
            .register("main", Arc::new(|_| Ok(exports())))
            .unwrap();
        resolver
    }

    fn write_operator_source(dir: &Path, module: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join(OPERATOR_CONFIG_FILE),
            serde_json::json!({"module": module}).to_string(),
        )
        .unwrap();
    }

    #[test]
    fn test_add_then_get_returns_same_memoized_operator() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src-op");
        write_operator_source(&source, "main");

        let registry =
            OperatorRegistry::open(tmp.path().join("registry"), resolver_with_main()).unwrap();
        let added = registry.add("testop", &source).unwrap();
        let fetched = registry.get("testop").unwrap();
        assert!(Arc::ptr_eq(&added, &fetched));
        assert_eq!(fetched.name(), "testop");
        assert!(registry.contains("testop").unwrap());
        assert!(!registry.contains("other").unwrap());
    }

    #[test]
    fn test_add_existing_name_fails_with_operator_exists() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src-op");
        write_operator_source(&source, "main");

        let registry =
            OperatorRegistry::open(tmp.path().join("registry"), resolver_with_main()).unwrap();
        registry.add("testop", &source).unwrap();
        let err = registry.add("testop", &source).unwrap_err();
        assert!(matches!(err, BentoctlError::OperatorExists { .. }));
    }

    #[test]
    fn test_failed_add_rolls_back_and_frees_the_name() {
        let tmp = TempDir::new().unwrap();
        let broken = tmp.path().join("broken-op");
        write_operator_source(&broken, "no-such-module");
        let good = tmp.path().join("good-op");
        write_operator_source(&good, "main");

        let registry =
            OperatorRegistry::open(tmp.path().join("registry"), resolver_with_main()).unwrap();

        let err = registry.add("testop", &broken).unwrap_err();
        assert!(matches!(err, BentoctlError::OperatorLoadException(_)));
        assert!(!registry.root().join("testop").exists());

        // The name is free again.
        registry.add("testop", &good).unwrap();
    }

    #[test]
    fn test_get_unknown_name_fails_with_operator_not_found() {
        let tmp = TempDir::new().unwrap();
        let registry =
            OperatorRegistry::open(tmp.path().join("registry"), resolver_with_main()).unwrap();
        let err = registry.get("missing").unwrap_err();
        assert!(matches!(err, BentoctlError::OperatorNotFound { .. }));
    }

    #[test]
    fn test_get_broken_directory_surfaces_config_not_found() {
        let tmp = TempDir::new().unwrap();
        let registry =
            OperatorRegistry::open(tmp.path().join("registry"), resolver_with_main()).unwrap();
        fs::create_dir(registry.root().join("damaged")).unwrap();

        let err = registry.get("damaged").unwrap_err();
        assert!(matches!(err, BentoctlError::OperatorConfigNotFound { .. }));
    }

    #[test]
    fn test_remove_unknown_name_fails_with_operator_not_found() {
        let tmp = TempDir::new().unwrap();
        let registry =
            OperatorRegistry::open(tmp.path().join("registry"), resolver_with_main()).unwrap();
        let err = registry.remove("missing").unwrap_err();
        assert!(matches!(err, BentoctlError::OperatorNotFound { .. }));
    }

    #[test]
    fn test_remove_deletes_directory_and_eviction_is_visible() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src-op");
        write_operator_source(&source, "main");

        let registry =
            OperatorRegistry::open(tmp.path().join("registry"), resolver_with_main()).unwrap();
        registry.add("testop", &source).unwrap();
        registry.remove("testop").unwrap();

        assert!(!registry.root().join("testop").exists());
        assert!(matches!(
            registry.get("testop").unwrap_err(),
            BentoctlError::OperatorNotFound { .. }
        ));
    }

    #[test]
    fn test_builtin_operator_cannot_be_removed_or_updated() {
        let tmp = TempDir::new().unwrap();
        let resolver = Arc::new(ModuleResolver::new());
        resolver
            .register("local", Arc::new(|_| Ok(exports())))
            .unwrap();
        let registry = OperatorRegistry::open(tmp.path().join("registry"), resolver).unwrap();
        registry.install_builtin("local").unwrap();

        assert!(matches!(
            registry.remove("local").unwrap_err(),
            BentoctlError::OperatorIsLocal { .. }
        ));
        assert!(matches!(
            registry.update("local", tmp.path()).unwrap_err(),
            BentoctlError::OperatorIsLocal { .. }
        ));
    }

    #[test]
    fn test_update_swaps_content_and_reloads() {
        let tmp = TempDir::new().unwrap();
        let source_v1 = tmp.path().join("v1");
        write_operator_source(&source_v1, "main");
        fs::write(source_v1.join("marker"), "v1").unwrap();
        let source_v2 = tmp.path().join("v2");
        write_operator_source(&source_v2, "main");
        fs::write(source_v2.join("marker"), "v2").unwrap();

        let registry =
            OperatorRegistry::open(tmp.path().join("registry"), resolver_with_main()).unwrap();
        let first = registry.add("testop", &source_v1).unwrap();
        let second = registry.update("testop", &source_v2).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        let marker = fs::read_to_string(registry.root().join("testop").join("marker")).unwrap();
        assert_eq!(marker, "v2");
    }

    #[test]
    fn test_update_with_broken_source_reports_not_updated() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("good");
        write_operator_source(&good, "main");
        let broken = tmp.path().join("broken");
        write_operator_source(&broken, "no-such-module");

        let registry =
            OperatorRegistry::open(tmp.path().join("registry"), resolver_with_main()).unwrap();
        registry.add("testop", &good).unwrap();

        let err = registry.update("testop", &broken).unwrap_err();
        assert!(matches!(err, BentoctlError::OperatorNotUpdated(_)));
    }

    #[test]
    fn test_update_unknown_name_fails_with_operator_not_found() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src-op");
        write_operator_source(&source, "main");
        let registry =
            OperatorRegistry::open(tmp.path().join("registry"), resolver_with_main()).unwrap();

        let err = registry.update("missing", &source).unwrap_err();
        assert!(matches!(err, BentoctlError::OperatorNotFound { .. }));
    }

    #[test]
    fn test_list_combines_builtins_and_disk_sorted() {
        let tmp = TempDir::new().unwrap();
        let resolver = Arc::new(ModuleResolver::new());
        resolver
            .register("main", Arc::new(|_| Ok(exports())))
            .unwrap();
        resolver
            .register("local", Arc::new(|_| Ok(exports())))
            .unwrap();

        let registry = OperatorRegistry::open(tmp.path().join("registry"), resolver).unwrap();
        registry.install_builtin("local").unwrap();

        let source = tmp.path().join("src-op");
        write_operator_source(&source, "main");
        registry.add("zeta", &source).unwrap();
        registry.add("alpha", &source).unwrap();

        // A directory without a configuration unit is not listed.
        fs::create_dir(registry.root().join("junk")).unwrap();

        assert_eq!(registry.list().unwrap(), vec!["alpha", "local", "zeta"]);
    }

    #[test]
    fn test_invalid_operator_names_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src-op");
        write_operator_source(&source, "main");
        let registry =
            OperatorRegistry::open(tmp.path().join("registry"), resolver_with_main()).unwrap();

        for bad in ["", "../escape", "a/b", ".hidden"] {
            let err = registry.add(bad, &source).unwrap_err();
            assert!(matches!(err, BentoctlError::Registry(_)), "name {:?}", bad);
        }
    }
}
