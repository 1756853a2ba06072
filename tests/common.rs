//! Common test utilities and fixtures for integration tests.
//!
//! Provides a registry fixture backed by a temp directory, with the
//! `testop` fixture module and the built-in local operator registered.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use bentoctl::error::BentoctlResult;
use bentoctl::operator::{local, ModuleResolver, OperatorRegistry};
use bentoctl::testing_utils::{TestOperatorFactory, TESTOP_MODULE};
use tempfile::TempDir;

/// Common test fixture wiring a resolver and registry to a temp directory.
pub struct CommonTestFixture {
    pub resolver: Arc<ModuleResolver>,
    pub registry: OperatorRegistry,
    pub _temp_dir: TempDir,
}

impl CommonTestFixture {
    /// Create a fixture with `testop` and the built-in `local` operator
    /// registered on the resolver. Nothing is installed yet.
    pub fn new() -> BentoctlResult<Self> {
        let temp_dir = tempfile::tempdir()?;
        let resolver = Arc::new(ModuleResolver::new());
        TestOperatorFactory::register_testop(&resolver);
        local::register(&resolver)?;

        let registry =
            OperatorRegistry::open(temp_dir.path().join("operators"), resolver.clone())?;

        Ok(Self {
            resolver,
            registry,
            _temp_dir: temp_dir,
        })
    }

    /// Create a fixture with the `testop` operator already installed under
    /// the given name.
    pub fn with_testop(name: &str) -> BentoctlResult<Self> {
        let fixture = Self::new()?;
        fixture.install_testop(name)?;
        Ok(fixture)
    }

    /// Install the `testop` fixture operator under `name`.
    pub fn install_testop(&self, name: &str) -> BentoctlResult<()> {
        let source = self.scratch_path(&format!("{}-source", name));
        TestOperatorFactory::write_operator_dir(&source, TESTOP_MODULE);
        self.registry.add(name, &source)?;
        Ok(())
    }

    /// A bento directory containing one service file, created on first use.
    pub fn bento_dir(&self) -> PathBuf {
        let bento = self.scratch_path("bento");
        if !bento.exists() {
            fs::create_dir_all(&bento).unwrap();
            fs::write(bento.join("service.txt"), "service").unwrap();
        }
        bento
    }

    /// Write a deployment spec file with the given contents and return its
    /// path.
    pub fn write_spec_file(&self, file_name: &str, contents: &str) -> PathBuf {
        let path = self.scratch_path(file_name);
        fs::write(&path, contents).unwrap();
        path
    }

    /// Path inside the fixture's temp directory.
    pub fn scratch_path(&self, name: &str) -> PathBuf {
        self._temp_dir.path().join(name)
    }
}
