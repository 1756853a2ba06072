//! Fixture operators and spec documents for tests.
//!
//! Available to unit tests and, behind the `test-utils` feature, to
//! integration tests. The `testop` fixture mirrors the smallest useful
//! operator: a required `replica_count`, a staging deploy that can report
//! its staged paths through a shared sink, and trivial describe/delete.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use uuid::Uuid;

use crate::operator::{ModuleExports, ModuleResolver, OperatorSpec};
use crate::schema::types::{FieldSchema, FieldType, OperatorSchema};

/// Module name the test operator registers under.
pub const TESTOP_MODULE: &str = "testop";

/// Shared sink collecting every deployable path a fixture operator staged.
pub type DeployableSink = Arc<Mutex<Vec<PathBuf>>>;

/// Builds fixture operators for tests.
pub struct TestOperatorFactory;

impl TestOperatorFactory {
    /// Schema requiring a numeric `replica_count`, with an optional
    /// free-form `env` mapping.
    pub fn testop_schema() -> OperatorSchema {
        OperatorSchema::new()
            .with_field("replica_count", FieldSchema::required(FieldType::Number))
            .with_field("env", FieldSchema::optional(FieldType::Mapping))
    }

    /// A complete export surface for the test operator.
    pub fn testop_exports() -> ModuleExports {
        Self::testop_exports_recording(Arc::new(Mutex::new(Vec::new())))
    }

    /// Like [`TestOperatorFactory::testop_exports`], but every staged
    /// deployable path is also pushed into `sink` so tests can check it
    /// was cleaned up.
    pub fn testop_exports_recording(sink: DeployableSink) -> ModuleExports {
        let deploy_sink = sink.clone();
        let update_sink = sink;
        ModuleExports {
            deploy: Some(Box::new(move |_bento, name, _spec| {
                let staged = Self::stage_dir(name)?;
                if let Ok(mut paths) = deploy_sink.lock() {
                    paths.push(staged.clone());
                }
                Ok(Some(staged))
            })),
            update: Some(Box::new(move |_bento, name, _spec| {
                let staged = Self::stage_dir(name)?;
                if let Ok(mut paths) = update_sink.lock() {
                    paths.push(staged.clone());
                }
                Ok(Some(staged))
            })),
            describe: Some(Box::new(|name, spec| {
                Ok(json!({
                    "deployment_name": name,
                    "status": "running",
                    "spec": spec.clone(),
                }))
            })),
            delete: Some(Box::new(|_name, _spec| Ok(()))),
            schema: Some(Self::testop_schema()),
        }
    }

    /// An export surface with the given capability slots emptied.
    pub fn incomplete_exports() -> ModuleExports {
        let mut exports = Self::testop_exports();
        exports.delete = None;
        exports.schema = None;
        exports
    }

    /// Register `testop` on a resolver.
    pub fn register_testop(resolver: &ModuleResolver) {
        resolver
            .register(TESTOP_MODULE, Arc::new(|_ctx| Ok(Self::testop_exports())))
            .unwrap();
    }

    /// Write an operator directory with a configuration unit referencing
    /// `module`.
    pub fn write_operator_dir(dir: &Path, module: &str) {
        fs::create_dir_all(dir).unwrap();
        let config = json!({"module": module, "description": "test operator"});
        fs::write(
            dir.join("operator_config.json"),
            serde_json::to_string_pretty(&config).unwrap(),
        )
        .unwrap();
    }

    /// A minimal valid spec document for the test operator.
    pub fn spec_document(name: &str, operator: &str, bento: &str) -> Value {
        json!({
            "name": name,
            "operator": operator,
            "bento": bento,
            "replica_count": 1,
        })
    }

    fn stage_dir(deployment_name: &str) -> anyhow::Result<PathBuf> {
        let staged = env::temp_dir().join(format!(
            "testop-{}-{}",
            deployment_name,
            Uuid::new_v4()
        ));
        fs::create_dir_all(&staged)?;
        fs::write(staged.join("deployable.txt"), deployment_name)?;
        Ok(staged)
    }
}

/// Sink collecting every spec an operator hook was called with, so tests
/// can assert exact dispatch arguments.
pub type CallSink = Arc<Mutex<Vec<OperatorSpec>>>;

/// Exports whose deploy hook records the spec it received and stages
/// nothing.
pub fn recording_exports(calls: CallSink) -> ModuleExports {
    let mut exports = TestOperatorFactory::testop_exports();
    exports.deploy = Some(Box::new(move |_bento, _name, spec| {
        if let Ok(mut seen) = calls.lock() {
            seen.push(spec.clone());
        }
        Ok(None)
    }));
    exports
}
