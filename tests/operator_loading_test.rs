//! Operator loading semantics through the registry.

mod common;

use std::fs;
use std::sync::Arc;

use bentoctl::error::BentoctlError;
use bentoctl::operator::{ModuleExports, OPERATOR_CONFIG_FILE};
use bentoctl::testing_utils::{TestOperatorFactory, TESTOP_MODULE};
use common::CommonTestFixture;

#[test]
fn test_directory_without_config_unit_fails_with_config_not_found() {
    let fixture = CommonTestFixture::new().unwrap();
    fs::create_dir_all(fixture.registry.root().join("broken")).unwrap();

    let err = fixture.registry.get("broken").unwrap_err();
    assert!(matches!(err, BentoctlError::OperatorConfigNotFound { .. }));
}

#[test]
fn test_operator_name_comes_from_directory_not_module() {
    let fixture = CommonTestFixture::new().unwrap();
    fixture.install_testop("my-operator").unwrap();

    let operator = fixture.registry.get("my-operator").unwrap();
    assert_eq!(operator.name(), "my-operator");
    assert_eq!(operator.module_name(), TESTOP_MODULE);
}

#[test]
fn test_config_referencing_unregistered_module_is_a_load_error() {
    let fixture = CommonTestFixture::new().unwrap();
    let source = fixture.scratch_path("ghost-source");
    TestOperatorFactory::write_operator_dir(&source, "no-such-module");

    let err = fixture.registry.add("ghost", &source).unwrap_err();
    assert!(matches!(err, BentoctlError::OperatorLoadException(_)));
    assert!(err.to_string().contains("no-such-module"));
}

#[test]
fn test_module_missing_capabilities_is_a_load_error_naming_them() {
    let fixture = CommonTestFixture::new().unwrap();
    fixture
        .resolver
        .register(
            "partial",
            Arc::new(|_| Ok(TestOperatorFactory::incomplete_exports())),
        )
        .unwrap();

    let source = fixture.scratch_path("partial-source");
    TestOperatorFactory::write_operator_dir(&source, "partial");

    let err = fixture.registry.add("partial-op", &source).unwrap_err();
    assert!(matches!(err, BentoctlError::OperatorLoadException(_)));
    let msg = err.to_string();
    assert!(msg.contains("delete"));
    assert!(msg.contains("schema"));
}

#[test]
fn test_directory_bound_module_resolves_during_load() {
    let fixture = CommonTestFixture::new().unwrap();

    // Two operators both reference a module called "main"; each directory
    // carries its own binding.
    let source_a = fixture.scratch_path("a-source");
    TestOperatorFactory::write_operator_dir(&source_a, "main");
    let source_b = fixture.scratch_path("b-source");
    TestOperatorFactory::write_operator_dir(&source_b, "main");

    let dest_a = fixture.registry.root().join("op-a");
    let dest_b = fixture.registry.root().join("op-b");
    fixture
        .resolver
        .bind(
            &dest_a,
            "main",
            Arc::new(|_| Ok(TestOperatorFactory::testop_exports())),
        )
        .unwrap();
    fixture
        .resolver
        .bind(
            &dest_b,
            "main",
            Arc::new(|_| {
                let mut exports = TestOperatorFactory::testop_exports();
                exports.schema = Some(TestOperatorFactory::testop_schema().deny_unknown_fields());
                Ok(exports)
            }),
        )
        .unwrap();

    let op_a = fixture.registry.add("op-a", &source_a).unwrap();
    let op_b = fixture.registry.add("op-b", &source_b).unwrap();

    assert_eq!(op_a.module_name(), "main");
    assert_eq!(op_b.module_name(), "main");
    // Each directory got its own constructor's exports.
    assert_ne!(
        op_a.schema().unknown_fields,
        op_b.schema().unknown_fields
    );
}

#[test]
fn test_module_constructor_failure_is_normalized_and_name_stays_free() {
    let fixture = CommonTestFixture::new().unwrap();
    fixture
        .resolver
        .register(
            "exploding",
            Arc::new(|_| Err(anyhow::anyhow!("backend unreachable"))),
        )
        .unwrap();

    let source = fixture.scratch_path("exploding-source");
    TestOperatorFactory::write_operator_dir(&source, "exploding");

    let err = fixture.registry.add("boom", &source).unwrap_err();
    assert!(matches!(err, BentoctlError::OperatorLoadException(_)));
    assert!(err.to_string().contains("backend unreachable"));

    // The rollback freed the name; an honest operator can take it.
    fixture.install_testop("boom").unwrap();
}

#[test]
fn test_operator_is_loaded_once_per_process() {
    let fixture = CommonTestFixture::new().unwrap();
    fixture.install_testop("memoized").unwrap();

    let first = fixture.registry.get("memoized").unwrap();
    let second = fixture.registry.get("memoized").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_empty_exports_module_reports_every_missing_capability() {
    let fixture = CommonTestFixture::new().unwrap();
    fixture
        .resolver
        .register("empty", Arc::new(|_| Ok(ModuleExports::new())))
        .unwrap();

    let source = fixture.scratch_path("empty-source");
    fs::create_dir_all(&source).unwrap();
    fs::write(
        source.join(OPERATOR_CONFIG_FILE),
        serde_json::json!({"module": "empty"}).to_string(),
    )
    .unwrap();

    let err = fixture.registry.add("empty-op", &source).unwrap_err();
    let msg = err.to_string();
    for capability in ["deploy", "update", "describe", "delete", "schema"] {
        assert!(msg.contains(capability), "missing {} in: {}", capability, msg);
    }
}
