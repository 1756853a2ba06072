//! Core library for bentoctl, a CLI for deploying bentos to cloud
//! platforms through pluggable operators.
//!
//! The flow runs in one direction: a deployment spec document is parsed
//! and validated into a [`DeploymentConfig`], which resolves its operator
//! through the [`operator::OperatorRegistry`] and checks the
//! operator-specific block against the operator's declared schema. The
//! lifecycle entry points in [`deployment`] then dispatch deploy, update,
//! describe, and delete to the operator and clean up whatever it staged.
//!
//! Operators are code units resolved by name through an
//! [`operator::ModuleResolver`]; each operator directory names its unit in
//! an `operator_config.json` configuration file.

pub mod cli;
pub mod config;
pub mod deployment;
pub mod deployment_config;
pub mod error;
pub mod operator;
pub mod schema;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing_utils;

pub use deployment_config::{DeploymentConfig, RESERVED_KEYS};
pub use error::{BentoctlError, BentoctlResult};
pub use operator::{ModuleExports, ModuleResolver, Operator, OperatorRegistry};
pub use schema::{OperatorSchema, SchemaValidator};
