//! Operator loading, resolution, and the installed-operator registry.

pub mod local;
pub mod module;
pub mod operator;
pub mod registry;
pub mod resolver;

pub use module::{
    Capability, DeleteFn, DeployFn, DescribeFn, ModuleExports, ModuleHandle, OperatorSpec,
    UpdateFn, OPERATOR_CONFIG_FILE,
};
pub use operator::{Operator, OperatorConfig, OperatorOrigin};
pub use registry::OperatorRegistry;
pub use resolver::{ModuleContext, ModuleCtor, ModuleResolver, ScopeGuard};
