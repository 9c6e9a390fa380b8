#![deny(clippy::unwrap_used)]
//! Annotation algebra, namespace resolution and import synthesis over reflected modules.

pub mod annotation;
pub mod annotator;
pub mod calls;
pub mod catalog;
mod error;
pub mod hierarchy;
pub mod imports;
pub mod loader;
pub mod namespace;
pub mod parameters;
pub mod signature;
pub mod universe;

#[cfg(test)]
mod imports_tests;
#[cfg(test)]
mod parameters_tests;
#[cfg(test)]
mod test_universe;

pub use annotation::Annotation;
pub use annotator::normalize;
pub use calls::{Argument, ArgumentValue, FunctionCall, Literal};
pub use catalog::{
    BUILT_INS_MODULE, ContentPath, ModulePath, ModuleRef, ObjectPath, PathKind, SEPARATOR,
    name_to_module_path, path_to_module_path,
};
pub use error::LiableError;
pub use hierarchy::Hierarchy;
pub use imports::{group_by_module, imports_for, to_imports};
pub use loader::{ImportStatement, ModuleCache, ModuleLoader, UniverseLoader, absolutize};
pub use namespace::{Namespace, Resolver, built_ins, inner_functions, merge, utilities};
pub use parameters::{COMMONS_MODULE, combine, from_type_initializer, group_by_top_module};
pub use signature::{Parameter, ParameterKind, Signature, dependants_paths, dependencies, signature};
pub use universe::{
    ClassInfo, Entity, EntityId, EntityKind, Form, FormKind, FunctionInfo, Known, ModuleInfo,
    RawParameter, Universe,
};
