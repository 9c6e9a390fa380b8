#![deny(clippy::unwrap_used)]
//! Project pipeline over `liable_core`: reads `liable.toml` and the reflected-modules manifest,
//! then answers the questions test generation asks of a module.

mod build;
pub mod config;
pub mod expr;
mod loader;
pub mod manifest;

use std::path::{Path, PathBuf};
use std::time::Instant;

use liable_core::{
    Argument, ArgumentValue, EntityId, FunctionCall, Hierarchy, LiableError, ModuleCache,
    ModulePath, Namespace, ParameterKind, Resolver, Signature, Universe, built_ins, combine,
    dependants_paths, from_type_initializer, group_by_top_module, imports_for, inner_functions,
    merge, signature, utilities,
};
use serde::Serialize;

pub use build::{build_universe, resolve_annotation};
pub use config::{CONFIG_FILE_NAME, LiableToml, read_liable_toml};
pub use loader::ManifestLoader;
pub use manifest::{Manifest, read_manifest};

macro_rules! timing_step {
    ($label:expr, $block:expr) => {{
        let _span = tracing::debug_span!("pipeline", step = $label).entered();
        let started = Instant::now();
        let result = $block;
        tracing::debug!(
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "{}",
            $label
        );
        result
    }};
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Manifest error: {0}")]
    Manifest(String),
    #[error("Invalid annotation `{expression}`: {reason}")]
    Annotation { expression: String, reason: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Liable(#[from] LiableError),
}

/// Parameters sharing the package their annotation comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterGroup {
    pub module: String,
    pub parameters: Vec<RenderedParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedParameter {
    pub name: String,
    pub kind: ParameterKind,
    pub annotation: String,
}

/// A configured project: its reflected modules plus the module cache every query shares.
pub struct Project {
    root: PathBuf,
    config: LiableToml,
    universe: Universe,
    cache: ModuleCache,
}

impl Project {
    /// Opens the project whose `liable.toml` is at `config_path`; the manifest path is taken
    /// relative to it.
    pub fn open(config_path: &Path) -> Result<Self, DriverError> {
        let config = timing_step!("read config", read_liable_toml(config_path)?);
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let manifest_path = root.join(&config.project.manifest);
        let manifest = timing_step!("read manifest", read_manifest(&manifest_path)?);
        Self::from_manifest(root, config, &manifest)
    }

    pub fn from_manifest(
        root: impl Into<PathBuf>,
        config: LiableToml,
        manifest: &Manifest,
    ) -> Result<Self, DriverError> {
        let universe = timing_step!("build universe", build_universe(manifest)?);
        Ok(Self {
            root: root.into(),
            config,
            universe,
            cache: ModuleCache::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &LiableToml {
        &self.config
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    pub fn module(&self, name: &str) -> Result<EntityId, DriverError> {
        let loader = ManifestLoader::new(&self.universe, &self.root);
        Ok(self.cache.load_by_name(&loader, name)?)
    }

    /// Module declared for a source file, given absolute or relative to the project root.
    pub fn module_for_file(&self, path: &Path) -> Result<EntityId, DriverError> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let loader = ManifestLoader::new(&self.universe, &self.root);
        Ok(self.cache.load_by_path(&loader, &self.universe, &path)?)
    }

    /// Import directives a generated test module needs to call every function `module_name`
    /// defines, grouped per module in sorted order.
    pub fn imports_for_module(&mut self, module_name: &str) -> Result<Vec<String>, DriverError> {
        let module = self.module(module_name)?;
        let functions = timing_step!("collect functions", self.module_functions(&[module])?);
        let signatures = timing_step!("read signatures", self.signatures(&functions)?);

        let loader = ManifestLoader::new(&self.universe, &self.root);
        let resolver = Resolver::new(&self.universe, &loader, &self.cache);
        let namespace = self.generation_namespace(&resolver, &[module])?;
        let paths = timing_step!(
            "resolve dependencies",
            dependants_paths(&resolver, &signatures, &namespace)?
        );
        tracing::debug!(
            module = module_name,
            functions = functions.len(),
            paths = paths.len(),
            "synthesizing imports"
        );
        Ok(imports_for(&paths)?)
    }

    pub fn imports_for_file(&mut self, path: &Path) -> Result<Vec<String>, DriverError> {
        let module = self.module_for_file(path)?;
        let name = self.universe.name(module).to_string();
        self.imports_for_module(&name)
    }

    /// Parameters of every function the project defines, merged by name into their most
    /// specific annotation and grouped under the package that annotation comes from.
    pub fn combined_parameters(&mut self) -> Result<Vec<ParameterGroup>, DriverError> {
        let modules: Vec<EntityId> = self
            .universe
            .modules()
            .filter(|&module| !self.universe.is_host_module(module))
            .collect();
        let functions = timing_step!("collect functions", self.module_functions(&modules)?);
        let signatures = timing_step!("read signatures", self.signatures(&functions)?);

        let hierarchy = timing_step!("build hierarchy", Hierarchy::build(&self.universe));
        let combined = timing_step!(
            "combine parameters",
            combine(
                &self.universe,
                &hierarchy,
                signatures
                    .into_iter()
                    .flat_map(|signature| signature.parameters),
            )?
        );

        let loader = ManifestLoader::new(&self.universe, &self.root);
        let resolver = Resolver::new(&self.universe, &loader, &self.cache);
        let namespace = self.generation_namespace(&resolver, &modules)?;
        let commons = ModulePath::root(&self.config.generation.commons_module);
        let groups = group_by_top_module(&resolver, combined.into_values(), &namespace, &commons)?;

        let mut rendered = Vec::with_capacity(groups.len());
        for (module, parameters) in groups {
            let mut group = ParameterGroup {
                module: module.to_string(),
                parameters: Vec::with_capacity(parameters.len()),
            };
            for parameter in parameters {
                group.parameters.push(RenderedParameter {
                    annotation: parameter.annotation.to_string(&resolver, &namespace)?,
                    name: parameter.name,
                    kind: parameter.kind,
                });
            }
            rendered.push(group);
        }
        Ok(rendered)
    }

    /// Calls constructing each class `module_name` defines with an initializer, every argument
    /// spelled as its parameter's annotation.
    pub fn constructor_calls(&mut self, module_name: &str) -> Result<Vec<String>, DriverError> {
        let module = self.module(module_name)?;
        let classes: Vec<EntityId> = self
            .universe
            .classes()
            .filter(|&class| {
                self.universe.object_is_defined_in(class, module)
                    && self
                        .universe
                        .class(class)
                        .is_some_and(|info| info.initializer.is_some())
            })
            .collect();

        let mut calls = Vec::with_capacity(classes.len());
        for class in classes {
            let arguments = from_type_initializer(&mut self.universe, class)?
                .into_iter()
                .map(|parameter| {
                    Argument::new(
                        parameter.name,
                        ArgumentValue::Annotation(parameter.annotation),
                        parameter.kind,
                    )
                })
                .collect();
            calls.push(FunctionCall::new(class, arguments));
        }

        let loader = ManifestLoader::new(&self.universe, &self.root);
        let resolver = Resolver::new(&self.universe, &loader, &self.cache);
        let namespace = self.generation_namespace(&resolver, &[module])?;
        calls
            .iter()
            .map(|call| call.to_string(&resolver, &namespace).map_err(DriverError::from))
            .collect()
    }

    fn module_functions(&self, modules: &[EntityId]) -> Result<Vec<EntityId>, DriverError> {
        let loader = ManifestLoader::new(&self.universe, &self.root);
        let resolver = Resolver::new(&self.universe, &loader, &self.cache);
        let mut functions = Vec::new();
        for &module in modules {
            let namespace = resolver.namespace(module)?;
            functions.extend(inner_functions(&self.universe, &namespace));
        }
        Ok(functions)
    }

    fn signatures(&mut self, functions: &[EntityId]) -> Result<Vec<Signature>, DriverError> {
        let mut signatures = Vec::with_capacity(functions.len());
        for &function in functions {
            signatures.push(signature(&mut self.universe, function)?);
        }
        Ok(signatures)
    }

    /// Namespace generated code sees: built-ins, then the typing utilities when enabled, then
    /// the namespaces of `modules`.
    fn generation_namespace(
        &self,
        resolver: &Resolver<'_>,
        modules: &[EntityId],
    ) -> Result<Namespace, DriverError> {
        let mut sources = vec![built_ins(&self.universe)];
        if self.config.generation.include_utilities {
            sources.push(utilities(&self.universe));
        }
        for &module in modules {
            sources.push(resolver.namespace(module)?.as_ref().clone());
        }
        Ok(merge(&sources))
    }
}

/// Pretty JSON for the serializable pipeline results.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, DriverError> {
    Ok(serde_json::to_string_pretty(value)?)
}
