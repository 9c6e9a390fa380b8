use std::path::Path;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::catalog::{SEPARATOR, path_to_module_path};
use crate::error::LiableError;
use crate::universe::{EntityId, Universe};

pub const ALL_OBJECTS_WILDCARD: &str = "*";

/// One import statement of a module, as produced by the source parser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportStatement {
    /// `import a, b.c`
    Import { modules: Vec<String> },
    /// `from module import names`; `level` counts the leading dots of a relative import.
    ImportFrom {
        module: Option<String>,
        names: Vec<String>,
        level: usize,
    },
}

impl ImportStatement {
    pub fn is_relative(&self) -> bool {
        matches!(self, ImportStatement::ImportFrom { level, .. } if *level > 0)
    }
}

/// Rewrites a relative import of `module_name` into an absolute one.
///
/// The anchor is the package the module lives in: the module itself for a package initializer,
/// its parent otherwise. Each level beyond the first climbs one package up.
pub fn absolutize(
    statement: &ImportStatement,
    module_name: &str,
    is_package: bool,
) -> Result<ImportStatement, LiableError> {
    let ImportStatement::ImportFrom {
        module,
        names,
        level,
    } = statement
    else {
        return Ok(statement.clone());
    };
    if *level == 0 {
        return Ok(statement.clone());
    }
    let unresolved = || LiableError::UnresolvedImport {
        module: format!("{}{}", ".".repeat(*level), module.as_deref().unwrap_or("")),
        object: names.join(", "),
    };
    let mut package = if is_package {
        Some(module_name)
    } else {
        module_name.rsplit_once(SEPARATOR).map(|(parent, _)| parent)
    };
    for _ in 1..*level {
        package = package.and_then(|name| name.rsplit_once(SEPARATOR).map(|(parent, _)| parent));
    }
    let full_name = match (package, module.as_deref()) {
        (Some(package), Some(module)) => format!("{package}{SEPARATOR}{module}"),
        (Some(package), None) => package.to_string(),
        (None, _) => return Err(unresolved()),
    };
    Ok(ImportStatement::ImportFrom {
        module: Some(full_name),
        names: names.clone(),
        level: 0,
    })
}

/// Loads modules on behalf of the namespace builder.
///
/// Loading may run module code, so callers go through a [`ModuleCache`] instead of invoking a
/// loader directly.
pub trait ModuleLoader {
    fn load_by_name(&self, name: &str) -> Result<EntityId, LiableError>;
    fn load_by_path(&self, path: &Path) -> Result<EntityId, LiableError>;

    /// Dotted name of the module at `path`, worked out without loading it.
    fn module_name_for_path(&self, path: &Path) -> Option<String> {
        path_to_module_path(path).map(|module_path| module_path.to_string())
    }
}

/// Name-keyed record of loaded modules, guaranteeing each module is loaded at most once.
///
/// The whole "check, else load and insert" sequence runs under one lock, so a loader must not
/// call back into the cache that drives it.
#[derive(Debug, Default)]
pub struct ModuleCache {
    loaded: Mutex<FxHashMap<String, EntityId>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_by_name(
        &self,
        loader: &dyn ModuleLoader,
        name: &str,
    ) -> Result<EntityId, LiableError> {
        let mut loaded = self.loaded.lock();
        if let Some(&module) = loaded.get(name) {
            return Ok(module);
        }
        let module = loader.load_by_name(name)?;
        tracing::debug!(module = name, "loaded module");
        loaded.insert(name.to_string(), module);
        Ok(module)
    }

    pub fn load_by_path(
        &self,
        loader: &dyn ModuleLoader,
        universe: &Universe,
        path: &Path,
    ) -> Result<EntityId, LiableError> {
        let key = path.display().to_string();
        let mut loaded = self.loaded.lock();
        if let Some(&module) = loaded.get(&key) {
            return Ok(module);
        }
        let known = loader
            .module_name_for_path(path)
            .and_then(|name| loaded.get(&name).copied());
        if let Some(module) = known {
            loaded.insert(key, module);
            return Ok(module);
        }
        let module = loader.load_by_path(path)?;
        tracing::debug!(path = %key, module = universe.name(module), "loaded module from path");
        loaded.insert(key, module);
        loaded.insert(universe.name(module).to_string(), module);
        Ok(module)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.loaded.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.lock().is_empty()
    }
}

/// Loader over the modules already registered in a [`Universe`].
#[derive(Clone, Copy, Debug)]
pub struct UniverseLoader<'u> {
    universe: &'u Universe,
}

impl<'u> UniverseLoader<'u> {
    pub fn new(universe: &'u Universe) -> Self {
        Self { universe }
    }
}

impl ModuleLoader for UniverseLoader<'_> {
    fn load_by_name(&self, name: &str) -> Result<EntityId, LiableError> {
        self.universe
            .module_by_name(name)
            .ok_or_else(|| LiableError::UnknownModule(name.to_string()))
    }

    fn load_by_path(&self, path: &Path) -> Result<EntityId, LiableError> {
        self.universe
            .modules()
            .find(|&module| {
                self.universe
                    .module(module)
                    .and_then(|info| info.file.as_deref())
                    .is_some_and(|file| file == path)
            })
            .ok_or_else(|| LiableError::UnknownModule(path.display().to_string()))
    }
}
