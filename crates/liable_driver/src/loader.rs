use std::path::{Path, PathBuf};

use liable_core::{EntityId, LiableError, ModuleLoader, Universe, path_to_module_path};

/// Loads manifest modules by dotted name or by source path under the project root.
pub struct ManifestLoader<'u> {
    universe: &'u Universe,
    root: PathBuf,
}

impl<'u> ManifestLoader<'u> {
    pub fn new(universe: &'u Universe, root: impl Into<PathBuf>) -> Self {
        Self {
            universe,
            root: root.into(),
        }
    }
}

impl ModuleLoader for ManifestLoader<'_> {
    fn load_by_name(&self, name: &str) -> Result<EntityId, LiableError> {
        self.universe
            .module_by_name(name)
            .ok_or_else(|| LiableError::UnknownModule(name.to_string()))
    }

    fn load_by_path(&self, path: &Path) -> Result<EntityId, LiableError> {
        self.module_name_for_path(path)
            .and_then(|name| self.universe.module_by_name(&name))
            .ok_or_else(|| LiableError::UnknownModule(path.display().to_string()))
    }

    fn module_name_for_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let declared = self.universe.modules().find(|&module| {
            self.universe
                .module(module)
                .and_then(|info| info.file.as_deref())
                .is_some_and(|file| file == relative)
        });
        match declared {
            Some(module) => Some(self.universe.name(module).to_string()),
            None => path_to_module_path(relative).map(|module_path| module_path.to_string()),
        }
    }
}
