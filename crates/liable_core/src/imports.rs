use indexmap::{IndexMap, IndexSet};

use crate::catalog::{ModulePath, ObjectPath, PathKind};
use crate::error::LiableError;

const NAMES_SEPARATOR: &str = ",\n";

/// Partitions `paths` by the module an import directive for each of them would name.
///
/// A named sub-module import (`from pkg import sub`) groups under its parent package. Groups
/// and their members keep first-seen order; duplicates collapse.
pub fn group_by_module<'a>(
    paths: impl IntoIterator<Item = &'a ObjectPath>,
) -> IndexMap<ModulePath, IndexSet<ObjectPath>> {
    let mut groups: IndexMap<ModulePath, IndexSet<ObjectPath>> = IndexMap::new();
    for path in paths {
        groups
            .entry(path.import_module())
            .or_default()
            .insert(path.clone());
    }
    groups
}

/// Import directives for paths that all live in one module.
///
/// Named paths produce one `from module import names` directive listing their sorted, distinct
/// names; any whole-module path adds an `import module` directive. Built-in paths need no
/// directive at all.
pub fn to_imports<'a>(
    paths: impl IntoIterator<Item = &'a ObjectPath>,
) -> Result<Vec<String>, LiableError> {
    let paths: Vec<&ObjectPath> = paths.into_iter().collect();
    let modules: IndexSet<ModulePath> = paths.iter().map(|path| path.import_module()).collect();
    let (Some(module), 1) = (modules.first(), modules.len()) else {
        return Err(LiableError::AmbiguousModuleSet {
            modules: modules.iter().map(ToString::to_string).collect(),
        });
    };
    if paths.iter().any(|path| path.is_built_in()) {
        return Ok(Vec::new());
    }

    let mut directives = Vec::with_capacity(2);
    let mut names: Vec<&str> = paths
        .iter()
        .filter(|path| !path.is_absolute())
        .map(|path| path.object_name())
        .collect();
    names.sort_unstable();
    names.dedup();
    if !names.is_empty() {
        directives.push(format!("from {module} import {}\n", wrap_names(&names)));
    }
    if paths.iter().any(|path| path.kind() == PathKind::Absolute) {
        directives.push(format!("import {module}\n"));
    }
    Ok(directives)
}

fn wrap_names(names: &[&str]) -> String {
    match names {
        [single] => (*single).to_string(),
        _ => format!("({})", names.join(NAMES_SEPARATOR)),
    }
}

/// Directives for arbitrary `paths`, grouped per module in sorted module order.
pub fn imports_for<'a>(
    paths: impl IntoIterator<Item = &'a ObjectPath>,
) -> Result<Vec<String>, LiableError> {
    let mut groups = group_by_module(paths);
    groups.sort_by(|left, _, right, _| left.to_string().cmp(&right.to_string()));
    let mut directives = Vec::new();
    for group in groups.values() {
        directives.extend(to_imports(group)?);
    }
    Ok(directives)
}
