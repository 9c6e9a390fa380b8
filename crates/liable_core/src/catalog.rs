use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

pub const SEPARATOR: &str = ".";
pub const BUILT_INS_MODULE: &str = "builtins";
pub const INIT_MODULE_NAME: &str = "__init__";

const MODULE_SUFFIXES: &[&str] = &[".py", ".pyw", ".pyc", ".pyd", ".so"];

/// How a symbol was reached from the namespace it was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathKind {
    /// Defined by the module the namespace belongs to.
    Inner,
    /// Reached through a whole-module import.
    Absolute,
    /// Reached through a named import.
    Relative,
    /// Always available, needs no import.
    BuiltIn,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModuleRef {
    Root(String),
    Nested(Box<ModulePath>),
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleRef::Root(name) => f.write_str(name),
            ModuleRef::Nested(path) => fmt::Display::fmt(path, f),
        }
    }
}

/// Reference to a module, or to a sub-module through its parent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModulePath {
    pub module: ModuleRef,
    pub object: Option<String>,
    pub kind: PathKind,
}

impl ModulePath {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            module: ModuleRef::Root(name.into()),
            object: None,
            kind: PathKind::Absolute,
        }
    }

    pub fn nested(parent: ModulePath, object: impl Into<String>, kind: PathKind) -> Self {
        Self {
            module: ModuleRef::Nested(Box::new(parent)),
            object: Some(object.into()),
            kind,
        }
    }

    pub fn built_ins() -> Self {
        Self::root(BUILT_INS_MODULE)
    }

    /// The enclosing module path; a root path is its own parent.
    pub fn parent(&self) -> ModulePath {
        match &self.module {
            ModuleRef::Nested(parent) => parent.as_ref().clone(),
            ModuleRef::Root(_) => self.clone(),
        }
    }

    /// The outermost package path.
    pub fn top(&self) -> ModulePath {
        match &self.module {
            ModuleRef::Nested(parent) => parent.top(),
            ModuleRef::Root(_) => self.clone(),
        }
    }

    /// Last segment of the dotted name.
    pub fn name(&self) -> &str {
        match (&self.object, &self.module) {
            (Some(object), _) => object,
            (None, ModuleRef::Root(name)) => name,
            (None, ModuleRef::Nested(parent)) => parent.name(),
        }
    }

    pub fn with_kind(mut self, kind: PathKind) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.module, f)?;
        if let Some(object) = &self.object {
            write!(f, "{SEPARATOR}{object}")?;
        }
        Ok(())
    }
}

/// Reference to a non-module object inside a module.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentPath {
    pub module: ModulePath,
    pub object: String,
    pub kind: PathKind,
}

impl ContentPath {
    pub fn new(module: ModulePath, object: impl Into<String>, kind: PathKind) -> Self {
        Self {
            module,
            object: object.into(),
            kind,
        }
    }

    pub fn is_built_in(&self) -> bool {
        self.kind == PathKind::BuiltIn || self.module == ModulePath::built_ins()
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_built_in() {
            return f.write_str(&self.object);
        }
        write!(f, "{}{SEPARATOR}{}", self.module, self.object)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectPath {
    Module(ModulePath),
    Content(ContentPath),
}

impl ObjectPath {
    /// Builds a module or content path depending on what `object` is.
    pub fn for_object(
        is_module: bool,
        module: ModulePath,
        object: impl Into<String>,
        kind: PathKind,
    ) -> Self {
        if is_module {
            ObjectPath::Module(ModulePath::nested(module, object, kind))
        } else {
            ObjectPath::Content(ContentPath::new(module, object, kind))
        }
    }

    pub fn kind(&self) -> PathKind {
        match self {
            ObjectPath::Module(path) => path.kind,
            ObjectPath::Content(path) => path.kind,
        }
    }

    /// Name the object is bound to in its module.
    pub fn object_name(&self) -> &str {
        match self {
            ObjectPath::Module(path) => path.name(),
            ObjectPath::Content(path) => &path.object,
        }
    }

    /// The path itself for modules, the owning module for contents.
    pub fn module_path(&self) -> &ModulePath {
        match self {
            ObjectPath::Module(path) => path,
            ObjectPath::Content(path) => &path.module,
        }
    }

    /// Module an import directive for this path names.
    pub fn import_module(&self) -> ModulePath {
        match self {
            ObjectPath::Module(path) if path.kind == PathKind::Relative => path.parent(),
            ObjectPath::Module(path) => path.clone(),
            ObjectPath::Content(path) => path.module.clone(),
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.kind() == PathKind::Absolute
    }

    pub fn is_built_in(&self) -> bool {
        match self {
            ObjectPath::Module(path) => {
                path.kind == PathKind::BuiltIn || *path == ModulePath::built_ins()
            }
            ObjectPath::Content(path) => path.is_built_in(),
        }
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectPath::Module(path) => fmt::Display::fmt(path, f),
            ObjectPath::Content(path) => fmt::Display::fmt(path, f),
        }
    }
}

/// `"a.b.c"` → `a` / `b` / `c`, every level with absolute kind.
pub fn name_to_module_path(full_name: &str) -> ModulePath {
    match full_name.rsplit_once(SEPARATOR) {
        Some((package, name)) => {
            ModulePath::nested(name_to_module_path(package), name, PathKind::Absolute)
        }
        None => ModulePath::root(full_name),
    }
}

/// Module path of a source file given relative to an import root.
///
/// Package initializers collapse to their directory; names that are not module files are kept
/// verbatim. Returns `None` when nothing names a module (e.g. a bare `__init__.py`).
pub fn path_to_module_path(path: &Path) -> Option<ModulePath> {
    let mut segments: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => {
                segments.pop();
            }
            _ => {}
        }
    }
    let file_name = segments.pop()?;
    if let Some(module_name) = to_module_name(&file_name) {
        segments.push(module_name);
    }
    let (first, rest) = segments.split_first()?;
    let mut module_path = ModulePath::root(first.clone());
    for segment in rest {
        module_path = ModulePath::nested(module_path, segment.clone(), PathKind::Absolute);
    }
    Some(module_path)
}

fn to_module_name(file_name: &str) -> Option<String> {
    let stem = MODULE_SUFFIXES
        .iter()
        .find_map(|suffix| file_name.strip_suffix(suffix))
        .unwrap_or(file_name);
    (stem != INIT_MODULE_NAME).then(|| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_names_nest_absolute_levels() {
        let path = name_to_module_path("pkg.sub.mod");
        assert_eq!(path.to_string(), "pkg.sub.mod");
        assert_eq!(path.kind, PathKind::Absolute);
        assert_eq!(path.top(), ModulePath::root("pkg"));
        assert_eq!(path.parent(), name_to_module_path("pkg.sub"));
    }

    #[test]
    fn file_paths_become_module_paths() {
        let module = path_to_module_path(Path::new("pkg/sub/mod.py"));
        assert_eq!(module, Some(name_to_module_path("pkg.sub.mod")));

        let package = path_to_module_path(Path::new("pkg/sub/__init__.py"));
        assert_eq!(package, Some(name_to_module_path("pkg.sub")));

        let normalized = path_to_module_path(Path::new("pkg/other/../mod.py"));
        assert_eq!(normalized, Some(name_to_module_path("pkg.mod")));

        assert_eq!(path_to_module_path(Path::new("__init__.py")), None);
    }

    #[test]
    fn built_in_contents_render_bare() {
        let built_in = ContentPath::new(ModulePath::built_ins(), "int", PathKind::BuiltIn);
        assert_eq!(built_in.to_string(), "int");

        let inner = ContentPath::new(name_to_module_path("pkg.mod"), "f", PathKind::Inner);
        assert_eq!(inner.to_string(), "pkg.mod.f");
    }

    #[test]
    fn kinds_are_part_of_identity() {
        let module = name_to_module_path("pkg.mod");
        let relative = ContentPath::new(module.clone(), "f", PathKind::Relative);
        let absolute = ContentPath::new(module, "f", PathKind::Absolute);
        assert_ne!(relative, absolute);
        assert_eq!(relative.to_string(), absolute.to_string());
    }

    #[test]
    fn relative_sub_modules_import_from_their_parent() {
        let sub = ModulePath::nested(ModulePath::root("pkg"), "sub", PathKind::Relative);
        let path = ObjectPath::Module(sub);
        assert_eq!(path.import_module(), ModulePath::root("pkg"));
        assert_eq!(path.object_name(), "sub");
    }
}
