use std::ops::ControlFlow;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::catalog::{
    ContentPath, ModulePath, ModuleRef, ObjectPath, PathKind, SEPARATOR, name_to_module_path,
};
use crate::error::LiableError;
use crate::loader::{
    ALL_OBJECTS_WILDCARD, ImportStatement, ModuleCache, ModuleLoader, absolutize,
};
use crate::universe::{EntityId, Universe};

/// Names visible from a module, keyed by how each one was reached.
///
/// Iteration order is insertion order; resolution results depend on it.
pub type Namespace = IndexMap<ObjectPath, EntityId>;

/// Whether `entity` is one of `namespace`'s values (identity comparison).
pub fn contains_value(namespace: &Namespace, entity: EntityId) -> bool {
    namespace.values().any(|&value| value == entity)
}

/// Combines namespaces; on a key collision the later source wins.
pub fn merge<'a>(sources: impl IntoIterator<Item = &'a Namespace>) -> Namespace {
    let mut merged = Namespace::default();
    for source in sources {
        for (path, &entity) in source {
            merged.insert(path.clone(), entity);
        }
    }
    merged
}

/// Every name the builtins module publishes, needing no import.
pub fn built_ins(universe: &Universe) -> Namespace {
    let builtins = universe.known().builtins;
    let Some(info) = universe.module(builtins) else {
        return Namespace::default();
    };
    info.members
        .iter()
        .map(|(name, &entity)| {
            let name = if entity == universe.known().ellipsis {
                "..."
            } else {
                name.as_str()
            };
            let path = ContentPath::new(ModulePath::built_ins(), name, PathKind::BuiltIn);
            (ObjectPath::Content(path), entity)
        })
        .collect()
}

/// Typing helpers generated code relies on regardless of what a module imports.
pub fn utilities(universe: &Universe) -> Namespace {
    let known = universe.known();
    let typing = ModulePath::root(universe.name(known.typing));
    let mut namespace = Namespace::default();
    namespace.insert(
        ObjectPath::Module(ModulePath::root(universe.name(known.collections))),
        known.collections,
    );
    for entity in [known.any, known.optional, known.tuple_form, known.dict_form] {
        let path = ContentPath::new(typing.clone(), universe.name(entity), PathKind::Relative);
        namespace.insert(ObjectPath::Content(path), entity);
    }
    namespace
}

/// Functions defined by the module the namespace belongs to.
pub fn inner_functions<'a>(
    universe: &'a Universe,
    namespace: &'a Namespace,
) -> impl Iterator<Item = EntityId> + 'a {
    namespace
        .iter()
        .filter(|(path, _)| path.kind() == PathKind::Inner)
        .map(|(_, &entity)| entity)
        .filter(|&entity| universe.function(entity).is_some())
}

/// Builds module namespaces and finds the paths naming an entity within them.
///
/// Built namespaces are memoized per module; modules are loaded through the shared
/// [`ModuleCache`], so each one is loaded at most once however many namespaces refer to it.
pub struct Resolver<'a> {
    universe: &'a Universe,
    loader: &'a dyn ModuleLoader,
    cache: &'a ModuleCache,
    built: Mutex<FxHashMap<EntityId, Arc<Namespace>>>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        universe: &'a Universe,
        loader: &'a dyn ModuleLoader,
        cache: &'a ModuleCache,
    ) -> Self {
        Self {
            universe,
            loader,
            cache,
            built: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn universe(&self) -> &'a Universe {
        self.universe
    }

    pub fn load(&self, name: &str) -> Result<EntityId, LiableError> {
        self.cache.load_by_name(self.loader, name)
    }

    /// Namespace of `module`: what it imports, overridden by what it defines.
    pub fn namespace(&self, module: EntityId) -> Result<Arc<Namespace>, LiableError> {
        if let Some(namespace) = self.built.lock().get(&module) {
            return Ok(Arc::clone(namespace));
        }
        let dependent = self.dependent_objects(module)?;
        let inner = self.inner_objects(module);
        let namespace = Arc::new(merge([&dependent, &inner]));
        tracing::debug!(
            module = self.universe.name(module),
            imported = dependent.len(),
            defined = inner.len(),
            "built namespace"
        );
        let mut built = self.built.lock();
        Ok(Arc::clone(built.entry(module).or_insert(namespace)))
    }

    /// Objects whose home is `module`, under inner kind.
    pub fn inner_objects(&self, module: EntityId) -> Namespace {
        let Some(info) = self.universe.module(module) else {
            return Namespace::default();
        };
        let module_path = name_to_module_path(self.universe.name(module));
        info.members
            .iter()
            .filter(|(_, entity)| self.universe.object_is_defined_in(**entity, module))
            .map(|(name, &entity)| {
                let path = ObjectPath::for_object(
                    self.universe.is_module(entity),
                    module_path.clone(),
                    name.as_str(),
                    PathKind::Inner,
                );
                (path, entity)
            })
            .collect()
    }

    /// Objects `module` imports. Host modules import nothing.
    pub fn dependent_objects(&self, module: EntityId) -> Result<Namespace, LiableError> {
        let Some(info) = self.universe.module(module) else {
            return Err(LiableError::UnknownModule(self.universe.name(module).to_string()));
        };
        let mut namespace = Namespace::default();
        if info.host {
            return Ok(namespace);
        }
        let module_name = self.universe.name(module);
        for statement in &info.imports {
            match absolutize(statement, module_name, info.is_package())? {
                ImportStatement::Import { modules } => {
                    for name in &modules {
                        let imported = self.load(name)?;
                        namespace.insert(ObjectPath::Module(name_to_module_path(name)), imported);
                    }
                }
                ImportStatement::ImportFrom {
                    module: Some(source),
                    names,
                    ..
                } => self.import_from(&source, &names, &mut namespace)?,
                ImportStatement::ImportFrom { module: None, names, .. } => {
                    return Err(LiableError::UnresolvedImport {
                        module: String::new(),
                        object: names.join(", "),
                    });
                }
            }
        }
        Ok(namespace)
    }

    fn import_from(
        &self,
        source: &str,
        names: &[String],
        namespace: &mut Namespace,
    ) -> Result<(), LiableError> {
        let imported = self.load(source)?;
        let source_path = name_to_module_path(source);
        let mut expanded: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if name == ALL_OBJECTS_WILDCARD {
                if let Some(info) = self.universe.module(imported) {
                    expanded.extend(info.published_names());
                }
            } else {
                expanded.push(name.clone());
            }
        }
        for name in expanded {
            let entity = match self.universe.member(imported, &name) {
                Some(entity) => entity,
                None => self
                    .load(&format!("{source}{SEPARATOR}{name}"))
                    .map_err(|_| LiableError::UnresolvedImport {
                        module: source.to_string(),
                        object: name.clone(),
                    })?,
            };
            let path = ObjectPath::for_object(
                self.universe.is_module(entity),
                source_path.clone(),
                name,
                PathKind::Relative,
            );
            namespace.insert(path, entity);
        }
        Ok(())
    }

    /// Whether `entity` is directly visible in `namespace`.
    pub fn is_relative(&self, entity: EntityId, namespace: &Namespace) -> bool {
        contains_value(namespace, entity)
    }

    /// Every path naming `entity` from `namespace`, in resolution order.
    pub fn search_paths(
        &self,
        entity: EntityId,
        namespace: &Namespace,
    ) -> Result<Vec<ObjectPath>, LiableError> {
        let mut found = Vec::new();
        self.visit_paths(entity, namespace, &mut |path| {
            found.push(path);
            ControlFlow::Continue(())
        })?;
        Ok(found)
    }

    /// First path naming `entity` from `namespace`.
    pub fn search_path(
        &self,
        entity: EntityId,
        namespace: &Namespace,
    ) -> Result<ObjectPath, LiableError> {
        let mut first = None;
        self.visit_paths(entity, namespace, &mut |path| {
            first = Some(path);
            ControlFlow::Break(())
        })?;
        first.ok_or_else(|| LiableError::NotFound {
            object: self.universe.qualified_name(entity),
        })
    }

    /// Source text naming `entity` from `namespace`.
    pub fn search_name(
        &self,
        entity: EntityId,
        namespace: &Namespace,
    ) -> Result<String, LiableError> {
        let path = self.search_path(entity, namespace)?;
        if path.kind() != PathKind::Absolute {
            return Ok(path.object_name().to_string());
        }
        let owner = match &path {
            ObjectPath::Module(module) => match &module.module {
                ModuleRef::Nested(parent) => Some(parent.as_ref()),
                ModuleRef::Root(_) => None,
            },
            ObjectPath::Content(content) => Some(&content.module),
        };
        match owner {
            Some(owner) if owner.kind == PathKind::Relative => {
                Ok(format!("{}{SEPARATOR}{}", owner.name(), path.object_name()))
            }
            _ => Ok(path.to_string()),
        }
    }

    fn visit_paths(
        &self,
        entity: EntityId,
        namespace: &Namespace,
        visit: &mut dyn FnMut(ObjectPath) -> ControlFlow<()>,
    ) -> Result<ControlFlow<()>, LiableError> {
        if self.is_relative(entity, namespace) {
            for (path, &value) in namespace {
                if value == entity {
                    tracing::trace!(%path, "relative candidate");
                    if visit(path.clone()).is_break() {
                        return Ok(ControlFlow::Break(()));
                    }
                }
            }
            return Ok(ControlFlow::Continue(()));
        }
        let mut visited = FxHashSet::default();
        self.visit_absolute_paths(entity, namespace, &mut visited, visit)
    }

    fn visit_absolute_paths(
        &self,
        entity: EntityId,
        namespace: &Namespace,
        visited: &mut FxHashSet<EntityId>,
        visit: &mut dyn FnMut(ObjectPath) -> ControlFlow<()>,
    ) -> Result<ControlFlow<()>, LiableError> {
        let mut sub_namespaces = Vec::new();
        for (path, &value) in namespace {
            let ObjectPath::Module(module_path) = path else {
                continue;
            };
            if !self.universe.is_module(value) || !visited.insert(value) {
                continue;
            }
            let sub_namespace = self.namespace(value)?;
            for (sub_path, &sub_value) in sub_namespace.iter() {
                if sub_value != entity {
                    continue;
                }
                let candidate = ObjectPath::for_object(
                    self.universe.is_module(sub_value),
                    module_path.clone(),
                    sub_path.object_name(),
                    PathKind::Absolute,
                );
                tracing::trace!(path = %candidate, "absolute candidate");
                if visit(candidate).is_break() {
                    return Ok(ControlFlow::Break(()));
                }
            }
            sub_namespaces.push(sub_namespace);
        }
        for sub_namespace in sub_namespaces {
            if self
                .visit_absolute_paths(entity, &sub_namespace, visited, visit)?
                .is_break()
            {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("built", &self.built.lock().len())
            .finish_non_exhaustive()
    }
}
