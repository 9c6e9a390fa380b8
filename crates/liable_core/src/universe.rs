use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::error::LiableError;
use crate::loader::ImportStatement;
use crate::signature::ParameterKind;

/// Identity handle of a reflected runtime entity.
///
/// Two handles are equal if and only if they denote the same entity; structurally equal
/// entities registered twice get distinct handles.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub name: String,
    /// Module the entity was defined in, if any.
    pub home: Option<EntityId>,
    pub kind: EntityKind,
}

#[derive(Clone, Debug)]
pub enum EntityKind {
    Module(ModuleInfo),
    Class(ClassInfo),
    Function(FunctionInfo),
    Value,
    Form(Form),
}

#[derive(Clone, Debug, Default)]
pub struct ModuleInfo {
    pub file: Option<PathBuf>,
    /// Host-provided modules contribute only their own definitions to a namespace.
    pub host: bool,
    pub members: IndexMap<String, EntityId>,
    /// Explicitly published names, used to expand wildcard imports.
    pub exports: Option<Vec<String>>,
    pub imports: Vec<ImportStatement>,
}

impl ModuleInfo {
    pub fn host() -> Self {
        Self {
            host: true,
            ..Self::default()
        }
    }

    pub fn is_package(&self) -> bool {
        self.file
            .as_deref()
            .and_then(|file| file.file_stem())
            .is_some_and(|stem| stem == "__init__")
    }

    /// Names a wildcard import of this module brings in.
    pub fn published_names(&self) -> Vec<String> {
        match &self.exports {
            Some(exports) => exports.clone(),
            None => self.members.keys().cloned().collect(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClassInfo {
    pub bases: Vec<EntityId>,
    pub initializer: Option<EntityId>,
}

#[derive(Clone, Debug)]
pub struct FunctionInfo {
    pub parameters: Vec<RawParameter>,
    pub return_annotation: EntityId,
}

#[derive(Clone, Debug)]
pub struct RawParameter {
    pub name: String,
    pub kind: ParameterKind,
    pub annotation: EntityId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormKind {
    /// The unconstrained `Any` marker.
    Any,
    /// Typing-shaped object without a recoverable origin (type variables and the like).
    Opaque,
    /// Typing-shaped object that is neither a union, a callable nor a generic container.
    Special,
    Union,
    Callable,
    Generic,
}

/// A typing-shaped object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Form {
    pub kind: FormKind,
    /// The unsubscripted form (`List` for `List[int]`, the union marker for `Union[...]`).
    pub origin: Option<EntityId>,
    /// Runtime type backing the form (`list` for `List`).
    pub container: Option<EntityId>,
    /// Captured type arguments; callables store parameters followed by the return type.
    pub arguments: Vec<EntityId>,
}

impl Form {
    pub fn new(kind: FormKind) -> Self {
        Self {
            kind,
            origin: None,
            container: None,
            arguments: Vec::new(),
        }
    }

    pub fn generic(container: EntityId) -> Self {
        Self {
            container: Some(container),
            ..Self::new(FormKind::Generic)
        }
    }

    pub fn callable(container: EntityId) -> Self {
        Self {
            container: Some(container),
            ..Self::new(FormKind::Callable)
        }
    }
}

/// Handles of the entities the algebra needs to recognise.
#[derive(Clone, Debug)]
pub struct Known {
    pub builtins: EntityId,
    pub typing: EntityId,
    pub collections: EntityId,
    pub collections_abc: EntityId,
    /// The universal base type.
    pub object: EntityId,
    pub type_: EntityId,
    pub int: EntityId,
    pub bool_: EntityId,
    pub float: EntityId,
    pub str_: EntityId,
    pub list: EntityId,
    pub tuple: EntityId,
    pub dict: EntityId,
    /// The null sentinel.
    pub none: EntityId,
    pub none_type: EntityId,
    /// Runtime type of plain functions.
    pub function: EntityId,
    pub ellipsis: EntityId,
    /// Stands in for a parameter or return value that carries no annotation.
    pub empty: EntityId,
    pub callable_type: EntityId,
    pub any: EntityId,
    pub union: EntityId,
    pub optional: EntityId,
    pub callable: EntityId,
    pub tuple_form: EntityId,
    pub dict_form: EntityId,
}

/// Append-only arena of reflected entities plus the module registry.
#[derive(Clone, Debug)]
pub struct Universe {
    entities: Vec<Entity>,
    modules: FxHashMap<String, EntityId>,
    subscripts: FxHashMap<(EntityId, Vec<EntityId>), EntityId>,
    known: Known,
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

impl Universe {
    /// Creates a universe seeded with the host modules (`builtins`, `collections`,
    /// `collections.abc`, `typing`).
    pub fn new() -> Self {
        let mut seed = Seed::default();
        let known = seed.host_modules();
        Self {
            entities: seed.entities,
            modules: seed.modules,
            subscripts: FxHashMap::default(),
            known,
        }
    }

    pub fn known(&self) -> &Known {
        &self.known
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0 as usize]
    }

    pub fn name(&self, id: EntityId) -> &str {
        &self.entity(id).name
    }

    /// `module.name`, or the bare name for entities without a home.
    pub fn qualified_name(&self, id: EntityId) -> String {
        let entity = self.entity(id);
        match entity.home {
            Some(home) if home != id && home != self.known.builtins => {
                format!("{}.{}", self.name(home), entity.name)
            }
            _ => entity.name.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn module(&self, id: EntityId) -> Option<&ModuleInfo> {
        match &self.entity(id).kind {
            EntityKind::Module(info) => Some(info),
            _ => None,
        }
    }

    pub fn module_mut(&mut self, id: EntityId) -> Option<&mut ModuleInfo> {
        match &mut self.entities[id.0 as usize].kind {
            EntityKind::Module(info) => Some(info),
            _ => None,
        }
    }

    pub fn class(&self, id: EntityId) -> Option<&ClassInfo> {
        match &self.entity(id).kind {
            EntityKind::Class(info) => Some(info),
            _ => None,
        }
    }

    pub fn function(&self, id: EntityId) -> Option<&FunctionInfo> {
        match &self.entity(id).kind {
            EntityKind::Function(info) => Some(info),
            _ => None,
        }
    }

    pub fn form(&self, id: EntityId) -> Option<&Form> {
        match &self.entity(id).kind {
            EntityKind::Form(form) => Some(form),
            _ => None,
        }
    }

    pub fn is_module(&self, id: EntityId) -> bool {
        self.module(id).is_some()
    }

    pub fn module_by_name(&self, name: &str) -> Option<EntityId> {
        self.modules.get(name).copied()
    }

    pub fn modules(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, entity)| matches!(entity.kind, EntityKind::Module(_)))
            .map(|(index, _)| EntityId(index as u32))
    }

    pub fn classes(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, entity)| matches!(entity.kind, EntityKind::Class(_)))
            .map(|(index, _)| EntityId(index as u32))
    }

    pub fn is_host_module(&self, id: EntityId) -> bool {
        self.module(id).is_some_and(|info| info.host)
    }

    /// Whether `object`'s home is exactly `module`, the module itself excluded.
    pub fn object_is_defined_in(&self, object: EntityId, module: EntityId) -> bool {
        object != module && self.entity(object).home == Some(module)
    }

    /// Looks `name` up among `module`'s members.
    pub fn member(&self, module: EntityId, name: &str) -> Option<EntityId> {
        self.module(module)?.members.get(name).copied()
    }

    pub fn add_module(&mut self, name: impl Into<String>, info: ModuleInfo) -> EntityId {
        let name = name.into();
        let id = self.push(Entity {
            name: name.clone(),
            home: None,
            kind: EntityKind::Module(info),
        });
        self.modules.insert(name, id);
        id
    }

    pub fn add_class(
        &mut self,
        module: EntityId,
        name: impl Into<String>,
        bases: Vec<EntityId>,
    ) -> EntityId {
        let bases = if bases.is_empty() {
            vec![self.known.object]
        } else {
            bases
        };
        self.define(
            module,
            name.into(),
            EntityKind::Class(ClassInfo {
                bases,
                initializer: None,
            }),
        )
    }

    pub fn add_function(
        &mut self,
        module: EntityId,
        name: impl Into<String>,
        parameters: Vec<RawParameter>,
        return_annotation: Option<EntityId>,
    ) -> EntityId {
        let return_annotation = return_annotation.unwrap_or(self.known.empty);
        self.define(
            module,
            name.into(),
            EntityKind::Function(FunctionInfo {
                parameters,
                return_annotation,
            }),
        )
    }

    pub fn add_value(&mut self, module: EntityId, name: impl Into<String>) -> EntityId {
        self.define(module, name.into(), EntityKind::Value)
    }

    /// Registers a typing-shaped object defined in `module`.
    pub fn add_form(
        &mut self,
        module: EntityId,
        name: impl Into<String>,
        form: Form,
    ) -> Result<EntityId, LiableError> {
        let name = name.into();
        validate_form(&name, &form)?;
        Ok(self.define(module, name, EntityKind::Form(form)))
    }

    /// Replaces the declared bases of `class`; no bases means the universal base.
    pub fn set_bases(&mut self, class: EntityId, bases: Vec<EntityId>) {
        let bases = if bases.is_empty() {
            vec![self.known.object]
        } else {
            bases
        };
        if let EntityKind::Class(info) = &mut self.entities[class.0 as usize].kind {
            info.bases = bases;
        }
    }

    /// Registers the constructor of `class`. It shares the class's home module but is not
    /// bound in it.
    pub fn add_initializer(&mut self, class: EntityId, parameters: Vec<RawParameter>) -> EntityId {
        let home = self.entity(class).home;
        let initializer = self.push(Entity {
            name: "__init__".to_string(),
            home,
            kind: EntityKind::Function(FunctionInfo {
                parameters,
                return_annotation: self.known.none,
            }),
        });
        if let EntityKind::Class(info) = &mut self.entities[class.0 as usize].kind {
            info.initializer = Some(initializer);
        }
        initializer
    }

    /// Binds an existing entity under `name` in `module` without changing its home.
    pub fn bind(&mut self, module: EntityId, name: impl Into<String>, entity: EntityId) {
        if let Some(info) = self.module_mut(module) {
            info.members.insert(name.into(), entity);
        }
    }

    /// Subscripts a typing form, e.g. `List` with `[int]`.
    ///
    /// Results are interned: the same origin and arguments always produce the same handle.
    /// Unions flatten nested unions, drop repeated arguments and collapse to their only
    /// argument; `Optional[X]` becomes `Union[X, None]`.
    pub fn subscript(
        &mut self,
        origin: EntityId,
        arguments: Vec<EntityId>,
    ) -> Result<EntityId, LiableError> {
        if origin == self.known.optional {
            let mut arguments = arguments;
            arguments.push(self.known.none_type);
            return self.subscript(self.known.union, arguments);
        }
        if origin == self.known.union {
            let mut flattened = Vec::with_capacity(arguments.len());
            for argument in arguments {
                let members = match self.form(argument) {
                    Some(form) if form.kind == FormKind::Union => form.arguments.clone(),
                    _ => vec![argument],
                };
                for member in members {
                    if !flattened.contains(&member) {
                        flattened.push(member);
                    }
                }
            }
            if let [single] = flattened.as_slice() {
                return Ok(*single);
            }
            return self.intern_subscript(origin, flattened, FormKind::Union, None);
        }
        let Some(form) = self.form(origin) else {
            return Err(LiableError::MalformedAnnotationNode {
                object: self.qualified_name(origin),
                reason: "object is not subscriptable".to_string(),
            });
        };
        match form.kind {
            FormKind::Callable | FormKind::Generic => {
                let kind = form.kind;
                let container = form.container;
                self.intern_subscript(origin, arguments, kind, container)
            }
            _ => Err(LiableError::MalformedAnnotationNode {
                object: self.qualified_name(origin),
                reason: "object is not subscriptable".to_string(),
            }),
        }
    }

    fn intern_subscript(
        &mut self,
        origin: EntityId,
        arguments: Vec<EntityId>,
        kind: FormKind,
        container: Option<EntityId>,
    ) -> Result<EntityId, LiableError> {
        let key = (origin, arguments);
        if let Some(&id) = self.subscripts.get(&key) {
            return Ok(id);
        }
        let (origin, arguments) = key;
        let name = self.subscript_name(origin, kind, &arguments);
        let form = Form {
            kind,
            origin: Some(origin),
            container,
            arguments: arguments.clone(),
        };
        validate_form(&name, &form)?;
        let home = self.entity(origin).home;
        let id = self.push(Entity {
            name,
            home,
            kind: EntityKind::Form(form),
        });
        self.subscripts.insert((origin, arguments), id);
        Ok(id)
    }

    fn subscript_name(&self, origin: EntityId, kind: FormKind, arguments: &[EntityId]) -> String {
        let names: Vec<&str> = arguments
            .iter()
            .map(|argument| {
                if *argument == self.known.none_type {
                    "None"
                } else {
                    self.name(*argument)
                }
            })
            .collect();
        match (kind, names.split_last()) {
            (FormKind::Callable, Some((returns, parameters))) => {
                if parameters == ["..."] || parameters == ["Ellipsis"] {
                    format!("{}[..., {returns}]", self.name(origin))
                } else {
                    format!("{}[[{}], {returns}]", self.name(origin), parameters.join(", "))
                }
            }
            _ => format!("{}[{}]", self.name(origin), names.join(", ")),
        }
    }

    fn define(&mut self, module: EntityId, name: String, kind: EntityKind) -> EntityId {
        let id = self.push(Entity {
            name: name.clone(),
            home: Some(module),
            kind,
        });
        self.bind(module, name, id);
        id
    }

    fn push(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(entity);
        id
    }
}

fn validate_form(name: &str, form: &Form) -> Result<(), LiableError> {
    let reason = match form.kind {
        FormKind::Union if form.origin.is_none() => Some("union without origin"),
        FormKind::Union if form.arguments.is_empty() => Some("union without arguments"),
        FormKind::Callable | FormKind::Generic if form.container.is_none() => {
            Some("container form without runtime type")
        }
        _ => None,
    };
    match reason {
        Some(reason) => Err(LiableError::MalformedAnnotationNode {
            object: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

#[derive(Default)]
struct Seed {
    entities: Vec<Entity>,
    modules: FxHashMap<String, EntityId>,
}

impl Seed {
    fn push(&mut self, name: &str, home: Option<EntityId>, kind: EntityKind) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(Entity {
            name: name.to_string(),
            home,
            kind,
        });
        if let Some(home) = home {
            if let EntityKind::Module(info) = &mut self.entities[home.0 as usize].kind {
                info.members.insert(name.to_string(), id);
            }
        }
        id
    }

    fn module(&mut self, name: &str) -> EntityId {
        let id = self.push(name, None, EntityKind::Module(ModuleInfo::host()));
        self.modules.insert(name.to_string(), id);
        id
    }

    fn class(&mut self, module: EntityId, name: &str, bases: &[EntityId]) -> EntityId {
        self.push(
            name,
            Some(module),
            EntityKind::Class(ClassInfo {
                bases: bases.to_vec(),
                initializer: None,
            }),
        )
    }

    fn form(&mut self, module: EntityId, name: &str, form: Form) -> EntityId {
        self.push(name, Some(module), EntityKind::Form(form))
    }

    fn host_modules(&mut self) -> Known {
        let builtins = self.module("builtins");
        let object = self.class(builtins, "object", &[]);
        let type_ = self.class(builtins, "type", &[object]);
        let int = self.class(builtins, "int", &[object]);
        let bool_ = self.class(builtins, "bool", &[int]);
        let float = self.class(builtins, "float", &[object]);
        self.class(builtins, "complex", &[object]);
        let str_ = self.class(builtins, "str", &[object]);
        self.class(builtins, "bytes", &[object]);
        self.class(builtins, "bytearray", &[object]);
        let list = self.class(builtins, "list", &[object]);
        let tuple = self.class(builtins, "tuple", &[object]);
        let dict = self.class(builtins, "dict", &[object]);
        let set = self.class(builtins, "set", &[object]);
        let frozenset = self.class(builtins, "frozenset", &[object]);
        let base_exception = self.class(builtins, "BaseException", &[object]);
        let exception = self.class(builtins, "Exception", &[base_exception]);
        self.class(builtins, "ValueError", &[exception]);
        self.class(builtins, "TypeError", &[exception]);
        let none = self.push("None", Some(builtins), EntityKind::Value);
        let ellipsis = self.push("Ellipsis", Some(builtins), EntityKind::Value);
        let none_type = self.push(
            "NoneType",
            Some(builtins),
            EntityKind::Class(ClassInfo {
                bases: vec![object],
                initializer: None,
            }),
        );
        let function = self.class(builtins, "function", &[object]);
        // Neither is published by `builtins`.
        if let EntityKind::Module(info) = &mut self.entities[builtins.0 as usize].kind {
            info.members.shift_remove("NoneType");
            info.members.shift_remove("function");
        }
        let empty = self.push("_empty", None, EntityKind::Value);

        let collections = self.module("collections");
        let collections_abc = self.module("collections.abc");
        if let EntityKind::Module(info) = &mut self.entities[collections.0 as usize].kind {
            info.members.insert("abc".to_string(), collections_abc);
        }
        self.class(collections_abc, "Hashable", &[object]);
        let iterable = self.class(collections_abc, "Iterable", &[object]);
        let sized = self.class(collections_abc, "Sized", &[object]);
        let container = self.class(collections_abc, "Container", &[object]);
        let collection =
            self.class(collections_abc, "Collection", &[sized, iterable, container]);
        let sequence = self.class(collections_abc, "Sequence", &[collection]);
        self.class(collections_abc, "MutableSequence", &[sequence]);
        let abstract_set = self.class(collections_abc, "Set", &[collection]);
        self.class(collections_abc, "MutableSet", &[abstract_set]);
        let mapping = self.class(collections_abc, "Mapping", &[collection]);
        self.class(collections_abc, "MutableMapping", &[mapping]);
        let callable_type = self.class(collections_abc, "Callable", &[object]);
        self.class(collections, "OrderedDict", &[dict]);
        self.class(collections, "defaultdict", &[dict]);
        self.class(collections, "deque", &[object]);

        let typing = self.module("typing");
        let any = self.form(typing, "Any", Form::new(FormKind::Any));
        let union = self.form(typing, "Union", Form::new(FormKind::Special));
        let optional = self.form(typing, "Optional", Form::new(FormKind::Special));
        let callable = self.form(typing, "Callable", Form::callable(callable_type));
        self.form(typing, "List", Form::generic(list));
        let tuple_form = self.form(typing, "Tuple", Form::generic(tuple));
        let dict_form = self.form(typing, "Dict", Form::generic(dict));
        self.form(typing, "Set", Form::generic(set));
        self.form(typing, "FrozenSet", Form::generic(frozenset));
        self.form(typing, "Iterable", Form::generic(iterable));
        self.form(typing, "Sequence", Form::generic(sequence));
        self.form(typing, "Mapping", Form::generic(mapping));
        self.form(typing, "Type", Form::generic(type_));
        self.form(typing, "ClassVar", Form::new(FormKind::Special));
        self.form(typing, "TypeVar", Form::new(FormKind::Opaque));

        Known {
            builtins,
            typing,
            collections,
            collections_abc,
            object,
            type_,
            int,
            bool_,
            float,
            str_,
            list,
            tuple,
            dict,
            none,
            none_type,
            function,
            ellipsis,
            empty,
            callable_type,
            any,
            union,
            optional,
            callable,
            tuple_form,
            dict_form,
        }
    }
}
