use indexmap::IndexMap;
use liable_core::loader::ALL_OBJECTS_WILDCARD;
use liable_core::{
    EntityId, ImportStatement, ModuleInfo, RawParameter, SEPARATOR, Universe, absolutize,
};

use crate::DriverError;
use crate::expr::{TypeArgument, TypeExpr, parse_annotation};
use crate::manifest::{Manifest, ModuleSpec, ParameterSpec};

/// Registers every manifest module in a fresh universe.
///
/// Definitions are registered first and annotations resolved last, so modules may refer to each
/// other regardless of the order they are listed in.
pub fn build_universe(manifest: &Manifest) -> Result<Universe, DriverError> {
    let mut universe = Universe::new();

    let mut modules = Vec::with_capacity(manifest.modules.len());
    for spec in &manifest.modules {
        if universe.module_by_name(&spec.name).is_some() {
            return Err(DriverError::Manifest(format!(
                "module `{}` is declared twice",
                spec.name
            )));
        }
        let info = ModuleInfo {
            file: spec.file.clone(),
            host: false,
            members: Default::default(),
            exports: spec.exports.clone(),
            imports: spec.imports.iter().map(|import| import.to_statement()).collect(),
        };
        modules.push((spec, universe.add_module(&spec.name, info)));
    }

    for (spec, module) in &modules {
        if let Some((parent, child)) = spec.name.rsplit_once(SEPARATOR) {
            if let Some(package) = universe.module_by_name(parent) {
                universe.bind(package, child, *module);
            }
        }
        for class in &spec.classes {
            universe.add_class(*module, &class.name, vec![]);
        }
        for value in &spec.values {
            universe.add_value(*module, &value.name);
        }
    }

    bind_imports(&mut universe, &modules);

    for (spec, module) in &modules {
        define_classes(&mut universe, spec, *module)?;
    }
    for (spec, module) in &modules {
        for function in &spec.functions {
            let parameters = raw_parameters(&mut universe, *module, &function.parameters)?;
            let returns = match &function.returns {
                Some(text) => Some(resolve_annotation(&mut universe, *module, text)?),
                None => None,
            };
            universe.add_function(*module, &function.name, parameters, returns);
        }
    }

    tracing::debug!(
        modules = modules.len(),
        entities = universe.len(),
        "built universe from manifest"
    );
    Ok(universe)
}

/// Binds imported names into their importing modules until nothing changes, so re-exported
/// names resolve whatever order their modules come in. Names a module defines itself are never
/// rebound.
fn bind_imports(universe: &mut Universe, modules: &[(&ModuleSpec, EntityId)]) {
    // Each pass can only propagate a binding one import edge further.
    for _ in 0..=modules.len() {
        let mut changed = false;
        for (spec, module) in modules {
            let is_package = universe.module(*module).is_some_and(ModuleInfo::is_package);
            let mut bindings: IndexMap<String, EntityId> = IndexMap::new();
            for import in &spec.imports {
                let statement = absolutize(&import.to_statement(), &spec.name, is_package);
                let Ok(statement) = statement else {
                    continue;
                };
                bindings.extend(imported_bindings(universe, &statement));
            }
            for (name, entity) in bindings {
                let current = universe.member(*module, &name);
                let defined_here = current
                    .is_some_and(|defined| universe.object_is_defined_in(defined, *module));
                if current == Some(entity) || defined_here {
                    continue;
                }
                universe.bind(*module, name, entity);
                changed = true;
            }
        }
        if !changed {
            return;
        }
    }
}

/// Names an import statement binds. Unresolvable imports bind nothing here; namespace building
/// reports them.
fn imported_bindings(universe: &Universe, statement: &ImportStatement) -> Vec<(String, EntityId)> {
    match statement {
        ImportStatement::Import { modules } => modules
            .iter()
            .filter_map(|name| {
                let top = name.split(SEPARATOR).next().unwrap_or(name);
                universe
                    .module_by_name(top)
                    .map(|module| (top.to_string(), module))
            })
            .collect(),
        ImportStatement::ImportFrom { module, names, .. } => {
            let Some(source) = module.as_deref().and_then(|name| universe.module_by_name(name))
            else {
                return Vec::new();
            };
            let source_name = universe.name(source);
            let mut bindings = Vec::new();
            for name in names {
                if name == ALL_OBJECTS_WILDCARD {
                    let published = universe
                        .module(source)
                        .map(ModuleInfo::published_names)
                        .unwrap_or_default();
                    bindings.extend(published.into_iter().filter_map(|name| {
                        let entity = universe.member(source, &name)?;
                        Some((name, entity))
                    }));
                    continue;
                }
                let entity = universe.member(source, name).or_else(|| {
                    universe.module_by_name(&format!("{source_name}{SEPARATOR}{name}"))
                });
                if let Some(entity) = entity {
                    bindings.push((name.clone(), entity));
                }
            }
            bindings
        }
    }
}

fn define_classes(
    universe: &mut Universe,
    spec: &ModuleSpec,
    module: EntityId,
) -> Result<(), DriverError> {
    for class in &spec.classes {
        let Some(entity) = universe.member(module, &class.name) else {
            continue;
        };
        let bases = class
            .bases
            .iter()
            .map(|base| resolve_name(universe, module, base))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(base) = bases.iter().find(|&&base| universe.class(base).is_none()) {
            return Err(DriverError::Manifest(format!(
                "base `{}` of `{}.{}` is not a class",
                universe.qualified_name(*base),
                spec.name,
                class.name
            )));
        }
        universe.set_bases(entity, bases);
        if let Some(initializer) = &class.initializer {
            let parameters = raw_parameters(universe, module, initializer)?;
            universe.add_initializer(entity, parameters);
        }
    }
    Ok(())
}

fn raw_parameters(
    universe: &mut Universe,
    module: EntityId,
    parameters: &[ParameterSpec],
) -> Result<Vec<RawParameter>, DriverError> {
    let empty = universe.known().empty;
    parameters
        .iter()
        .map(|parameter| {
            let annotation = match &parameter.annotation {
                Some(text) => resolve_annotation(universe, module, text)?,
                None => empty,
            };
            Ok(RawParameter {
                name: parameter.name.clone(),
                kind: parameter.kind,
                annotation,
            })
        })
        .collect()
}

/// Parses and resolves an annotation expression in the scope of `module`.
pub fn resolve_annotation(
    universe: &mut Universe,
    module: EntityId,
    text: &str,
) -> Result<EntityId, DriverError> {
    let parsed = parse_annotation(text)?;
    resolve_expr(universe, module, &parsed)
}

fn resolve_expr(
    universe: &mut Universe,
    module: EntityId,
    expr: &TypeExpr,
) -> Result<EntityId, DriverError> {
    let origin = resolve_name(universe, module, expr.name())?;
    let TypeExpr::Subscript { arguments, .. } = expr else {
        return Ok(origin);
    };
    let mut resolved = Vec::with_capacity(arguments.len());
    for argument in arguments {
        match argument {
            TypeArgument::Type(inner) => resolved.push(type_argument(universe, module, inner)?),
            TypeArgument::List(items) => {
                for item in items {
                    resolved.push(type_argument(universe, module, item)?);
                }
            }
            TypeArgument::Ellipsis => resolved.push(universe.known().ellipsis),
        }
    }
    Ok(universe.subscript(origin, resolved)?)
}

/// Inside brackets the null sentinel stands for its type.
fn type_argument(
    universe: &mut Universe,
    module: EntityId,
    expr: &TypeExpr,
) -> Result<EntityId, DriverError> {
    let entity = resolve_expr(universe, module, expr)?;
    let known = universe.known();
    Ok(if entity == known.none { known.none_type } else { entity })
}

/// Looks a possibly dotted name up in `module`, then in `builtins` and `typing`, then as a
/// registered module path.
fn resolve_name(
    universe: &Universe,
    module: EntityId,
    dotted: &str,
) -> Result<EntityId, DriverError> {
    let known = universe.known();
    let segments: Vec<&str> = dotted.split(SEPARATOR).collect();
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => return Err(unknown_name(universe, module, dotted)),
    };
    let scoped = [module, known.builtins, known.typing]
        .into_iter()
        .find_map(|scope| universe.member(scope, first))
        .and_then(|entity| follow_members(universe, entity, rest));
    if let Some(entity) = scoped {
        return Ok(entity);
    }
    (1..=segments.len())
        .rev()
        .find_map(|split| {
            let module = universe.module_by_name(&segments[..split].join(SEPARATOR))?;
            follow_members(universe, module, &segments[split..])
        })
        .ok_or_else(|| unknown_name(universe, module, dotted))
}

fn follow_members(universe: &Universe, entity: EntityId, segments: &[&str]) -> Option<EntityId> {
    segments
        .iter()
        .try_fold(entity, |current, segment| universe.member(current, segment))
}

fn unknown_name(universe: &Universe, module: EntityId, name: &str) -> DriverError {
    DriverError::Manifest(format!(
        "cannot resolve `{name}` in module `{}`",
        universe.name(module)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ClassSpec, FunctionSpec, ImportSpec};
    use liable_core::ParameterKind;

    fn module(name: &str, file: &str) -> ModuleSpec {
        ModuleSpec {
            name: name.to_string(),
            file: Some(file.into()),
            exports: None,
            imports: vec![],
            classes: vec![],
            functions: vec![],
            values: vec![],
        }
    }

    fn class(name: &str, bases: &[&str]) -> ClassSpec {
        ClassSpec {
            name: name.to_string(),
            bases: bases.iter().map(|base| base.to_string()).collect(),
            initializer: None,
        }
    }

    fn from_import(from: Option<&str>, names: &[&str], level: usize) -> ImportSpec {
        ImportSpec {
            from: from.map(str::to_string),
            names: names.iter().map(|name| name.to_string()).collect(),
            level,
        }
    }

    #[test]
    fn modules_may_refer_to_later_modules() {
        let mut geometry = module("pkg.geometry", "pkg/geometry.py");
        geometry.imports.push(from_import(Some("shapes"), &["Circle"], 1));
        geometry.classes.push(class("Ring", &["Circle"]));
        let mut shapes = module("pkg.shapes", "pkg/shapes.py");
        shapes.classes.push(class("Shape", &[]));
        shapes.classes.push(class("Circle", &["Shape"]));
        let manifest = Manifest {
            modules: vec![module("pkg", "pkg/__init__.py"), geometry, shapes],
        };

        let universe = build_universe(&manifest).unwrap();
        let pkg = universe.module_by_name("pkg").unwrap();
        let geometry = universe.module_by_name("pkg.geometry").unwrap();
        let shapes = universe.module_by_name("pkg.shapes").unwrap();
        assert_eq!(universe.member(pkg, "shapes"), Some(shapes));

        let ring = universe.member(geometry, "Ring").unwrap();
        let circle = universe.member(shapes, "Circle").unwrap();
        assert_eq!(universe.member(geometry, "Circle"), Some(circle));
        assert_eq!(universe.class(ring).unwrap().bases, vec![circle]);
        assert!(universe.object_is_defined_in(circle, shapes));
        assert!(!universe.object_is_defined_in(circle, geometry));
    }

    #[test]
    fn annotations_resolve_through_scopes() {
        let mut app = module("app", "app.py");
        app.imports.push(from_import(Some("typing"), &["List"], 0));
        app.imports.push(from_import(None, &["models.core"], 0));
        app.functions.push(FunctionSpec {
            name: "run".to_string(),
            returns: Some("Optional[models.core.User]".to_string()),
            parameters: vec![ParameterSpec {
                name: "items".to_string(),
                annotation: Some("List[Union[int, None]]".to_string()),
                kind: ParameterKind::PositionalOrKeyword,
            }],
        });
        let mut core = module("models.core", "models/core.py");
        core.classes.push(class("User", &[]));
        let manifest = Manifest {
            modules: vec![app, core],
        };

        let universe = build_universe(&manifest).unwrap();
        let app = universe.module_by_name("app").unwrap();
        let run = universe.member(app, "run").unwrap();
        let info = universe.function(run).unwrap();
        assert_eq!(universe.name(info.parameters[0].annotation), "List[Union[int, None]]");
        assert_eq!(universe.name(info.return_annotation), "Union[User, None]");
    }

    #[test]
    fn unknown_names_and_duplicate_modules_are_reported() {
        let mut app = module("app", "app.py");
        app.classes.push(class("Thing", &["Missing"]));
        let err = build_universe(&Manifest {
            modules: vec![app],
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Manifest error: cannot resolve `Missing` in module `app`");

        let err = build_universe(&Manifest {
            modules: vec![module("app", "app.py"), module("app", "app.py")],
        })
        .unwrap_err();
        assert!(matches!(err, DriverError::Manifest(_)));
    }
}
