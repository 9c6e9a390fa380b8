use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::catalog::ModulePath;
use crate::error::LiableError;
use crate::hierarchy::Hierarchy;
use crate::namespace::{Namespace, Resolver};
use crate::signature::{Parameter, signature};
use crate::universe::{EntityId, Universe};

pub const COMMONS_MODULE: &str = "utils";

/// Merges parameters sharing a name, keeping the most specific annotation for each.
///
/// Names keep their first-seen order. A later annotation replaces the recorded one when its
/// hierarchy is not contained in the recorded one; two annotations sharing no ancestor other
/// than the universal base are rejected, unless both are `Any`.
pub fn combine(
    universe: &Universe,
    hierarchy: &Hierarchy,
    parameters: impl IntoIterator<Item = Parameter>,
) -> Result<IndexMap<String, Parameter>, LiableError> {
    let mut combined: IndexMap<String, Parameter> = IndexMap::new();
    for parameter in parameters {
        let Some(previous) = combined.get(&parameter.name) else {
            combined.insert(parameter.name.clone(), parameter);
            continue;
        };
        if previous.annotation.is_any() && parameter.annotation.is_any() {
            continue;
        }
        let previous_types = specific_types(hierarchy, previous);
        let types = specific_types(hierarchy, &parameter);
        if previous_types.is_disjoint(&types) {
            return Err(LiableError::InconsistentAnnotation {
                parameter: parameter.name.clone(),
                previous: previous.annotation.display(universe),
                current: parameter.annotation.display(universe),
            });
        }
        if !types.is_subset(&previous_types) {
            tracing::trace!(
                parameter = %parameter.name,
                annotation = %parameter.annotation.display(universe),
                "more specific annotation"
            );
            combined.insert(parameter.name.clone(), parameter);
        }
    }
    Ok(combined)
}

fn specific_types(hierarchy: &Hierarchy, parameter: &Parameter) -> FxHashSet<EntityId> {
    let mut types = hierarchy.of_annotation(&parameter.annotation);
    types.remove(&hierarchy.universal());
    types
}

/// Parameters a class is constructed with: its initializer's, minus the receiver and the
/// variadic ones.
pub fn from_type_initializer(
    universe: &mut Universe,
    class: EntityId,
) -> Result<Vec<Parameter>, LiableError> {
    let Some(initializer) = universe.class(class).and_then(|info| info.initializer) else {
        return Ok(Vec::new());
    };
    let initializer_signature = signature(universe, initializer)?;
    Ok(initializer_signature
        .parameters
        .into_iter()
        .skip(1)
        .filter(|parameter| !parameter.kind.is_variadic())
        .collect())
}

/// Sorts parameters into the top-level package their annotation's type comes from.
///
/// Only parameters with a single, non-built-in base get a package of their own; the rest go
/// under `commons`.
pub fn group_by_top_module(
    resolver: &Resolver<'_>,
    parameters: impl IntoIterator<Item = Parameter>,
    namespace: &Namespace,
    commons: &ModulePath,
) -> Result<IndexMap<ModulePath, Vec<Parameter>>, LiableError> {
    let mut groups: IndexMap<ModulePath, Vec<Parameter>> = IndexMap::new();
    for parameter in parameters {
        let module = match parameter.annotation.bases().as_slice() {
            [base] => {
                let path = resolver.search_path(*base, namespace)?;
                if path.is_built_in() {
                    commons.clone()
                } else {
                    path.module_path().clone()
                }
            }
            _ => commons.clone(),
        };
        groups.entry(module.top()).or_default().push(parameter);
    }
    Ok(groups)
}
