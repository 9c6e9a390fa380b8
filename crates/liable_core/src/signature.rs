use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::annotation::Annotation;
use crate::annotator::normalize;
use crate::catalog::ObjectPath;
use crate::error::LiableError;
use crate::namespace::{Namespace, Resolver};
use crate::universe::{EntityId, Universe};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    PositionalOnly,
    #[default]
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

impl ParameterKind {
    pub fn is_variadic(self) -> bool {
        matches!(self, ParameterKind::VarPositional | ParameterKind::VarKeyword)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub annotation: Annotation,
}

/// Normalized view of a reflected function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub function: EntityId,
    pub parameters: Vec<Parameter>,
    pub return_type: Annotation,
}

/// Reads the signature of `function`, normalizing every annotation.
///
/// Variadic parameters are annotated with the container the host passes them in: `*args: T`
/// becomes `Tuple[T]` and `**kwargs: T` becomes `Dict[str, T]`. Subscripting may register new
/// forms, hence the mutable universe.
pub fn signature(universe: &mut Universe, function: EntityId) -> Result<Signature, LiableError> {
    let Some(info) = universe.function(function).cloned() else {
        return Err(LiableError::NotCallable {
            object: universe.qualified_name(function),
        });
    };
    let known = universe.known().clone();
    let mut parameters = Vec::with_capacity(info.parameters.len());
    for raw in info.parameters {
        let annotation = if raw.annotation == known.empty {
            known.any
        } else {
            raw.annotation
        };
        let annotation = match raw.kind {
            ParameterKind::VarPositional => universe.subscript(known.tuple_form, vec![annotation])?,
            ParameterKind::VarKeyword => {
                universe.subscript(known.dict_form, vec![known.str_, annotation])?
            }
            _ => annotation,
        };
        parameters.push(Parameter {
            name: raw.name,
            kind: raw.kind,
            annotation: normalize(universe, annotation),
        });
    }
    Ok(Signature {
        function,
        parameters,
        return_type: normalize(universe, info.return_annotation),
    })
}

/// Entities generated code touching `signature` refers to: the function, whatever its
/// parameter annotations reference, and the bases of its return annotation.
pub fn dependencies<'a>(
    signature: &'a Signature,
    namespace: &'a Namespace,
) -> impl Iterator<Item = EntityId> + 'a {
    std::iter::once(signature.function)
        .chain(
            signature
                .parameters
                .iter()
                .flat_map(move |parameter| parameter.annotation.walk_visible(namespace)),
        )
        .chain(signature.return_type.bases())
}

/// Distinct non-built-in paths of every dependency of `signatures`, in first-seen order.
pub fn dependants_paths(
    resolver: &Resolver<'_>,
    signatures: &[Signature],
    namespace: &Namespace,
) -> Result<Vec<ObjectPath>, LiableError> {
    let mut paths = IndexSet::new();
    for signature in signatures {
        for dependency in dependencies(signature, namespace) {
            paths.insert(resolver.search_path(dependency, namespace)?);
        }
    }
    Ok(paths
        .into_iter()
        .filter(|path| !path.is_built_in())
        .collect())
}
