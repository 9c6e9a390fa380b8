use crate::annotation::Annotation;
use crate::universe::{EntityId, FormKind, Universe};

/// Entities standing in for "no annotation", with what they are read as.
fn replacement(universe: &Universe, entity: EntityId) -> EntityId {
    let known = universe.known();
    if entity == known.empty {
        known.any
    } else {
        entity
    }
}

/// Turns a reflected type object into an [`Annotation`] tree.
pub fn normalize(universe: &Universe, entity: EntityId) -> Annotation {
    to_annotation(universe, replacement(universe, entity))
}

fn to_annotation(universe: &Universe, entity: EntityId) -> Annotation {
    let known = universe.known();
    let Some(form) = universe.form(entity) else {
        return Annotation::Raw { origin: entity };
    };
    match form.kind {
        FormKind::Any => Annotation::Any {
            origin: entity,
            universal: known.object,
        },
        FormKind::Opaque => Annotation::Raw {
            origin: known.object,
        },
        FormKind::Union => {
            let arguments: Vec<EntityId> = form
                .arguments
                .iter()
                .map(|&argument| {
                    if argument == known.none_type {
                        known.none
                    } else {
                        argument
                    }
                })
                .collect();
            if arguments.contains(&known.none) {
                return Annotation::Optional {
                    origin: entity,
                    marker: known.optional,
                    union: known.union,
                    none: known.none,
                    arguments: arguments
                        .into_iter()
                        .filter(|&argument| argument != known.none)
                        .map(|argument| to_annotation(universe, argument))
                        .collect(),
                };
            }
            Annotation::Union {
                origin: entity,
                marker: form.origin.unwrap_or(known.union),
                arguments: arguments
                    .into_iter()
                    .map(|argument| to_annotation(universe, argument))
                    .collect(),
            }
        }
        FormKind::Callable => {
            let container = form.container.unwrap_or(known.callable_type);
            let Some((&return_type, parameters)) = form.arguments.split_last() else {
                return Annotation::PlainAnnotation {
                    origin: entity,
                    container,
                };
            };
            Annotation::Callable {
                origin: entity,
                generic: form.origin.unwrap_or(entity),
                container,
                parameters: parameters
                    .iter()
                    .map(|&parameter| to_annotation(universe, parameter))
                    .collect(),
                return_type: Box::new(to_annotation(universe, return_type)),
            }
        }
        FormKind::Generic => {
            let container = form.container.unwrap_or(known.object);
            if form.arguments.is_empty() {
                return Annotation::PlainGeneric {
                    origin: entity,
                    container,
                };
            }
            Annotation::Generic {
                origin: entity,
                generic: form.origin.unwrap_or(entity),
                container,
                arguments: form
                    .arguments
                    .iter()
                    .map(|&argument| to_annotation(universe, argument))
                    .collect(),
            }
        }
        FormKind::Special => Annotation::PlainAnnotation {
            origin: entity,
            container: form.container.unwrap_or(known.object),
        },
    }
}
