use crate::error::LiableError;
use crate::namespace::{Namespace, Resolver, contains_value};
use crate::universe::{EntityId, Universe};

/// Normalized, recursive representation of a reflected type shape.
///
/// Built only by [`crate::annotator::normalize`]; every variant keeps the entity it was derived
/// from as its `origin` so the tree can be traced back to the reflected object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Annotation {
    /// Non-generic runtime type.
    Raw { origin: EntityId },
    /// Typing-shaped object with no captured arguments and no generic container.
    PlainAnnotation {
        origin: EntityId,
        container: EntityId,
    },
    /// Generic container used without type arguments (`List`).
    PlainGeneric {
        origin: EntityId,
        container: EntityId,
    },
    Any {
        origin: EntityId,
        universal: EntityId,
    },
    Union {
        origin: EntityId,
        marker: EntityId,
        arguments: Vec<Annotation>,
    },
    /// Union with the null sentinel stripped from `arguments`.
    Optional {
        origin: EntityId,
        marker: EntityId,
        union: EntityId,
        none: EntityId,
        arguments: Vec<Annotation>,
    },
    Generic {
        origin: EntityId,
        generic: EntityId,
        container: EntityId,
        arguments: Vec<Annotation>,
    },
    Callable {
        origin: EntityId,
        generic: EntityId,
        container: EntityId,
        parameters: Vec<Annotation>,
        return_type: Box<Annotation>,
    },
}

impl Annotation {
    pub fn origin(&self) -> EntityId {
        match self {
            Annotation::Raw { origin }
            | Annotation::PlainAnnotation { origin, .. }
            | Annotation::PlainGeneric { origin, .. }
            | Annotation::Any { origin, .. }
            | Annotation::Union { origin, .. }
            | Annotation::Optional { origin, .. }
            | Annotation::Generic { origin, .. }
            | Annotation::Callable { origin, .. } => *origin,
        }
    }

    /// Runtime types a value of this annotation is an instance of. Never empty.
    pub fn bases(&self) -> Vec<EntityId> {
        match self {
            Annotation::Raw { origin } => vec![*origin],
            Annotation::PlainAnnotation { container, .. }
            | Annotation::PlainGeneric { container, .. }
            | Annotation::Generic { container, .. }
            | Annotation::Callable { container, .. } => vec![*container],
            Annotation::Any { universal, .. } => vec![*universal],
            Annotation::Union { arguments, .. } => {
                arguments.iter().flat_map(Annotation::bases).collect()
            }
            Annotation::Optional {
                arguments, none, ..
            } => arguments
                .iter()
                .flat_map(Annotation::bases)
                .chain(std::iter::once(*none))
                .collect(),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Annotation::Any { .. })
    }

    /// Every runtime entity the tree references, in a fixed depth-first order.
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(self, None)
    }

    /// Like [`Annotation::walk`], but a node whose origin is already visible in `namespace`
    /// yields only that origin instead of its parts.
    pub fn walk_visible<'a>(&'a self, namespace: &'a Namespace) -> Walk<'a> {
        Walk::new(self, Some(namespace))
    }

    /// Source text naming this annotation from within `namespace`.
    pub fn to_string(
        &self,
        resolver: &Resolver<'_>,
        namespace: &Namespace,
    ) -> Result<String, LiableError> {
        match self {
            Annotation::Raw { origin }
            | Annotation::PlainAnnotation { origin, .. }
            | Annotation::PlainGeneric { origin, .. }
            | Annotation::Any { origin, .. } => resolver.search_name(*origin, namespace),
            Annotation::Optional {
                marker,
                union,
                arguments,
                ..
            } => {
                let marker_name = resolver.search_name(*marker, namespace)?;
                let arguments = join(resolver, namespace, arguments)?;
                if arguments.len() > 1 {
                    let union_name = resolver.search_name(*union, namespace)?;
                    return Ok(format!(
                        "{marker_name}[{union_name}[{}]]",
                        arguments.join(", ")
                    ));
                }
                Ok(format!("{marker_name}[{}]", arguments.join(", ")))
            }
            Annotation::Union { origin, .. }
            | Annotation::Generic { origin, .. }
            | Annotation::Callable { origin, .. }
                if contains_value(namespace, *origin) =>
            {
                resolver.search_name(*origin, namespace)
            }
            Annotation::Union {
                marker, arguments, ..
            } => {
                let marker_name = resolver.search_name(*marker, namespace)?;
                let arguments = join(resolver, namespace, arguments)?;
                Ok(format!("{marker_name}[{}]", arguments.join(", ")))
            }
            Annotation::Generic {
                generic, arguments, ..
            } => {
                let generic_name = resolver.search_name(*generic, namespace)?;
                let arguments = join(resolver, namespace, arguments)?;
                Ok(format!("{generic_name}[{}]", arguments.join(", ")))
            }
            Annotation::Callable {
                generic,
                parameters,
                return_type,
                ..
            } => {
                let generic_name = resolver.search_name(*generic, namespace)?;
                let return_name = return_type.to_string(resolver, namespace)?;
                let ellipsis = resolver.universe().known().ellipsis;
                let any_arguments = matches!(
                    parameters.as_slice(),
                    [Annotation::Raw { origin }] if *origin == ellipsis
                );
                if any_arguments {
                    return Ok(format!("{generic_name}[..., {return_name}]"));
                }
                let parameters = join(resolver, namespace, parameters)?;
                Ok(format!(
                    "{generic_name}[[{}], {return_name}]",
                    parameters.join(", ")
                ))
            }
        }
    }

    /// Name for diagnostics, independent of any namespace.
    pub fn display(&self, universe: &Universe) -> String {
        universe.qualified_name(self.origin())
    }
}

fn join(
    resolver: &Resolver<'_>,
    namespace: &Namespace,
    annotations: &[Annotation],
) -> Result<Vec<String>, LiableError> {
    annotations
        .iter()
        .map(|annotation| annotation.to_string(resolver, namespace))
        .collect()
}

enum Step<'a> {
    Entity(EntityId),
    Node(&'a Annotation),
}

/// Lazy walk over an annotation tree; see [`Annotation::walk`].
pub struct Walk<'a> {
    pending: Vec<Step<'a>>,
    namespace: Option<&'a Namespace>,
}

impl<'a> Walk<'a> {
    fn new(root: &'a Annotation, namespace: Option<&'a Namespace>) -> Self {
        Self {
            pending: vec![Step::Node(root)],
            namespace,
        }
    }

    /// Queues `steps` so that they come out in the given order.
    fn schedule(&mut self, steps: impl DoubleEndedIterator<Item = Step<'a>>) {
        self.pending.extend(steps.rev());
    }

    fn expand(&mut self, node: &'a Annotation) -> EntityId {
        match node {
            Annotation::Raw { origin }
            | Annotation::PlainAnnotation { origin, .. }
            | Annotation::PlainGeneric { origin, .. }
            | Annotation::Any { origin, .. } => {
                self.schedule(node.bases().into_iter().map(Step::Entity));
                *origin
            }
            Annotation::Union {
                marker, arguments, ..
            }
            | Annotation::Optional {
                marker, arguments, ..
            } => {
                self.schedule(arguments.iter().map(Step::Node));
                *marker
            }
            Annotation::Generic {
                generic, arguments, ..
            } => {
                self.schedule(arguments.iter().map(Step::Node));
                *generic
            }
            Annotation::Callable {
                generic,
                parameters,
                return_type,
                ..
            } => {
                self.schedule(
                    parameters
                        .iter()
                        .chain(std::iter::once(return_type.as_ref()))
                        .map(Step::Node),
                );
                *generic
            }
        }
    }
}

impl Iterator for Walk<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        match self.pending.pop()? {
            Step::Entity(entity) => Some(entity),
            Step::Node(node) => {
                let origin = node.origin();
                if self
                    .namespace
                    .is_some_and(|namespace| contains_value(namespace, origin))
                {
                    return Some(origin);
                }
                Some(self.expand(node))
            }
        }
    }
}
