use rustc_hash::{FxHashMap, FxHashSet};

use crate::annotation::Annotation;
use crate::universe::{EntityId, Universe};

/// Precomputed ancestor chains of every class in a [`Universe`].
///
/// A chain starts with the class itself and ends with the universal base. Chains follow C3
/// linearization of the declared bases; declarations with no consistent linearization fall back
/// to depth-first order.
#[derive(Clone, Debug)]
pub struct Hierarchy {
    chains: FxHashMap<EntityId, Vec<EntityId>>,
    universal: EntityId,
}

impl Hierarchy {
    pub fn build(universe: &Universe) -> Self {
        let mut builder = Builder {
            universe,
            chains: FxHashMap::default(),
            in_progress: FxHashSet::default(),
        };
        for class in universe.classes() {
            builder.linearize(class);
        }
        Self {
            chains: builder.chains,
            universal: universe.known().object,
        }
    }

    /// Ancestor chain of `entity`, itself included. Entities that are not classes get
    /// `[entity, universal base]`.
    pub fn ancestors(&self, entity: EntityId) -> Vec<EntityId> {
        match self.chains.get(&entity) {
            Some(chain) => chain.clone(),
            None if entity == self.universal => vec![entity],
            None => vec![entity, self.universal],
        }
    }

    pub fn is_subclass(&self, entity: EntityId, base: EntityId) -> bool {
        entity == base
            || base == self.universal
            || self
                .chains
                .get(&entity)
                .is_some_and(|chain| chain.contains(&base))
    }

    /// Union of the ancestor chains of every base of `annotation`.
    pub fn of_annotation(&self, annotation: &Annotation) -> FxHashSet<EntityId> {
        annotation
            .bases()
            .into_iter()
            .flat_map(|base| self.ancestors(base))
            .collect()
    }

    pub fn universal(&self) -> EntityId {
        self.universal
    }
}

struct Builder<'u> {
    universe: &'u Universe,
    chains: FxHashMap<EntityId, Vec<EntityId>>,
    in_progress: FxHashSet<EntityId>,
}

impl Builder<'_> {
    fn linearize(&mut self, class: EntityId) -> Vec<EntityId> {
        if let Some(chain) = self.chains.get(&class) {
            return chain.clone();
        }
        let universal = self.universe.known().object;
        if !self.in_progress.insert(class) {
            return vec![class, universal];
        }
        let bases = self
            .universe
            .class(class)
            .map(|info| info.bases.clone())
            .unwrap_or_default();
        let base_chains: Vec<Vec<EntityId>> =
            bases.iter().map(|&base| self.linearize(base)).collect();

        let mut sequences = base_chains.clone();
        sequences.push(bases.clone());
        let mut chain = vec![class];
        match c3_merge(sequences) {
            Some(merged) => chain.extend(merged),
            None => {
                tracing::trace!(
                    class = self.universe.name(class),
                    "no consistent linearization, using depth-first order"
                );
                let mut seen = FxHashSet::default();
                seen.insert(class);
                chain.extend(
                    base_chains
                        .into_iter()
                        .flatten()
                        .filter(|&ancestor| seen.insert(ancestor)),
                );
            }
        }
        if class != universal {
            chain.retain(|&ancestor| ancestor != universal);
            chain.push(universal);
        }

        self.in_progress.remove(&class);
        self.chains.insert(class, chain.clone());
        chain
    }
}

fn c3_merge(mut sequences: Vec<Vec<EntityId>>) -> Option<Vec<EntityId>> {
    let mut merged = Vec::new();
    loop {
        sequences.retain(|sequence| !sequence.is_empty());
        if sequences.is_empty() {
            return Some(merged);
        }
        let head = sequences.iter().map(|sequence| sequence[0]).find(|candidate| {
            sequences
                .iter()
                .all(|sequence| !sequence[1..].contains(candidate))
        })?;
        merged.push(head);
        for sequence in &mut sequences {
            if sequence[0] == head {
                sequence.remove(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chains_follow_c3_order() {
        let mut universe = Universe::new();
        let module = universe.add_module("shapes", Default::default());
        let object = universe.known().object;
        let base = universe.add_class(module, "Base", vec![]);
        let left = universe.add_class(module, "Left", vec![base]);
        let right = universe.add_class(module, "Right", vec![base]);
        let diamond = universe.add_class(module, "Diamond", vec![left, right]);

        let hierarchy = Hierarchy::build(&universe);
        assert_eq!(
            hierarchy.ancestors(diamond),
            vec![diamond, left, right, base, object]
        );
        assert!(hierarchy.is_subclass(diamond, base));
        assert!(!hierarchy.is_subclass(base, diamond));
    }

    #[test]
    fn inconsistent_bases_fall_back_to_depth_first() {
        let mut universe = Universe::new();
        let module = universe.add_module("shapes", Default::default());
        let object = universe.known().object;
        let a = universe.add_class(module, "A", vec![]);
        let b = universe.add_class(module, "B", vec![a]);
        // `A` before its own subclass admits no linearization.
        let broken = universe.add_class(module, "Broken", vec![a, b]);

        let hierarchy = Hierarchy::build(&universe);
        assert_eq!(hierarchy.ancestors(broken), vec![broken, a, b, object]);
    }

    #[test]
    fn builtin_subclassing_is_recorded() {
        let universe = Universe::new();
        let known = universe.known();
        let hierarchy = Hierarchy::build(&universe);
        assert_eq!(
            hierarchy.ancestors(known.bool_),
            vec![known.bool_, known.int, known.object]
        );
        assert_eq!(hierarchy.ancestors(known.none), vec![known.none, known.object]);
        assert_eq!(hierarchy.ancestors(known.object), vec![known.object]);
    }
}
