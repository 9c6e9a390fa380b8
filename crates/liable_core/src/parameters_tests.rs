use crate::annotator::normalize;
use crate::catalog::ModulePath;
use crate::error::LiableError;
use crate::hierarchy::Hierarchy;
use crate::loader::{ModuleCache, UniverseLoader};
use crate::namespace::{Resolver, built_ins, merge};
use crate::parameters::{COMMONS_MODULE, combine, from_type_initializer, group_by_top_module};
use crate::signature::{Parameter, ParameterKind};
use crate::test_universe::{fixture, parameter};
use crate::universe::{EntityId, ModuleInfo, RawParameter, Universe};

fn named(universe: &Universe, name: &str, annotation: EntityId) -> Parameter {
    Parameter {
        name: name.to_string(),
        kind: ParameterKind::PositionalOrKeyword,
        annotation: normalize(universe, annotation),
    }
}

#[test]
fn subclasses_are_more_specific() {
    let universe = Universe::new();
    let known = universe.known();
    let hierarchy = Hierarchy::build(&universe);

    let combined = combine(
        &universe,
        &hierarchy,
        [named(&universe, "n", known.int), named(&universe, "n", known.bool_)],
    )
    .unwrap();
    assert_eq!(combined["n"].annotation, normalize(&universe, known.bool_));

    let combined = combine(
        &universe,
        &hierarchy,
        [named(&universe, "n", known.bool_), named(&universe, "n", known.int)],
    )
    .unwrap();
    assert_eq!(combined["n"].annotation, normalize(&universe, known.bool_));
}

#[test]
fn unrelated_annotations_are_inconsistent() {
    let universe = Universe::new();
    let known = universe.known();
    let hierarchy = Hierarchy::build(&universe);

    let err = combine(
        &universe,
        &hierarchy,
        [named(&universe, "n", known.int), named(&universe, "n", known.str_)],
    )
    .unwrap_err();
    assert_eq!(
        err,
        LiableError::InconsistentAnnotation {
            parameter: "n".to_string(),
            previous: "int".to_string(),
            current: "str".to_string(),
        }
    );
    insta::assert_snapshot!(
        err.to_string(),
        @r#"Invalid parameter: "n", different annotations should agree, but found "int", "str"."#
    );
}

#[test]
fn any_does_not_agree_with_concrete_types() {
    let universe = Universe::new();
    let known = universe.known();
    let hierarchy = Hierarchy::build(&universe);

    let any_first = [named(&universe, "n", known.empty), named(&universe, "n", known.int)];
    let int_first = [named(&universe, "n", known.int), named(&universe, "n", known.any)];
    for parameters in [any_first, int_first] {
        let err = combine(&universe, &hierarchy, parameters).unwrap_err();
        assert!(matches!(
            err,
            LiableError::InconsistentAnnotation { ref parameter, .. } if parameter == "n"
        ));
    }
}

#[test]
fn any_agrees_with_itself() {
    let universe = Universe::new();
    let known = universe.known();
    let hierarchy = Hierarchy::build(&universe);

    let first = named(&universe, "value", known.empty);
    let second = named(&universe, "value", known.any);
    let combined = combine(&universe, &hierarchy, [first.clone(), second]).unwrap();
    assert_eq!(combined.len(), 1);
    assert_eq!(combined["value"], first);
}

#[test]
fn optional_widens_a_plain_annotation() {
    let mut universe = Universe::new();
    let known = universe.known().clone();
    let optional_int = universe.subscript(known.optional, vec![known.int]).unwrap();
    let hierarchy = Hierarchy::build(&universe);

    let combined = combine(
        &universe,
        &hierarchy,
        [
            named(&universe, "limit", known.int),
            named(&universe, "label", known.str_),
            named(&universe, "limit", optional_int),
        ],
    )
    .unwrap();
    let names: Vec<&str> = combined.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["limit", "label"]);
    assert_eq!(combined["limit"].annotation.origin(), optional_int);
}

#[test]
fn initializer_parameters_skip_receiver_and_variadics() {
    let mut universe = Universe::new();
    let known = universe.known().clone();
    let module = universe.add_module("points", ModuleInfo::default());
    let point = universe.add_class(module, "Point", vec![]);
    universe.add_initializer(
        point,
        vec![
            parameter("self", known.empty),
            parameter("x", known.int),
            parameter("y", known.int),
            RawParameter {
                name: "rest".to_string(),
                kind: ParameterKind::VarPositional,
                annotation: known.int,
            },
        ],
    );

    let parameters = from_type_initializer(&mut universe, point).unwrap();
    let names: Vec<&str> = parameters.iter().map(|parameter| parameter.name.as_str()).collect();
    assert_eq!(names, vec!["x", "y"]);

    let bare = universe.add_class(module, "Bare", vec![]);
    assert!(from_type_initializer(&mut universe, bare).unwrap().is_empty());
}

#[test]
fn parameters_group_under_the_top_package_of_their_type() {
    let mut fixture = fixture();
    let known = fixture.universe.known().clone();
    let optional_shape = fixture
        .universe
        .subscript(known.optional, vec![fixture.shape])
        .unwrap();

    let universe = &fixture.universe;
    let cache = ModuleCache::new();
    let loader = UniverseLoader::new(universe);
    let resolver = Resolver::new(universe, &loader, &cache);
    let namespace = merge([&built_ins(universe), &*resolver.namespace(fixture.geometry).unwrap()]);

    let commons = ModulePath::root(COMMONS_MODULE);
    let groups = group_by_top_module(
        &resolver,
        [
            named(universe, "shape", fixture.shape),
            named(universe, "factor", known.float),
            named(universe, "maybe", optional_shape),
        ],
        &namespace,
        &commons,
    )
    .unwrap();

    let layout: Vec<(String, Vec<&str>)> = groups
        .iter()
        .map(|(module, parameters)| {
            let names = parameters.iter().map(|parameter| parameter.name.as_str()).collect();
            (module.to_string(), names)
        })
        .collect();
    assert_eq!(
        layout,
        vec![
            ("pkg".to_string(), vec!["shape"]),
            ("utils".to_string(), vec!["factor", "maybe"]),
        ]
    );
}
