use std::path::PathBuf;

use crate::loader::ImportStatement;
use crate::signature::ParameterKind;
use crate::universe::{EntityId, ModuleInfo, RawParameter, Universe};

/// Small package used across unit tests:
///
/// ```text
/// pkg/__init__.py
/// pkg/shapes.py    from typing import List, Optional; class Shape; class Circle(Shape); def area
/// pkg/geometry.py  from .shapes import Shape; def scale
/// pkg/canvas.py    import pkg.shapes; def draw
/// ```
pub(crate) struct Fixture {
    pub universe: Universe,
    pub pkg: EntityId,
    pub shapes: EntityId,
    pub geometry: EntityId,
    pub canvas: EntityId,
    pub shape: EntityId,
    pub circle: EntityId,
    pub area: EntityId,
    pub scale: EntityId,
    pub draw: EntityId,
}

pub(crate) fn from_import(module: &str, names: &[&str], level: usize) -> ImportStatement {
    ImportStatement::ImportFrom {
        module: (!module.is_empty()).then(|| module.to_string()),
        names: names.iter().map(|name| name.to_string()).collect(),
        level,
    }
}

pub(crate) fn module_info(file: &str, imports: Vec<ImportStatement>) -> ModuleInfo {
    ModuleInfo {
        file: Some(PathBuf::from(file)),
        imports,
        ..ModuleInfo::default()
    }
}

pub(crate) fn parameter(name: &str, annotation: EntityId) -> RawParameter {
    RawParameter {
        name: name.to_string(),
        kind: ParameterKind::PositionalOrKeyword,
        annotation,
    }
}

pub(crate) fn fixture() -> Fixture {
    let mut universe = Universe::new();
    let known = universe.known().clone();

    let pkg = universe.add_module("pkg", module_info("pkg/__init__.py", vec![]));

    let shapes = universe.add_module(
        "pkg.shapes",
        module_info(
            "pkg/shapes.py",
            vec![from_import("typing", &["List", "Optional"], 0)],
        ),
    );
    universe.bind(pkg, "shapes", shapes);
    for name in ["List", "Optional"] {
        if let Some(entity) = universe.member(known.typing, name) {
            universe.bind(shapes, name, entity);
        }
    }
    let shape = universe.add_class(shapes, "Shape", vec![]);
    let circle = universe.add_class(shapes, "Circle", vec![shape]);
    let area = universe.add_function(
        shapes,
        "area",
        vec![parameter("shape", shape)],
        Some(known.float),
    );

    let geometry = universe.add_module(
        "pkg.geometry",
        module_info("pkg/geometry.py", vec![from_import("shapes", &["Shape"], 1)]),
    );
    universe.bind(pkg, "geometry", geometry);
    universe.bind(geometry, "Shape", shape);
    let scale = universe.add_function(
        geometry,
        "scale",
        vec![parameter("shape", shape), parameter("factor", known.float)],
        Some(shape),
    );

    let canvas = universe.add_module(
        "pkg.canvas",
        module_info(
            "pkg/canvas.py",
            vec![ImportStatement::Import {
                modules: vec!["pkg.shapes".to_string()],
            }],
        ),
    );
    universe.bind(pkg, "canvas", canvas);
    let draw = universe.add_function(canvas, "draw", vec![parameter("circle", circle)], None);

    Fixture {
        universe,
        pkg,
        shapes,
        geometry,
        canvas,
        shape,
        circle,
        area,
        scale,
        draw,
    }
}
