use std::path::Path;

use liable_core::{LiableError, ParameterKind};
use liable_driver::{DriverError, ParameterGroup, Project, RenderedParameter, to_json};


use test_support::{open_fixture, write_project};

fn directives(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|line| line.to_string()).collect()
}

#[test]
fn named_imports_group_by_source_module() {
    let mut project = open_fixture("shapes");
    let imports = project.imports_for_module("pkg.geometry").unwrap();
    assert_eq!(
        imports,
        directives(&[
            "from pkg.geometry import scale\n",
            "from pkg.shapes import (Circle,\nShape)\n",
        ])
    );
}

#[test]
fn module_imports_and_typing_helpers_are_kept_apart() {
    let mut project = open_fixture("shapes");
    let imports = project.imports_for_module("pkg.canvas").unwrap();
    assert_eq!(
        imports,
        directives(&[
            "from pkg.canvas import draw\n",
            "import pkg.shapes\n",
            "from typing import (List,\nOptional)\n",
        ])
    );
}

#[test]
fn source_files_map_to_their_declared_modules() {
    let mut project = open_fixture("shapes");
    let by_file = project.imports_for_file(Path::new("pkg/geometry.py")).unwrap();
    let by_name = project.imports_for_module("pkg.geometry").unwrap();
    assert_eq!(by_file, by_name);
    assert!(project.cache().is_loaded("pkg.geometry"));
    assert!(project.cache().is_loaded("pkg.shapes"));
}

#[test]
fn parameters_merge_across_modules() {
    let mut project = open_fixture("shapes");
    let groups = project.combined_parameters().unwrap();
    let parameter = |name: &str, annotation: &str| RenderedParameter {
        name: name.to_string(),
        kind: ParameterKind::PositionalOrKeyword,
        annotation: annotation.to_string(),
    };
    assert_eq!(
        groups,
        vec![
            ParameterGroup {
                module: "pkg".to_string(),
                parameters: vec![parameter("shape", "Circle")],
            },
            ParameterGroup {
                module: "utils".to_string(),
                parameters: vec![
                    parameter("factor", "Optional[float]"),
                    parameter("shapes", "List[Shape]"),
                ],
            },
        ]
    );

    let json: serde_json::Value = serde_json::from_str(&to_json(&groups).unwrap()).unwrap();
    assert_eq!(json[0]["module"], "pkg");
    assert_eq!(json[0]["parameters"][0]["kind"], "positional_or_keyword");
}

#[test]
fn constructors_render_with_annotated_arguments() {
    let mut project = open_fixture("shapes");
    let calls = project.constructor_calls("pkg.shapes").unwrap();
    assert_eq!(calls.len(), 1);
    insta::assert_snapshot!(calls[0], @r"
    Circle(radius=float,
    label=Optional[str])
    ");
}

#[test]
fn unknown_modules_are_reported() {
    let mut project = open_fixture("shapes");
    let err = project.imports_for_module("pkg.missing").unwrap_err();
    assert!(matches!(
        err,
        DriverError::Liable(LiableError::UnknownModule(ref name)) if name == "pkg.missing"
    ));
}

const WORDS_MANIFEST: &str = r#"{
    "modules": [
        {
            "name": "words",
            "file": "words.py",
            "imports": [{"from": "typing", "names": ["Dict"]}],
            "functions": [
                {
                    "name": "count",
                    "returns": "int",
                    "parameters": [{"name": "words", "annotation": "Dict[str, int]"}]
                }
            ]
        },
        {
            "name": "bare",
            "file": "bare.py",
            "functions": [{"name": "echo", "parameters": [{"name": "value"}]}]
        }
    ]
}"#;

#[test]
fn json_manifests_drive_the_same_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(
        dir.path(),
        "[project]\nmanifest = \"modules.json\"\n",
        "modules.json",
        WORDS_MANIFEST,
    );
    let mut project = Project::open(&config).unwrap();
    assert_eq!(
        project.imports_for_module("words").unwrap(),
        directives(&["from typing import Dict\n", "from words import count\n"])
    );
    assert_eq!(
        project.imports_for_module("bare").unwrap(),
        directives(&["from bare import echo\n", "from typing import Any\n"])
    );
}

#[test]
fn unannotated_parameters_need_the_typing_utilities() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(
        dir.path(),
        "[project]\nmanifest = \"modules.json\"\n\n[generation]\ninclude_utilities = false\n",
        "modules.json",
        WORDS_MANIFEST,
    );
    let mut project = Project::open(&config).unwrap();
    assert!(project.imports_for_module("words").is_ok());
    let err = project.imports_for_module("bare").unwrap_err();
    assert_eq!(
        err.to_string(),
        LiableError::NotFound {
            object: "typing.Any".to_string()
        }
        .to_string()
    );
}

#[test]
fn missing_manifests_surface_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join(liable_driver::CONFIG_FILE_NAME);
    std::fs::write(&config, "").unwrap();
    let err = Project::open(&config).err().unwrap();
    assert!(matches!(err, DriverError::Io(_)));
}
