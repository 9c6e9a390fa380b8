use crate::catalog::{ContentPath, ModulePath, ObjectPath, PathKind, name_to_module_path};
use crate::error::LiableError;
use crate::imports::{group_by_module, imports_for, to_imports};

fn content(module: &str, object: &str, kind: PathKind) -> ObjectPath {
    ObjectPath::Content(ContentPath::new(name_to_module_path(module), object, kind))
}

#[test]
fn named_and_whole_module_directives_coexist() {
    let paths = [
        content("pkg.shapes", "y", PathKind::Relative),
        content("pkg.shapes", "x", PathKind::Relative),
        content("pkg.shapes", "Circle", PathKind::Absolute),
    ];
    let directives = to_imports(&paths).unwrap();
    assert_eq!(
        directives,
        vec![
            "from pkg.shapes import (x,\ny)\n".to_string(),
            "import pkg.shapes\n".to_string(),
        ]
    );
}

#[test]
fn single_named_object_is_not_wrapped() {
    let paths = [
        content("pkg.shapes", "Shape", PathKind::Inner),
        content("pkg.shapes", "Shape", PathKind::Relative),
    ];
    let text = to_imports(&paths).unwrap().concat();
    insta::assert_snapshot!(text.trim_end(), @"from pkg.shapes import Shape");
}

#[test]
fn empty_and_mixed_batches_are_rejected() {
    let err = to_imports(std::iter::empty::<&ObjectPath>()).unwrap_err();
    assert_eq!(err, LiableError::AmbiguousModuleSet { modules: vec![] });
    assert_eq!(err.to_string(), "No modules paths found.");

    let paths = [
        content("pkg.shapes", "Shape", PathKind::Relative),
        content("pkg.geometry", "scale", PathKind::Relative),
    ];
    let err = to_imports(&paths).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Found modules paths for different modules: \"pkg.shapes\", \"pkg.geometry\"."
    );
}

#[test]
fn built_in_paths_need_no_directive() {
    let path = ObjectPath::Content(ContentPath::new(
        ModulePath::built_ins(),
        "int",
        PathKind::BuiltIn,
    ));
    assert_eq!(to_imports([&path]).unwrap(), Vec::<String>::new());
}

#[test]
fn named_sub_modules_group_under_their_package() {
    let sub_module = ObjectPath::Module(ModulePath::nested(
        ModulePath::root("pkg"),
        "shapes",
        PathKind::Relative,
    ));
    let whole = ObjectPath::Module(name_to_module_path("pkg.geometry"));
    let groups = group_by_module([&sub_module, &whole]);
    let keys: Vec<String> = groups.keys().map(ToString::to_string).collect();
    assert_eq!(keys, vec!["pkg", "pkg.geometry"]);

    let directives = imports_for([&whole, &sub_module]).unwrap();
    assert_eq!(
        directives,
        vec![
            "from pkg import shapes\n".to_string(),
            "import pkg.geometry\n".to_string(),
        ]
    );
}

#[test]
fn imports_for_orders_groups_by_module_name() {
    let paths = [
        content("zoo.animals", "Cat", PathKind::Relative),
        content("app.models", "User", PathKind::Relative),
        content("app.models", "Group", PathKind::Relative),
    ];
    let directives = imports_for(&paths).unwrap();
    assert_eq!(
        directives,
        vec![
            "from app.models import (Group,\nUser)\n".to_string(),
            "from zoo.animals import Cat\n".to_string(),
        ]
    );
}
