use liable_core::{
    LiableError, ModuleCache, Resolver, UniverseLoader, built_ins, dependants_paths, imports_for,
    inner_functions, merge, signature, utilities,
};


use test_support::store;

#[test]
fn package_re_exports_import_from_the_package() {
    let mut store = store();
    let order = signature(&mut store.universe, store.order).unwrap();

    let universe = &store.universe;
    let cache = ModuleCache::new();
    let loader = UniverseLoader::new(universe);
    let resolver = Resolver::new(universe, &loader, &cache);
    let module_namespace = resolver.namespace(store.orders).unwrap();
    assert_eq!(
        inner_functions(universe, &module_namespace).collect::<Vec<_>>(),
        vec![store.order]
    );

    let namespace = merge([&built_ins(universe), &utilities(universe), &*module_namespace]);
    assert_eq!(resolver.search_name(store.item, &namespace).unwrap(), "Item");
    let paths = dependants_paths(&resolver, &[order], &namespace).unwrap();
    let imports = imports_for(&paths).unwrap().concat();
    let imports = imports.trim_end();
    insta::assert_snapshot!(imports, @r"
    from store import Item
    from store.orders import order
    from typing import List
    ");
    assert!(cache.is_loaded("store"));
}

#[test]
fn namespaces_of_unknown_relative_sources_fail() {
    let mut store = store();
    let broken = store.universe.add_module(
        "store.broken",
        test_support::module_info(
            "store/broken.py",
            vec![test_support::from_import("missing", &["Thing"], 1)],
        ),
    );
    let universe = &store.universe;
    let cache = ModuleCache::new();
    let loader = UniverseLoader::new(universe);
    let resolver = Resolver::new(universe, &loader, &cache);
    let err = resolver.namespace(broken).unwrap_err();
    assert_eq!(err, LiableError::UnknownModule("store.missing".to_string()));
}
