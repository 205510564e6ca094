//! Integration tests for reference-closure resolution over parsed manifests.

mod common;

use common::ModuleBuilder;
use dotprobe::prelude::*;
use uguid::Guid;

fn names(set: &ResolvedReferenceSet) -> Vec<String> {
    set.iter().map(|b| b.identity().name.clone()).collect()
}

#[test]
fn resolution_over_realistic_snapshot() {
    common::init_logging();

    // A framework-style snapshot: core library, two app assemblies, a satellite
    // duplicate of the core library contract, and an unrelated loaded module.
    let corelib = ModuleBuilder::new("System.Private.CoreLib")
        .version(8, 0, 0, 0)
        .type_def("System", "Object", 0x0200_0002)
        .type_def("System", "String", 0x0200_0003);
    let facade = ModuleBuilder::new("System.Runtime")
        .mvid([0xFA; 16])
        .version(8, 0, 0, 0);
    let lib = ModuleBuilder::new("Lib")
        .reference(&facade.identity())
        .type_def("Lib", "Helper", 0x0200_0002);
    let app = ModuleBuilder::new("App")
        .reference(&lib.identity())
        .reference(&facade.identity())
        .type_def("MyApp", "Program", 0x0200_0002);
    let unrelated = ModuleBuilder::new("Telemetry");

    let app_block = app.build();
    let target = app_block.module_version_id();

    let blocks = MetadataBlockSet::from_blocks([
        corelib.build(),
        facade.build(),
        lib.build(),
        app_block,
        unrelated.build(),
    ]);

    let all = resolve_references(&blocks, target, ReferenceKind::AllModules);
    assert_eq!(all.len(), 5);

    let referenced = resolve_references(&blocks, target, ReferenceKind::ReferencedModulesOnly);
    assert_eq!(
        names(&referenced),
        vec!["System.Runtime", "Lib", "App"],
        "closure keeps input order and drops unreachable modules"
    );
}

#[test]
fn facade_unification_prefers_type_bearing_core_library() {
    let facade = ModuleBuilder::new("mscorlib").mvid([1; 16]).version(4, 0, 0, 0);
    let loaded = ModuleBuilder::new("mscorlib")
        .mvid([2; 16])
        .version(4, 0, 0, 0)
        .key_token(0x89e0_3419_565c_7ab7)
        .type_def("System", "Object", 0x0200_0002);
    let app = ModuleBuilder::new("App").build();
    let target = app.module_version_id();

    let blocks = MetadataBlockSet::from_blocks([facade.build(), loaded.build(), app]);
    let resolved = resolve_references(&blocks, target, ReferenceKind::AllModules);

    let core: Vec<_> = resolved
        .iter()
        .filter(|b| b.identity().is_core_library())
        .collect();
    assert_eq!(core.len(), 1);
    assert!(!core[0].type_defs().is_empty());
}

#[test]
fn strong_named_duplicate_replaces_weak_in_place() {
    let weak = ModuleBuilder::new("Newtonsoft.Json").mvid([1; 16]).version(13, 0, 0, 0);
    let strong = ModuleBuilder::new("Newtonsoft.Json")
        .mvid([2; 16])
        .version(13, 0, 0, 0)
        .key_token(0x7788_99AA_BBCC_DDEE);
    let app = ModuleBuilder::new("App").build();
    let target = app.module_version_id();

    let blocks = MetadataBlockSet::from_blocks([weak.build(), strong.build(), app]);
    let resolved = resolve_references(&blocks, target, ReferenceKind::AllModules);

    assert_eq!(names(&resolved), vec!["Newtonsoft.Json", "App"]);
    assert!(resolved.blocks()[0].identity().is_strong_named());
}

#[test]
fn closure_follows_strong_name_requirements() {
    // App requires the strong-named Lib; the weak one does not satisfy it but
    // survives duplicate elimination as a distinct loaded module is not pulled
    // into the closure.
    let weak_lib = ModuleBuilder::new("Lib").mvid([1; 16]).version(2, 0, 0, 0);
    let strong_lib = ModuleBuilder::new("Lib")
        .mvid([2; 16])
        .version(2, 0, 0, 0)
        .key_token(0x0102_0304_0506_0708);
    let app = ModuleBuilder::new("App").reference(&strong_lib.identity());
    let app_block = app.build();
    let target = app_block.module_version_id();

    let blocks = MetadataBlockSet::from_blocks([weak_lib.build(), strong_lib.build(), app_block]);
    let resolved = resolve_references(&blocks, target, ReferenceKind::ReferencedModulesOnly);

    assert_eq!(resolved.len(), 2);
    assert!(resolved.blocks()[0].identity().is_strong_named());
}

#[test]
fn version_compatibility_in_closure() {
    // App's reference table asks for Lib 1.0; a loaded Lib 1.5 satisfies it,
    // a loaded Lib 2.0 does not (major mismatch).
    let required = AssemblyIdentity::simple("Lib", AssemblyVersion::new(1, 0, 0, 0));
    let v15 = ModuleBuilder::new("Lib").mvid([1; 16]).version(1, 5, 0, 0);
    let v20 = ModuleBuilder::new("Lib").mvid([2; 16]).version(2, 0, 0, 0);
    let app = ModuleBuilder::new("App").reference(&required);
    let app_block = app.build();
    let target = app_block.module_version_id();

    let blocks = MetadataBlockSet::from_blocks([v20.build(), v15.build(), app_block]);
    let resolved = resolve_references(&blocks, target, ReferenceKind::ReferencedModulesOnly);

    assert_eq!(resolved.len(), 2);
    assert_eq!(
        resolved.blocks()[0].identity().version,
        AssemblyVersion::new(1, 5, 0, 0)
    );
}

#[test]
fn missing_target_module_resolves_empty() {
    let blocks = MetadataBlockSet::from_blocks([ModuleBuilder::new("App").build()]);
    let resolved = resolve_references(
        &blocks,
        Guid::from_bytes([0xEE; 16]),
        ReferenceKind::AllModules,
    );
    assert!(resolved.is_empty());
}
