//! Process-wide registry behaviour.
//!
//! Only this test binary touches the global registry, so the tests in here
//! run against one shared instance and are written to tolerate each other.

use typegraph_metadata::{
    ConstructId, FieldFragment, MetadataRegistry, Scalar, TypeFragment, TypeToken,
    metadata_registry,
};

struct Ingredient;

#[test]
fn global_registry_collects_and_resets() {
    let registry = metadata_registry();
    assert!(std::ptr::eq(registry, metadata_registry()));

    let target = ConstructId::of::<Ingredient>();
    let id = registry.register(TypeFragment::object(target.clone(), "Ingredient"));
    registry.register(FieldFragment::property(target.clone(), "name", Scalar::String));

    let snapshot = registry.snapshot();
    assert_eq!(
        snapshot.type_fragment(id).map(|fragment| fragment.name.as_str()),
        Some("Ingredient")
    );
    assert_eq!(snapshot.fields_of(&target).count(), 1);

    registry.reset();
    assert!(registry.is_empty());
    // The snapshot outlives the reset.
    assert_eq!(snapshot.fields_of(&target).count(), 1);
}

#[test]
fn private_registries_are_isolated() {
    let first = MetadataRegistry::new();
    let second = MetadataRegistry::new();

    first.register(
        TypeFragment::object(ConstructId::named("A"), "A").implements(TypeToken::named("Node")),
    );

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
}

#[test]
fn forward_references_are_accepted_at_registration() {
    let registry = MetadataRegistry::new();

    // Nothing named `Missing` exists; registration still succeeds.
    registry.register(FieldFragment::property(
        ConstructId::named("Recipe"),
        "missing",
        TypeToken::named("Missing"),
    ));

    assert_eq!(registry.snapshot().fields().count(), 1);
}
