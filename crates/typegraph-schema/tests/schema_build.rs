//! Integration tests for schema builds.
//!
//! Every test declares its metadata in a private registry, builds through the
//! public entry points and inspects the resulting type graph or SDL.

use typegraph_metadata::{
    ArgumentFragment, ConstructId, FieldFragment, Fragment, InheritanceEdge, MetadataRegistry,
    ResolverFragment, Scalar, TypeFragment, TypeReference, TypeToken,
};
use typegraph_schema::{
    BuildSchemaOptions, BuildWarning, GraphSchema, PrintSchemaOptions, SchemaBuilder, SchemaError,
    build_schema_from_registry_sync, print_schema, type_defs_and_resolvers,
};

// =============================================================================
// Fixtures
// =============================================================================

fn construct(name: &'static str) -> ConstructId {
    ConstructId::named(name)
}

fn build(registry: &MetadataRegistry) -> Result<GraphSchema, SchemaError> {
    build_schema_from_registry_sync(registry, &BuildSchemaOptions::default())
}

fn sdl(schema: &GraphSchema) -> String {
    print_schema(schema, &PrintSchemaOptions::default())
}

fn codes(error: &SchemaError) -> Vec<&'static str> {
    error.errors().iter().map(|e| e.error_code()).collect()
}

/// Recipe and User referencing each other, served by one resolver.
fn recipe_fragments() -> Vec<Fragment> {
    let recipe = construct("Recipe");
    let user = construct("User");
    let resolver = construct("RecipeResolver");

    vec![
        TypeFragment::object(recipe.clone(), "Recipe")
            .description("A cooking recipe")
            .into(),
        FieldFragment::property(recipe.clone(), "title", Scalar::String).into(),
        FieldFragment::property(recipe.clone(), "author", TypeToken::named("User")).into(),
        TypeFragment::object(user.clone(), "User").into(),
        FieldFragment::property(user.clone(), "name", Scalar::String).into(),
        FieldFragment::property(user, "recipes", TypeReference::new(recipe.clone()).list())
            .into(),
        ResolverFragment::new(resolver.clone()).into(),
        FieldFragment::query(resolver, "recipes", TypeReference::new(recipe).list())
            .argument(ArgumentFragment::new("take", Scalar::Int).default_value(10))
            .into(),
    ]
}

fn registry_with(fragments: impl IntoIterator<Item = Fragment>) -> MetadataRegistry {
    let registry = MetadataRegistry::new();
    registry.register_all(fragments);
    registry
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn builds_from_one_snapshot_are_identical() {
    let registry = registry_with(recipe_fragments());
    let snapshot = registry.snapshot();
    let options = BuildSchemaOptions::default();

    let first = SchemaBuilder::new(&snapshot, &options).build().unwrap();
    let second = SchemaBuilder::new(&snapshot, &options).build().unwrap();

    assert_eq!(sdl(&first), sdl(&second));
}

#[test]
fn registration_order_does_not_change_sorted_output() {
    let forward = registry_with(recipe_fragments());
    let backward = registry_with(recipe_fragments().into_iter().rev());

    assert_eq!(sdl(&build(&forward).unwrap()), sdl(&build(&backward).unwrap()));
}

#[test]
fn unsorted_output_keeps_builder_order() {
    let schema = build(&registry_with(recipe_fragments())).unwrap();

    let printed = print_schema(&schema, &PrintSchemaOptions { sorted_schema: false });

    let query = printed.find("type Query").unwrap();
    let recipe = printed.find("type Recipe").unwrap();
    let user = printed.find("type User").unwrap();
    assert!(query < recipe && recipe < user);
    assert!(printed.find("  title").unwrap() < printed.find("  author").unwrap());
}

// =============================================================================
// References
// =============================================================================

#[test]
fn circular_references_resolve_to_each_other() {
    let schema = build(&registry_with(recipe_fragments())).unwrap();

    let recipe = schema.type_by_name("Recipe").unwrap();
    let author = recipe.field("author").unwrap();
    assert_eq!(schema.named_type(&author.type_ref).unwrap().name, "User");

    let user = schema.type_by_name("User").unwrap();
    let recipes = user.field("recipes").unwrap();
    assert_eq!(recipes.type_ref.display(&schema).to_string(), "[Recipe!]!");
    assert_eq!(schema.named_type(&recipes.type_ref).unwrap().name, "Recipe");
}

#[test]
fn unresolved_references_are_reported_together() {
    let registry = registry_with(recipe_fragments());
    registry.register(FieldFragment::property(
        construct("Recipe"),
        "category",
        TypeToken::named("Category"),
    ));
    registry.register(FieldFragment::property(
        construct("User"),
        "avatar",
        TypeToken::named("Image"),
    ));

    let err = build(&registry).unwrap_err();

    assert_eq!(codes(&err), ["UNRESOLVED_REFERENCE", "UNRESOLVED_REFERENCE"]);
    let message = err.to_string();
    assert!(message.contains("Category") && message.contains("Recipe.category"));
    assert!(message.contains("Image") && message.contains("User.avatar"));
}

#[test]
fn conflicting_type_names_are_rejected() {
    let registry = registry_with(recipe_fragments());
    registry.register(TypeFragment::input(construct("OtherRecipe"), "Recipe"));
    registry.register(FieldFragment::property(construct("OtherRecipe"), "title", Scalar::String));

    let err = build(&registry).unwrap_err();

    assert_eq!(codes(&err), ["DUPLICATE_TYPE_NAME"]);
    assert!(err.to_string().contains("OtherRecipe"));
}

#[test]
fn identical_declarations_merge_with_a_warning() {
    let registry = registry_with(recipe_fragments());
    registry.register(TypeFragment::object(construct("CopiedUser"), "User"));
    registry.register(FieldFragment::property(construct("CopiedUser"), "name", Scalar::String));
    registry.register(FieldFragment::property(
        construct("CopiedUser"),
        "recipes",
        TypeReference::new(construct("Recipe")).list(),
    ));

    let schema = build(&registry).unwrap();

    assert!(schema.warnings().contains(&BuildWarning::MergedDuplicate {
        name: "User".into()
    }));
    assert_eq!(schema.types().filter(|(_, ty)| ty.name == "User").count(), 1);
}

#[test]
fn declarations_with_different_parents_conflict_in_either_order() {
    let shared: Vec<Fragment> = vec![
        TypeFragment::object(construct("Base"), "Base")
            .abstract_type()
            .into(),
        FieldFragment::property(construct("Base"), "secret", Scalar::String).into(),
        FieldFragment::query(construct("UserResolver"), "user", TypeToken::named("User")).into(),
    ];
    let extended: Vec<Fragment> = vec![
        TypeFragment::object(construct("a::User"), "User").into(),
        FieldFragment::property(construct("a::User"), "name", Scalar::String).into(),
        InheritanceEdge::new(construct("a::User"), construct("Base")).into(),
    ];
    let plain: Vec<Fragment> = vec![
        TypeFragment::object(construct("b::User"), "User").into(),
        FieldFragment::property(construct("b::User"), "name", Scalar::String).into(),
    ];

    for (first, second) in [(&extended, &plain), (&plain, &extended)] {
        let registry = registry_with(shared.iter().chain(first).chain(second).cloned());

        let err = build(&registry).unwrap_err();

        assert_eq!(codes(&err), ["DUPLICATE_TYPE_NAME"]);
    }
}

// =============================================================================
// Inheritance and interfaces
// =============================================================================

fn node_fragments() -> Vec<Fragment> {
    let node = construct("Node");
    vec![
        TypeFragment::interface(node.clone(), "Node").into(),
        FieldFragment::property(node.clone(), "id", Scalar::Id).into(),
        TypeFragment::object(construct("Entity"), "Entity")
            .abstract_type()
            .into(),
        FieldFragment::property(construct("Entity"), "related", TypeReference::new(node).optional())
            .into(),
        FieldFragment::property(
            construct("Entity"),
            "label",
            TypeReference::new(Scalar::String).optional(),
        )
        .into(),
        FieldFragment::property(construct("Entity"), "count", Scalar::Int).into(),
        TypeFragment::object(construct("Recipe"), "Recipe")
            .implements(construct("Node"))
            .into(),
        FieldFragment::property(construct("Recipe"), "id", Scalar::Id).into(),
        InheritanceEdge::new(construct("Recipe"), construct("Entity")).into(),
        FieldFragment::query(construct("RecipeResolver"), "recipe", construct("Recipe")).into(),
    ]
}

#[test]
fn covariant_overrides_are_accepted() {
    let registry = registry_with(node_fragments());
    // Nullable to non-null, and interface to implementing object.
    registry.register(FieldFragment::property(construct("Recipe"), "label", Scalar::String));
    registry.register(FieldFragment::property(construct("Recipe"), "related", construct("Recipe")));

    let schema = build(&registry).unwrap();

    let recipe = schema.type_by_name("Recipe").unwrap();
    let fields: Vec<_> = recipe.fields.keys().map(String::as_str).collect();
    assert_eq!(fields, ["related", "label", "count", "id"]);
    assert_eq!(
        recipe.field("related").unwrap().type_ref.display(&schema).to_string(),
        "Recipe!"
    );
    assert!(schema.type_by_name("Entity").is_none());
}

#[test]
fn incompatible_override_names_both_types() {
    let registry = registry_with(node_fragments());
    registry.register(FieldFragment::property(construct("Recipe"), "count", Scalar::String));

    let err = build(&registry).unwrap_err();

    match err {
        SchemaError::IncompatibleOverride {
            type_name,
            field,
            parent,
            expected,
            found,
        } => {
            assert_eq!(type_name, "Recipe");
            assert_eq!(field, "count");
            assert_eq!(parent, "Entity");
            assert_eq!(expected, "Int!");
            assert_eq!(found, "String!");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn widening_nullability_is_incompatible() {
    let registry = registry_with(node_fragments());
    registry.register(FieldFragment::property(
        construct("Recipe"),
        "count",
        TypeReference::new(Scalar::Int).optional(),
    ));

    let err = build(&registry).unwrap_err();

    assert_eq!(codes(&err), ["INCOMPATIBLE_OVERRIDE"]);
}

#[test]
fn missing_interface_field_is_named() {
    let registry = registry_with(node_fragments());
    registry.register(FieldFragment::property(construct("Node"), "createdAt", Scalar::String));

    let err = build(&registry).unwrap_err();

    match err {
        SchemaError::InterfaceContract {
            type_name,
            interface,
            missing,
            incompatible,
        } => {
            assert_eq!(type_name, "Recipe");
            assert_eq!(interface, "Node");
            assert_eq!(missing, ["createdAt"]);
            assert!(incompatible.is_empty());
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn implementations_of_reachable_interfaces_are_included() {
    let registry = MetadataRegistry::new();
    let node = construct("Node");
    registry.register(TypeFragment::interface(node.clone(), "Node"));
    registry.register(FieldFragment::property(node.clone(), "id", Scalar::Id));
    registry.register(TypeFragment::object(construct("User"), "User"));
    registry.register(InheritanceEdge::new(construct("User"), node.clone()));
    registry.register(FieldFragment::query(construct("NodeResolver"), "node", node));

    let schema = build(&registry).unwrap();

    let node = schema.type_by_name("Node").unwrap();
    let implementors: Vec<_> = node
        .possible_types
        .iter()
        .map(|&id| schema.type_name(id))
        .collect();
    assert_eq!(implementors, ["User"]);
    assert!(sdl(&schema).contains("type User implements Node {\n  id: ID!\n}"));
}

#[test]
fn cyclic_inheritance_is_rejected() {
    let registry = registry_with(recipe_fragments());
    registry.register(InheritanceEdge::new(construct("Recipe"), construct("User")));
    registry.register(InheritanceEdge::new(construct("User"), construct("Recipe")));

    let err = build(&registry).unwrap_err();

    assert!(codes(&err).contains(&"CYCLIC_INHERITANCE"));
}

#[test]
fn interfaces_implementing_each_other_are_rejected() {
    let registry = MetadataRegistry::new();
    registry.register(TypeFragment::interface(construct("A"), "A").implements(construct("B")));
    registry.register(FieldFragment::property(construct("A"), "id", Scalar::Id));
    registry.register(TypeFragment::interface(construct("B"), "B").implements(construct("A")));
    registry.register(FieldFragment::property(construct("B"), "id", Scalar::Id));
    registry.register(FieldFragment::query(construct("QueryResolver"), "a", construct("A")));

    let err = build(&registry).unwrap_err();

    match err {
        SchemaError::CyclicInheritance { chain } => assert_eq!(chain, ["A", "B", "A"]),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn interface_implementing_itself_is_rejected() {
    let registry = MetadataRegistry::new();
    registry.register(TypeFragment::interface(construct("A"), "A").implements(construct("A")));
    registry.register(FieldFragment::property(construct("A"), "id", Scalar::Id));
    registry.register(FieldFragment::query(construct("QueryResolver"), "a", construct("A")));

    let err = build(&registry).unwrap_err();

    match err {
        SchemaError::CyclicInheritance { chain } => assert_eq!(chain, ["A", "A"]),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn unresolved_inherited_field_is_not_reported_missing() {
    let registry = MetadataRegistry::new();
    registry.register(TypeFragment::interface(construct("Named"), "Named"));
    registry.register(FieldFragment::property(construct("Named"), "label", Scalar::String));
    registry.register(TypeFragment::object(construct("Base"), "Base").abstract_type());
    registry.register(FieldFragment::property(
        construct("Base"),
        "label",
        TypeToken::named("Missing"),
    ));
    registry.register(
        TypeFragment::object(construct("User"), "User").implements(construct("Named")),
    );
    registry.register(FieldFragment::property(construct("User"), "id", Scalar::Id));
    registry.register(InheritanceEdge::new(construct("User"), construct("Base")));
    registry.register(FieldFragment::query(construct("UserResolver"), "user", construct("User")));

    let err = build(&registry).unwrap_err();

    assert_eq!(codes(&err), ["UNRESOLVED_REFERENCE"]);
    assert!(err.to_string().contains("Missing"));
}

// =============================================================================
// Resolvers
// =============================================================================

#[test]
fn field_resolvers_attach_to_the_served_type() {
    let registry = registry_with(recipe_fragments());
    let resolver = construct("RecipeResolver");
    registry.register(ResolverFragment::new(resolver.clone()).of(construct("Recipe")));
    registry.register(
        FieldFragment::field_resolver(resolver.clone(), "rating", Scalar::Float)
            .method("average_rating"),
    );
    registry.register(
        FieldFragment::field_resolver(resolver, "title", Scalar::String)
            .description("Display title"),
    );

    let schema = build(&registry).unwrap();

    let recipe = schema.type_by_name("Recipe").unwrap();
    let rating = recipe.field("rating").unwrap();
    let binding = rating.binding.as_ref().unwrap();
    assert_eq!(binding.resolver, construct("RecipeResolver"));
    assert_eq!(binding.method, "average_rating");
    // A field resolver named like a property replaces it in place.
    let fields: Vec<_> = recipe.fields.keys().map(String::as_str).collect();
    assert_eq!(fields, ["title", "author", "rating"]);
    assert_eq!(recipe.field("title").unwrap().description.as_deref(), Some("Display title"));
}

#[test]
fn type_defs_come_with_their_field_bindings() {
    let registry = registry_with(recipe_fragments());
    let resolver = construct("RecipeResolver");
    registry.register(ResolverFragment::new(resolver.clone()).of(construct("Recipe")));
    registry.register(
        FieldFragment::field_resolver(resolver.clone(), "rating", Scalar::Float)
            .method("average_rating"),
    );

    let schema = build(&registry).unwrap();
    let (type_defs, resolvers) = type_defs_and_resolvers(&schema);

    assert_eq!(type_defs, sdl(&schema));
    assert_eq!(resolvers.len(), 2);
    let rating = &resolvers[&("Recipe".to_string(), "rating".to_string())];
    assert_eq!(rating.resolver, resolver);
    assert_eq!(rating.method, "average_rating");
    assert_eq!(resolvers[&("Query".to_string(), "recipes".to_string())].method, "recipes");
    // Stored fields read the parent's property and need no binding.
    assert!(!resolvers.contains_key(&("Recipe".to_string(), "title".to_string())));
}

#[test]
fn field_resolvers_need_a_target_type() {
    let registry = registry_with(recipe_fragments());
    registry.register(FieldFragment::field_resolver(
        construct("RecipeResolver"),
        "rating",
        Scalar::Float,
    ));

    let err = build(&registry).unwrap_err();

    assert_eq!(codes(&err), ["MISSING_RESOLVER_TARGET"]);
}

#[test]
fn inherited_resolver_methods_bind_to_the_subclass() {
    let registry = registry_with(recipe_fragments());
    let base = construct("BaseResolver");
    let child = construct("UserResolver");
    registry.register(ResolverFragment::new(base.clone()).abstract_resolver());
    registry.register(FieldFragment::query(
        base.clone(),
        "users",
        TypeReference::named("User").list(),
    ));
    registry.register(ResolverFragment::new(child.clone()).extends(base));

    let schema = build(&registry).unwrap();

    let users = schema.query_type().field("users").unwrap();
    assert_eq!(users.binding.as_ref().unwrap().resolver, child);
}

#[test]
fn only_listed_resolvers_are_scanned() {
    let registry = registry_with(recipe_fragments());
    registry.register(ResolverFragment::new(construct("UserResolver")));
    registry.register(FieldFragment::query(construct("UserResolver"), "me", construct("User")));

    let options = BuildSchemaOptions::new().resolver_construct(construct("UserResolver"));
    let schema = build_schema_from_registry_sync(&registry, &options).unwrap();

    let fields: Vec<_> = schema.query_type().fields.keys().map(String::as_str).collect();
    assert_eq!(fields, ["me"]);
}

#[test]
fn duplicate_root_fields_are_rejected() {
    let registry = registry_with(recipe_fragments());
    registry.register(FieldFragment::query(
        construct("OtherResolver"),
        "recipes",
        Scalar::Int,
    ));

    let err = build(&registry).unwrap_err();

    assert_eq!(codes(&err), ["DUPLICATE_FIELD"]);
}

#[test]
fn mutation_and_subscription_roots_are_optional() {
    let registry = registry_with(recipe_fragments());
    let schema = build(&registry).unwrap();
    assert!(schema.mutation_type().is_none());
    assert!(schema.subscription_type().is_none());

    registry.register(FieldFragment::mutation(
        construct("RecipeResolver"),
        "addRecipe",
        construct("Recipe"),
    ));
    let schema = build(&registry).unwrap();
    assert_eq!(schema.mutation_type().unwrap().name, "Mutation");
}

#[test]
fn query_without_fields_is_an_empty_schema() {
    let registry = MetadataRegistry::new();
    registry.register(TypeFragment::object(construct("Recipe"), "Recipe"));
    registry.register(FieldFragment::property(construct("Recipe"), "title", Scalar::String));

    let err = build(&registry).unwrap_err();

    assert!(matches!(err, SchemaError::EmptySchema));
}

// =============================================================================
// Reachability
// =============================================================================

#[test]
fn unreachable_types_are_dropped_with_a_warning() {
    let registry = registry_with(recipe_fragments());
    registry.register(TypeFragment::object(construct("Orphan"), "Orphan"));
    registry.register(FieldFragment::property(construct("Orphan"), "id", Scalar::Id));

    let schema = build(&registry).unwrap();

    assert!(schema.type_by_name("Orphan").is_none());
    assert_eq!(
        schema.warnings(),
        [BuildWarning::UnreachableType {
            name: "Orphan".into()
        }]
    );
}

#[test]
fn orphaned_types_listed_in_options_are_kept() {
    let registry = registry_with(recipe_fragments());
    registry.register(TypeFragment::object(construct("Orphan"), "Orphan"));
    registry.register(FieldFragment::property(construct("Orphan"), "id", Scalar::Id));

    let options = BuildSchemaOptions::new().orphaned_type(construct("Orphan"));
    let schema = build_schema_from_registry_sync(&registry, &options).unwrap();

    assert!(schema.type_by_name("Orphan").is_some());
    assert!(schema.warnings().is_empty());
}

#[test]
fn unions_list_their_members() {
    let registry = registry_with(recipe_fragments());
    registry.register(
        TypeFragment::union(construct("SearchResult"), "SearchResult")
            .member(construct("User"))
            .member(construct("Recipe")),
    );
    registry.register(FieldFragment::query(
        construct("SearchResolver"),
        "search",
        TypeReference::new(construct("SearchResult")).list(),
    ));

    let schema = build(&registry).unwrap();

    assert!(sdl(&schema).contains("union SearchResult = Recipe | User"));
}
