//! Builds against the process-wide registry.
//!
//! Only this test binary touches the global registry; everything runs in one
//! test so nothing races on it.

use async_graphql::Value;
use async_graphql::dynamic::FieldFuture;
use typegraph_metadata::{
    ConstructId, FieldFragment, ResolverFragment, Scalar, TypeFragment, TypeReference,
    metadata_registry,
};
use typegraph_schema::{
    BuildSchemaOptions, LazySchema, PrintSchemaOptions, RuntimeConfig, SchemaError, SchemaState,
    build_schema, build_schema_sync, build_type_defs_and_resolvers,
    build_type_defs_and_resolvers_sync, print_schema,
};

struct Recipe;
struct RecipeResolver;

#[tokio::test]
async fn global_registry_builds_sync_async_and_lazily() {
    let registry = metadata_registry();
    registry.reset();

    // Nothing declared yet.
    let err = build_schema_sync(&BuildSchemaOptions::default()).unwrap_err();
    assert!(matches!(err, SchemaError::EmptySchema));

    let recipe = ConstructId::of::<Recipe>();
    let resolver = ConstructId::of::<RecipeResolver>();
    registry.register(ResolverFragment::new(resolver.clone()));
    registry.register(
        FieldFragment::query(resolver, "recipes", TypeReference::of::<Recipe>().list()).handler(
            |_ctx| {
                FieldFuture::new(async {
                    let recipes = Value::from_json(serde_json::json!([{ "title": "Pancakes" }]))?;
                    Ok(Some(recipes))
                })
            },
        ),
    );
    // Declared after its first use.
    registry.register(TypeFragment::object(recipe.clone(), "Recipe"));
    registry.register(FieldFragment::property(recipe, "title", Scalar::String));

    let options = BuildSchemaOptions::new().resolver::<RecipeResolver>();
    let from_sync = build_schema_sync(&options).unwrap();
    let from_async = build_schema(&options).await.unwrap();

    let print = PrintSchemaOptions::default();
    assert_eq!(print_schema(&from_sync, &print), print_schema(&from_async, &print));
    assert_eq!(from_sync.generation(), registry.generation());

    let (type_defs, resolvers) = build_type_defs_and_resolvers_sync(&options).unwrap();
    assert_eq!(type_defs, print_schema(&from_sync, &print));
    let recipes = &resolvers[&("Query".to_string(), "recipes".to_string())];
    assert!(recipes.field_handler().is_some());
    let (async_type_defs, _) = build_type_defs_and_resolvers(&options).await.unwrap();
    assert_eq!(async_type_defs, type_defs);

    let lazy = LazySchema::new(registry, options);
    let schema = lazy.get_or_build().await.unwrap();
    assert_eq!(lazy.state().await, SchemaState::Ready);

    // The finished schema executes against the dynamic runtime.
    let executable = schema.to_dynamic(&RuntimeConfig::default()).unwrap();
    let response = executable.execute("{ recipes { title } }").await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        serde_json::json!({ "recipes": [{ "title": "Pancakes" }] })
    );

    registry.reset();
}
