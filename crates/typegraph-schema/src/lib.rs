//! # typegraph-schema
//!
//! Turns the metadata collected in a
//! [`MetadataRegistry`](typegraph_metadata::MetadataRegistry) into a
//! validated GraphQL schema.
//!
//! A build takes a frozen snapshot of the registry, resolves every lazy type
//! reference, merges inheritance, checks interface contracts and field
//! overrides, and assembles the `Query`, `Mutation` and `Subscription` root
//! types. Either the whole schema is consistent and returned, or every
//! problem found is reported at once.
//!
//! ## Overview
//!
//! ```ignore
//! use typegraph_schema::{BuildSchemaOptions, build_schema};
//!
//! let schema = build_schema(
//!     &BuildSchemaOptions::new()
//!         .resolver::<RecipeResolver>()
//!         .emit_schema_file("schema/schema.graphql"),
//! )
//! .await?;
//!
//! // Hand the result to the execution runtime
//! let executable = schema.to_dynamic(&Default::default())?;
//! ```
//!
//! ## Configuration
//!
//! Build settings can live in a TOML file:
//!
//! ```toml
//! nullable_by_default = false
//! emit_schema_file = { path = "schema/schema.graphql", sorted_schema = true }
//!
//! [runtime]
//! max_depth = 15
//! max_complexity = 500
//! introspection = true
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Build, print and runtime options
//! - [`schema`] - Reference resolution, schema building and lazy caching
//! - [`emit`] - SDL printing and schema file emission
//! - [`error`] - Error types for schema builds

pub mod config;
pub mod emit;
pub mod error;
pub mod schema;

use std::io::{self, Write};

use tracing::{debug, info};
use typegraph_metadata::{MetadataRegistry, metadata_registry};

// Re-export main types
pub use config::{
    BuildSchemaOptions, EmitSchemaFile, EmitSchemaFileOptions, EmitTarget, PrintSchemaOptions,
    RuntimeConfig, SchemaConfig,
};
pub use emit::{
    GENERATED_BANNER, emit_schema_definition_file, emit_schema_definition_file_sync,
    emit_to_writer, print_schema, render_document,
};
pub use error::{BuildWarning, SchemaError};
pub use schema::{
    GraphSchema, LazySchema, ReferenceResolver, ResolvedArgument, ResolvedEnumValue,
    ResolvedField, ResolvedType, ResolvedTypeRef, ResolversMap, SchemaBuilder, SchemaState, TypeId,
};

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Builds a schema from the process-wide registry and emits it as
/// configured.
///
/// # Errors
///
/// Returns the build error, or `SchemaError::Emit` if emission fails.
/// Nothing is emitted when the build fails.
pub async fn build_schema(options: &BuildSchemaOptions) -> Result<GraphSchema> {
    build_schema_from_registry(metadata_registry(), options).await
}

/// Blocking variant of [`build_schema`].
///
/// # Errors
///
/// Returns the build error, or `SchemaError::Emit` if emission fails.
pub fn build_schema_sync(options: &BuildSchemaOptions) -> Result<GraphSchema> {
    build_schema_from_registry_sync(metadata_registry(), options)
}

/// Builds a schema from `registry` and emits it as configured.
///
/// # Errors
///
/// Returns the build error, or `SchemaError::Emit` if emission fails.
pub async fn build_schema_from_registry(
    registry: &MetadataRegistry,
    options: &BuildSchemaOptions,
) -> Result<GraphSchema> {
    let schema = build_unemitted(registry, options)?;

    match options.config.emit_schema_file.target() {
        Some((EmitTarget::File(path), print)) => {
            emit_schema_definition_file(&path, &schema, &print).await?;
        }
        Some((EmitTarget::Stdout, print)) => emit_to_stdout(io::stdout(), &schema, &print)?,
        None => {}
    }
    Ok(schema)
}

/// Blocking variant of [`build_schema_from_registry`].
///
/// # Errors
///
/// Returns the build error, or `SchemaError::Emit` if emission fails.
pub fn build_schema_from_registry_sync(
    registry: &MetadataRegistry,
    options: &BuildSchemaOptions,
) -> Result<GraphSchema> {
    build_schema_from_registry_to(io::stdout(), registry, options)
}

/// Blocking build that sends stdout emission to `writer` instead.
///
/// Emission to a configured file path is unaffected. `writer` receives the
/// document at most once and nothing at all when the build fails.
///
/// # Errors
///
/// Returns the build error, or `SchemaError::Emit` if emission fails.
pub fn build_schema_from_registry_to<W: Write>(
    writer: W,
    registry: &MetadataRegistry,
    options: &BuildSchemaOptions,
) -> Result<GraphSchema> {
    let schema = build_unemitted(registry, options)?;

    match options.config.emit_schema_file.target() {
        Some((EmitTarget::File(path), print)) => {
            emit_schema_definition_file_sync(&path, &schema, &print)?;
        }
        Some((EmitTarget::Stdout, print)) => emit_to_stdout(writer, &schema, &print)?,
        None => {}
    }
    Ok(schema)
}

/// Builds a schema from the process-wide registry and returns its SDL with
/// the handler bindings of its fields, for runtimes that take type
/// definitions and a resolver map instead of a schema object.
///
/// Emission configured in `options` happens as in [`build_schema`].
///
/// # Errors
///
/// Returns the build error, or `SchemaError::Emit` if emission fails.
pub async fn build_type_defs_and_resolvers(
    options: &BuildSchemaOptions,
) -> Result<(String, ResolversMap)> {
    let schema = build_schema(options).await?;
    Ok(type_defs_and_resolvers(&schema))
}

/// Blocking variant of [`build_type_defs_and_resolvers`].
///
/// # Errors
///
/// Returns the build error, or `SchemaError::Emit` if emission fails.
pub fn build_type_defs_and_resolvers_sync(
    options: &BuildSchemaOptions,
) -> Result<(String, ResolversMap)> {
    let schema = build_schema_sync(options)?;
    Ok(type_defs_and_resolvers(&schema))
}

/// SDL of `schema`, sorted, with its field bindings.
#[must_use]
pub fn type_defs_and_resolvers(schema: &GraphSchema) -> (String, ResolversMap) {
    let type_defs = print_schema(schema, &PrintSchemaOptions::default());
    (type_defs, schema.resolvers_map())
}

fn build_unemitted(
    registry: &MetadataRegistry,
    options: &BuildSchemaOptions,
) -> Result<GraphSchema> {
    options
        .config
        .validate()
        .map_err(SchemaError::InvalidConfig)?;

    let snapshot = registry.snapshot();
    let schema = SchemaBuilder::new(&snapshot, options).build()?;

    info!(
        types = schema.len(),
        warnings = schema.warnings().len(),
        generation = schema.generation(),
        "Schema built"
    );
    Ok(schema)
}

fn emit_to_stdout<W: Write>(
    writer: W,
    schema: &GraphSchema,
    options: &PrintSchemaOptions,
) -> Result<()> {
    debug!("Emitting schema definition to stdout");
    emit_to_writer(writer, schema, options)
}
