//! Lazy schema building.
//!
//! `LazySchema` defers the build until the schema is first needed and keeps
//! the result until the registry changes. Registering a fragment bumps the
//! registry generation; the next access notices and rebuilds.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use typegraph_metadata::MetadataRegistry;

use super::GraphSchema;
use crate::config::BuildSchemaOptions;
use crate::error::SchemaError;

/// State of the lazy schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// Schema has not been built yet, or was invalidated.
    Uninitialized,
    /// Schema is currently being built.
    Building,
    /// Schema is ready for use.
    Ready,
    /// Schema build failed.
    Failed,
}

/// Thread-safe lazy schema holder.
///
/// # Example
///
/// ```ignore
/// let lazy = LazySchema::new(metadata_registry(), options);
///
/// // First access triggers the build
/// let schema = lazy.get_or_build().await?;
///
/// // Served from the cache until a fragment is registered
/// let schema = lazy.get_or_build().await?;
///
/// // Force a rebuild on next access
/// lazy.invalidate().await;
/// ```
pub struct LazySchema<'r> {
    registry: &'r MetadataRegistry,
    options: BuildSchemaOptions,

    /// The cached schema (None if not built yet or invalidated).
    schema: RwLock<Option<Arc<GraphSchema>>>,

    /// Build lock to ensure only one build at a time.
    build_lock: Mutex<()>,

    state: RwLock<SchemaState>,

    /// Last build error message (for diagnostics).
    last_error: RwLock<Option<String>>,
}

impl<'r> LazySchema<'r> {
    /// Creates a lazy schema over `registry`.
    #[must_use]
    pub fn new(registry: &'r MetadataRegistry, options: BuildSchemaOptions) -> Self {
        Self {
            registry,
            options,
            schema: RwLock::new(None),
            build_lock: Mutex::new(()),
            state: RwLock::new(SchemaState::Uninitialized),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the current state of the schema.
    pub async fn state(&self) -> SchemaState {
        *self.state.read().await
    }

    /// The cached schema if it matches the current registry generation.
    async fn current(&self) -> Option<Arc<GraphSchema>> {
        let schema = self.schema.read().await;
        schema
            .as_ref()
            .filter(|s| s.generation() == self.registry.generation())
            .map(Arc::clone)
    }

    /// Gets the schema, building it if necessary.
    ///
    /// Concurrent callers wait for an in-progress build. Nothing is cached
    /// after a failed build, so the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns the build error. Schema file emission configured in the
    /// options happens on every successful build.
    pub async fn get_or_build(&self) -> Result<Arc<GraphSchema>, SchemaError> {
        // Fast path: schema already built
        if let Some(schema) = self.current().await {
            return Ok(schema);
        }

        let _guard = self.build_lock.lock().await;

        // Double-check after acquiring lock
        if let Some(schema) = self.current().await {
            return Ok(schema);
        }

        *self.state.write().await = SchemaState::Building;
        let generation = self.registry.generation();
        info!(generation, "Building GraphQL schema...");

        match crate::build_schema_from_registry(self.registry, &self.options).await {
            Ok(schema) => {
                let schema = Arc::new(schema);
                *self.schema.write().await = Some(Arc::clone(&schema));
                *self.state.write().await = SchemaState::Ready;
                *self.last_error.write().await = None;
                info!(types = schema.len(), "GraphQL schema built successfully");
                Ok(schema)
            }
            Err(e) => {
                let error_msg = e.to_string();
                warn!(error = %error_msg, "Failed to build GraphQL schema");
                *self.schema.write().await = None;
                *self.state.write().await = SchemaState::Failed;
                *self.last_error.write().await = Some(error_msg);
                Err(e)
            }
        }
    }

    /// Gets the schema if it's already built, without triggering a build.
    ///
    /// The returned schema may be stale if the registry changed since.
    pub async fn get(&self) -> Option<Arc<GraphSchema>> {
        self.schema.read().await.clone()
    }

    /// Drops the cached schema so the next `get_or_build()` rebuilds it.
    pub async fn invalidate(&self) {
        let _guard = self.build_lock.lock().await;

        *self.schema.write().await = None;
        *self.state.write().await = SchemaState::Uninitialized;
        *self.last_error.write().await = None;

        info!("GraphQL schema invalidated - will rebuild on next access");
    }

    /// Returns the last build error, if any.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    /// Returns whether a schema is cached and ready for use.
    pub async fn is_ready(&self) -> bool {
        *self.state.read().await == SchemaState::Ready
    }
}

#[cfg(test)]
mod tests {
    use typegraph_metadata::{ConstructId, FieldFragment, Scalar};

    use super::*;

    fn hello(registry: &MetadataRegistry, name: &str) {
        registry.register(FieldFragment::query(
            ConstructId::named("HelloResolver"),
            name.to_string(),
            Scalar::String,
        ));
    }

    #[tokio::test]
    async fn test_builds_once_and_caches() {
        let registry = MetadataRegistry::new();
        hello(&registry, "hello");
        let lazy = LazySchema::new(&registry, BuildSchemaOptions::default());

        assert_eq!(lazy.state().await, SchemaState::Uninitialized);
        assert!(lazy.get().await.is_none());

        let first = lazy.get_or_build().await.unwrap();
        let second = lazy.get_or_build().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(lazy.is_ready().await);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_build() {
        let registry = MetadataRegistry::new();
        hello(&registry, "hello");
        let lazy = LazySchema::new(&registry, BuildSchemaOptions::default());

        let schemas = futures_util::future::join_all((0..8).map(|_| lazy.get_or_build())).await;

        let first = schemas[0].as_ref().unwrap();
        for schema in &schemas {
            assert!(Arc::ptr_eq(first, schema.as_ref().unwrap()));
        }
    }

    #[tokio::test]
    async fn test_rebuilds_after_registration() {
        let registry = MetadataRegistry::new();
        hello(&registry, "hello");
        let lazy = LazySchema::new(&registry, BuildSchemaOptions::default());
        let first = lazy.get_or_build().await.unwrap();

        hello(&registry, "goodbye");
        let second = lazy.get_or_build().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.query_type().field("goodbye").is_some());
    }

    #[tokio::test]
    async fn test_failure_is_recorded() {
        let registry = MetadataRegistry::new();
        let lazy = LazySchema::new(&registry, BuildSchemaOptions::default());

        let err = lazy.get_or_build().await.unwrap_err();

        assert_eq!(err.error_code(), "EMPTY_SCHEMA");
        assert_eq!(lazy.state().await, SchemaState::Failed);
        assert!(lazy.last_error().await.is_some());

        hello(&registry, "hello");
        lazy.invalidate().await;
        assert!(lazy.last_error().await.is_none());
        assert!(lazy.get_or_build().await.is_ok());
    }
}
