//! Schema build configuration.
//!
//! [`SchemaConfig`] holds the serializable part of a build's options and can
//! be loaded from TOML:
//!
//! ```toml
//! nullable_by_default = false
//! emit_schema_file = { path = "schema/schema.graphql", sorted_schema = false }
//!
//! [runtime]
//! max_depth = 15
//! max_complexity = 500
//! introspection = true
//! ```
//!
//! [`BuildSchemaOptions`] adds what only code can provide: the resolver
//! constructs to scan and the explicitly listed types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use typegraph_metadata::{ConstructId, TypeToken};

use crate::error::SchemaError;

/// Options for printing a schema as SDL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintSchemaOptions {
    /// Sort types, fields, arguments, enum values, interfaces and union
    /// members alphabetically. When false, builder order is kept.
    /// Default: true
    #[serde(default = "default_sorted_schema")]
    pub sorted_schema: bool,
}

fn default_sorted_schema() -> bool {
    true
}

impl Default for PrintSchemaOptions {
    fn default() -> Self {
        Self {
            sorted_schema: default_sorted_schema(),
        }
    }
}

/// Emission settings given as a table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmitSchemaFileOptions {
    /// Target file. Without a path the document goes to stdout.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(flatten)]
    pub print: PrintSchemaOptions,
}

/// Whether and where a build emits its schema definition.
///
/// Accepts `false`, `true`, a path string or an options table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmitSchemaFile {
    Flag(bool),
    Path(PathBuf),
    Options(EmitSchemaFileOptions),
}

impl Default for EmitSchemaFile {
    fn default() -> Self {
        Self::Flag(false)
    }
}

/// Where an enabled emission goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitTarget {
    /// No path could be resolved; print to standard output.
    Stdout,
    File(PathBuf),
}

impl EmitSchemaFile {
    /// Resolves the emission target, or `None` when emission is disabled.
    #[must_use]
    pub fn target(&self) -> Option<(EmitTarget, PrintSchemaOptions)> {
        match self {
            Self::Flag(false) => None,
            Self::Flag(true) => Some((EmitTarget::Stdout, PrintSchemaOptions::default())),
            Self::Path(path) => Some((
                EmitTarget::File(path.clone()),
                PrintSchemaOptions::default(),
            )),
            Self::Options(options) => {
                let target = match &options.path {
                    Some(path) => EmitTarget::File(path.clone()),
                    None => EmitTarget::Stdout,
                };
                Some((target, options.print.clone()))
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        let path = match self {
            Self::Path(path) => Some(path),
            Self::Options(options) => options.path.as_ref(),
            Self::Flag(_) => None,
        };
        if path.is_some_and(|path| path.as_os_str().is_empty()) {
            return Err("emit_schema_file path must not be empty".into());
        }
        Ok(())
    }
}

impl From<bool> for EmitSchemaFile {
    fn from(enabled: bool) -> Self {
        Self::Flag(enabled)
    }
}

impl From<PathBuf> for EmitSchemaFile {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&str> for EmitSchemaFile {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<EmitSchemaFileOptions> for EmitSchemaFile {
    fn from(options: EmitSchemaFileOptions) -> Self {
        Self::Options(options)
    }
}

/// Settings passed through to the execution runtime beneath the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Maximum query depth allowed.
    /// Default: 15
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum query complexity allowed.
    /// Default: 500
    #[serde(default = "default_max_complexity")]
    pub max_complexity: usize,

    /// Enable introspection queries.
    /// Default: true
    #[serde(default = "default_introspection")]
    pub introspection: bool,
}

fn default_max_depth() -> usize {
    15
}

fn default_max_complexity() -> usize {
    500
}

fn default_introspection() -> bool {
    true
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_complexity: default_max_complexity(),
            introspection: default_introspection(),
        }
    }
}

impl RuntimeConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if limits are zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == 0 {
            return Err("runtime.max_depth must be > 0".into());
        }
        if self.max_complexity == 0 {
            return Err("runtime.max_complexity must be > 0".into());
        }
        Ok(())
    }
}

/// Serializable build configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Schema definition emission. Default: disabled.
    #[serde(default)]
    pub emit_schema_file: EmitSchemaFile,

    /// Treat declarations without explicit nullability as nullable.
    /// Default: false
    #[serde(default)]
    pub nullable_by_default: bool,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl SchemaConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidConfig` if parsing or validation fails.
    pub fn from_toml_str(source: &str) -> Result<Self, SchemaError> {
        let config: Self =
            toml::from_str(source).map_err(|e| SchemaError::InvalidConfig(e.to_string()))?;
        config.validate().map_err(SchemaError::InvalidConfig)?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        self.emit_schema_file.validate()?;
        self.runtime.validate()
    }
}

/// Everything a build needs besides the registry.
#[derive(Debug, Clone, Default)]
pub struct BuildSchemaOptions {
    /// Resolver constructs to scan. Empty means every registered,
    /// non-abstract resolver.
    pub resolvers: Vec<ConstructId>,

    /// Types included even when no root reaches them.
    pub types: Vec<TypeToken>,

    pub config: SchemaConfig,
}

impl BuildSchemaOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the resolver declared by the Rust type `T`.
    #[must_use]
    pub fn resolver<T: ?Sized + 'static>(self) -> Self {
        self.resolver_construct(ConstructId::of::<T>())
    }

    /// Adds a resolver construct.
    #[must_use]
    pub fn resolver_construct(mut self, resolver: ConstructId) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// Includes a type that no root reaches.
    #[must_use]
    pub fn orphaned_type(mut self, token: impl Into<TypeToken>) -> Self {
        self.types.push(token.into());
        self
    }

    #[must_use]
    pub fn emit_schema_file(mut self, emit: impl Into<EmitSchemaFile>) -> Self {
        self.config.emit_schema_file = emit.into();
        self
    }

    #[must_use]
    pub fn nullable_by_default(mut self, nullable: bool) -> Self {
        self.config.nullable_by_default = nullable;
        self
    }

    #[must_use]
    pub fn config(mut self, config: SchemaConfig) -> Self {
        self.config = config;
        self
    }
}
