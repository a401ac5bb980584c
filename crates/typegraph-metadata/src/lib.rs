//! # typegraph-metadata
//!
//! Metadata collection for code-first GraphQL schemas.
//!
//! Application code declares GraphQL types, fields and resolvers by
//! registering *fragments* in a [`MetadataRegistry`]. Declarations can happen
//! in any order and may reference types that are registered later: type
//! references are lazy [`TypeToken`]s that are only resolved when a schema is
//! built (see the `typegraph-schema` crate).
//!
//! ```ignore
//! use typegraph_metadata::*;
//!
//! struct Recipe;
//! struct RecipeResolver;
//!
//! let registry = metadata_registry();
//! registry.register(TypeFragment::object(ConstructId::of::<Recipe>(), "Recipe"));
//! registry.register(FieldFragment::property(
//!     ConstructId::of::<Recipe>(),
//!     "title",
//!     Scalar::String,
//! ));
//! registry.register(ResolverFragment::new(ConstructId::of::<RecipeResolver>()));
//! registry.register(FieldFragment::query(
//!     ConstructId::of::<RecipeResolver>(),
//!     "recipes",
//!     TypeReference::of::<Recipe>().list(),
//! ));
//! ```
//!
//! ## Modules
//!
//! - [`construct`] - Identity of declaring constructs
//! - [`reference`] - Lazy type references
//! - [`fragment`] - Fragment data model
//! - [`binding`] - Resolver bindings and runtime handlers
//! - [`registry`] - The registry and its snapshots

pub mod binding;
pub mod construct;
pub mod fragment;
pub mod reference;
pub mod registry;

pub use binding::{FieldHandler, Handler, ResolverBinding, SubscriptionHandler};
pub use construct::ConstructId;
pub use fragment::{
    ArgumentFragment, ArgumentSource, EnumValueFragment, FieldFragment, FieldRole, Fragment,
    InheritanceEdge, OperationType, ResolverFragment, TypeFragment, TypeKind,
};
pub use reference::{Nullable, Scalar, TypeReference, TypeToken};
pub use registry::{FragmentId, MetadataRegistry, RegistrySnapshot, metadata_registry};
