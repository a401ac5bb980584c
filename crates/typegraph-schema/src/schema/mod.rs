//! Schema assembly.
//!
//! This module turns a registry snapshot into a [`GraphSchema`]. The build
//! is a single synchronous pass over frozen metadata; it never touches the
//! live registry and performs no I/O.
//!
//! ## Components
//!
//! - [`ReferenceResolver`] - Resolves lazy type tokens against the snapshot
//! - [`SchemaBuilder`] - Validation and synthesis of resolved types
//! - [`GraphSchema`] - The immutable result
//! - [`LazySchema`] - Cached schema that rebuilds when the registry changes
//!
//! ## Build steps
//!
//! 1. Index type names, collapsing identical duplicates
//! 2. Collect the resolver constructs in scope and their fields
//! 3. Attach field resolvers, then merge inherited fields
//! 4. Resolve field, argument, interface and member references
//! 5. Check overrides, interface contracts and empty types
//! 6. Assemble the root operation types
//! 7. Drop unreachable types and synthesize the finished schema

mod builder;
mod dynamic;
mod graph;
mod inheritance;
mod lazy;
mod names;
mod resolver;

pub use builder::SchemaBuilder;
pub use graph::{
    GraphSchema, ResolvedArgument, ResolvedEnumValue, ResolvedField, ResolvedType,
    ResolvedTypeRef, ResolversMap, TypeId,
};
pub use lazy::{LazySchema, SchemaState};
pub use names::is_valid_graphql_name;
pub use resolver::{Position, ReferenceResolver, Resolved, TypeSlot};

use crate::error::{BuildWarning, SchemaError};

/// Problems collected during one build.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    pub errors: Vec<SchemaError>,
    pub warnings: Vec<BuildWarning>,
}

impl Diagnostics {
    /// Records an error. A field inherited by several types fails the same
    /// way in each of them; the repeats are dropped.
    pub fn error(&mut self, error: SchemaError) {
        let message = error.to_string();
        if !self.errors.iter().any(|known| known.to_string() == message) {
            self.errors.push(error);
        }
    }

    pub fn warn(&mut self, warning: BuildWarning) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
