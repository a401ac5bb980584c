//! The metadata registry.
//!
//! Collection sites push fragments into a [`MetadataRegistry`] at any time
//! before a build; builds work on a frozen [`RegistrySnapshot`]. The
//! registry never validates anything: duplicate names, dangling references
//! and inheritance cycles are all reported by the build.
//!
//! ## Process-wide default
//!
//! Declarations usually happen during program initialization, long before
//! any build call, so there is one registry per process reachable through
//! [`metadata_registry`]. It lives until process exit; [`MetadataRegistry::reset`]
//! is the only way to clear it. Code that wants isolation (tests, plugins)
//! creates its own registry with [`MetadataRegistry::new`] and passes it to
//! the build explicitly.
//!
//! ## Concurrency
//!
//! The registry is lock-protected, but collection is expected to be finished
//! before a build starts. Registering fragments concurrently with a build is
//! unsupported: the build sees whatever snapshot it took.

use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::construct::ConstructId;
use crate::fragment::{FieldFragment, Fragment, InheritanceEdge, ResolverFragment, TypeFragment};

/// Handle of a registered fragment: its position in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(u32);

impl FragmentId {
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    fragments: Arc<Vec<Fragment>>,
    generation: u64,
}

/// Insertion-ordered store of metadata fragments.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    state: RwLock<RegistryState>,
}

static GLOBAL_REGISTRY: LazyLock<MetadataRegistry> = LazyLock::new(MetadataRegistry::new);

/// Returns the process-wide registry.
pub fn metadata_registry() -> &'static MetadataRegistry {
    &GLOBAL_REGISTRY
}

impl MetadataRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fragment and returns its handle.
    ///
    /// Registration never fails. Existing snapshots are unaffected.
    pub fn register(&self, fragment: impl Into<Fragment>) -> FragmentId {
        let fragment = fragment.into();
        let mut state = self.state.write();
        let id = FragmentId::new(state.fragments.len());

        trace!(
            id = %id,
            kind = fragment.kind_label(),
            target = %fragment.target(),
            "Registered metadata fragment"
        );

        Arc::make_mut(&mut state.fragments).push(fragment);
        state.generation += 1;
        id
    }

    /// Registers several fragments in order.
    pub fn register_all<I, F>(&self, fragments: I) -> Vec<FragmentId>
    where
        I: IntoIterator<Item = F>,
        F: Into<Fragment>,
    {
        fragments.into_iter().map(|f| self.register(f)).collect()
    }

    /// Returns a frozen view of everything registered so far.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.read();
        RegistrySnapshot {
            fragments: Arc::clone(&state.fragments),
            generation: state.generation,
        }
    }

    /// Mutation counter; changes whenever the registry content changes.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Number of registered fragments.
    pub fn len(&self) -> usize {
        self.state.read().fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every fragment.
    pub fn reset(&self) {
        let mut state = self.state.write();
        let dropped = state.fragments.len();
        state.fragments = Arc::new(Vec::new());
        state.generation += 1;
        debug!(dropped, "Metadata registry reset");
    }
}

/// Immutable view of a registry at one point in time.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    fragments: Arc<Vec<Fragment>>,
    generation: u64,
}

impl RegistrySnapshot {
    /// Generation of the registry when the snapshot was taken.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Looks up a fragment by handle.
    #[must_use]
    pub fn get(&self, id: FragmentId) -> Option<&Fragment> {
        self.fragments.get(id.index())
    }

    /// Looks up a type fragment by handle.
    #[must_use]
    pub fn type_fragment(&self, id: FragmentId) -> Option<&TypeFragment> {
        match self.get(id) {
            Some(Fragment::Type(fragment)) => Some(fragment),
            _ => None,
        }
    }

    /// All fragments in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (FragmentId, &Fragment)> {
        self.fragments
            .iter()
            .enumerate()
            .map(|(index, fragment)| (FragmentId::new(index), fragment))
    }

    pub fn types(&self) -> impl Iterator<Item = (FragmentId, &TypeFragment)> {
        self.iter().filter_map(|(id, fragment)| match fragment {
            Fragment::Type(fragment) => Some((id, fragment)),
            _ => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = (FragmentId, &FieldFragment)> {
        self.iter().filter_map(|(id, fragment)| match fragment {
            Fragment::Field(fragment) => Some((id, fragment)),
            _ => None,
        })
    }

    pub fn resolvers(&self) -> impl Iterator<Item = (FragmentId, &ResolverFragment)> {
        self.iter().filter_map(|(id, fragment)| match fragment {
            Fragment::Resolver(fragment) => Some((id, fragment)),
            _ => None,
        })
    }

    pub fn inheritance_edges(&self) -> impl Iterator<Item = (FragmentId, &InheritanceEdge)> {
        self.iter().filter_map(|(id, fragment)| match fragment {
            Fragment::Inheritance(edge) => Some((id, edge)),
            _ => None,
        })
    }

    /// Field fragments declared by `target`, in registration order.
    pub fn fields_of<'a>(
        &'a self,
        target: &'a ConstructId,
    ) -> impl Iterator<Item = (FragmentId, &'a FieldFragment)> + 'a {
        self.fields().filter(move |(_, field)| &field.target == target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{FieldFragment, TypeFragment};
    use crate::reference::Scalar;

    fn recipe() -> ConstructId {
        ConstructId::named("Recipe")
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let registry = MetadataRegistry::new();
        let first = registry.register(TypeFragment::object(recipe(), "Recipe"));
        let second = registry.register(FieldFragment::property(recipe(), "title", Scalar::String));

        assert_eq!(first.index(), 0);
        assert_eq!(second.index(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_snapshot_is_frozen() {
        let registry = MetadataRegistry::new();
        registry.register(TypeFragment::object(recipe(), "Recipe"));
        let snapshot = registry.snapshot();

        registry.register(FieldFragment::property(recipe(), "title", Scalar::String));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.snapshot().len(), 2);
        assert!(registry.generation() > snapshot.generation());
    }

    #[test]
    fn test_snapshot_does_not_clear_registry() {
        let registry = MetadataRegistry::new();
        registry.register(TypeFragment::object(recipe(), "Recipe"));

        let first = registry.snapshot();
        let second = registry.snapshot();

        assert_eq!(first.len(), second.len());
        assert_eq!(first.generation(), second.generation());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_typed_iterators() {
        let registry = MetadataRegistry::new();
        let type_id = registry.register(TypeFragment::object(recipe(), "Recipe"));
        registry.register(FieldFragment::property(recipe(), "title", Scalar::String));
        registry.register(FieldFragment::property(
            ConstructId::named("Other"),
            "name",
            Scalar::String,
        ));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.types().count(), 1);
        assert_eq!(snapshot.fields().count(), 2);
        assert_eq!(snapshot.fields_of(&recipe()).count(), 1);
        assert_eq!(
            snapshot.type_fragment(type_id).map(|t| t.name.as_str()),
            Some("Recipe")
        );
        assert!(snapshot.type_fragment(FragmentId::new(1)).is_none());
    }

    #[test]
    fn test_reset_clears_and_bumps_generation() {
        let registry = MetadataRegistry::new();
        registry.register(TypeFragment::object(recipe(), "Recipe"));
        let before = registry.generation();

        registry.reset();

        assert!(registry.is_empty());
        assert!(registry.generation() > before);
    }
}
