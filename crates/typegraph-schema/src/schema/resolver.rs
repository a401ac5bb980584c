//! Build-time resolution of lazy type references.
//!
//! The resolver indexes the type fragments of one registry snapshot by name
//! and by declaring construct. Indexing is where duplicate names surface:
//! identical duplicates collapse into the first declaration, conflicting
//! ones are reported and then aliased to the first declaration so that one
//! clash does not cascade into unresolved references.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::trace;
use typegraph_metadata::{
    ConstructId, FieldFragment, FieldRole, FragmentId, RegistrySnapshot, Scalar, TypeFragment,
    TypeKind, TypeToken,
};

use super::Diagnostics;
use super::names::check_name;
use crate::error::{BuildWarning, SchemaError};

/// Where a reference is used. Picks between the types of a construct that
/// declares more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Field types of object and interface types, union members.
    Output,
    /// Argument types and input field types.
    Input,
    /// Argument spreads.
    Args,
    /// No preference; the construct's first type wins.
    Any,
}

impl Position {
    fn accepts(self, kind: TypeKind) -> bool {
        match self {
            Self::Output => kind.is_output(),
            Self::Input => kind.is_input(),
            Self::Args => kind == TypeKind::Args,
            Self::Any => true,
        }
    }
}

/// Handle of a canonical type fragment within one [`ReferenceResolver`].
///
/// Slots are numbered in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeSlot(u32);

impl TypeSlot {
    fn new(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    /// Position of the slot in registration order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Target of a resolved reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolved {
    Type(TypeSlot),
    Builtin(Scalar),
}

/// Resolves [`TypeToken`]s against one registry snapshot.
#[derive(Debug)]
pub struct ReferenceResolver<'s> {
    snapshot: &'s RegistrySnapshot,
    /// Canonical type fragments in registration order, indexed by slot.
    types: Vec<(FragmentId, &'s TypeFragment)>,
    by_name: IndexMap<&'s str, TypeSlot>,
    by_construct: IndexMap<&'s ConstructId, Vec<TypeSlot>>,
    /// Every registered type fragment, duplicates included.
    by_fragment: HashMap<FragmentId, TypeSlot>,
}

impl<'s> ReferenceResolver<'s> {
    /// Indexes every type fragment of `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTypeName` or `InvalidName` (batched when there are
    /// several) if the type namespace is inconsistent.
    pub fn new(snapshot: &'s RegistrySnapshot) -> Result<Self, SchemaError> {
        let mut diagnostics = Diagnostics::default();
        let resolver = Self::index(snapshot, &mut diagnostics);
        if diagnostics.has_errors() {
            return Err(SchemaError::from_diagnostics(diagnostics.errors));
        }
        Ok(resolver)
    }

    /// Indexes every type fragment of `snapshot`, recording name problems
    /// instead of failing.
    ///
    /// Name problems are recorded in `diagnostics`; the returned resolver is
    /// usable either way.
    pub(crate) fn index(snapshot: &'s RegistrySnapshot, diagnostics: &mut Diagnostics) -> Self {
        let mut resolver = Self {
            snapshot,
            types: Vec::new(),
            by_name: IndexMap::new(),
            by_construct: IndexMap::new(),
            by_fragment: HashMap::new(),
        };

        for (id, fragment) in snapshot.types() {
            if let Err(error) = check_name(&fragment.name, || describe_fragment(fragment)) {
                diagnostics.error(error);
            }

            if let Some(scalar) = Scalar::from_name(&fragment.name) {
                diagnostics.error(SchemaError::DuplicateTypeName {
                    name: fragment.name.clone(),
                    first: format!("built-in scalar `{scalar}`"),
                    second: describe_fragment(fragment),
                });
                continue;
            }

            let Some(&first_slot) = resolver.by_name.get(fragment.name.as_str()) else {
                let slot = TypeSlot::new(resolver.types.len());
                resolver.types.push((id, fragment));
                resolver.by_name.insert(&fragment.name, slot);
                resolver.by_fragment.insert(id, slot);
                resolver.link_construct(&fragment.target, slot);
                continue;
            };

            let first = resolver.fragment(first_slot);
            if resolver.identical(first, fragment) {
                trace!(name = %fragment.name, "Merging identical type declarations");
                diagnostics.warn(BuildWarning::MergedDuplicate {
                    name: fragment.name.clone(),
                });
            } else {
                diagnostics.error(SchemaError::DuplicateTypeName {
                    name: fragment.name.clone(),
                    first: describe_fragment(first),
                    second: describe_fragment(fragment),
                });
            }
            resolver.by_fragment.insert(id, first_slot);
            resolver.link_construct(&fragment.target, first_slot);
        }

        resolver
    }

    fn link_construct(&mut self, construct: &'s ConstructId, slot: TypeSlot) {
        let slots = self.by_construct.entry(construct).or_default();
        if !slots.contains(&slot) {
            slots.push(slot);
        }
    }

    /// Two declarations are identical when the type fragments, their own
    /// stored fields and their inheritance parents match, declaring construct
    /// aside. Parents must be referenced the same way.
    fn identical(&self, first: &TypeFragment, second: &TypeFragment) -> bool {
        if !first.same_declaration(second) {
            return false;
        }
        if first.target == second.target {
            return true;
        }

        let a = self.own_properties(&first.target);
        let b = self.own_properties(&second.target);
        a.len() == b.len()
            && a.iter().zip(&b).all(|(x, y)| x.same_declaration(y))
            && self.parents(&first.target) == self.parents(&second.target)
    }

    fn parents(&self, target: &ConstructId) -> Vec<&'s TypeToken> {
        self.snapshot
            .inheritance_edges()
            .filter(|(_, edge)| &edge.child == target)
            .map(|(_, edge)| &edge.parent)
            .collect()
    }

    fn own_properties<'a>(&'a self, target: &'a ConstructId) -> Vec<&'a FieldFragment> {
        self.snapshot
            .fields_of(target)
            .filter(|(_, field)| field.role == FieldRole::Property)
            .map(|(_, field)| field)
            .collect()
    }

    /// The snapshot being resolved against.
    pub fn snapshot(&self) -> &'s RegistrySnapshot {
        self.snapshot
    }

    /// Canonical type fragments in registration order.
    pub fn types(&self) -> impl Iterator<Item = (TypeSlot, &'s TypeFragment)> + '_ {
        self.types
            .iter()
            .enumerate()
            .map(|(index, (_, fragment))| (TypeSlot::new(index), *fragment))
    }

    /// Number of canonical types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The type fragment in `slot`.
    pub fn fragment(&self, slot: TypeSlot) -> &'s TypeFragment {
        self.types[slot.index()].1
    }

    /// Registry handle of the fragment in `slot`.
    pub fn fragment_id(&self, slot: TypeSlot) -> FragmentId {
        self.types[slot.index()].0
    }

    /// Canonical types declared by `construct`.
    pub fn types_of(&self, construct: &ConstructId) -> &[TypeSlot] {
        self.by_construct
            .get(construct)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Looks up a type by GraphQL name, including the built-in scalars.
    pub fn lookup(&self, name: &str) -> Option<Resolved> {
        if let Some(scalar) = Scalar::from_name(name) {
            return Some(Resolved::Builtin(scalar));
        }
        self.by_name.get(name).map(|&slot| Resolved::Type(slot))
    }

    /// Resolves `token` for use at `position`.
    ///
    /// A construct that declares no type acceptable at `position` resolves
    /// to its first type; callers check the kind.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedReference` naming the token and `referrer` when no
    /// type matches.
    pub fn resolve(
        &self,
        token: &TypeToken,
        position: Position,
        referrer: impl FnOnce() -> String,
    ) -> Result<Resolved, SchemaError> {
        let resolved = match token {
            TypeToken::Builtin(scalar) => Some(Resolved::Builtin(*scalar)),
            TypeToken::Named(name) => self.lookup(name),
            TypeToken::Fragment(id) => self.by_fragment.get(id).map(|&slot| Resolved::Type(slot)),
            TypeToken::Construct(construct) => {
                let slots = self.types_of(construct);
                slots
                    .iter()
                    .copied()
                    .find(|&slot| self.preferred(slot, position))
                    .or_else(|| {
                        slots
                            .iter()
                            .copied()
                            .find(|&slot| position.accepts(self.fragment(slot).kind))
                    })
                    .or_else(|| slots.first().copied())
                    .map(Resolved::Type)
            }
        };

        resolved.ok_or_else(|| SchemaError::unresolved(token, referrer()))
    }

    /// Input positions prefer a declared input type over an enum or scalar
    /// the same construct also declares.
    fn preferred(&self, slot: TypeSlot, position: Position) -> bool {
        let kind = self.fragment(slot).kind;
        match position {
            Position::Input => kind == TypeKind::InputObject,
            _ => position.accepts(kind),
        }
    }

    /// GraphQL name of a resolved type.
    pub fn name_of(&self, resolved: Resolved) -> &'s str {
        match resolved {
            Resolved::Type(slot) => &self.fragment(slot).name,
            Resolved::Builtin(scalar) => scalar.name(),
        }
    }

    /// Kind of a resolved type.
    pub fn kind_of(&self, resolved: Resolved) -> TypeKind {
        match resolved {
            Resolved::Type(slot) => self.fragment(slot).kind,
            Resolved::Builtin(_) => TypeKind::Scalar,
        }
    }

    /// Whether the resolved type is abstract.
    pub fn is_abstract(&self, resolved: Resolved) -> bool {
        match resolved {
            Resolved::Type(slot) => self.fragment(slot).is_abstract,
            Resolved::Builtin(_) => false,
        }
    }
}

/// Human readable label of a type fragment, used in error messages.
pub(crate) fn describe_fragment(fragment: &TypeFragment) -> String {
    format!("{} `{}` declared by `{}`", fragment.kind, fragment.name, fragment.target)
}
