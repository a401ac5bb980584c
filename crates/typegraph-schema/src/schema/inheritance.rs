//! Field lists after field resolvers and inheritance.
//!
//! Each type starts from its own stored fields. Field resolvers attached by
//! resolver constructs bind to the stored field of the same name or add a new
//! field. Inheritance then prepends the parents' merged fields: parents come
//! first in parent order, and a field redeclared further down replaces the
//! inherited one in place, remembering what it overrode so the builder can
//! check compatibility once types are resolved.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use tracing::trace;
use typegraph_metadata::{EnumValueFragment, FieldFragment, FieldRole, TypeKind, TypeToken};

use super::Diagnostics;
use super::resolver::{Position, ReferenceResolver, Resolved, TypeSlot};
use crate::error::SchemaError;

/// The declaration a field replaced.
#[derive(Debug, Clone)]
pub struct FieldOverride {
    /// Type the replaced declaration belongs to.
    pub parent: String,
    pub field: FieldFragment,
}

/// A field as it ends up on a type.
#[derive(Debug, Clone)]
pub struct MergedField {
    pub field: FieldFragment,
    /// Type that declared the field.
    pub owner: String,
    pub overrides: Option<FieldOverride>,
}

/// A type after inheritance.
#[derive(Debug, Clone, Default)]
pub struct MergedType {
    pub fields: IndexMap<String, MergedField>,
    /// Implemented interfaces, inherited ones first. Unresolved.
    pub interfaces: Vec<TypeToken>,
    pub values: Vec<EnumValueFragment>,
    pub members: Vec<TypeToken>,
}

/// Computes [`MergedType`]s for every type of a resolver.
pub struct FieldMerger<'r, 's> {
    resolver: &'r ReferenceResolver<'s>,
    own: HashMap<TypeSlot, IndexMap<String, MergedField>>,
    parents: HashMap<TypeSlot, Vec<TypeSlot>>,
    merged: HashMap<TypeSlot, MergedType>,
    merging: IndexSet<TypeSlot>,
    failed: HashSet<TypeSlot>,
}

impl<'r, 's> FieldMerger<'r, 's> {
    /// Collects own fields and inheritance edges.
    ///
    /// `attached` holds the field resolvers serving each type, in scope order.
    pub(crate) fn new(
        resolver: &'r ReferenceResolver<'s>,
        attached: &HashMap<TypeSlot, Vec<FieldFragment>>,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut merger = Self {
            resolver,
            own: HashMap::new(),
            parents: HashMap::new(),
            merged: HashMap::new(),
            merging: IndexSet::new(),
            failed: HashSet::new(),
        };

        for (slot, fragment) in resolver.types() {
            let mut fields = IndexMap::new();
            if fragment.kind.has_fields() {
                merger.collect_properties(slot, &mut fields, diagnostics);
                if let Some(resolvers) = attached.get(&slot) {
                    merger.attach_field_resolvers(slot, resolvers, &mut fields, diagnostics);
                }
            }
            merger.own.insert(slot, fields);

            let parents = merger.collect_parents(slot, diagnostics);
            merger.parents.insert(slot, parents);
        }

        merger
    }

    fn collect_properties(
        &self,
        slot: TypeSlot,
        fields: &mut IndexMap<String, MergedField>,
        diagnostics: &mut Diagnostics,
    ) {
        let fragment = self.resolver.fragment(slot);
        let properties = self
            .resolver
            .snapshot()
            .fields_of(&fragment.target)
            .filter(|(_, field)| field.role == FieldRole::Property);

        for (_, field) in properties {
            if let Some(existing) = fields.get(&field.name) {
                if !existing.field.same_declaration(field) {
                    diagnostics.error(SchemaError::DuplicateField {
                        owner: fragment.name.clone(),
                        field: field.name.clone(),
                    });
                }
                continue;
            }
            fields.insert(
                field.name.clone(),
                MergedField {
                    field: field.clone(),
                    owner: fragment.name.clone(),
                    overrides: None,
                },
            );
        }
    }

    fn attach_field_resolvers(
        &self,
        slot: TypeSlot,
        resolvers: &[FieldFragment],
        fields: &mut IndexMap<String, MergedField>,
        diagnostics: &mut Diagnostics,
    ) {
        let type_name = &self.resolver.fragment(slot).name;

        for computed in resolvers {
            match fields.get_mut(&computed.name) {
                Some(existing) if existing.field.role == FieldRole::Property => {
                    // The resolver now computes the stored field.
                    let mut field = computed.clone();
                    if field.description.is_none() {
                        field.description = existing.field.description.clone();
                    }
                    if field.deprecation_reason.is_none() {
                        field.deprecation_reason = existing.field.deprecation_reason.clone();
                    }
                    existing.field = field;
                }
                Some(existing) => {
                    if !(existing.field.same_declaration(computed)
                        && existing.field.binding == computed.binding)
                    {
                        diagnostics.error(SchemaError::DuplicateField {
                            owner: type_name.clone(),
                            field: computed.name.clone(),
                        });
                    }
                }
                None => {
                    fields.insert(
                        computed.name.clone(),
                        MergedField {
                            field: computed.clone(),
                            owner: type_name.clone(),
                            overrides: None,
                        },
                    );
                }
            }
        }
    }

    fn collect_parents(&self, slot: TypeSlot, diagnostics: &mut Diagnostics) -> Vec<TypeSlot> {
        let child = self.resolver.fragment(slot);
        let position = match child.kind {
            TypeKind::Object | TypeKind::Interface => Position::Output,
            TypeKind::InputObject => Position::Input,
            TypeKind::Args => Position::Args,
            TypeKind::Enum | TypeKind::Union | TypeKind::Scalar => Position::Any,
        };

        let mut parents = Vec::new();
        for (_, edge) in self.resolver.snapshot().inheritance_edges() {
            if edge.child != child.target {
                continue;
            }

            let resolved = match self.resolver.resolve(&edge.parent, position, || {
                format!("inheritance of `{}`", child.name)
            }) {
                Ok(resolved) => resolved,
                Err(error) => {
                    diagnostics.error(error);
                    continue;
                }
            };

            let parent_kind = self.resolver.kind_of(resolved);
            let compatible = parent_kind == child.kind
                || (child.kind == TypeKind::Object && parent_kind == TypeKind::Interface);
            match resolved {
                Resolved::Type(parent) if compatible => {
                    if !parents.contains(&parent) {
                        parents.push(parent);
                    }
                }
                _ => diagnostics.error(SchemaError::IncompatibleInheritance {
                    child: child.name.clone(),
                    child_kind: child.kind,
                    parent: self.resolver.name_of(resolved).to_string(),
                    parent_kind,
                }),
            }
        }
        parents
    }

    /// Merges every type, in registration order.
    ///
    /// Types on an inheritance cycle, and their descendants, are left out.
    pub(crate) fn merge_all(
        mut self,
        diagnostics: &mut Diagnostics,
    ) -> IndexMap<TypeSlot, MergedType> {
        let slots: Vec<_> = self.resolver.types().map(|(slot, _)| slot).collect();
        for &slot in &slots {
            self.merge(slot, diagnostics);
        }

        slots
            .into_iter()
            .filter_map(|slot| self.merged.remove(&slot).map(|merged| (slot, merged)))
            .collect()
    }

    fn merge(&mut self, slot: TypeSlot, diagnostics: &mut Diagnostics) -> bool {
        if self.merged.contains_key(&slot) {
            return true;
        }
        if self.failed.contains(&slot) {
            return false;
        }
        if let Some(start) = self.merging.get_index_of(&slot) {
            let cycle: Vec<TypeSlot> = self.merging.iter().skip(start).copied().collect();
            let mut chain: Vec<String> = cycle
                .iter()
                .map(|&member| self.resolver.fragment(member).name.clone())
                .collect();
            chain.push(self.resolver.fragment(slot).name.clone());
            diagnostics.error(SchemaError::CyclicInheritance { chain });
            self.failed.extend(cycle);
            return false;
        }

        self.merging.insert(slot);
        let child = self.resolver.fragment(slot);
        let mut merged = MergedType::default();
        let mut complete = true;

        let parents = self.parents.get(&slot).cloned().unwrap_or_default();
        for parent in parents {
            if !self.merge(parent, diagnostics) {
                complete = false;
                continue;
            }
            let Some(inherited) = self.merged.get(&parent) else {
                continue;
            };

            trace!(
                child = %child.name,
                parent = %self.resolver.fragment(parent).name,
                "Merging inherited fields"
            );
            for field in inherited.fields.values() {
                apply_field(&mut merged.fields, field.clone());
            }
            merged.interfaces.extend(inherited.interfaces.iter().cloned());
            for value in &inherited.values {
                apply_value(&mut merged.values, value.clone());
            }
            merged.members.extend(inherited.members.iter().cloned());

            let parent_fragment = self.resolver.fragment(parent);
            if child.kind == TypeKind::Object
                && parent_fragment.kind == TypeKind::Interface
                && !parent_fragment.is_abstract
            {
                merged
                    .interfaces
                    .push(TypeToken::Fragment(self.resolver.fragment_id(parent)));
            }
        }

        for field in self.own.get(&slot).into_iter().flat_map(IndexMap::values) {
            apply_field(&mut merged.fields, field.clone());
        }
        merged.interfaces.extend(child.interfaces.iter().cloned());
        for value in &child.values {
            apply_value(&mut merged.values, value.clone());
        }
        merged.members.extend(child.members.iter().cloned());

        self.merging.shift_remove(&slot);
        if !complete {
            self.failed.insert(slot);
            return false;
        }
        self.merged.insert(slot, merged);
        true
    }
}

/// Appends `incoming`, or replaces the field of the same name in place.
fn apply_field(fields: &mut IndexMap<String, MergedField>, mut incoming: MergedField) {
    match fields.get_mut(&incoming.field.name) {
        Some(existing) => {
            if incoming.owner != existing.owner {
                incoming.overrides = Some(FieldOverride {
                    parent: existing.owner.clone(),
                    field: existing.field.clone(),
                });
            }
            *existing = incoming;
        }
        None => {
            fields.insert(incoming.field.name.clone(), incoming);
        }
    }
}

fn apply_value(values: &mut Vec<EnumValueFragment>, incoming: EnumValueFragment) {
    match values.iter_mut().find(|value| value.name == incoming.name) {
        Some(existing) => *existing = incoming,
        None => values.push(incoming),
    }
}
