//! Type graph builder.
//!
//! [`SchemaBuilder`] runs the whole build over one registry snapshot. Every
//! problem is collected before the build fails, so a single run reports all
//! unresolved references, broken overrides and interface violations at once.
//! Nothing is returned unless the graph is consistent.

use std::collections::{HashMap, HashSet, VecDeque};
use std::mem;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tracing::{debug, trace, warn};
use typegraph_metadata::{
    ArgumentSource, ConstructId, EnumValueFragment, FieldFragment, FieldRole, Nullable,
    OperationType, RegistrySnapshot, ResolverBinding, ResolverFragment, Scalar, TypeKind,
    TypeReference, TypeToken,
};

use super::Diagnostics;
use super::graph::{
    GraphSchema, ResolvedArgument, ResolvedEnumValue, ResolvedField, ResolvedType,
    ResolvedTypeRef, TypeId,
};
use super::inheritance::{FieldMerger, FieldOverride, MergedField, MergedType};
use super::names::check_name;
use super::resolver::{Position, ReferenceResolver, Resolved, TypeSlot, describe_fragment};
use crate::config::BuildSchemaOptions;
use crate::error::{BuildWarning, SchemaError};

/// Builds a [`GraphSchema`] from a registry snapshot.
///
/// # Example
///
/// ```ignore
/// let snapshot = metadata_registry().snapshot();
/// let options = BuildSchemaOptions::new().resolver::<RecipeResolver>();
///
/// let schema = SchemaBuilder::new(&snapshot, &options).build()?;
/// ```
pub struct SchemaBuilder<'a> {
    snapshot: &'a RegistrySnapshot,
    options: &'a BuildSchemaOptions,
}

impl<'a> SchemaBuilder<'a> {
    /// Creates a builder over `snapshot`.
    #[must_use]
    pub fn new(snapshot: &'a RegistrySnapshot, options: &'a BuildSchemaOptions) -> Self {
        Self { snapshot, options }
    }

    /// Builds the schema.
    ///
    /// The build is deterministic: two builds over the same snapshot with the
    /// same options produce equal schemas.
    ///
    /// # Errors
    ///
    /// Returns the single build error found, or `SchemaError::Diagnostics`
    /// carrying all of them.
    pub fn build(&self) -> Result<GraphSchema, SchemaError> {
        debug!(
            fragments = self.snapshot.len(),
            generation = self.snapshot.generation(),
            "Starting schema build"
        );

        let mut diagnostics = Diagnostics::default();
        let resolver = ReferenceResolver::index(self.snapshot, &mut diagnostics);

        BuildPass {
            resolver: &resolver,
            options: self.options,
            diagnostics,
            drafts: IndexMap::new(),
            roots: Vec::new(),
            broken: HashSet::new(),
        }
        .run()
    }
}

/// A resolved but not yet numbered type reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DraftTypeRef {
    target: Resolved,
    list_depth: u8,
    outer_nullable: bool,
    /// Nullability of list items at every nesting level.
    items_nullable: bool,
}

#[derive(Debug, Clone)]
struct DraftArgument {
    name: String,
    type_ref: DraftTypeRef,
    default_value: Option<Value>,
    description: Option<String>,
}

#[derive(Debug, Clone)]
struct DraftField {
    name: String,
    type_ref: DraftTypeRef,
    args: IndexMap<String, DraftArgument>,
    description: Option<String>,
    deprecation_reason: Option<String>,
    default_value: Option<Value>,
    binding: Option<ResolverBinding>,
    owner: String,
    overrides: Option<FieldOverride>,
}

#[derive(Debug, Clone)]
struct DraftType {
    name: String,
    kind: TypeKind,
    description: Option<String>,
    construct: Option<ConstructId>,
    fields: IndexMap<String, DraftField>,
    /// Direct interfaces while drafting, the transitive closure afterwards.
    interfaces: Vec<TypeSlot>,
    members: Vec<TypeSlot>,
    values: Vec<EnumValueFragment>,
}

impl DraftType {
    fn root(operation: OperationType) -> Self {
        Self {
            name: operation.root_name().to_string(),
            kind: TypeKind::Object,
            description: None,
            construct: None,
            fields: IndexMap::new(),
            interfaces: Vec::new(),
            members: Vec::new(),
            values: Vec::new(),
        }
    }

    fn is_output(&self) -> bool {
        matches!(self.kind, TypeKind::Object | TypeKind::Interface)
    }
}

/// Fields a resolver construct contributes, its ancestors' included.
#[derive(Debug)]
struct ResolverScope {
    construct: ConstructId,
    of_type: Option<TypeToken>,
    fields: Vec<FieldFragment>,
}

struct BuildPass<'r, 's> {
    resolver: &'r ReferenceResolver<'s>,
    options: &'r BuildSchemaOptions,
    diagnostics: Diagnostics,
    drafts: IndexMap<TypeSlot, DraftType>,
    roots: Vec<(OperationType, DraftType)>,
    /// Fields whose type failed to resolve, by type name and field name; not
    /// reported again as missing.
    broken: HashSet<(String, String)>,
}

impl<'r, 's> BuildPass<'r, 's> {
    fn run(mut self) -> Result<GraphSchema, SchemaError> {
        let scopes = self.collect_scopes();
        let attached = self.attach_field_resolvers(&scopes);

        let merged = FieldMerger::new(self.resolver, &attached, &mut self.diagnostics)
            .merge_all(&mut self.diagnostics);
        debug!(types = merged.len(), resolvers = scopes.len(), "Merged type fields");

        self.draft_types(&merged);
        self.check_interface_cycles();
        self.close_interfaces();
        self.check_overrides();
        self.check_interface_contracts();
        self.check_empty_types(&merged);
        self.assemble_roots(&scopes);
        let explicit = self.resolve_explicit_types();

        if self.diagnostics.has_errors() {
            let errors = mem::take(&mut self.diagnostics.errors);
            debug!(errors = errors.len(), "Schema build failed");
            return Err(SchemaError::from_diagnostics(errors));
        }

        let reachable = self.reachable(&explicit);
        Ok(self.synthesize(&reachable))
    }

    fn error(&mut self, error: SchemaError) {
        self.diagnostics.error(error);
    }

    fn validate_name(&mut self, name: &str, location: impl FnOnce() -> String) {
        if let Err(error) = check_name(name, location) {
            self.error(error);
        }
    }

    // ------------------------------------------------------------------
    // Resolver constructs
    // ------------------------------------------------------------------

    /// Resolver constructs in scope, with the fields of their ancestors.
    fn collect_scopes(&mut self) -> Vec<ResolverScope> {
        let snapshot = self.resolver.snapshot();

        // Repeated declarations of one resolver complement each other.
        let mut declared: IndexMap<ConstructId, ResolverFragment> = IndexMap::new();
        for (_, fragment) in snapshot.resolvers() {
            let entry = declared
                .entry(fragment.target.clone())
                .or_insert_with(|| fragment.clone());
            if entry.of_type.is_none() {
                entry.of_type.clone_from(&fragment.of_type);
            }
            if entry.extends.is_none() {
                entry.extends.clone_from(&fragment.extends);
            }
        }

        let constructs: Vec<ConstructId> = if self.options.resolvers.is_empty() {
            let mut all: IndexSet<ConstructId> = declared
                .values()
                .filter(|fragment| !fragment.is_abstract)
                .map(|fragment| fragment.target.clone())
                .collect();
            // Constructs serving fields without declaring a resolver fragment.
            for (_, field) in snapshot.fields() {
                if field.role != FieldRole::Property && !declared.contains_key(&field.target) {
                    all.insert(field.target.clone());
                }
            }
            all.into_iter().collect()
        } else {
            let unique: IndexSet<ConstructId> = self.options.resolvers.iter().cloned().collect();
            unique.into_iter().collect()
        };

        let mut reported_cycles = HashSet::new();
        let mut scopes = Vec::with_capacity(constructs.len());
        for construct in constructs {
            let Some(chain) = self.resolver_chain(&construct, &declared, &mut reported_cycles)
            else {
                continue;
            };

            let of_type = chain
                .iter()
                .rev()
                .find_map(|ancestor| declared.get(ancestor).and_then(|r| r.of_type.clone()));
            let fields = self.scope_fields(&construct, &chain);

            trace!(resolver = %construct, fields = fields.len(), "Resolver in scope");
            scopes.push(ResolverScope {
                construct,
                of_type,
                fields,
            });
        }
        scopes
    }

    /// `construct` and its ancestors, root ancestor first.
    fn resolver_chain(
        &mut self,
        construct: &ConstructId,
        declared: &IndexMap<ConstructId, ResolverFragment>,
        reported_cycles: &mut HashSet<Vec<String>>,
    ) -> Option<Vec<ConstructId>> {
        let mut chain = vec![construct.clone()];
        let mut current = construct.clone();

        while let Some(parent) = declared.get(&current).and_then(|r| r.extends.clone()) {
            if chain.contains(&parent) {
                let mut names: Vec<String> = chain.iter().map(ToString::to_string).collect();
                names.push(parent.to_string());

                let mut members = names.clone();
                members.sort();
                members.dedup();
                if reported_cycles.insert(members) {
                    self.error(SchemaError::CyclicInheritance { chain: names });
                }
                return None;
            }
            chain.push(parent.clone());
            current = parent;
        }

        chain.reverse();
        Some(chain)
    }

    /// Root fields and field resolvers of a resolver chain. A field declared
    /// again further down the chain replaces the ancestor's declaration.
    fn scope_fields(
        &mut self,
        construct: &ConstructId,
        chain: &[ConstructId],
    ) -> Vec<FieldFragment> {
        let snapshot = self.resolver.snapshot();
        let mut fields: IndexMap<(FieldRole, String), (&ConstructId, FieldFragment)> =
            IndexMap::new();

        for declarer in chain {
            let declared = snapshot
                .fields_of(declarer)
                .filter(|(_, field)| field.role != FieldRole::Property);

            for (_, field) in declared {
                let key = (field.role, field.name.clone());
                match fields.get_mut(&key) {
                    Some((existing_declarer, existing)) if *existing_declarer == declarer => {
                        if !existing.same_declaration(field) {
                            self.error(SchemaError::DuplicateField {
                                owner: declarer.to_string(),
                                field: field.name.clone(),
                            });
                        }
                    }
                    Some(entry) => *entry = (declarer, field.clone()),
                    None => {
                        fields.insert(key, (declarer, field.clone()));
                    }
                }
            }
        }

        fields
            .into_values()
            .map(|(declarer, mut field)| {
                // Inherited methods are served by the resolver in scope.
                if declarer != construct
                    && let Some(binding) = &mut field.binding
                {
                    binding.resolver = construct.clone();
                }
                field
            })
            .collect()
    }

    /// Groups field resolvers by the type they serve.
    fn attach_field_resolvers(
        &mut self,
        scopes: &[ResolverScope],
    ) -> HashMap<TypeSlot, Vec<FieldFragment>> {
        let mut attached: HashMap<TypeSlot, Vec<FieldFragment>> = HashMap::new();

        for scope in scopes {
            let computed: Vec<&FieldFragment> = scope
                .fields
                .iter()
                .filter(|field| field.role == FieldRole::FieldResolver)
                .collect();
            if computed.is_empty() {
                continue;
            }

            let Some(of_type) = &scope.of_type else {
                for field in computed {
                    self.error(SchemaError::MissingResolverTarget {
                        resolver: scope.construct.to_string(),
                        field: field.name.clone(),
                    });
                }
                continue;
            };

            let location = format!("resolver `{}`", scope.construct);
            let resolved = match self
                .resolver
                .resolve(of_type, Position::Output, || location.clone())
            {
                Ok(resolved) => resolved,
                Err(error) => {
                    self.error(error);
                    continue;
                }
            };

            match resolved {
                Resolved::Type(slot)
                    if matches!(
                        self.resolver.kind_of(resolved),
                        TypeKind::Object | TypeKind::Interface
                    ) =>
                {
                    attached
                        .entry(slot)
                        .or_default()
                        .extend(computed.into_iter().cloned());
                }
                _ => self.error(SchemaError::InvalidTypeUsage {
                    location,
                    type_name: self.resolver.name_of(resolved).to_string(),
                    expected: "an object or interface type",
                }),
            }
        }

        attached
    }

    // ------------------------------------------------------------------
    // Reference resolution
    // ------------------------------------------------------------------

    fn draft_types(&mut self, merged: &IndexMap<TypeSlot, MergedType>) {
        // Args types first: other fields spread them into their arguments.
        for args_phase in [true, false] {
            for (&slot, merged_type) in merged {
                let fragment = self.resolver.fragment(slot);
                if fragment.is_abstract || (fragment.kind == TypeKind::Args) != args_phase {
                    continue;
                }
                let draft = self.draft_type(slot, merged_type);
                self.drafts.insert(slot, draft);
            }
        }
    }

    fn draft_type(&mut self, slot: TypeSlot, merged: &MergedType) -> DraftType {
        let fragment = self.resolver.fragment(slot);
        let mut draft = DraftType {
            name: fragment.name.clone(),
            kind: fragment.kind,
            description: fragment.description.clone(),
            construct: Some(fragment.target.clone()),
            fields: IndexMap::new(),
            interfaces: Vec::new(),
            members: Vec::new(),
            values: Vec::new(),
        };

        match fragment.kind {
            TypeKind::Object | TypeKind::Interface => {
                for field in merged.fields.values() {
                    if let Some(drafted) = self.draft_output_field(&fragment.name, field) {
                        draft.fields.insert(drafted.name.clone(), drafted);
                    }
                }
                draft.interfaces = self.resolve_interfaces(slot, &merged.interfaces);
            }
            TypeKind::InputObject | TypeKind::Args => {
                for field in merged.fields.values() {
                    if let Some(drafted) = self.draft_input_field(&fragment.name, field) {
                        draft.fields.insert(drafted.name.clone(), drafted);
                    }
                }
            }
            TypeKind::Enum => {
                for value in &merged.values {
                    self.validate_name(&value.name, || {
                        format!("value of enum `{}`", fragment.name)
                    });
                }
                draft.values = merged.values.clone();
            }
            TypeKind::Union => {
                draft.members = self.resolve_members(slot, &merged.members);
            }
            TypeKind::Scalar => {}
        }

        draft
    }

    /// Drafts a field of `type_name`. Fields whose type fails to resolve are
    /// remembered under the implementing type's name.
    fn draft_output_field(&mut self, type_name: &str, merged: &MergedField) -> Option<DraftField> {
        let field = &merged.field;
        let path = format!("{}.{}", merged.owner, field.name);
        let location = format!("field `{path}`");
        self.validate_name(&field.name, || location.clone());

        let args = self.draft_arguments(&path, field);
        let Some(type_ref) = self.draft_ref(&field.type_ref, Position::Output, &location) else {
            self.broken.insert((type_name.to_string(), field.name.clone()));
            return None;
        };

        Some(DraftField {
            name: field.name.clone(),
            type_ref,
            args,
            description: field.description.clone(),
            deprecation_reason: field.deprecation_reason.clone(),
            default_value: None,
            binding: field.binding.clone(),
            owner: merged.owner.clone(),
            overrides: merged.overrides.clone(),
        })
    }

    fn draft_input_field(&mut self, type_name: &str, merged: &MergedField) -> Option<DraftField> {
        let field = &merged.field;
        let path = format!("{}.{}", merged.owner, field.name);
        let location = format!("input field `{path}`");
        self.validate_name(&field.name, || location.clone());

        let Some(type_ref) = self.draft_ref(&field.type_ref, Position::Input, &location) else {
            self.broken.insert((type_name.to_string(), field.name.clone()));
            return None;
        };

        Some(DraftField {
            name: field.name.clone(),
            type_ref,
            args: IndexMap::new(),
            description: field.description.clone(),
            deprecation_reason: field.deprecation_reason.clone(),
            default_value: field.default_value.clone(),
            binding: None,
            owner: merged.owner.clone(),
            overrides: merged.overrides.clone(),
        })
    }

    fn draft_arguments(
        &mut self,
        path: &str,
        field: &FieldFragment,
    ) -> IndexMap<String, DraftArgument> {
        let mut args = IndexMap::new();

        for source in &field.args {
            match source {
                ArgumentSource::Single(argument) => {
                    let location = format!("argument `{path}({})`", argument.name);
                    self.validate_name(&argument.name, || location.clone());
                    if let Some(type_ref) =
                        self.draft_ref(&argument.type_ref, Position::Input, &location)
                    {
                        self.push_argument(
                            &mut args,
                            path,
                            DraftArgument {
                                name: argument.name.clone(),
                                type_ref,
                                default_value: argument.default_value.clone(),
                                description: argument.description.clone(),
                            },
                        );
                    }
                }
                ArgumentSource::Spread(token) => {
                    let location = format!("arguments of `{path}`");
                    for argument in self.spread_arguments(token, &location) {
                        self.push_argument(&mut args, path, argument);
                    }
                }
            }
        }

        args
    }

    fn spread_arguments(&mut self, token: &TypeToken, location: &str) -> Vec<DraftArgument> {
        let resolved = match self
            .resolver
            .resolve(token, Position::Args, || location.to_string())
        {
            Ok(resolved) => resolved,
            Err(error) => {
                self.error(error);
                return Vec::new();
            }
        };

        let args_type = match resolved {
            Resolved::Type(slot)
                if self.resolver.kind_of(resolved) == TypeKind::Args
                    && !self.resolver.is_abstract(resolved) =>
            {
                self.drafts.get(&slot)
            }
            _ => {
                self.error(SchemaError::InvalidTypeUsage {
                    location: location.to_string(),
                    type_name: self.resolver.name_of(resolved).to_string(),
                    expected: "a non-abstract args type",
                });
                return Vec::new();
            }
        };

        // An args type on an inheritance cycle has no draft; the cycle is reported.
        args_type
            .map(|args_type| {
                args_type
                    .fields
                    .values()
                    .map(|field| DraftArgument {
                        name: field.name.clone(),
                        type_ref: field.type_ref,
                        default_value: field.default_value.clone(),
                        description: field.description.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn push_argument(
        &mut self,
        args: &mut IndexMap<String, DraftArgument>,
        path: &str,
        argument: DraftArgument,
    ) {
        if args.contains_key(&argument.name) {
            self.error(SchemaError::DuplicateField {
                owner: path.to_string(),
                field: argument.name,
            });
            return;
        }
        args.insert(argument.name.clone(), argument);
    }

    /// Resolves a declared reference and checks it may be used at `position`.
    fn draft_ref(
        &mut self,
        reference: &TypeReference,
        position: Position,
        location: &str,
    ) -> Option<DraftTypeRef> {
        let resolved = match self
            .resolver
            .resolve(&reference.token, position, || location.to_string())
        {
            Ok(resolved) => resolved,
            Err(error) => {
                self.error(error);
                return None;
            }
        };

        let kind = self.resolver.kind_of(resolved);
        let expected = if self.resolver.is_abstract(resolved) {
            Some("a non-abstract type")
        } else if !position.accepts_usage(kind) {
            Some(position.expected())
        } else {
            None
        };
        if let Some(expected) = expected {
            self.error(SchemaError::InvalidTypeUsage {
                location: location.to_string(),
                type_name: self.resolver.name_of(resolved).to_string(),
                expected,
            });
            return None;
        }

        Some(self.wrap(resolved, reference))
    }

    /// Resolves without validating; used for declarations checked elsewhere.
    fn try_ref(&self, reference: &TypeReference, position: Position) -> Option<DraftTypeRef> {
        self.resolver
            .resolve(&reference.token, position, String::new)
            .ok()
            .map(|resolved| self.wrap(resolved, reference))
    }

    fn wrap(&self, target: Resolved, reference: &TypeReference) -> DraftTypeRef {
        let nullable = reference
            .nullable
            .unwrap_or_else(|| Nullable::by_default(self.options.config.nullable_by_default));
        DraftTypeRef {
            target,
            list_depth: reference.list_depth,
            outer_nullable: nullable.outer(),
            items_nullable: reference.is_list() && nullable.items(),
        }
    }

    fn resolve_interfaces(&mut self, slot: TypeSlot, tokens: &[TypeToken]) -> Vec<TypeSlot> {
        let location = format!("interfaces of `{}`", self.resolver.fragment(slot).name);
        let mut interfaces = Vec::new();

        for token in tokens {
            let resolved = match self
                .resolver
                .resolve(token, Position::Output, || location.clone())
            {
                Ok(resolved) => resolved,
                Err(error) => {
                    self.error(error);
                    continue;
                }
            };

            match resolved {
                Resolved::Type(interface)
                    if self.resolver.kind_of(resolved) == TypeKind::Interface
                        && !self.resolver.is_abstract(resolved) =>
                {
                    if !interfaces.contains(&interface) {
                        interfaces.push(interface);
                    }
                }
                _ => self.error(SchemaError::InvalidTypeUsage {
                    location: location.clone(),
                    type_name: self.resolver.name_of(resolved).to_string(),
                    expected: "an interface type",
                }),
            }
        }

        interfaces
    }

    fn resolve_members(&mut self, slot: TypeSlot, tokens: &[TypeToken]) -> Vec<TypeSlot> {
        let location = format!("members of union `{}`", self.resolver.fragment(slot).name);
        let mut members = Vec::new();

        for token in tokens {
            let resolved = match self
                .resolver
                .resolve(token, Position::Output, || location.clone())
            {
                Ok(resolved) => resolved,
                Err(error) => {
                    self.error(error);
                    continue;
                }
            };

            match resolved {
                Resolved::Type(member)
                    if self.resolver.kind_of(resolved) == TypeKind::Object
                        && !self.resolver.is_abstract(resolved) =>
                {
                    if !members.contains(&member) {
                        members.push(member);
                    }
                }
                _ => self.error(SchemaError::InvalidTypeUsage {
                    location: location.clone(),
                    type_name: self.resolver.name_of(resolved).to_string(),
                    expected: "an object type",
                }),
            }
        }

        members
    }

    /// Reports every cycle among the direct interfaces, self-implementation
    /// included, and drops the edge closing it.
    fn check_interface_cycles(&mut self) {
        let mut visited = HashSet::new();
        let mut path = IndexSet::new();
        let mut back_edges = Vec::new();

        let slots: Vec<TypeSlot> = self.drafts.keys().copied().collect();
        for slot in slots {
            self.visit_interfaces(slot, &mut visited, &mut path, &mut back_edges);
        }

        for (implementor, interface, chain) in back_edges {
            if let Some(draft) = self.drafts.get_mut(&implementor) {
                draft.interfaces.retain(|&direct| direct != interface);
            }
            self.error(SchemaError::CyclicInheritance { chain });
        }
    }

    fn visit_interfaces(
        &self,
        slot: TypeSlot,
        visited: &mut HashSet<TypeSlot>,
        path: &mut IndexSet<TypeSlot>,
        back_edges: &mut Vec<(TypeSlot, TypeSlot, Vec<String>)>,
    ) {
        if !visited.insert(slot) {
            return;
        }
        let Some(draft) = self.drafts.get(&slot) else {
            return;
        };

        path.insert(slot);
        for &interface in &draft.interfaces {
            if let Some(start) = path.get_index_of(&interface) {
                let mut chain: Vec<String> = path
                    .iter()
                    .skip(start)
                    .map(|&member| self.resolver.fragment(member).name.clone())
                    .collect();
                chain.push(self.resolver.fragment(interface).name.clone());
                back_edges.push((slot, interface, chain));
            } else {
                self.visit_interfaces(interface, visited, path, back_edges);
            }
        }
        path.shift_remove(&slot);
    }

    /// Replaces every type's direct interfaces with the transitive closure.
    fn close_interfaces(&mut self) {
        let closures: Vec<(TypeSlot, Vec<TypeSlot>)> = self
            .drafts
            .iter()
            .filter(|(_, draft)| !draft.interfaces.is_empty())
            .map(|(&slot, draft)| {
                let mut closure = Vec::new();
                let mut queue: VecDeque<TypeSlot> = draft.interfaces.iter().copied().collect();
                while let Some(interface) = queue.pop_front() {
                    if interface == slot || closure.contains(&interface) {
                        continue;
                    }
                    closure.push(interface);
                    if let Some(parent) = self.drafts.get(&interface) {
                        queue.extend(parent.interfaces.iter().copied());
                    }
                }
                (slot, closure)
            })
            .collect();

        for (slot, closure) in closures {
            if let Some(draft) = self.drafts.get_mut(&slot) {
                draft.interfaces = closure;
            }
        }
    }

    // ------------------------------------------------------------------
    // Structural checks
    // ------------------------------------------------------------------

    /// Whether `child` may stand where `parent` is expected.
    fn is_subtype(&self, child: Resolved, parent: Resolved) -> bool {
        if child == parent {
            return true;
        }
        let (Resolved::Type(child), Resolved::Type(parent)) = (child, parent) else {
            return false;
        };
        match self.resolver.fragment(parent).kind {
            TypeKind::Interface => self
                .drafts
                .get(&child)
                .is_some_and(|draft| draft.interfaces.contains(&parent)),
            TypeKind::Union => self
                .drafts
                .get(&parent)
                .is_some_and(|draft| draft.members.contains(&child)),
            _ => false,
        }
    }

    /// Output covariance: same list depth, nullability may only narrow and
    /// the named type must be a subtype.
    fn covariant(&self, child: &DraftTypeRef, parent: &DraftTypeRef) -> bool {
        child.list_depth == parent.list_depth
            && (parent.outer_nullable || !child.outer_nullable)
            && (parent.items_nullable || !child.items_nullable)
            && self.is_subtype(child.target, parent.target)
    }

    /// SDL notation of a draft reference.
    fn render(&self, reference: &DraftTypeRef) -> String {
        let mut rendered = self.resolver.name_of(reference.target).to_string();
        if reference.list_depth == 0 {
            if !reference.outer_nullable {
                rendered.push('!');
            }
            return rendered;
        }

        if !reference.items_nullable {
            rendered.push('!');
        }
        for level in 1..=reference.list_depth {
            rendered = format!("[{rendered}]");
            let nullable = if level == reference.list_depth {
                reference.outer_nullable
            } else {
                reference.items_nullable
            };
            if !nullable {
                rendered.push('!');
            }
        }
        rendered
    }

    fn check_overrides(&mut self) {
        let mut errors = Vec::new();
        let mut checked = HashSet::new();

        for draft in self.drafts.values() {
            let position = if draft.is_output() {
                Position::Output
            } else {
                Position::Input
            };

            for field in draft.fields.values() {
                let Some(overridden) = &field.overrides else {
                    continue;
                };
                if !checked.insert((field.owner.as_str(), field.name.as_str())) {
                    continue;
                }
                let Some(expected) = self.try_ref(&overridden.field.type_ref, position) else {
                    continue;
                };

                let compatible = if draft.is_output() {
                    self.covariant(&field.type_ref, &expected)
                } else {
                    field.type_ref == expected
                };
                if !compatible {
                    errors.push(SchemaError::IncompatibleOverride {
                        type_name: field.owner.clone(),
                        field: field.name.clone(),
                        parent: overridden.parent.clone(),
                        expected: self.render(&expected),
                        found: self.render(&field.type_ref),
                    });
                }
            }
        }

        for error in errors {
            self.error(error);
        }
    }

    /// Whether `field` fulfils the interface field `required`.
    fn satisfies(&self, field: &DraftField, required: &DraftField) -> bool {
        if !self.covariant(&field.type_ref, &required.type_ref) {
            return false;
        }

        let required_args = required.args.values().all(|argument| {
            field
                .args
                .get(&argument.name)
                .is_some_and(|own| own.type_ref == argument.type_ref)
        });
        let extra_args_optional = field
            .args
            .values()
            .filter(|argument| !required.args.contains_key(&argument.name))
            .all(|argument| argument.type_ref.outer_nullable || argument.default_value.is_some());

        required_args && extra_args_optional
    }

    fn check_interface_contracts(&mut self) {
        let mut errors = Vec::new();

        for draft in self.drafts.values().filter(|draft| draft.is_output()) {
            for interface_slot in &draft.interfaces {
                let Some(interface) = self.drafts.get(interface_slot) else {
                    continue;
                };

                let mut missing = Vec::new();
                let mut incompatible = Vec::new();
                for (name, required) in &interface.fields {
                    match draft.fields.get(name) {
                        Some(field) if !self.satisfies(field, required) => {
                            incompatible.push(name.clone());
                        }
                        Some(_) => {}
                        None if self.broken.contains(&(draft.name.clone(), name.clone())) => {}
                        None => missing.push(name.clone()),
                    }
                }

                if !missing.is_empty() || !incompatible.is_empty() {
                    errors.push(SchemaError::InterfaceContract {
                        type_name: draft.name.clone(),
                        interface: interface.name.clone(),
                        missing,
                        incompatible,
                    });
                }
            }
        }

        for error in errors {
            self.error(error);
        }
    }

    fn check_empty_types(&mut self, merged: &IndexMap<TypeSlot, MergedType>) {
        for (&slot, merged_type) in merged {
            let fragment = self.resolver.fragment(slot);
            if fragment.is_abstract {
                continue;
            }
            let empty = match fragment.kind {
                TypeKind::Object | TypeKind::Interface | TypeKind::InputObject => {
                    merged_type.fields.is_empty()
                }
                TypeKind::Enum => merged_type.values.is_empty(),
                TypeKind::Union => merged_type.members.is_empty(),
                TypeKind::Scalar | TypeKind::Args => false,
            };
            if empty {
                self.error(SchemaError::EmptyType {
                    name: fragment.name.clone(),
                    kind: fragment.kind,
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Roots and reachability
    // ------------------------------------------------------------------

    fn assemble_roots(&mut self, scopes: &[ResolverScope]) {
        for operation in OperationType::ALL {
            let mut root = DraftType::root(operation);
            let mut declared = 0usize;

            for scope in scopes {
                let fields = scope
                    .fields
                    .iter()
                    .filter(|field| field.role == FieldRole::Root(operation));
                for field in fields {
                    declared += 1;
                    if root.fields.contains_key(&field.name) {
                        self.error(SchemaError::DuplicateField {
                            owner: root.name.clone(),
                            field: field.name.clone(),
                        });
                        continue;
                    }
                    let merged = MergedField {
                        field: field.clone(),
                        owner: root.name.clone(),
                        overrides: None,
                    };
                    if let Some(drafted) = self.draft_output_field(&root.name, &merged) {
                        root.fields.insert(drafted.name.clone(), drafted);
                    }
                }
            }

            if declared == 0 {
                if operation == OperationType::Query {
                    self.error(SchemaError::EmptySchema);
                }
                continue;
            }

            if let Some(Resolved::Type(slot)) = self.resolver.lookup(&root.name) {
                self.error(SchemaError::DuplicateTypeName {
                    name: root.name.clone(),
                    first: format!("root operation type `{}`", root.name),
                    second: describe_fragment(self.resolver.fragment(slot)),
                });
            }

            debug!(root = %root.name, fields = root.fields.len(), "Assembled root type");
            self.roots.push((operation, root));
        }
    }

    fn resolve_explicit_types(&mut self) -> Vec<TypeSlot> {
        let options = self.options;
        let mut explicit = Vec::new();

        for token in &options.types {
            let location = "explicitly listed types";
            let resolved = match self
                .resolver
                .resolve(token, Position::Any, || location.to_string())
            {
                Ok(resolved) => resolved,
                Err(error) => {
                    self.error(error);
                    continue;
                }
            };

            match resolved {
                Resolved::Builtin(_) => {}
                Resolved::Type(slot) if self.drafts.contains_key(&slot) => {
                    if self.resolver.kind_of(resolved) == TypeKind::Args {
                        self.error(SchemaError::InvalidTypeUsage {
                            location: location.to_string(),
                            type_name: self.resolver.name_of(resolved).to_string(),
                            expected: "a schema type",
                        });
                    } else {
                        explicit.push(slot);
                    }
                }
                // Abstract, or failed to merge (already reported).
                Resolved::Type(_) if self.resolver.is_abstract(resolved) => {
                    self.error(SchemaError::InvalidTypeUsage {
                        location: location.to_string(),
                        type_name: self.resolver.name_of(resolved).to_string(),
                        expected: "a non-abstract type",
                    });
                }
                Resolved::Type(_) => {}
            }
        }

        explicit
    }

    /// Types reachable from the roots and the explicitly listed types.
    /// Implementations of a reachable interface are reachable too.
    fn reachable(&mut self, explicit: &[TypeSlot]) -> IndexSet<TypeSlot> {
        let mut reachable = IndexSet::new();
        let mut queue: Vec<TypeSlot> = explicit.to_vec();
        for (_, root) in &self.roots {
            queue.extend(referenced(root));
        }

        while let Some(slot) = queue.pop() {
            if !reachable.insert(slot) {
                continue;
            }
            let Some(draft) = self.drafts.get(&slot) else {
                continue;
            };
            queue.extend(referenced(draft));
            if draft.kind == TypeKind::Interface {
                let implementors = self
                    .drafts
                    .iter()
                    .filter(|(_, other)| other.interfaces.contains(&slot))
                    .map(|(&other, _)| other);
                queue.extend(implementors);
            }
        }

        for (slot, fragment) in self.resolver.types() {
            let Some(draft) = self.drafts.get(&slot) else {
                continue;
            };
            if draft.kind != TypeKind::Args && !reachable.contains(&slot) {
                self.diagnostics.warn(BuildWarning::UnreachableType {
                    name: fragment.name.clone(),
                });
            }
        }

        reachable
    }

    // ------------------------------------------------------------------
    // Synthesis
    // ------------------------------------------------------------------

    fn synthesize(mut self, reachable: &IndexSet<TypeSlot>) -> GraphSchema {
        let emitted: Vec<TypeSlot> = self
            .resolver
            .types()
            .map(|(slot, _)| slot)
            .filter(|slot| reachable.contains(slot))
            .filter(|slot| {
                self.drafts
                    .get(slot)
                    .is_some_and(|draft| draft.kind != TypeKind::Args)
            })
            .collect();

        let mut ids: HashMap<Resolved, TypeId> = HashMap::new();
        let mut next = self.roots.len();
        for &slot in &emitted {
            ids.insert(Resolved::Type(slot), TypeId::new(next));
            next += 1;
        }
        for scalar in Scalar::ALL {
            ids.insert(Resolved::Builtin(scalar), TypeId::new(next));
            next += 1;
        }
        let numbering = Numbering { ids: &ids };

        let mut types = Vec::with_capacity(next);
        let mut roots = HashMap::new();
        for (index, (operation, root)) in self.roots.iter().enumerate() {
            roots.insert(*operation, TypeId::new(index));
            types.push(numbering.resolved_type(root, Vec::new()));
        }

        for &slot in &emitted {
            let Some(draft) = self.drafts.get(&slot) else {
                continue;
            };
            let possible_types = match draft.kind {
                TypeKind::Interface => emitted
                    .iter()
                    .filter(|&&other| {
                        self.drafts.get(&other).is_some_and(|implementor| {
                            implementor.kind == TypeKind::Object
                                && implementor.interfaces.contains(&slot)
                        })
                    })
                    .map(|&other| numbering.id(Resolved::Type(other)))
                    .collect(),
                TypeKind::Union => draft
                    .members
                    .iter()
                    .map(|&member| numbering.id(Resolved::Type(member)))
                    .collect(),
                _ => Vec::new(),
            };
            types.push(numbering.resolved_type(draft, possible_types));
        }

        for scalar in Scalar::ALL {
            types.push(ResolvedType {
                name: scalar.name().to_string(),
                kind: TypeKind::Scalar,
                description: None,
                fields: IndexMap::new(),
                interfaces: Vec::new(),
                possible_types: Vec::new(),
                enum_values: Vec::new(),
                builtin: true,
                construct: None,
            });
        }

        let by_name = types
            .iter()
            .enumerate()
            .map(|(index, resolved)| (resolved.name.clone(), TypeId::new(index)))
            .collect();

        let warnings = mem::take(&mut self.diagnostics.warnings);
        for warning in &warnings {
            warn!(warning = %warning, "Schema build warning");
        }

        debug!(
            types = types.len(),
            warnings = warnings.len(),
            "Schema build complete"
        );

        GraphSchema {
            types,
            by_name,
            query: roots
                .get(&OperationType::Query)
                .copied()
                .unwrap_or_else(|| TypeId::new(0)),
            mutation: roots.get(&OperationType::Mutation).copied(),
            subscription: roots.get(&OperationType::Subscription).copied(),
            warnings,
            generation: self.resolver.snapshot().generation(),
        }
    }
}

impl Position {
    /// Whether a type of `kind` may be used at this position.
    fn accepts_usage(self, kind: TypeKind) -> bool {
        match self {
            Self::Output => kind.is_output(),
            Self::Input => kind.is_input(),
            Self::Args => kind == TypeKind::Args,
            Self::Any => kind != TypeKind::Args,
        }
    }

    fn expected(self) -> &'static str {
        match self {
            Self::Output => "an output type (scalar, enum, object, interface or union)",
            Self::Input => "an input type (scalar, enum or input object)",
            Self::Args => "an args type",
            Self::Any => "a schema type",
        }
    }
}

/// Declared types referenced by a draft's fields, arguments, interfaces and
/// members.
fn referenced(draft: &DraftType) -> Vec<TypeSlot> {
    let field_types = draft.fields.values().flat_map(|field| {
        std::iter::once(field.type_ref.target)
            .chain(field.args.values().map(|argument| argument.type_ref.target))
    });

    field_types
        .filter_map(|target| match target {
            Resolved::Type(slot) => Some(slot),
            Resolved::Builtin(_) => None,
        })
        .chain(draft.interfaces.iter().copied())
        .chain(draft.members.iter().copied())
        .collect()
}

/// Final numbering of emitted types.
struct Numbering<'a> {
    ids: &'a HashMap<Resolved, TypeId>,
}

impl Numbering<'_> {
    /// Every reference of an emitted type points at an emitted type:
    /// reachability follows exactly the references numbered here.
    fn id(&self, target: Resolved) -> TypeId {
        self.ids[&target]
    }

    fn type_ref(&self, reference: &DraftTypeRef) -> ResolvedTypeRef {
        let non_null = |inner: ResolvedTypeRef, nullable: bool| {
            if nullable {
                inner
            } else {
                ResolvedTypeRef::NonNull(Box::new(inner))
            }
        };

        let named = ResolvedTypeRef::Named(self.id(reference.target));
        if reference.list_depth == 0 {
            return non_null(named, reference.outer_nullable);
        }

        let mut wrapped = non_null(named, reference.items_nullable);
        for level in 1..=reference.list_depth {
            let nullable = if level == reference.list_depth {
                reference.outer_nullable
            } else {
                reference.items_nullable
            };
            wrapped = non_null(ResolvedTypeRef::List(Box::new(wrapped)), nullable);
        }
        wrapped
    }

    fn resolved_type(&self, draft: &DraftType, possible_types: Vec<TypeId>) -> ResolvedType {
        let fields = draft
            .fields
            .values()
            .map(|field| {
                let args = field
                    .args
                    .values()
                    .map(|argument| {
                        let resolved = ResolvedArgument {
                            name: argument.name.clone(),
                            type_ref: self.type_ref(&argument.type_ref),
                            default_value: argument.default_value.clone(),
                            description: argument.description.clone(),
                        };
                        (argument.name.clone(), resolved)
                    })
                    .collect();
                let resolved = ResolvedField {
                    name: field.name.clone(),
                    type_ref: self.type_ref(&field.type_ref),
                    args,
                    description: field.description.clone(),
                    deprecation_reason: field.deprecation_reason.clone(),
                    default_value: field.default_value.clone(),
                    binding: field.binding.clone(),
                };
                (field.name.clone(), resolved)
            })
            .collect();

        ResolvedType {
            name: draft.name.clone(),
            kind: draft.kind,
            description: draft.description.clone(),
            fields,
            interfaces: draft
                .interfaces
                .iter()
                .map(|&interface| self.id(Resolved::Type(interface)))
                .collect(),
            possible_types,
            enum_values: draft
                .values
                .iter()
                .map(|value| ResolvedEnumValue {
                    name: value.name.clone(),
                    description: value.description.clone(),
                    deprecation_reason: value.deprecation_reason.clone(),
                })
                .collect(),
            builtin: false,
            construct: draft.construct.clone(),
        }
    }
}
