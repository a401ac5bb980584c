//! The finished, immutable type graph.
//!
//! A [`GraphSchema`] owns every resolved type. Field and argument types point
//! at other types through [`TypeId`] handles into the same schema, so
//! circular references (`Recipe.author: User`, `User.recipes: [Recipe]`)
//! need no fragment lookups after the build.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;
use typegraph_metadata::{ConstructId, OperationType, ResolverBinding, TypeKind};

use crate::error::BuildWarning;

/// Handle of a type within one [`GraphSchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A wrapped reference to a resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedTypeRef {
    Named(TypeId),
    List(Box<ResolvedTypeRef>),
    NonNull(Box<ResolvedTypeRef>),
}

impl ResolvedTypeRef {
    /// The named type beneath all wrappers.
    #[must_use]
    pub fn named_type(&self) -> TypeId {
        match self {
            Self::Named(id) => *id,
            Self::List(inner) | Self::NonNull(inner) => inner.named_type(),
        }
    }

    #[must_use]
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// Renders the reference in SDL notation, e.g. `[Recipe!]!`.
    #[must_use]
    pub fn display<'a>(&'a self, schema: &'a GraphSchema) -> impl fmt::Display + 'a {
        DisplayTypeRef {
            type_ref: self,
            schema,
        }
    }
}

struct DisplayTypeRef<'a> {
    type_ref: &'a ResolvedTypeRef,
    schema: &'a GraphSchema,
}

impl fmt::Display for DisplayTypeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_ref {
            ResolvedTypeRef::Named(id) => f.write_str(self.schema.type_name(*id)),
            ResolvedTypeRef::List(inner) => write!(f, "[{}]", inner.display(self.schema)),
            ResolvedTypeRef::NonNull(inner) => write!(f, "{}!", inner.display(self.schema)),
        }
    }
}

/// An argument of a resolved field.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArgument {
    pub name: String,
    pub type_ref: ResolvedTypeRef,
    pub default_value: Option<Value>,
    pub description: Option<String>,
}

/// A field of an object, interface or input type.
#[derive(Debug, Clone)]
pub struct ResolvedField {
    pub name: String,
    pub type_ref: ResolvedTypeRef,
    pub args: IndexMap<String, ResolvedArgument>,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
    /// Default value (input fields only).
    pub default_value: Option<Value>,
    /// Resolver construct and method computing the field, if any.
    pub binding: Option<ResolverBinding>,
}

/// A value of a resolved enum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnumValue {
    pub name: String,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
}

/// One type of the finished schema.
#[derive(Debug, Clone)]
pub struct ResolvedType {
    pub name: String,
    pub kind: TypeKind,
    pub description: Option<String>,
    /// Fields of object, interface and input types.
    pub fields: IndexMap<String, ResolvedField>,
    /// Implemented interfaces, transitive ones included.
    pub interfaces: Vec<TypeId>,
    /// Object types an interface or union stands for.
    pub possible_types: Vec<TypeId>,
    pub enum_values: Vec<ResolvedEnumValue>,
    /// Built-in scalars are part of every schema and never printed.
    pub builtin: bool,
    /// The construct that declared the type; `None` for roots and built-ins.
    pub construct: Option<ConstructId>,
}

impl ResolvedType {
    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.fields.get(name)
    }
}

/// The finished schema handed to the execution runtime.
#[derive(Debug, Clone)]
pub struct GraphSchema {
    pub(crate) types: Vec<ResolvedType>,
    pub(crate) by_name: IndexMap<String, TypeId>,
    pub(crate) query: TypeId,
    pub(crate) mutation: Option<TypeId>,
    pub(crate) subscription: Option<TypeId>,
    pub(crate) warnings: Vec<BuildWarning>,
    pub(crate) generation: u64,
}

impl GraphSchema {
    /// All types in builder order: roots, declared types, built-in scalars.
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &ResolvedType)> {
        self.types
            .iter()
            .enumerate()
            .map(|(index, resolved)| (TypeId::new(index), resolved))
    }

    /// Number of types, built-ins included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Looks up a type by handle.
    #[must_use]
    pub fn get(&self, id: TypeId) -> Option<&ResolvedType> {
        self.types.get(id.index())
    }

    /// Handle of the type with the given name.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Looks up a type by name.
    #[must_use]
    pub fn type_by_name(&self, name: &str) -> Option<&ResolvedType> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    /// Name of the type behind `id`; empty for foreign handles.
    #[must_use]
    pub fn type_name(&self, id: TypeId) -> &str {
        self.get(id).map_or("", |resolved| resolved.name.as_str())
    }

    /// Resolves a field's type to the named type beneath its wrappers.
    #[must_use]
    pub fn named_type(&self, type_ref: &ResolvedTypeRef) -> Option<&ResolvedType> {
        self.get(type_ref.named_type())
    }

    /// The root type of an operation, if the schema has one.
    #[must_use]
    pub fn root(&self, operation: OperationType) -> Option<TypeId> {
        match operation {
            OperationType::Query => Some(self.query),
            OperationType::Mutation => self.mutation,
            OperationType::Subscription => self.subscription,
        }
    }

    #[must_use]
    pub fn query_type(&self) -> &ResolvedType {
        &self.types[self.query.index()]
    }

    #[must_use]
    pub fn mutation_type(&self) -> Option<&ResolvedType> {
        self.mutation.and_then(|id| self.get(id))
    }

    #[must_use]
    pub fn subscription_type(&self) -> Option<&ResolvedType> {
        self.subscription.and_then(|id| self.get(id))
    }

    /// Non-fatal findings of the build, in the order they were found.
    #[must_use]
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    /// Registry generation the schema was built from.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Handler bindings of every bound field, keyed by type name and field
    /// name, in type order.
    ///
    /// Fields without a binding read the parent's property and are left out.
    #[must_use]
    pub fn resolvers_map(&self) -> ResolversMap {
        self.types()
            .filter(|(_, resolved)| !resolved.builtin)
            .flat_map(|(_, resolved)| {
                resolved.fields.values().filter_map(move |field| {
                    let binding = field.binding.clone()?;
                    Some(((resolved.name.clone(), field.name.clone()), binding))
                })
            })
            .collect()
    }
}

/// Field bindings keyed by `(type name, field name)`.
pub type ResolversMap = IndexMap<(String, String), ResolverBinding>;
