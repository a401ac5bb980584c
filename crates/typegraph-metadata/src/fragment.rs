//! Metadata fragments.
//!
//! Fragments are the units collection sites push into the registry. They
//! carry unresolved [`TypeToken`]s and are never validated on registration;
//! every structural rule is checked when a schema is built.

use std::fmt;

use serde_json::Value;

use crate::binding::{FieldHandler, ResolverBinding};
use crate::construct::ConstructId;
use crate::reference::{TypeReference, TypeToken};

/// Kind of a declared schema type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Object,
    Interface,
    InputObject,
    Enum,
    Union,
    Scalar,
    /// A bundle of arguments spread into fields; never emitted as a type.
    Args,
}

impl TypeKind {
    /// Whether values of this kind may appear in output positions.
    #[must_use]
    pub fn is_output(self) -> bool {
        matches!(
            self,
            Self::Object | Self::Interface | Self::Union | Self::Enum | Self::Scalar
        )
    }

    /// Whether values of this kind may appear in input positions.
    #[must_use]
    pub fn is_input(self) -> bool {
        matches!(self, Self::InputObject | Self::Enum | Self::Scalar)
    }

    /// Whether the kind declares fields.
    #[must_use]
    pub fn has_fields(self) -> bool {
        matches!(
            self,
            Self::Object | Self::Interface | Self::InputObject | Self::Args
        )
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Object => "object type",
            Self::Interface => "interface type",
            Self::InputObject => "input type",
            Self::Enum => "enum type",
            Self::Union => "union type",
            Self::Scalar => "scalar type",
            Self::Args => "args type",
        };
        f.write_str(name)
    }
}

/// One value of a declared enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValueFragment {
    pub name: String,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
}

impl EnumValueFragment {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            deprecation_reason: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }
}

/// One declared schema type.
///
/// The fields of object, interface, input and args types are not stored
/// here: they are separate [`FieldFragment`]s keyed by the same construct,
/// so they can be registered before or after the type itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeFragment {
    /// GraphQL name of the type.
    pub name: String,
    pub kind: TypeKind,
    /// The construct that declared the type.
    pub target: ConstructId,
    pub description: Option<String>,
    /// Implemented interfaces (objects and interfaces only).
    pub interfaces: Vec<TypeToken>,
    /// Abstract types are only inherited from; they never reach the schema.
    pub is_abstract: bool,
    /// Enum values, in declaration order.
    pub values: Vec<EnumValueFragment>,
    /// Union members, in declaration order.
    pub members: Vec<TypeToken>,
}

impl TypeFragment {
    /// Creates a fragment of the given kind.
    #[must_use]
    pub fn new(kind: TypeKind, target: ConstructId, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            target,
            description: None,
            interfaces: Vec::new(),
            is_abstract: false,
            values: Vec::new(),
            members: Vec::new(),
        }
    }

    #[must_use]
    pub fn object(target: ConstructId, name: impl Into<String>) -> Self {
        Self::new(TypeKind::Object, target, name)
    }

    #[must_use]
    pub fn interface(target: ConstructId, name: impl Into<String>) -> Self {
        Self::new(TypeKind::Interface, target, name)
    }

    #[must_use]
    pub fn input(target: ConstructId, name: impl Into<String>) -> Self {
        Self::new(TypeKind::InputObject, target, name)
    }

    #[must_use]
    pub fn enumeration(target: ConstructId, name: impl Into<String>) -> Self {
        Self::new(TypeKind::Enum, target, name)
    }

    #[must_use]
    pub fn union(target: ConstructId, name: impl Into<String>) -> Self {
        Self::new(TypeKind::Union, target, name)
    }

    #[must_use]
    pub fn scalar(target: ConstructId, name: impl Into<String>) -> Self {
        Self::new(TypeKind::Scalar, target, name)
    }

    #[must_use]
    pub fn args(target: ConstructId, name: impl Into<String>) -> Self {
        Self::new(TypeKind::Args, target, name)
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares an implemented interface.
    #[must_use]
    pub fn implements(mut self, interface: impl Into<TypeToken>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Marks the type as abstract.
    #[must_use]
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Adds an enum value.
    #[must_use]
    pub fn value(mut self, value: impl Into<EnumValueFragment>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Adds a union member.
    #[must_use]
    pub fn member(mut self, member: impl Into<TypeToken>) -> Self {
        self.members.push(member.into());
        self
    }

    /// Equality ignoring the declaring construct.
    #[must_use]
    pub fn same_declaration(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.description == other.description
            && self.interfaces == other.interfaces
            && self.is_abstract == other.is_abstract
            && self.values == other.values
            && self.members == other.members
    }
}

impl From<&str> for EnumValueFragment {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Root operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl OperationType {
    pub const ALL: [OperationType; 3] = [Self::Query, Self::Mutation, Self::Subscription];

    /// Name of the root type holding fields of this operation.
    #[must_use]
    pub fn root_name(self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Mutation => "Mutation",
            Self::Subscription => "Subscription",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root_name())
    }
}

/// What a field fragment contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// A stored field of the construct's own type.
    Property,
    /// A computed field that a resolver construct adds to the type it serves.
    FieldResolver,
    /// A field of a root operation type.
    Root(OperationType),
}

/// A single declared argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentFragment {
    pub name: String,
    pub type_ref: TypeReference,
    pub default_value: Option<Value>,
    pub description: Option<String>,
}

impl ArgumentFragment {
    #[must_use]
    pub fn new(name: impl Into<String>, type_ref: impl Into<TypeReference>) -> Self {
        Self {
            name: name.into(),
            type_ref: type_ref.into(),
            default_value: None,
            description: None,
        }
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Where a field's arguments come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentSource {
    /// One named argument.
    Single(ArgumentFragment),
    /// Every field of an args type, in its field order.
    Spread(TypeToken),
}

/// One declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFragment {
    /// The declaring construct: the type for properties, the resolver
    /// construct for field resolvers and root fields.
    pub target: ConstructId,
    pub name: String,
    pub type_ref: TypeReference,
    pub args: Vec<ArgumentSource>,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
    /// Default value (input fields only).
    pub default_value: Option<Value>,
    pub role: FieldRole,
    pub binding: Option<ResolverBinding>,
}

impl FieldFragment {
    fn with_role(
        role: FieldRole,
        target: ConstructId,
        name: impl Into<String>,
        type_ref: impl Into<TypeReference>,
    ) -> Self {
        let name = name.into();
        let binding = match role {
            FieldRole::Property => None,
            FieldRole::FieldResolver | FieldRole::Root(_) => {
                Some(ResolverBinding::new(target.clone(), name.clone()))
            }
        };
        Self {
            target,
            name,
            type_ref: type_ref.into(),
            args: Vec::new(),
            description: None,
            deprecation_reason: None,
            default_value: None,
            role,
            binding,
        }
    }

    /// A stored field of the type declared by `target`.
    #[must_use]
    pub fn property(
        target: ConstructId,
        name: impl Into<String>,
        type_ref: impl Into<TypeReference>,
    ) -> Self {
        Self::with_role(FieldRole::Property, target, name, type_ref)
    }

    /// A computed field added by `resolver` to the type it serves.
    #[must_use]
    pub fn field_resolver(
        resolver: ConstructId,
        name: impl Into<String>,
        type_ref: impl Into<TypeReference>,
    ) -> Self {
        Self::with_role(FieldRole::FieldResolver, resolver, name, type_ref)
    }

    /// A root field served by `resolver`.
    #[must_use]
    pub fn root(
        operation: OperationType,
        resolver: ConstructId,
        name: impl Into<String>,
        type_ref: impl Into<TypeReference>,
    ) -> Self {
        Self::with_role(FieldRole::Root(operation), resolver, name, type_ref)
    }

    #[must_use]
    pub fn query(
        resolver: ConstructId,
        name: impl Into<String>,
        type_ref: impl Into<TypeReference>,
    ) -> Self {
        Self::root(OperationType::Query, resolver, name, type_ref)
    }

    #[must_use]
    pub fn mutation(
        resolver: ConstructId,
        name: impl Into<String>,
        type_ref: impl Into<TypeReference>,
    ) -> Self {
        Self::root(OperationType::Mutation, resolver, name, type_ref)
    }

    #[must_use]
    pub fn subscription(
        resolver: ConstructId,
        name: impl Into<String>,
        type_ref: impl Into<TypeReference>,
    ) -> Self {
        Self::root(OperationType::Subscription, resolver, name, type_ref)
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Adds a single argument.
    #[must_use]
    pub fn argument(mut self, argument: ArgumentFragment) -> Self {
        self.args.push(ArgumentSource::Single(argument));
        self
    }

    /// Spreads every field of an args type into the argument list.
    #[must_use]
    pub fn args_from(mut self, args_type: impl Into<TypeToken>) -> Self {
        self.args.push(ArgumentSource::Spread(args_type.into()));
        self
    }

    /// Renames the servicing method (defaults to the field name).
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        if let Some(binding) = &mut self.binding {
            binding.method = method.into();
        }
        self
    }

    /// Replaces the binding.
    #[must_use]
    pub fn binding(mut self, binding: ResolverBinding) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Attaches a field handler, creating a binding for properties.
    #[must_use]
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: for<'a> Fn(
                async_graphql::dynamic::ResolverContext<'a>,
            ) -> async_graphql::dynamic::FieldFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        let binding = self
            .binding
            .take()
            .unwrap_or_else(|| ResolverBinding::new(self.target.clone(), self.name.clone()));
        self.binding = Some(binding.with_handler(handler));
        self
    }

    /// Attaches a subscription stream handler.
    #[must_use]
    pub fn subscription_handler<F>(mut self, handler: F) -> Self
    where
        F: for<'a> Fn(
                async_graphql::dynamic::ResolverContext<'a>,
            ) -> async_graphql::dynamic::SubscriptionFieldFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        let binding = self
            .binding
            .take()
            .unwrap_or_else(|| ResolverBinding::new(self.target.clone(), self.name.clone()));
        self.binding = Some(binding.with_subscription_handler(handler));
        self
    }

    /// The field handler, if any.
    #[must_use]
    pub fn field_handler(&self) -> Option<&FieldHandler> {
        self.binding.as_ref().and_then(ResolverBinding::field_handler)
    }

    /// Equality ignoring the declaring construct and bindings.
    #[must_use]
    pub fn same_declaration(&self, other: &Self) -> bool {
        self.name == other.name
            && self.type_ref == other.type_ref
            && self.args == other.args
            && self.description == other.description
            && self.deprecation_reason == other.deprecation_reason
            && self.default_value == other.default_value
            && self.role == other.role
    }
}

/// A resolver construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverFragment {
    pub target: ConstructId,
    /// The type whose field resolvers this construct provides.
    pub of_type: Option<TypeToken>,
    /// Parent resolver construct whose fields are inherited.
    pub extends: Option<ConstructId>,
    /// Abstract resolvers only contribute fields through subclasses.
    pub is_abstract: bool,
}

impl ResolverFragment {
    #[must_use]
    pub fn new(target: ConstructId) -> Self {
        Self {
            target,
            of_type: None,
            extends: None,
            is_abstract: false,
        }
    }

    /// Declares the type this resolver serves field resolvers for.
    #[must_use]
    pub fn of(mut self, of_type: impl Into<TypeToken>) -> Self {
        self.of_type = Some(of_type.into());
        self
    }

    #[must_use]
    pub fn extends(mut self, parent: ConstructId) -> Self {
        self.extends = Some(parent);
        self
    }

    #[must_use]
    pub fn abstract_resolver(mut self) -> Self {
        self.is_abstract = true;
        self
    }
}

/// `child` inherits the fields (and interfaces) of `parent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritanceEdge {
    pub child: ConstructId,
    pub parent: TypeToken,
}

impl InheritanceEdge {
    #[must_use]
    pub fn new(child: ConstructId, parent: impl Into<TypeToken>) -> Self {
        Self {
            child,
            parent: parent.into(),
        }
    }
}

/// Any registrable fragment.
#[derive(Debug, Clone)]
pub enum Fragment {
    Type(TypeFragment),
    Field(FieldFragment),
    Resolver(ResolverFragment),
    Inheritance(InheritanceEdge),
}

impl Fragment {
    /// Short kind label used in logs.
    #[must_use]
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Type(_) => "type",
            Self::Field(_) => "field",
            Self::Resolver(_) => "resolver",
            Self::Inheritance(_) => "inheritance",
        }
    }

    /// The declaring construct.
    #[must_use]
    pub fn target(&self) -> &ConstructId {
        match self {
            Self::Type(fragment) => &fragment.target,
            Self::Field(fragment) => &fragment.target,
            Self::Resolver(fragment) => &fragment.target,
            Self::Inheritance(edge) => &edge.child,
        }
    }
}

impl From<TypeFragment> for Fragment {
    fn from(fragment: TypeFragment) -> Self {
        Self::Type(fragment)
    }
}

impl From<FieldFragment> for Fragment {
    fn from(fragment: FieldFragment) -> Self {
        Self::Field(fragment)
    }
}

impl From<ResolverFragment> for Fragment {
    fn from(fragment: ResolverFragment) -> Self {
        Self::Resolver(fragment)
    }
}

impl From<InheritanceEdge> for Fragment {
    fn from(edge: InheritanceEdge) -> Self {
        Self::Inheritance(edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Scalar;

    #[test]
    fn test_kind_positions() {
        assert!(TypeKind::Enum.is_input() && TypeKind::Enum.is_output());
        assert!(TypeKind::InputObject.is_input() && !TypeKind::InputObject.is_output());
        assert!(!TypeKind::Args.is_input() && !TypeKind::Args.is_output());
        assert!(TypeKind::Args.has_fields());
    }

    #[test]
    fn test_root_field_gets_binding() {
        let resolver = ConstructId::named("RecipeResolver");
        let field = FieldFragment::query(resolver.clone(), "recipes", Scalar::String).method("all");

        let binding = field.binding.as_ref().expect("root fields are bound");
        assert_eq!(binding.resolver, resolver);
        assert_eq!(binding.method, "all");
        assert_eq!(field.role, FieldRole::Root(OperationType::Query));
    }

    #[test]
    fn test_property_has_no_binding() {
        let field = FieldFragment::property(ConstructId::named("Recipe"), "title", Scalar::String);
        assert!(field.binding.is_none());
        assert!(field.field_handler().is_none());
    }

    #[test]
    fn test_same_declaration_ignores_target() {
        let a =
            TypeFragment::object(ConstructId::named("a::Recipe"), "Recipe").description("A recipe");
        let b =
            TypeFragment::object(ConstructId::named("b::Recipe"), "Recipe").description("A recipe");
        let c = TypeFragment::object(ConstructId::named("c::Recipe"), "Recipe");

        assert!(a.same_declaration(&b));
        assert!(!a.same_declaration(&c));
    }
}
