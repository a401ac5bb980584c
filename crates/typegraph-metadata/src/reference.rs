//! Lazy type references.
//!
//! A field declared on one construct may point at a type that has not been
//! registered yet (or never will be). References are therefore recorded as
//! tokens and only looked up when a schema is built, against the complete
//! registry snapshot. Nothing in this module performs a lookup.

use std::fmt;

use crate::construct::ConstructId;
use crate::registry::FragmentId;

/// The scalars every GraphQL schema provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scalar {
    String,
    Int,
    Float,
    Boolean,
    Id,
}

impl Scalar {
    /// All built-in scalars, in the order they are appended to a schema.
    pub const ALL: [Scalar; 5] = [
        Scalar::String,
        Scalar::Int,
        Scalar::Float,
        Scalar::Boolean,
        Scalar::Id,
    ];

    /// The GraphQL name of the scalar.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
            Self::Id => "ID",
        }
    }

    /// Looks up a built-in scalar by its GraphQL name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scalar| scalar.name() == name)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A reference to a schema type, resolved at build time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeToken {
    /// The schema type declared by a construct.
    ///
    /// A construct may declare both an output type and an input type; the
    /// position the reference is used in picks between them.
    Construct(ConstructId),
    /// A schema type by GraphQL name. Built-in scalar names resolve too.
    Named(String),
    /// A type fragment by the handle its registration returned.
    Fragment(FragmentId),
    /// A built-in scalar.
    Builtin(Scalar),
}

impl TypeToken {
    /// Reference to the type declared by the Rust type `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Construct(ConstructId::of::<T>())
    }

    /// Reference by GraphQL type name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construct(construct) => write!(f, "construct `{construct}`"),
            Self::Named(name) => write!(f, "type `{name}`"),
            Self::Fragment(id) => write!(f, "fragment #{id}"),
            Self::Builtin(scalar) => write!(f, "scalar `{scalar}`"),
        }
    }
}

impl From<Scalar> for TypeToken {
    fn from(scalar: Scalar) -> Self {
        Self::Builtin(scalar)
    }
}

impl From<ConstructId> for TypeToken {
    fn from(construct: ConstructId) -> Self {
        Self::Construct(construct)
    }
}

impl From<FragmentId> for TypeToken {
    fn from(id: FragmentId) -> Self {
        Self::Fragment(id)
    }
}

/// Nullability of a declared type.
///
/// For list types, `Items` makes only the list items nullable and
/// `ItemsAndList` makes both the items and the list itself nullable.
/// On non-list types `Items` is treated as `No` and `ItemsAndList` as `Yes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nullable {
    No,
    Yes,
    Items,
    ItemsAndList,
}

impl Nullable {
    /// Whether the outermost type (the list itself, for lists) is nullable.
    #[must_use]
    pub fn outer(self) -> bool {
        matches!(self, Self::Yes | Self::ItemsAndList)
    }

    /// Whether list items (and nested lists) are nullable.
    #[must_use]
    pub fn items(self) -> bool {
        matches!(self, Self::Items | Self::ItemsAndList)
    }

    /// The option used for declarations that do not specify one.
    #[must_use]
    pub fn by_default(nullable_by_default: bool) -> Self {
        if nullable_by_default { Self::Yes } else { Self::No }
    }
}

/// A declared, not yet resolved, field or argument type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeReference {
    /// The referenced named type.
    pub token: TypeToken,
    /// Number of list wrappers around the named type.
    pub list_depth: u8,
    /// Explicit nullability; `None` defers to the build's default.
    pub nullable: Option<Nullable>,
}

impl TypeReference {
    /// A non-list reference with default nullability.
    #[must_use]
    pub fn new(token: impl Into<TypeToken>) -> Self {
        Self {
            token: token.into(),
            list_depth: 0,
            nullable: None,
        }
    }

    /// Reference to the type declared by the Rust type `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeToken::of::<T>())
    }

    /// Reference by GraphQL type name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(TypeToken::named(name))
    }

    /// Wraps the reference in one more list.
    #[must_use]
    pub fn list(mut self) -> Self {
        self.list_depth = self.list_depth.saturating_add(1);
        self
    }

    /// Sets explicit nullability.
    #[must_use]
    pub fn nullable(mut self, nullable: Nullable) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Shorthand for `nullable(Nullable::Yes)`.
    #[must_use]
    pub fn optional(self) -> Self {
        self.nullable(Nullable::Yes)
    }

    /// Whether the reference is wrapped in at least one list.
    #[must_use]
    pub fn is_list(&self) -> bool {
        self.list_depth > 0
    }
}

impl From<Scalar> for TypeReference {
    fn from(scalar: Scalar) -> Self {
        Self::new(scalar)
    }
}

impl From<TypeToken> for TypeReference {
    fn from(token: TypeToken) -> Self {
        Self::new(token)
    }
}

impl From<ConstructId> for TypeReference {
    fn from(construct: ConstructId) -> Self {
        Self::new(construct)
    }
}

impl From<FragmentId> for TypeReference {
    fn from(id: FragmentId) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_names() {
        assert_eq!(Scalar::Id.name(), "ID");
        assert_eq!(Scalar::from_name("Boolean"), Some(Scalar::Boolean));
        assert_eq!(Scalar::from_name("Date"), None);
    }

    #[test]
    fn test_reference_wrapping() {
        let reference = TypeReference::named("Recipe").list().nullable(Nullable::Items);
        assert!(reference.is_list());
        assert_eq!(reference.list_depth, 1);
        assert_eq!(reference.nullable, Some(Nullable::Items));
    }

    #[test]
    fn test_nullable_outer_and_items() {
        assert!(!Nullable::Items.outer());
        assert!(Nullable::Items.items());
        assert!(Nullable::ItemsAndList.outer());
        assert!(!Nullable::No.outer());
        assert!(!Nullable::Yes.items());
        assert_eq!(Nullable::by_default(true), Nullable::Yes);
    }
}
