//! Identity of declaring constructs.
//!
//! Every fragment is keyed by the construct that declared it. In the common
//! case that construct is a Rust type (the struct a GraphQL object type is
//! derived from, or the resolver struct whose methods serve root fields), and
//! [`ConstructId::of`] derives the identity from the type's path. Constructs
//! that have no Rust type behind them use [`ConstructId::named`].

use std::borrow::Cow;
use std::fmt;

/// Identity of the construct that declared a fragment.
///
/// Two fragments belong to the same construct when their `ConstructId`s are
/// equal. Identities derived from [`std::any::type_name`] are unique for all
/// practical purposes within one binary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstructId(Cow<'static, str>);

impl ConstructId {
    /// Identity of the Rust type `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(std::any::type_name::<T>()))
    }

    /// Identity of a construct that is not backed by a Rust type.
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Returns the identity as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConstructId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ConstructId {
    fn from(name: &'static str) -> Self {
        Self::named(name)
    }
}

impl From<String> for ConstructId {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recipe;
    struct Ingredient;

    #[test]
    fn test_type_identity_is_stable() {
        assert_eq!(ConstructId::of::<Recipe>(), ConstructId::of::<Recipe>());
        assert_ne!(ConstructId::of::<Recipe>(), ConstructId::of::<Ingredient>());
        assert!(ConstructId::of::<Recipe>().as_str().ends_with("Recipe"));
    }

    #[test]
    fn test_named_identity() {
        let id = ConstructId::named("RecipeResolver");
        assert_eq!(id, ConstructId::from("RecipeResolver"));
        assert_eq!(id.to_string(), "RecipeResolver");
    }
}
