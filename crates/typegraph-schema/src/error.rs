//! Error and warning types for schema builds.
//!
//! Every structural problem is reported when a schema is built, never when
//! metadata is registered. The builder collects as many problems as it can
//! before failing; a build with several problems fails with
//! [`SchemaError::Diagnostics`].

use std::fmt;
use std::path::PathBuf;

use typegraph_metadata::TypeKind;

/// Errors raised while building, emitting or handing off a schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A lazy type reference names nothing in the registry snapshot.
    #[error("Unable to resolve {reference} referenced by {referrer}")]
    UnresolvedReference {
        /// The unresolved token.
        reference: String,
        /// Where the token was used.
        referrer: String,
    },

    /// A field redeclared on a subtype has a type incompatible with the
    /// inherited declaration.
    #[error(
        "Field `{type_name}.{field}` overrides `{parent}.{field}` with incompatible type `{found}` (expected `{expected}` or a subtype)"
    )]
    IncompatibleOverride {
        type_name: String,
        field: String,
        parent: String,
        expected: String,
        found: String,
    },

    /// A type does not provide every field of an interface it implements.
    #[error(
        "Type `{type_name}` does not satisfy interface `{interface}`: {}",
        describe_contract(.missing, .incompatible)
    )]
    InterfaceContract {
        type_name: String,
        interface: String,
        /// Interface fields absent from the implementor.
        missing: Vec<String>,
        /// Interface fields present with an incompatible type or arguments.
        incompatible: Vec<String>,
    },

    /// Two declarations share one name in the schema's type namespace.
    #[error(
        "Schema must contain uniquely named types but contains multiple types named `{name}` ({first} and {second})"
    )]
    DuplicateTypeName {
        name: String,
        first: String,
        second: String,
    },

    /// No query root field is contributed by the resolvers in scope.
    #[error("Schema has no query fields; at least one resolver in scope must declare a query")]
    EmptySchema,

    /// An inheritance chain loops back on itself.
    #[error("Cyclic inheritance: {}", .chain.join(" -> "))]
    CyclicInheritance { chain: Vec<String> },

    /// An inheritance edge connects kinds that cannot share fields.
    #[error("{child_kind} `{child}` cannot extend {parent_kind} `{parent}`")]
    IncompatibleInheritance {
        child: String,
        child_kind: TypeKind,
        parent: String,
        parent_kind: TypeKind,
    },

    /// A field or argument name is declared twice on the same owner.
    #[error("`{field}` is declared more than once on `{owner}`")]
    DuplicateField { owner: String, field: String },

    /// A reference resolved to a type that is not allowed where it is used.
    #[error("{location} must reference {expected}, but `{type_name}` is not one")]
    InvalidTypeUsage {
        location: String,
        type_name: String,
        expected: &'static str,
    },

    /// A name does not match `[_A-Za-z][_0-9A-Za-z]*` or uses the reserved `__` prefix.
    #[error("Name `{name}` of {location} is not a valid GraphQL name")]
    InvalidName { name: String, location: String },

    /// A composite type has nothing in it.
    #[error("{kind} `{name}` must define at least one {}", member_label(.kind))]
    EmptyType { name: String, kind: TypeKind },

    /// A field resolver belongs to a resolver that serves no type.
    #[error(
        "Field resolver `{field}` of `{resolver}` has no type to attach to; declare the type the resolver serves"
    )]
    MissingResolverTarget { resolver: String, field: String },

    /// Several problems found in one build.
    #[error("Schema build failed with {} errors:\n{}", .0.len(), join_diagnostics(.0))]
    Diagnostics(Vec<SchemaError>),

    /// Writing the schema definition failed.
    #[error("Failed to emit schema definition to {}: {source}", .path.display())]
    Emit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration values are invalid.
    #[error("Invalid schema configuration: {0}")]
    InvalidConfig(String),

    /// The execution runtime rejected the finished schema.
    #[error("Runtime rejected the schema: {0}")]
    Runtime(String),
}

fn describe_contract(missing: &[String], incompatible: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing fields {}", quote_all(missing)));
    }
    if !incompatible.is_empty() {
        parts.push(format!("incompatible fields {}", quote_all(incompatible)));
    }
    parts.join("; ")
}

fn quote_all(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("`{name}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn member_label(kind: &TypeKind) -> &'static str {
    match kind {
        TypeKind::Enum => "value",
        TypeKind::Union => "member type",
        _ => "field",
    }
}

fn join_diagnostics(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(|error| format!("  - {error}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl SchemaError {
    /// Folds collected diagnostics into one error.
    ///
    /// A single diagnostic is returned unchanged.
    #[must_use]
    pub fn from_diagnostics(mut errors: Vec<SchemaError>) -> Self {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            Self::Diagnostics(errors)
        }
    }

    /// Creates an `UnresolvedReference` error.
    #[must_use]
    pub fn unresolved(reference: impl fmt::Display, referrer: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            reference: reference.to_string(),
            referrer: referrer.into(),
        }
    }

    /// Every individual error, flattening batched diagnostics.
    #[must_use]
    pub fn errors(&self) -> Vec<&SchemaError> {
        match self {
            Self::Diagnostics(errors) => errors.iter().flat_map(SchemaError::errors).collect(),
            other => vec![other],
        }
    }

    /// Returns a stable code for this error.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnresolvedReference { .. } => "UNRESOLVED_REFERENCE",
            Self::IncompatibleOverride { .. } => "INCOMPATIBLE_OVERRIDE",
            Self::InterfaceContract { .. } => "INTERFACE_CONTRACT",
            Self::DuplicateTypeName { .. } => "DUPLICATE_TYPE_NAME",
            Self::EmptySchema => "EMPTY_SCHEMA",
            Self::CyclicInheritance { .. } => "CYCLIC_INHERITANCE",
            Self::IncompatibleInheritance { .. } => "INCOMPATIBLE_INHERITANCE",
            Self::DuplicateField { .. } => "DUPLICATE_FIELD",
            Self::InvalidTypeUsage { .. } => "INVALID_TYPE_USAGE",
            Self::InvalidName { .. } => "INVALID_NAME",
            Self::EmptyType { .. } => "EMPTY_TYPE",
            Self::MissingResolverTarget { .. } => "MISSING_RESOLVER_TARGET",
            Self::Diagnostics(_) => "DIAGNOSTICS",
            Self::Emit { .. } => "EMIT_FAILED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Runtime(_) => "RUNTIME_REJECTED",
        }
    }

    /// Whether the error describes the declared metadata (as opposed to I/O,
    /// configuration or runtime handoff).
    #[must_use]
    pub fn is_build_error(&self) -> bool {
        !matches!(
            self,
            Self::Emit { .. } | Self::InvalidConfig(_) | Self::Runtime(_)
        )
    }
}

/// Non-fatal findings of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// A declared type is not reachable from any root or explicit type and
    /// was left out of the schema.
    UnreachableType { name: String },
    /// Two identical declarations of one type were merged into one.
    MergedDuplicate { name: String },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreachableType { name } => {
                write!(f, "Type `{name}` is not reachable from any root and was omitted")
            }
            Self::MergedDuplicate { name } => {
                write!(f, "Identical declarations of `{name}` were merged")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_diagnostic_is_unwrapped() {
        let error = SchemaError::from_diagnostics(vec![SchemaError::EmptySchema]);
        assert!(matches!(error, SchemaError::EmptySchema));
    }

    #[test]
    fn test_diagnostics_flatten() {
        let error = SchemaError::from_diagnostics(vec![
            SchemaError::EmptySchema,
            SchemaError::unresolved("type `Missing`", "field `Recipe.missing`"),
        ]);

        assert_eq!(error.error_code(), "DIAGNOSTICS");
        let codes: Vec<_> = error.errors().iter().map(|e| e.error_code()).collect();
        assert_eq!(codes, ["EMPTY_SCHEMA", "UNRESOLVED_REFERENCE"]);
        assert!(error.to_string().contains("2 errors"));
    }

    #[test]
    fn test_interface_contract_message() {
        let error = SchemaError::InterfaceContract {
            type_name: "Recipe".into(),
            interface: "Node".into(),
            missing: vec!["id".into()],
            incompatible: vec![],
        };
        assert_eq!(
            error.to_string(),
            "Type `Recipe` does not satisfy interface `Node`: missing fields `id`"
        );
    }

    #[test]
    fn test_empty_type_message() {
        let error = SchemaError::EmptyType {
            name: "Color".into(),
            kind: TypeKind::Enum,
        };
        assert_eq!(error.to_string(), "enum type `Color` must define at least one value");
    }

    #[test]
    fn test_build_error_classification() {
        assert!(SchemaError::EmptySchema.is_build_error());
        assert!(!SchemaError::InvalidConfig("x".into()).is_build_error());
    }

    #[test]
    fn test_warning_display() {
        let warning = BuildWarning::UnreachableType {
            name: "Orphan".into(),
        };
        assert!(warning.to_string().contains("Orphan"));
    }
}
