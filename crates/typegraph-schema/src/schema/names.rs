//! GraphQL name validation.

use crate::error::SchemaError;

/// Checks if a string is a valid GraphQL name.
///
/// GraphQL names must match `[_A-Za-z][_0-9A-Za-z]*`. Names starting with
/// `__` are reserved for introspection.
pub fn is_valid_graphql_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }

    let mut chars = name.chars();

    // First character must be underscore or letter
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }

    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Returns `InvalidName` for names that are not valid GraphQL names.
pub(crate) fn check_name(name: &str, location: impl FnOnce() -> String) -> Result<(), SchemaError> {
    if is_valid_graphql_name(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidName {
            name: name.to_string(),
            location: location(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_graphql_name("Recipe"));
        assert!(is_valid_graphql_name("_private"));
        assert!(is_valid_graphql_name("field2"));
        assert!(is_valid_graphql_name("A"));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!is_valid_graphql_name(""));
        assert!(!is_valid_graphql_name("2fast"));
        assert!(!is_valid_graphql_name("with-hyphen"));
        assert!(!is_valid_graphql_name("Vec<Recipe>"));
        assert!(!is_valid_graphql_name("__Type"));
    }

    #[test]
    fn test_check_name_reports_location() {
        let err = check_name("bad name", || "type `Recipe`".to_string()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_NAME");
        assert!(err.to_string().contains("type `Recipe`"));
    }
}
