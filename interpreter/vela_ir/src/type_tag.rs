//! Canonical type names.
//!
//! Every value in a Vela script has a canonical type name: one of the four
//! primitive names, a registered abstract base name, or any of those with a
//! `[]` suffix denoting a vector. Type tags are the currency between the
//! environment, the typed stores, and the factories.

use std::fmt;

/// Canonical name of the boolean primitive.
pub const BOOL: &str = "bool";
/// Canonical name of the integer primitive.
pub const INT: &str = "int";
/// Canonical name of the floating-point primitive.
pub const DOUBLE: &str = "double";
/// Canonical name of the string primitive.
pub const STRING: &str = "string";

/// Suffix marking a vector type.
pub const VECTOR_SUFFIX: &str = "[]";

/// A canonical type name.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TypeTag(String);

impl TypeTag {
    /// Create a tag from a canonical name.
    pub fn new(name: impl Into<String>) -> Self {
        TypeTag(name.into())
    }

    /// The canonical name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this tag denotes a vector (`[]` suffix).
    #[inline]
    pub fn is_vector(&self) -> bool {
        self.0.ends_with(VECTOR_SUFFIX)
    }

    /// The element tag of a vector, or `None` for scalar tags.
    pub fn element(&self) -> Option<TypeTag> {
        self.0
            .strip_suffix(VECTOR_SUFFIX)
            .map(|elem| TypeTag(elem.to_owned()))
    }

    /// The vector tag with this tag as the element.
    pub fn vector_of(&self) -> TypeTag {
        TypeTag(format!("{}{}", self.0, VECTOR_SUFFIX))
    }

    /// The scalar name underneath any vector suffix.
    pub fn base(&self) -> &str {
        self.0.strip_suffix(VECTOR_SUFFIX).unwrap_or(&self.0)
    }

    /// Check if this tag (or its element, for vectors) is a primitive.
    pub fn is_primitive(&self) -> bool {
        matches!(self.base(), BOOL | INT | DOUBLE | STRING)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", self.0)
    }
}

impl From<&str> for TypeTag {
    fn from(name: &str) -> Self {
        TypeTag(name.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_suffix() {
        let ints = TypeTag::new(INT).vector_of();
        assert_eq!(ints.as_str(), "int[]");
        assert!(ints.is_vector());
        assert_eq!(ints.element(), Some(TypeTag::new(INT)));
        assert_eq!(ints.base(), INT);
    }

    #[test]
    fn test_scalar_has_no_element() {
        let tag = TypeTag::new(DOUBLE);
        assert!(!tag.is_vector());
        assert_eq!(tag.element(), None);
        assert_eq!(tag.base(), DOUBLE);
    }

    #[test]
    fn test_is_primitive() {
        assert!(TypeTag::new(BOOL).is_primitive());
        assert!(TypeTag::new(STRING).vector_of().is_primitive());
        assert!(!TypeTag::new("Model").is_primitive());
        assert!(!TypeTag::new("Model").vector_of().is_primitive());
    }
}
