//! Error types for xsdcheck
//!
//! This module defines the error enum used by the fallible internals (facet
//! engine, XPath parsing, name validation) and the `Diagnostic` value type
//! the structure checker collects and returns.

use std::fmt;
use thiserror::Error;

/// Result type alias using the xsdcheck Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xsdcheck operations
#[derive(Error, Debug)]
pub enum Error {
    /// Type error in a schema component
    #[error("type error: {0}")]
    Type(String),

    /// Value error (invalid lexical value for a type)
    #[error("value error: {0}")]
    Value(String),

    /// Facet error (unknown facet, inapplicable facet, bad facet value)
    #[error("facet error: {0}")]
    Facet(String),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Name error (invalid XML name)
    #[error("name error: {0}")]
    Name(String),

    /// XPath error from identity-constraint expressions
    #[error("xpath error: {0}")]
    XPath(#[from] XPathError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Error raised while parsing the restricted XPath subset used by
/// identity-constraint selectors and fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XPathError {
    /// The expression is empty
    #[error("xpath expression cannot be empty")]
    Empty,

    /// The expression selects attributes where that is not permitted
    #[error("attribute selection is not allowed in a selector xpath expression")]
    AttributeNotAllowed,

    /// The expression uses an axis outside the permitted subset
    #[error("axis '{0}' is not allowed in an identity-constraint xpath expression")]
    ForbiddenAxis(String),

    /// The expression navigates to the parent or an ancestor
    #[error("parent navigation ('..') is not allowed in an identity-constraint xpath expression")]
    ParentNavigation,

    /// The expression selects text or other node-kind tests
    #[error("node test '{0}' is not allowed in an identity-constraint xpath expression")]
    ForbiddenNodeTest(String),

    /// A step or token could not be parsed
    #[error("cannot parse xpath step '{0}'")]
    BadStep(String),

    /// An attribute test appears before the final step of a field
    #[error("an attribute test must be the final step of a field xpath expression")]
    AttributeNotLast,
}

/// A single structure-check finding.
///
/// All diagnostics have error severity; the message carries the offending
/// component prefix (`"type T: ..."`, `"element E: ..."`). Consumers are not
/// expected to discriminate diagnostics programmatically, but the distinct
/// message prefixes are kept stable by convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Human-readable description of the violation
    pub message: String,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Create a diagnostic prefixed with the offending component
    /// (`"type T: ..."`, `"element E: ..."`).
    pub fn for_component(kind: &str, name: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self {
            message: format!("{} {}: {}", kind, name, message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new("maxOccurs cannot be 0 when minOccurs > 0");
        assert_eq!(
            format!("{}", diag),
            "maxOccurs cannot be 0 when minOccurs > 0"
        );
    }

    #[test]
    fn test_diagnostic_component_prefix() {
        let diag = Diagnostic::for_component("type", "Invoice", "circular derivation");
        assert_eq!(diag.message, "type Invoice: circular derivation");
    }

    #[test]
    fn test_xpath_error_conversion() {
        let err: Error = XPathError::Empty.into();
        assert!(matches!(err, Error::XPath(XPathError::Empty)));
        assert!(format!("{}", err).contains("cannot be empty"));
    }
}
