//! # xsdcheck
//!
//! A semantic (structure) checker for XML Schema (XSD 1.0) component graphs.
//!
//! Given a parsed, resolved-as-far-as-possible schema — an in-memory tree of
//! type, element, attribute, group, and constraint declarations — the checker
//! validates every static conformance rule the XSD specification imposes
//! beyond XML well-formedness and surface-syntax parsing. Its output is an
//! ordered collection of diagnostics; it never transforms the schema.
//!
//! ## Features
//!
//! - Simple-type derivation, facet applicability and bound-tightening
//! - Complex-type extension/restriction including Particle Derivation OK
//! - Attribute-use collation and derivation across inheritance chains
//! - Wildcard namespace and processContents algebra
//! - Unique Particle Attribution via a Glushkov position automaton
//! - Identity-constraint XPath validation and name uniqueness
//! - Substitution-group membership and blocking
//!
//! ## Example
//!
//! ```rust,ignore
//! use xsdcheck::validators::schemas::{validate_structure, XsdSchema};
//!
//! let schema: XsdSchema = build_schema_somehow();
//! let diagnostics = validate_structure(Some(&schema));
//! assert!(diagnostics.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod error;

// Utilities
pub mod names;
pub mod namespaces;
pub mod xpath;

// Validators
pub mod validators;

// Re-exports for convenience
pub use error::{Diagnostic, Error, Result};
pub use validators::schemas::validate_structure;

/// Version of the xsdcheck library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD 1.0 namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XSD instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
