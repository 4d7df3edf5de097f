//! XSD structure validators
//!
//! The semantic checker proper: the schema component model and the
//! interlocking validators for simple- and complex-type derivation,
//! attribute collation, wildcard algebra, content-model determinism, and
//! identity constraints.

// Foundation
pub mod helpers;
pub mod visits;

// Type system
pub mod builtins;
pub mod facets;
pub mod simple_types;

// Content models
pub mod elements;
pub mod groups;
pub mod particles;
pub mod wildcards;

// Composite structures
pub mod attributes;
pub mod complex_types;
pub mod identities;

// Derivation and determinism
pub mod derivations;
pub mod models;

// Schema container and driver
pub mod schemas;

// Re-exports
pub use schemas::{validate_structure, GlobalKind, XsdSchema, XsdType};
