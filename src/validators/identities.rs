//! XSD identity constraints
//!
//! This module implements the structural rules for identity constraints:
//! - xs:unique - values must be unique within scope
//! - xs:key - like unique, and all field values must be present
//! - xs:keyref - references a key/unique constraint
//!
//! Selector and field expressions parse through the restricted XPath subset;
//! constraint names share one symbol space per schema but must also be
//! unique per owning element.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#cIdentity-constraint_Definitions

use crate::error::Diagnostic;
use crate::names::is_valid_ncname;
use crate::namespaces::{NamespaceContext, QName};
use crate::xpath;

use super::elements::XsdElement;
use super::schemas::XsdSchema;

/// Kind of identity constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// xs:key
    Key,
    /// xs:unique
    Unique,
    /// xs:keyref
    Keyref,
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key => write!(f, "key"),
            Self::Unique => write!(f, "unique"),
            Self::Keyref => write!(f, "keyref"),
        }
    }
}

/// XSD identity constraint declaration
#[derive(Debug, Clone)]
pub struct XsdIdentityConstraint {
    /// Constraint kind
    pub kind: ConstraintKind,
    /// Constraint name (an NCName, qualified by the schema target namespace)
    pub name: String,
    /// Selector xpath expression
    pub selector: String,
    /// Field xpath expressions
    pub fields: Vec<String>,
    /// Referenced key/unique (keyref only)
    pub refer: Option<QName>,
    /// In-scope namespace bindings for the xpath expressions and `refer`
    pub namespaces: NamespaceContext,
}

impl XsdIdentityConstraint {
    /// Create a new identity constraint
    pub fn new(kind: ConstraintKind, name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            selector: selector.into(),
            fields: Vec::new(),
            refer: None,
            namespaces: NamespaceContext::new(),
        }
    }

    /// Add a field expression
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Set the refer attribute
    pub fn with_refer(mut self, refer: QName) -> Self {
        self.refer = Some(refer);
        self
    }
}

/// Validate every identity constraint declared on one element.
pub fn validate_identity_constraints(
    schema: &XsdSchema,
    element: &XsdElement,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let mut seen = std::collections::HashSet::new();

    for constraint in &element.constraints {
        if !is_valid_ncname(&constraint.name) {
            diags.push(Diagnostic::new(format!(
                "{}: identity constraint name '{}' must be a valid NCName",
                prefix, constraint.name
            )));
        }

        // Two constraints on one element cannot share a name
        if !seen.insert(constraint.name.clone()) {
            diags.push(Diagnostic::new(format!(
                "{}: duplicate identity constraint '{}'",
                prefix, constraint.name
            )));
        }

        if let Err(err) = xpath::parse_selector(&constraint.selector, &constraint.namespaces) {
            diags.push(Diagnostic::new(format!(
                "{}: selector of '{}': {}",
                prefix, constraint.name, err
            )));
        }

        if constraint.fields.is_empty() {
            diags.push(Diagnostic::new(format!(
                "{}: identity constraint '{}' must declare at least one field",
                prefix, constraint.name
            )));
        }
        for field in &constraint.fields {
            if let Err(err) = xpath::parse_field(field, &constraint.namespaces) {
                diags.push(Diagnostic::new(format!(
                    "{}: field of '{}': {}",
                    prefix, constraint.name, err
                )));
            }
        }

        validate_refer(schema, constraint, prefix, diags);
    }
}

fn validate_refer(
    schema: &XsdSchema,
    constraint: &XsdIdentityConstraint,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    match (constraint.kind, &constraint.refer) {
        (ConstraintKind::Keyref, None) => {
            diags.push(Diagnostic::new(format!(
                "{}: keyref '{}' must declare a refer attribute",
                prefix, constraint.name
            )));
        }
        (ConstraintKind::Keyref, Some(refer)) => {
            // Identity constraints share one schema-wide symbol space
            match schema.lookup_identity_constraint(refer) {
                Some(ConstraintKind::Keyref) => {
                    diags.push(Diagnostic::new(format!(
                        "{}: keyref '{}' must refer to a key or unique constraint, not a keyref",
                        prefix, constraint.name
                    )));
                }
                Some(_) => {}
                None => {
                    diags.push(Diagnostic::new(format!(
                        "{}: keyref '{}' refers to unknown key or unique '{}'",
                        prefix, constraint.name, refer
                    )));
                }
            }
        }
        (kind, Some(_)) => {
            diags.push(Diagnostic::new(format!(
                "{}: {} '{}' must not declare a refer attribute",
                prefix, kind, constraint.name
            )));
        }
        (_, None) => {}
    }
}
