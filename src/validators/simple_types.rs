//! XSD simple type definitions and their validator
//!
//! Atomic, list, and union simple types with their restriction facets. The
//! validator gates by variety: base-kind rules, `final` enforcement, the
//! whiteSpace discipline of list types, facet applicability and
//! inheritance, and deferred-facet re-checking.
//!
//! Reference: https://www.w3.org/TR/xmlschema-2/#rf-defn

use std::sync::Arc;

use crate::error::Diagnostic;
use crate::namespaces::QName;

use super::builtins::{self, BuiltinType};
use super::facets::{self, Facet, WhiteSpace};
use super::helpers::{Derivation, DerivationSet};
use super::schemas::{XsdSchema, XsdType};
use super::visits::VisitTracker;

/// Variety of a simple type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleTypeVariety {
    /// Atomic type (single value)
    Atomic,
    /// List type (whitespace-separated values)
    List,
    /// Union type (value matches one of several member types)
    Union,
}

impl std::fmt::Display for SimpleTypeVariety {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Atomic => write!(f, "atomic"),
            Self::List => write!(f, "list"),
            Self::Union => write!(f, "union"),
        }
    }
}

/// Reference to an item/member type: by name, or an inline anonymous type
/// owned by the referring type.
#[derive(Debug, Clone)]
pub enum TypeRef {
    /// Named reference, resolved through the schema
    Named(QName),
    /// Inline anonymous simple type
    Inline(Arc<XsdSimpleType>),
}

/// XSD simple type definition
#[derive(Debug, Clone)]
pub struct XsdSimpleType {
    /// Type name (None for anonymous types)
    pub name: Option<QName>,
    /// Variety
    pub variety: SimpleTypeVariety,
    /// Restriction base (None for constructed list/union types)
    pub base: Option<QName>,
    /// Declared facets, possibly deferred
    pub facets: Vec<Facet>,
    /// Item type for list varieties
    pub item_type: Option<TypeRef>,
    /// Member types for union varieties
    pub member_types: Vec<TypeRef>,
    /// Finalized derivation methods
    pub final_set: DerivationSet,
}

impl XsdSimpleType {
    /// Create an atomic restriction of a base type
    pub fn restriction(name: Option<QName>, base: QName) -> Self {
        Self {
            name,
            variety: SimpleTypeVariety::Atomic,
            base: Some(base),
            facets: Vec::new(),
            item_type: None,
            member_types: Vec::new(),
            final_set: DerivationSet::none(),
        }
    }

    /// Create a list type over an item type
    pub fn list(name: Option<QName>, item_type: TypeRef) -> Self {
        Self {
            name,
            variety: SimpleTypeVariety::List,
            base: None,
            facets: Vec::new(),
            item_type: Some(item_type),
            member_types: Vec::new(),
            final_set: DerivationSet::none(),
        }
    }

    /// Create a union type over member types
    pub fn union(name: Option<QName>, member_types: Vec<TypeRef>) -> Self {
        Self {
            name,
            variety: SimpleTypeVariety::Union,
            base: None,
            facets: Vec::new(),
            item_type: None,
            member_types,
            final_set: DerivationSet::none(),
        }
    }

    /// Add a facet
    pub fn with_facet(mut self, facet: Facet) -> Self {
        self.facets.push(facet);
        self
    }

    /// The explicitly declared whiteSpace facet, if any
    pub fn declared_white_space(&self) -> Option<WhiteSpace> {
        self.facets.iter().find_map(|f| match f {
            Facet::WhiteSpace {
                mode,
                explicit: true,
            } => Some(*mode),
            _ => None,
        })
    }

    /// The type's own enumeration values, if declared
    pub fn enumeration_values(&self) -> Option<&[String]> {
        self.facets.iter().find_map(|f| match f {
            Facet::Enumeration(values) => Some(values.as_slice()),
            _ => None,
        })
    }

    /// Diagnostic prefix for this type
    pub fn prefix(&self) -> String {
        match &self.name {
            Some(name) => format!("type {}", name.local_name),
            None => "anonymous simpleType".to_string(),
        }
    }
}

/// Walk the restriction chain of a simple type to the built-in that
/// terminates it. A list without a restriction base resolves through its
/// item type. Returns None when any link is unresolved.
pub fn resolve_base_builtin(
    schema: &XsdSchema,
    simple_type: &XsdSimpleType,
) -> Option<&'static BuiltinType> {
    let mut tracker = VisitTracker::new();
    let mut current: QName = match (&simple_type.base, &simple_type.item_type) {
        (Some(base), _) => base.clone(),
        (None, Some(TypeRef::Named(item))) => item.clone(),
        (None, Some(TypeRef::Inline(inner))) => return resolve_base_builtin(schema, inner),
        _ => return None,
    };

    loop {
        if !tracker.enter(current.clone()) {
            return None;
        }
        if let Some(builtin) = builtins::get_builtin_by_qname(&current) {
            return Some(builtin);
        }
        let st = schema.lookup_simple_type(&current)?;
        match (&st.base, &st.item_type) {
            (Some(base), _) => current = base.clone(),
            (None, Some(TypeRef::Named(item))) => current = item.clone(),
            (None, Some(TypeRef::Inline(inner))) => return resolve_base_builtin(schema, inner),
            _ => return None,
        }
    }
}

/// Resolve a named type to the built-in terminating its restriction chain.
pub fn resolve_named_builtin(schema: &XsdSchema, name: &QName) -> Option<&'static BuiltinType> {
    if let Some(builtin) = builtins::get_builtin_by_qname(name) {
        return Some(builtin);
    }
    let st = schema.lookup_simple_type(name)?;
    resolve_base_builtin(schema, &st)
}

/// Outcome of a type-derivation query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationCheck {
    /// `derived` is the same as or validly derived from `base`
    Derived,
    /// The derivation does not hold
    NotDerived,
    /// A reference did not resolve; the caller must skip its check
    Unresolved,
}

/// Check whether `derived` is the same as, or validly derived from, `base`.
///
/// Traverses restriction links and accepts membership in a base union.
pub fn check_type_derivation(schema: &XsdSchema, derived: &QName, base: &QName) -> DerivationCheck {
    if derived == base {
        return DerivationCheck::Derived;
    }

    match super::elements::derivation_steps(schema, derived, base) {
        super::elements::DerivationSteps::Found(_) => return DerivationCheck::Derived,
        super::elements::DerivationSteps::Unresolved => return DerivationCheck::Unresolved,
        super::elements::DerivationSteps::NotFound => {}
    }

    // A derived type may be (or derive from) a member of a base union
    if let Some(st) = schema.lookup_simple_type(base) {
        if st.variety == SimpleTypeVariety::Union {
            for member in &st.member_types {
                if let TypeRef::Named(member_name) = member {
                    match check_type_derivation(schema, derived, member_name) {
                        DerivationCheck::Derived => return DerivationCheck::Derived,
                        _ => continue,
                    }
                }
            }
        }
    }

    DerivationCheck::NotDerived
}

/// Validate a simple type definition.
pub fn validate_simple_type(schema: &XsdSchema, simple_type: &XsdSimpleType, diags: &mut Vec<Diagnostic>) {
    let prefix = simple_type.prefix();

    if let Some(base) = &simple_type.base {
        validate_base_reference(schema, simple_type, base, &prefix, diags);
    }

    match simple_type.variety {
        SimpleTypeVariety::Atomic => {}
        SimpleTypeVariety::List => validate_list(schema, simple_type, &prefix, diags),
        SimpleTypeVariety::Union => validate_union(schema, simple_type, &prefix, diags),
    }

    validate_facets(schema, simple_type, &prefix, diags);
}

fn is_xsd11_reference(name: &QName) -> bool {
    name.namespace.as_deref() == Some(crate::XSD_NAMESPACE)
        && builtins::is_xsd11_builtin(&name.local_name)
}

fn validate_base_reference(
    schema: &XsdSchema,
    simple_type: &XsdSimpleType,
    base: &QName,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    if is_xsd11_reference(base) {
        diags.push(Diagnostic::new(format!(
            "{}: base type '{}' is an XSD 1.1 type and is not supported",
            prefix, base.local_name
        )));
        return;
    }

    if *base == *builtins::XS_ANY_TYPE || *base == *builtins::XS_ANY_SIMPLE_TYPE {
        diags.push(Diagnostic::new(format!(
            "{}: a simple type cannot restrict '{}'",
            prefix, base.local_name
        )));
        return;
    }

    match schema.lookup_type(base) {
        Some(XsdType::Complex(_)) => {
            diags.push(Diagnostic::new(format!(
                "{}: a simple type cannot restrict the complex type '{}'",
                prefix, base.local_name
            )));
        }
        Some(XsdType::Simple(base_type)) => {
            if base_type.final_set.contains(Derivation::Restriction) {
                diags.push(Diagnostic::new(format!(
                    "{}: cannot derive by restriction: base type '{}' is final for restriction",
                    prefix, base.local_name
                )));
            }
        }
        // Builtins carry no final set; unresolved bases are skipped
        _ => {}
    }
}

fn validate_member_reference(
    schema: &XsdSchema,
    name: &QName,
    role: &str,
    blocked_final: Derivation,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) -> Option<Arc<XsdSimpleType>> {
    if is_xsd11_reference(name) {
        diags.push(Diagnostic::new(format!(
            "{}: {} '{}' is an XSD 1.1 type and is not supported",
            prefix, role, name.local_name
        )));
        return None;
    }

    match schema.lookup_type(name) {
        Some(XsdType::Complex(_)) => {
            diags.push(Diagnostic::new(format!(
                "{}: {} '{}' must be a simple type",
                prefix, role, name.local_name
            )));
            None
        }
        Some(XsdType::Simple(st)) => {
            if st.final_set.contains(blocked_final) {
                diags.push(Diagnostic::new(format!(
                    "{}: {} '{}' is final for {}",
                    prefix, role, name.local_name, blocked_final
                )));
            }
            Some(st)
        }
        _ => None,
    }
}

fn validate_list(
    schema: &XsdSchema,
    simple_type: &XsdSimpleType,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    match &simple_type.item_type {
        None if simple_type.base.is_none() => {
            diags.push(Diagnostic::new(format!(
                "{}: a list type must declare an item type",
                prefix
            )));
        }
        Some(TypeRef::Named(item)) => {
            if let Some(item_type) = validate_member_reference(
                schema,
                item,
                "item type",
                Derivation::List,
                prefix,
                diags,
            ) {
                if item_type.variety == SimpleTypeVariety::List {
                    diags.push(Diagnostic::new(format!(
                        "{}: the item type of a list cannot itself be a list",
                        prefix
                    )));
                }
            }
        }
        Some(TypeRef::Inline(item_type)) => {
            if item_type.variety == SimpleTypeVariety::List {
                diags.push(Diagnostic::new(format!(
                    "{}: the item type of a list cannot itself be a list",
                    prefix
                )));
            }
            validate_simple_type(schema, item_type, diags);
        }
        None => {}
    }

    // A list's whiteSpace is fixed at collapse
    if let Some(mode) = simple_type.declared_white_space() {
        if mode != WhiteSpace::Collapse {
            diags.push(Diagnostic::new(format!(
                "{}: a list type requires whiteSpace='collapse', found '{}'",
                prefix, mode
            )));
        }
    }
}

fn validate_union(
    schema: &XsdSchema,
    simple_type: &XsdSimpleType,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    if simple_type.member_types.is_empty() {
        diags.push(Diagnostic::new(format!(
            "{}: a union type must declare at least one member type",
            prefix
        )));
    }

    for member in &simple_type.member_types {
        match member {
            TypeRef::Named(name) => {
                validate_member_reference(
                    schema,
                    name,
                    "member type",
                    Derivation::Union,
                    prefix,
                    diags,
                );
            }
            TypeRef::Inline(inner) => validate_simple_type(schema, inner, diags),
        }
    }
}

fn validate_facets(
    schema: &XsdSchema,
    simple_type: &XsdSimpleType,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    if let Some(builtin) = resolve_base_builtin(schema, simple_type) {
        facets::validate_facet_applicability(
            &simple_type.facets,
            builtin.primitive,
            simple_type.variety,
            prefix,
            diags,
        );
        facets::validate_range_values(&simple_type.facets, builtin.primitive, prefix, diags);
        facets::validate_range_consistency(&simple_type.facets, builtin.primitive, prefix, diags);
        facets::check_facet_inheritance(schema, simple_type, prefix, diags);
    }

    facets::validate_deferred_facets(schema, simple_type, prefix, diags);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::XSD_NAMESPACE;

    fn xs(local: &str) -> QName {
        QName::namespaced(XSD_NAMESPACE, local)
    }

    fn named(local: &str) -> QName {
        QName::namespaced("http://example.com", local)
    }

    fn schema_with(types: Vec<XsdSimpleType>) -> XsdSchema {
        let mut schema = XsdSchema::new(Some("http://example.com"));
        for st in types {
            let name = st.name.clone().unwrap();
            schema.add_simple_type(name, st);
        }
        schema
    }

    #[test]
    fn test_resolve_base_builtin_through_chain() {
        let base = XsdSimpleType::restriction(Some(named("Base")), xs("decimal"));
        let derived = XsdSimpleType::restriction(Some(named("Derived")), named("Base"));
        let schema = schema_with(vec![base, derived.clone()]);

        let builtin = resolve_base_builtin(&schema, &derived).unwrap();
        assert_eq!(builtin.name, "decimal");
    }

    #[test]
    fn test_resolve_base_builtin_cycle_safe() {
        let a = XsdSimpleType::restriction(Some(named("A")), named("B"));
        let b = XsdSimpleType::restriction(Some(named("B")), named("A"));
        let schema = schema_with(vec![a.clone(), b]);
        assert!(resolve_base_builtin(&schema, &a).is_none());
    }

    #[test]
    fn test_check_type_derivation() {
        let base = XsdSimpleType::restriction(Some(named("Base")), xs("decimal"));
        let derived = XsdSimpleType::restriction(Some(named("Derived")), named("Base"));
        let schema = schema_with(vec![base, derived]);

        assert_eq!(
            check_type_derivation(&schema, &named("Derived"), &named("Base")),
            DerivationCheck::Derived
        );
        assert_eq!(
            check_type_derivation(&schema, &named("Derived"), &xs("decimal")),
            DerivationCheck::Derived
        );
        assert_eq!(
            check_type_derivation(&schema, &named("Base"), &named("Derived")),
            DerivationCheck::NotDerived
        );
        assert_eq!(
            check_type_derivation(&schema, &named("Missing"), &named("Base")),
            DerivationCheck::Unresolved
        );
    }

    #[test]
    fn test_check_type_derivation_union_member() {
        let number = XsdSimpleType::restriction(Some(named("Number")), xs("decimal"));
        let code = XsdSimpleType::restriction(Some(named("Code")), xs("string"));
        let either = XsdSimpleType::union(
            Some(named("Either")),
            vec![
                TypeRef::Named(named("Number")),
                TypeRef::Named(named("Code")),
            ],
        );
        let schema = schema_with(vec![number, code, either]);

        assert_eq!(
            check_type_derivation(&schema, &named("Number"), &named("Either")),
            DerivationCheck::Derived
        );
        assert_eq!(
            check_type_derivation(&schema, &xs("boolean"), &named("Either")),
            DerivationCheck::NotDerived
        );
    }

    #[test]
    fn test_restriction_of_any_simple_type_rejected() {
        let bad = XsdSimpleType::restriction(Some(named("Bad")), xs("anySimpleType"));
        let schema = schema_with(vec![bad.clone()]);

        let mut diags = Vec::new();
        validate_simple_type(&schema, &bad, &mut diags);
        assert!(diags
            .iter()
            .any(|d| d.message.contains("cannot restrict 'anySimpleType'")));
    }

    #[test]
    fn test_xsd11_builtin_rejected() {
        let bad = XsdSimpleType::restriction(Some(named("Bad")), xs("dateTimeStamp"));
        let schema = schema_with(vec![bad.clone()]);

        let mut diags = Vec::new();
        validate_simple_type(&schema, &bad, &mut diags);
        assert!(diags
            .iter()
            .any(|d| d.message.contains("XSD 1.1 type")));
    }

    #[test]
    fn test_final_restriction_enforced() {
        let mut base = XsdSimpleType::restriction(Some(named("Base")), xs("string"));
        base.final_set = DerivationSet::from_attr("restriction");
        let derived = XsdSimpleType::restriction(Some(named("Derived")), named("Base"));
        let schema = schema_with(vec![base, derived.clone()]);

        let mut diags = Vec::new();
        validate_simple_type(&schema, &derived, &mut diags);
        assert!(diags
            .iter()
            .any(|d| d.message.contains("final for restriction")));
    }

    #[test]
    fn test_list_of_list_rejected() {
        let inner = XsdSimpleType::list(
            Some(named("Inner")),
            TypeRef::Named(xs("NMTOKEN")),
        );
        let outer = XsdSimpleType::list(Some(named("Outer")), TypeRef::Named(named("Inner")));
        let schema = schema_with(vec![inner, outer.clone()]);

        let mut diags = Vec::new();
        validate_simple_type(&schema, &outer, &mut diags);
        assert!(diags
            .iter()
            .any(|d| d.message.contains("cannot itself be a list")));
    }

    #[test]
    fn test_list_white_space_override_rejected() {
        let bad = XsdSimpleType::list(Some(named("Bad")), TypeRef::Named(xs("NMTOKEN")))
            .with_facet(Facet::WhiteSpace {
                mode: WhiteSpace::Preserve,
                explicit: true,
            });
        let schema = schema_with(vec![bad.clone()]);

        let mut diags = Vec::new();
        validate_simple_type(&schema, &bad, &mut diags);
        assert!(diags
            .iter()
            .any(|d| d.message.contains("whiteSpace='collapse'")));
    }

    #[test]
    fn test_facet_tightening_scenario() {
        let base = XsdSimpleType::restriction(Some(named("BaseType")), xs("decimal"))
            .with_facet(Facet::MaxInclusive("100".to_string()));
        let good = XsdSimpleType::restriction(Some(named("GoodDerived")), named("BaseType"))
            .with_facet(Facet::MaxInclusive("50".to_string()));
        let bad = XsdSimpleType::restriction(Some(named("BadDerived")), named("BaseType"))
            .with_facet(Facet::MaxInclusive("200".to_string()));
        let schema = schema_with(vec![base, good.clone(), bad.clone()]);

        let mut diags = Vec::new();
        validate_simple_type(&schema, &good, &mut diags);
        assert!(diags.is_empty(), "unexpected: {:?}", diags);

        validate_simple_type(&schema, &bad, &mut diags);
        assert!(diags.iter().any(|d| d.message.contains(
            "maxInclusive: derived value (200) must be <= base value (100)"
        )));
    }

    #[test]
    fn test_implicit_builtin_bounds_enforced() {
        // unsignedInt contributes [0, 4294967295]
        let bad = XsdSimpleType::restriction(Some(named("Bad")), xs("unsignedInt"))
            .with_facet(Facet::MinInclusive("-5".to_string()));
        let schema = schema_with(vec![bad.clone()]);

        let mut diags = Vec::new();
        validate_simple_type(&schema, &bad, &mut diags);
        assert!(diags.iter().any(|d| d.message.contains(
            "minInclusive: derived value (-5) must be >= base value (0)"
        )));
    }

    #[test]
    fn test_deferred_facet_revalidation() {
        let bad = XsdSimpleType::restriction(Some(named("Bad")), xs("gYear"))
            .with_facet(Facet::Deferred {
                name: "minInclusive".to_string(),
                value: "2002".to_string(),
            })
            .with_facet(Facet::Deferred {
                name: "maxInclusive".to_string(),
                value: "1998".to_string(),
            });
        let schema = schema_with(vec![bad.clone()]);

        let mut diags = Vec::new();
        validate_simple_type(&schema, &bad, &mut diags);
        assert!(diags
            .iter()
            .any(|d| d.message.contains("minInclusive (2002) must be <= maxInclusive (1998)")));
    }
}
