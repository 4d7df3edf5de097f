//! XSD complex type definitions and their validator
//!
//! The complex-type model (content kinds, derivation method, block/final),
//! the derivation-chain walker toward `xs:anyType`, the effective content
//! particle with extension combining, and the validator that composes the
//! content, attribute, derivation, UPA, and circularity checks.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#Complex_Type_Definitions

use std::sync::Arc;

use crate::error::Diagnostic;
use crate::namespaces::QName;

use super::attributes::{self, XsdAttribute};
use super::builtins;
use super::elements::XsdElement;
use super::groups::{self, ModelType, XsdGroup};
use super::helpers::{Derivation, DerivationSet};
use super::models;
use super::particles::{self, Occurs};
use super::schemas::{XsdSchema, XsdType};
use super::visits::VisitTracker;
use super::wildcards::XsdAnyAttribute;

/// Derivation method for complex types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerivationMethod {
    /// Type derived by restriction
    #[default]
    Restriction,
    /// Type derived by extension
    Extension,
}

impl DerivationMethod {
    /// The matching derivation-control keyword
    pub fn as_derivation(&self) -> Derivation {
        match self {
            Self::Restriction => Derivation::Restriction,
            Self::Extension => Derivation::Extension,
        }
    }
}

impl std::fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restriction => write!(f, "restriction"),
            Self::Extension => write!(f, "extension"),
        }
    }
}

/// Content kind of a complex type
#[derive(Debug, Clone)]
pub enum ContentType {
    /// No content
    Empty,
    /// Local element content; mixedness comes from the type's `mixed` flag
    Element(Arc<XsdGroup>),
    /// Simple content derived from the type in `base_type`
    SimpleContent,
    /// Complex content derived from the type in `base_type`
    ComplexContent {
        /// The derivation step's own particle, if any
        particle: Option<Arc<XsdGroup>>,
    },
}

/// XSD complex type definition
#[derive(Debug, Clone)]
pub struct XsdComplexType {
    /// Type name (None for anonymous types)
    pub name: Option<QName>,
    /// Content kind
    pub content: ContentType,
    /// Derivation method when the type has a base
    pub derivation: Option<DerivationMethod>,
    /// Base type reference
    pub base_type: Option<QName>,
    /// Whether character content is allowed between child elements
    pub mixed: bool,
    /// Whether the type is abstract
    pub abstract_type: bool,
    /// Blocked derivation methods for substitution purposes
    pub block: DerivationSet,
    /// Finalized derivation methods
    pub final_set: DerivationSet,
    /// Direct attribute declarations
    pub attributes: Vec<Arc<XsdAttribute>>,
    /// Attribute group references
    pub attribute_groups: Vec<QName>,
    /// Attribute wildcard
    pub any_attribute: Option<Arc<XsdAnyAttribute>>,
}

impl XsdComplexType {
    fn bare(name: Option<QName>, content: ContentType) -> Self {
        Self {
            name,
            content,
            derivation: None,
            base_type: None,
            mixed: false,
            abstract_type: false,
            block: DerivationSet::none(),
            final_set: DerivationSet::none(),
            attributes: Vec::new(),
            attribute_groups: Vec::new(),
            any_attribute: None,
        }
    }

    /// Create an empty-content type
    pub fn empty(name: Option<QName>) -> Self {
        Self::bare(name, ContentType::Empty)
    }

    /// Create an element-only type
    pub fn element_only(name: Option<QName>, group: XsdGroup) -> Self {
        Self::bare(name, ContentType::Element(Arc::new(group)))
    }

    /// Create a mixed-content type
    pub fn mixed(name: Option<QName>, group: XsdGroup) -> Self {
        let mut ct = Self::bare(name, ContentType::Element(Arc::new(group)));
        ct.mixed = true;
        ct
    }

    /// Create a complex-content derivation step
    pub fn derived(
        name: Option<QName>,
        base: QName,
        method: DerivationMethod,
        particle: Option<XsdGroup>,
    ) -> Self {
        let mut ct = Self::bare(
            name,
            ContentType::ComplexContent {
                particle: particle.map(Arc::new),
            },
        );
        ct.base_type = Some(base);
        ct.derivation = Some(method);
        ct
    }

    /// Create a simple-content derivation step
    pub fn simple_content(name: Option<QName>, base: QName, method: DerivationMethod) -> Self {
        let mut ct = Self::bare(name, ContentType::SimpleContent);
        ct.base_type = Some(base);
        ct.derivation = Some(method);
        ct
    }

    /// Add an attribute
    pub fn with_attribute(mut self, attr: XsdAttribute) -> Self {
        self.attributes.push(Arc::new(attr));
        self
    }

    /// The type's own content particle, if any
    pub fn content_particle(&self) -> Option<&Arc<XsdGroup>> {
        match &self.content {
            ContentType::Element(group) => Some(group),
            ContentType::ComplexContent { particle } => particle.as_ref(),
            _ => None,
        }
    }

    /// Whether this type has element content of its own
    pub fn has_element_content(&self) -> bool {
        self.content_particle().is_some_and(|g| !g.is_empty())
    }

    /// Diagnostic prefix for this type
    pub fn prefix(&self) -> String {
        match &self.name {
            Some(name) => format!("type {}", name.local_name),
            None => "anonymous complexType".to_string(),
        }
    }
}

/// How the chain walker treats a top-level type without a declared base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainMode {
    /// Only explicit base links are followed
    Strict,
    /// A missing base on a top-level type terminates at an implicit anyType
    AllowImplicitAnyType,
}

/// A walked derivation chain, leaf first
#[derive(Debug)]
pub struct TypeChain {
    /// The chain members, starting at the walked type
    pub links: Vec<Arc<XsdComplexType>>,
    /// Whether the walk terminated at (explicit or implicit) anyType or the
    /// redefine exemption, as opposed to a missing base, a simple base, or
    /// a cycle
    pub complete: bool,
}

impl TypeChain {
    /// Iterate the chain, leaf first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<XsdComplexType>> {
        self.links.iter()
    }
}

impl<'a> IntoIterator for &'a TypeChain {
    type Item = &'a Arc<XsdComplexType>;
    type IntoIter = std::slice::Iter<'a, Arc<XsdComplexType>>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

/// Walk the derivation chain of a complex type toward `xs:anyType`,
/// stopping on a cycle, a missing base, or the anyType terminator.
pub fn type_chain(schema: &XsdSchema, ct: &Arc<XsdComplexType>, mode: ChainMode) -> TypeChain {
    let mut links = vec![ct.clone()];
    let mut tracker: VisitTracker<usize> = VisitTracker::new();
    tracker.enter(Arc::as_ptr(ct) as usize);

    loop {
        let current = links.last().unwrap().clone();
        let Some(base_name) = &current.base_type else {
            return TypeChain {
                links,
                complete: mode == ChainMode::AllowImplicitAnyType,
            };
        };

        if *base_name == *builtins::XS_ANY_TYPE {
            return TypeChain {
                links,
                complete: true,
            };
        }

        // A type naming itself as base is a redefine of the previous
        // definition, which is not available here; the chain ends cleanly
        if current.name.as_ref() == Some(base_name) {
            return TypeChain {
                links,
                complete: true,
            };
        }

        match schema.lookup_type(base_name) {
            Some(XsdType::Complex(base)) => {
                if !tracker.enter(Arc::as_ptr(&base) as usize) {
                    return TypeChain {
                        links,
                        complete: false,
                    };
                }
                links.push(base);
            }
            _ => {
                return TypeChain {
                    links,
                    complete: false,
                }
            }
        }
    }
}

/// Build a 1..1 synthetic sequence over two optional particles; one absent
/// side yields the other directly.
pub fn synthetic_sequence(
    first: Option<Arc<XsdGroup>>,
    second: Option<Arc<XsdGroup>>,
) -> Option<Arc<XsdGroup>> {
    match (first, second) {
        (Some(a), Some(b)) => {
            let mut seq = XsdGroup::new(ModelType::Sequence);
            seq.occurs = Occurs::once();
            seq.particles.push(groups::XsdParticle::Group(a));
            seq.particles.push(groups::XsdParticle::Group(b));
            Some(Arc::new(seq))
        }
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// The full element-content particle of a type after extension combining:
/// an extension contributes a synthetic sequence of the base's effective
/// content followed by its own particle.
pub fn effective_content_particle(
    schema: &XsdSchema,
    ct: &Arc<XsdComplexType>,
) -> Option<Arc<XsdGroup>> {
    let mut tracker = VisitTracker::new();
    effective_content_inner(schema, ct, &mut tracker)
}

fn effective_content_inner(
    schema: &XsdSchema,
    ct: &Arc<XsdComplexType>,
    tracker: &mut VisitTracker<usize>,
) -> Option<Arc<XsdGroup>> {
    if !tracker.enter(Arc::as_ptr(ct) as usize) {
        return None;
    }

    let own = ct.content_particle().cloned();

    if ct.derivation == Some(DerivationMethod::Extension) {
        if let Some(base_name) = &ct.base_type {
            if ct.name.as_ref() != Some(base_name) {
                if let Some(XsdType::Complex(base)) = schema.lookup_type(base_name) {
                    let base_particle = effective_content_inner(schema, &base, tracker);
                    return synthetic_sequence(base_particle, own);
                }
            }
        }
    }

    own
}

/// Collect every element declaration reachable from a complex type's
/// effective content particle.
pub fn collect_element_decls_from_complex_type(
    schema: &XsdSchema,
    ct: &Arc<XsdComplexType>,
) -> Vec<Arc<XsdElement>> {
    let mut out = Vec::new();
    if let Some(group) = effective_content_particle(schema, ct) {
        groups::collect_element_decls(schema, &group, &mut out);
    }
    out
}

/// Validate a complex type definition.
pub fn validate_complex_type(schema: &XsdSchema, ct: &Arc<XsdComplexType>, diags: &mut Vec<Diagnostic>) {
    let prefix = ct.prefix();

    // Content structure
    if let Some(group) = ct.content_particle() {
        particles::validate_particle_tree(schema, group, false, &prefix, diags);
    }
    validate_simple_content_base(schema, ct, &prefix, diags);

    let base_complex = ct.base_type.as_ref().and_then(|base_name| {
        if ct.name.as_ref() == Some(base_name) {
            // Redefine self-reference: the previous definition is not in
            // the resolved graph
            return None;
        }
        match schema.lookup_type(base_name) {
            Some(XsdType::Complex(base)) => Some(base),
            _ => None,
        }
    });

    // UPA and element-declarations-consistent run over the merged content
    // model so extension interactions are covered
    if let Some(merged) = merged_content_particle(schema, ct, base_complex.as_ref()) {
        models::check_unique_particle_attribution(schema, &merged, &prefix, diags);
        particles::check_element_declarations_consistent(schema, &merged, &prefix, diags);
    }

    if let (Some(method), Some(base)) = (ct.derivation, base_complex.as_ref()) {
        check_mixed_content_derivation(ct, base, method, &prefix, diags);
        match method {
            DerivationMethod::Restriction => {
                check_content_restriction(schema, ct, base, &prefix, diags);
                attributes::check_attribute_restriction(schema, ct, base, &prefix, diags);
            }
            DerivationMethod::Extension => {
                attributes::check_attribute_extension(schema, ct, base, &prefix, diags);
            }
        }
        check_any_attribute_derivation(schema, ct, base, method, &prefix, diags);
    }

    // Attribute structure and collation
    let collected = attributes::collect_all_attributes(
        schema,
        &ct.attributes,
        &ct.attribute_groups,
        ct.any_attribute.as_ref(),
    );
    for attr in &collected.attributes {
        attributes::validate_attribute(schema, attr, &prefix, diags);
    }
    attributes::check_attribute_uniqueness(&collected, &prefix, diags);
    let _ = attributes::collapse_any_attributes(schema, ct, &prefix, diags);

    let uses = attributes::collect_effective_attribute_uses(schema, ct);
    attributes::check_multiple_id_attributes(schema, &uses, &prefix, diags);

    check_circular_derivation(schema, ct, &prefix, diags);
    check_base_finality(schema, ct, &prefix, diags);
}

fn merged_content_particle(
    schema: &XsdSchema,
    ct: &Arc<XsdComplexType>,
    base: Option<&Arc<XsdComplexType>>,
) -> Option<Arc<XsdGroup>> {
    match (ct.derivation, base) {
        // An extension's effective particle already merges the base
        (Some(DerivationMethod::Extension), _) | (None, _) => {
            effective_content_particle(schema, ct)
        }
        (Some(DerivationMethod::Restriction), Some(base_ct)) => synthetic_sequence(
            effective_content_particle(schema, base_ct),
            ct.content_particle().cloned(),
        ),
        (Some(DerivationMethod::Restriction), None) => effective_content_particle(schema, ct),
    }
}

fn validate_simple_content_base(
    schema: &XsdSchema,
    ct: &XsdComplexType,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    if !matches!(ct.content, ContentType::SimpleContent) {
        return;
    }
    let Some(base_name) = &ct.base_type else {
        diags.push(Diagnostic::new(format!(
            "{}: simpleContent must declare a base type",
            prefix
        )));
        return;
    };
    if let Some(XsdType::Complex(base)) = schema.lookup_type(base_name) {
        if base.has_element_content() && !base.mixed {
            diags.push(Diagnostic::new(format!(
                "{}: simpleContent cannot derive from the element-only type '{}'",
                prefix, base_name.local_name
            )));
        }
    }
}

fn check_mixed_content_derivation(
    ct: &XsdComplexType,
    base: &XsdComplexType,
    method: DerivationMethod,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let base_mixed = base.mixed;
    let derived_mixed = ct.mixed;
    let base_name = base
        .name
        .as_ref()
        .map(|n| n.local_name.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    match method {
        DerivationMethod::Extension => {
            if derived_mixed && !base_mixed && base.has_element_content() {
                diags.push(Diagnostic::new(format!(
                    "{}: extension cannot add mixed content to the element-only base type '{}'",
                    prefix, base_name
                )));
            }
            if !derived_mixed && base_mixed && ct.has_element_content() {
                diags.push(Diagnostic::new(format!(
                    "{}: extension cannot drop the mixed content of base type '{}'",
                    prefix, base_name
                )));
            }
        }
        DerivationMethod::Restriction => {
            // Removing mixed is fine; adding it is not
            if derived_mixed && !base_mixed {
                diags.push(Diagnostic::new(format!(
                    "{}: mixed content cannot restrict the element-only base type '{}'",
                    prefix, base_name
                )));
            }
        }
    }
}

fn check_content_restriction(
    schema: &XsdSchema,
    ct: &Arc<XsdComplexType>,
    base: &Arc<XsdComplexType>,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let base_particle = effective_content_particle(schema, base);
    let derived_particle = ct.content_particle().cloned();

    match (derived_particle, base_particle) {
        (Some(derived), Some(base_group)) => {
            super::derivations::check_particle_restriction(
                schema,
                &derived,
                &base_group,
                prefix,
                diags,
            );
        }
        (None, Some(base_group)) => {
            if !base_group.is_emptiable() {
                diags.push(Diagnostic::new(format!(
                    "{}: ComplexContent restriction: the base content model is not emptiable but the derived content is empty",
                    prefix
                )));
            }
        }
        (Some(derived), None) => {
            if !derived.is_empty() {
                diags.push(Diagnostic::new(format!(
                    "{}: ComplexContent restriction: the derived content adds elements not present in the base type",
                    prefix
                )));
            }
        }
        (None, None) => {}
    }
}

fn check_any_attribute_derivation(
    schema: &XsdSchema,
    ct: &Arc<XsdComplexType>,
    base: &Arc<XsdComplexType>,
    method: DerivationMethod,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let derived_collected = attributes::collect_all_attributes(
        schema,
        &ct.attributes,
        &ct.attribute_groups,
        ct.any_attribute.as_ref(),
    );
    let Some(first) = derived_collected.wildcards.first() else {
        return;
    };

    // The type's own complete wildcard: intersection at its level
    let mut derived_wildcard = first.wildcard.clone();
    for next in derived_collected.wildcards.iter().skip(1) {
        match derived_wildcard.intersect(&next.wildcard) {
            Some(intersection) => derived_wildcard = intersection,
            None => return, // reported by the collapse pass
        }
    }

    let mut sink = Vec::new();
    let base_wildcard = attributes::collapse_any_attributes(schema, base, prefix, &mut sink);

    match method {
        DerivationMethod::Restriction => match base_wildcard {
            Some(base_w) => {
                if !derived_wildcard.is_restriction_of(&base_w) {
                    diags.push(Diagnostic::new(format!(
                        "{}: anyAttribute restriction: the derived wildcard is not a subset of the base wildcard",
                        prefix
                    )));
                }
            }
            None => {
                diags.push(Diagnostic::new(format!(
                    "{}: anyAttribute restriction: the base type has no attribute wildcard",
                    prefix
                )));
            }
        },
        DerivationMethod::Extension => {
            if let Some(base_w) = base_wildcard {
                if derived_wildcard.union(&base_w).is_none() {
                    diags.push(Diagnostic::new(format!(
                        "{}: anyAttribute extension: union is not expressible",
                        prefix
                    )));
                }
            }
        }
    }
}

fn check_circular_derivation(
    schema: &XsdSchema,
    ct: &XsdComplexType,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let Some(own_name) = &ct.name else {
        return;
    };
    let Some(first_base) = &ct.base_type else {
        return;
    };

    // The first edge pointing back at the type itself is a redefine of the
    // previous definition, not a cycle
    if first_base == own_name {
        return;
    }

    let mut tracker = VisitTracker::new();
    let mut current = first_base.clone();

    loop {
        if current == *own_name {
            diags.push(Diagnostic::new(format!(
                "{}: circular derivation detected through base type '{}'",
                prefix, first_base.local_name
            )));
            return;
        }
        if !tracker.enter(current.clone()) {
            // A cycle that does not pass through this type; reported there
            return;
        }
        match schema.lookup_type(&current) {
            Some(XsdType::Complex(base)) => match &base.base_type {
                Some(next) => current = next.clone(),
                None => return,
            },
            _ => return,
        }
    }
}

fn check_base_finality(
    schema: &XsdSchema,
    ct: &XsdComplexType,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let (Some(method), Some(base_name)) = (ct.derivation, &ct.base_type) else {
        return;
    };
    if ct.name.as_ref() == Some(base_name) {
        return;
    }

    let final_set = match schema.lookup_type(base_name) {
        Some(XsdType::Complex(base)) => base.final_set,
        Some(XsdType::Simple(base)) => base.final_set,
        _ => return,
    };

    if final_set.contains(method.as_derivation()) {
        let verb = match method {
            DerivationMethod::Extension => "extend",
            DerivationMethod::Restriction => "restrict",
        };
        diags.push(Diagnostic::new(format!(
            "{}: cannot {} type '{}': base type is final for {}",
            prefix, verb, base_name.local_name, method
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::particles::Occurs;

    fn named(local: &str) -> QName {
        QName::namespaced("http://example.com", local)
    }

    fn seq_of(names: &[&str]) -> XsdGroup {
        let mut group = XsdGroup::new(ModelType::Sequence);
        for name in names {
            group.add_element(XsdElement::local(QName::local(*name), Occurs::once()));
        }
        group
    }

    fn add_type(schema: &mut XsdSchema, ct: XsdComplexType) -> Arc<XsdComplexType> {
        let name = ct.name.clone().unwrap();
        let arc = Arc::new(ct);
        schema.add_complex_type(name, arc.clone());
        arc
    }

    #[test]
    fn test_type_chain_walks_to_root() {
        let mut schema = XsdSchema::new(Some("http://example.com"));
        let root = add_type(&mut schema, XsdComplexType::element_only(Some(named("Root")), seq_of(&["a"])));
        let mid = add_type(
            &mut schema,
            XsdComplexType::derived(
                Some(named("Mid")),
                named("Root"),
                DerivationMethod::Extension,
                Some(seq_of(&["b"])),
            ),
        );
        let leaf = add_type(
            &mut schema,
            XsdComplexType::derived(
                Some(named("Leaf")),
                named("Mid"),
                DerivationMethod::Extension,
                Some(seq_of(&["c"])),
            ),
        );
        let _ = (root, mid);

        let chain = type_chain(&schema, &leaf, ChainMode::AllowImplicitAnyType);
        let names: Vec<_> = chain
            .links
            .iter()
            .map(|ct| ct.name.as_ref().unwrap().local_name.clone())
            .collect();
        assert_eq!(names, vec!["Leaf", "Mid", "Root"]);
        assert!(chain.complete);
    }

    #[test]
    fn test_type_chain_strict_mode_incomplete_without_base() {
        let mut schema = XsdSchema::new(None);
        let root = add_type(&mut schema, XsdComplexType::empty(Some(named("Root"))));

        assert!(!type_chain(&schema, &root, ChainMode::Strict).complete);
        assert!(type_chain(&schema, &root, ChainMode::AllowImplicitAnyType).complete);
    }

    #[test]
    fn test_type_chain_stops_on_cycle() {
        let mut schema = XsdSchema::new(None);
        let a = add_type(
            &mut schema,
            XsdComplexType::derived(Some(named("A")), named("B"), DerivationMethod::Extension, None),
        );
        let _b = add_type(
            &mut schema,
            XsdComplexType::derived(Some(named("B")), named("A"), DerivationMethod::Extension, None),
        );

        let chain = type_chain(&schema, &a, ChainMode::Strict);
        assert_eq!(chain.links.len(), 2);
        assert!(!chain.complete);
    }

    #[test]
    fn test_effective_content_particle_combines_extension() {
        let mut schema = XsdSchema::new(None);
        let _base = add_type(
            &mut schema,
            XsdComplexType::element_only(Some(named("Base")), seq_of(&["a"])),
        );
        let derived = add_type(
            &mut schema,
            XsdComplexType::derived(
                Some(named("Derived")),
                named("Base"),
                DerivationMethod::Extension,
                Some(seq_of(&["b"])),
            ),
        );

        let merged = effective_content_particle(&schema, &derived).unwrap();
        assert_eq!(merged.model, ModelType::Sequence);
        assert_eq!(merged.occurs, Occurs::once());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_circular_derivation_reported() {
        let mut schema = XsdSchema::new(None);
        let a = add_type(
            &mut schema,
            XsdComplexType::derived(Some(named("A")), named("B"), DerivationMethod::Extension, None),
        );
        let _b = add_type(
            &mut schema,
            XsdComplexType::derived(Some(named("B")), named("A"), DerivationMethod::Extension, None),
        );

        let mut diags = Vec::new();
        validate_complex_type(&schema, &a, &mut diags);
        assert!(diags
            .iter()
            .any(|d| d.message.contains("circular derivation")));
    }

    #[test]
    fn test_redefine_self_extension_tolerated() {
        let mut schema = XsdSchema::new(None);
        let t = add_type(
            &mut schema,
            XsdComplexType::derived(Some(named("T")), named("T"), DerivationMethod::Extension, None),
        );

        let mut diags = Vec::new();
        validate_complex_type(&schema, &t, &mut diags);
        assert!(
            !diags.iter().any(|d| d.message.contains("circular")),
            "unexpected: {:?}",
            diags
        );
    }

    #[test]
    fn test_base_finality_enforced() {
        let mut schema = XsdSchema::new(None);
        let mut base = XsdComplexType::element_only(Some(named("Base")), seq_of(&["a"]));
        base.final_set = DerivationSet::from_attr("extension");
        add_type(&mut schema, base);

        let derived = add_type(
            &mut schema,
            XsdComplexType::derived(
                Some(named("Derived")),
                named("Base"),
                DerivationMethod::Extension,
                Some(seq_of(&["b"])),
            ),
        );

        let mut diags = Vec::new();
        validate_complex_type(&schema, &derived, &mut diags);
        assert!(diags
            .iter()
            .any(|d| d.message.contains("base type is final for extension")));
    }

    #[test]
    fn test_mixed_restriction_of_element_only_rejected() {
        let mut schema = XsdSchema::new(None);
        add_type(
            &mut schema,
            XsdComplexType::element_only(Some(named("Base")), seq_of(&["a"])),
        );

        let mut derived = XsdComplexType::derived(
            Some(named("Derived")),
            named("Base"),
            DerivationMethod::Restriction,
            Some(seq_of(&["a"])),
        );
        derived.mixed = true;
        let derived = add_type(&mut schema, derived);

        let mut diags = Vec::new();
        validate_complex_type(&schema, &derived, &mut diags);
        assert!(diags
            .iter()
            .any(|d| d.message.contains("mixed content cannot restrict the element-only base")));
    }

    #[test]
    fn test_restriction_of_non_emptiable_base_to_empty_rejected() {
        let mut schema = XsdSchema::new(None);
        add_type(
            &mut schema,
            XsdComplexType::element_only(Some(named("Base")), seq_of(&["a"])),
        );
        let derived = add_type(
            &mut schema,
            XsdComplexType::derived(
                Some(named("Derived")),
                named("Base"),
                DerivationMethod::Restriction,
                None,
            ),
        );

        let mut diags = Vec::new();
        validate_complex_type(&schema, &derived, &mut diags);
        assert!(diags
            .iter()
            .any(|d| d.message.contains("not emptiable but the derived content is empty")));
    }
}
