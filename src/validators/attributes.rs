//! XSD attribute declarations, attribute groups, and attribute-use rules
//!
//! Two collection modes drive everything here: a flat collection used for
//! uniqueness checks inside a single type, and the effective-use map built
//! root-first along the type chain, where the innermost declaration wins and
//! `use='prohibited'` without a fixed value deletes a use. The
//! restriction/extension rules for attribute uses and the multiple-ID rule
//! complete the set.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#cAttribute_Declarations

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::Diagnostic;
use crate::namespaces::QName;

use super::builtins;
use super::complex_types::{type_chain, ChainMode, XsdComplexType};
use super::helpers::normalized_equal;
use super::schemas::XsdSchema;
use super::simple_types::{
    self, check_type_derivation, validate_simple_type, DerivationCheck, XsdSimpleType,
};
use super::visits::VisitTracker;
use super::wildcards::{XsdAnyAttribute, XsdWildcard};

/// Attribute use mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeUse {
    /// The attribute may appear
    #[default]
    Optional,
    /// The attribute must appear
    Required,
    /// The attribute must not appear
    Prohibited,
}

impl std::fmt::Display for AttributeUse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optional => write!(f, "optional"),
            Self::Required => write!(f, "required"),
            Self::Prohibited => write!(f, "prohibited"),
        }
    }
}

/// XSD attribute declaration or use
#[derive(Debug, Clone)]
pub struct XsdAttribute {
    /// Attribute name
    pub name: QName,
    /// Declared type reference
    pub type_ref: Option<QName>,
    /// Inline anonymous simple type, owned by this declaration
    pub inline_type: Option<Arc<XsdSimpleType>>,
    /// Use mode
    pub use_mode: AttributeUse,
    /// Fixed value constraint
    pub fixed: Option<String>,
    /// Default value constraint
    pub default: Option<String>,
    /// Whether this use references a global declaration
    pub is_reference: bool,
}

impl XsdAttribute {
    /// Create an optional attribute
    pub fn new(name: QName) -> Self {
        Self {
            name,
            type_ref: None,
            inline_type: None,
            use_mode: AttributeUse::Optional,
            fixed: None,
            default: None,
            is_reference: false,
        }
    }

    /// Set the declared type
    pub fn with_type(mut self, type_ref: QName) -> Self {
        self.type_ref = Some(type_ref);
        self
    }

    /// Set the use mode
    pub fn with_use(mut self, use_mode: AttributeUse) -> Self {
        self.use_mode = use_mode;
        self
    }

    /// Set a fixed value
    pub fn with_fixed(mut self, value: impl Into<String>) -> Self {
        self.fixed = Some(value.into());
        self
    }

    /// Set a default value
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// XSD attribute group definition
#[derive(Debug, Clone, Default)]
pub struct XsdAttributeGroup {
    /// Group name (None for the anonymous per-type group)
    pub name: Option<QName>,
    /// Direct attribute declarations
    pub attributes: Vec<Arc<XsdAttribute>>,
    /// References to further attribute groups
    pub attribute_groups: Vec<QName>,
    /// Attribute wildcard
    pub any_attribute: Option<Arc<XsdAnyAttribute>>,
}

impl XsdAttributeGroup {
    /// Create a named attribute group
    pub fn named(name: QName) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }
}

/// Result of flattening attribute declarations and wildcards
#[derive(Debug, Default)]
pub struct CollectedAttributes {
    /// Every attribute in declaration order
    pub attributes: Vec<Arc<XsdAttribute>>,
    /// Every distinct wildcard (deduplicated by identity)
    pub wildcards: Vec<Arc<XsdAnyAttribute>>,
}

/// Flatten direct attributes plus everything reachable through
/// attribute-group references, breadth-first with cycle protection.
///
/// A wildcard reached through several reference paths appears once:
/// deduplication is by object identity, not by value.
pub fn collect_all_attributes(
    schema: &XsdSchema,
    attributes: &[Arc<XsdAttribute>],
    attribute_groups: &[QName],
    any_attribute: Option<&Arc<XsdAnyAttribute>>,
) -> CollectedAttributes {
    let mut collected = CollectedAttributes {
        attributes: attributes.to_vec(),
        wildcards: any_attribute.cloned().into_iter().collect(),
    };

    let mut tracker: VisitTracker<QName> = VisitTracker::new();
    let mut queue: Vec<QName> = attribute_groups.to_vec();

    while !queue.is_empty() {
        let mut next = Vec::new();
        for group_name in queue {
            if !tracker.enter(group_name.clone()) {
                continue;
            }
            let Some(group) = schema.lookup_attribute_group(&group_name) else {
                continue;
            };
            collected.attributes.extend(group.attributes.iter().cloned());
            if let Some(wildcard) = &group.any_attribute {
                if !collected
                    .wildcards
                    .iter()
                    .any(|w| Arc::ptr_eq(w, wildcard))
                {
                    collected.wildcards.push(wildcard.clone());
                }
            }
            next.extend(group.attribute_groups.iter().cloned());
        }
        queue = next;
    }

    collected
}

fn collect_for_type(schema: &XsdSchema, ct: &XsdComplexType) -> CollectedAttributes {
    collect_all_attributes(
        schema,
        &ct.attributes,
        &ct.attribute_groups,
        ct.any_attribute.as_ref(),
    )
}

/// Build the effective attribute uses of a complex type.
///
/// The chain is walked root-first so the innermost declaration wins;
/// `use='prohibited'` without a fixed value removes the use.
pub fn collect_effective_attribute_uses(
    schema: &XsdSchema,
    ct: &Arc<XsdComplexType>,
) -> IndexMap<QName, Arc<XsdAttribute>> {
    let mut uses: IndexMap<QName, Arc<XsdAttribute>> = IndexMap::new();

    let chain = type_chain(schema, ct, ChainMode::AllowImplicitAnyType);
    for level in chain.iter().rev() {
        let collected = collect_for_type(schema, level);
        for attr in collected.attributes {
            if attr.use_mode == AttributeUse::Prohibited && attr.fixed.is_none() {
                uses.shift_remove(&attr.name);
            } else {
                uses.insert(attr.name.clone(), attr);
            }
        }
    }

    uses
}

/// Intersect every anyAttribute wildcard collected along the chain into the
/// type's complete wildcard. An inexpressible intersection is reported; an
/// empty result means the type admits no wildcard attributes.
pub fn collapse_any_attributes(
    schema: &XsdSchema,
    ct: &Arc<XsdComplexType>,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) -> Option<XsdWildcard> {
    let mut wildcards: Vec<Arc<XsdAnyAttribute>> = Vec::new();
    let chain = type_chain(schema, ct, ChainMode::AllowImplicitAnyType);
    for level in &chain {
        let collected = collect_for_type(schema, level);
        for wildcard in collected.wildcards {
            if !wildcards.iter().any(|w| Arc::ptr_eq(w, &wildcard)) {
                wildcards.push(wildcard);
            }
        }
    }

    let mut iter = wildcards.into_iter();
    let mut result = iter.next()?.wildcard.clone();
    for next in iter {
        match result.intersect(&next.wildcard) {
            Some(intersection) => result = intersection,
            None => {
                diags.push(Diagnostic::new(format!(
                    "{}: anyAttribute intersection is not expressible",
                    prefix
                )));
                return None;
            }
        }
    }
    Some(result)
}

/// Check whether an attribute's type is ID or derived exclusively from it.
pub fn is_id_derived(schema: &XsdSchema, attr: &XsdAttribute) -> bool {
    let builtin = match (&attr.type_ref, &attr.inline_type) {
        (Some(type_ref), _) => simple_types::resolve_named_builtin(schema, type_ref),
        (None, Some(inline)) => simple_types::resolve_base_builtin(schema, inline),
        _ => None,
    };
    builtin.is_some_and(|bt| builtins::is_builtin_derived_from(bt, "ID"))
}

fn is_notation_derived(schema: &XsdSchema, attr: &XsdAttribute) -> bool {
    let builtin = match (&attr.type_ref, &attr.inline_type) {
        (Some(type_ref), _) => simple_types::resolve_named_builtin(schema, type_ref),
        (None, Some(inline)) => simple_types::resolve_base_builtin(schema, inline),
        _ => None,
    };
    builtin.is_some_and(|bt| builtins::is_builtin_derived_from(bt, "NOTATION"))
}

/// Validate a single attribute declaration or use.
pub fn validate_attribute(
    schema: &XsdSchema,
    attr: &XsdAttribute,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    if attr.use_mode == AttributeUse::Prohibited && attr.default.is_some() {
        diags.push(Diagnostic::new(format!(
            "{}: attribute '{}': use='prohibited' conflicts with a default value",
            prefix, attr.name.local_name
        )));
    }

    if attr.fixed.is_some() && attr.default.is_some() {
        diags.push(Diagnostic::new(format!(
            "{}: attribute '{}': fixed and default are mutually exclusive",
            prefix, attr.name.local_name
        )));
    }

    if attr.default.is_some() && attr.use_mode == AttributeUse::Required {
        diags.push(Diagnostic::new(format!(
            "{}: attribute '{}': a default value requires use='optional'",
            prefix, attr.name.local_name
        )));
    }

    if let Some(type_ref) = &attr.type_ref {
        if type_ref.namespace.as_deref() == Some(crate::XSD_NAMESPACE)
            && builtins::is_xsd11_builtin(&type_ref.local_name)
        {
            diags.push(Diagnostic::new(format!(
                "{}: attribute '{}': type '{}' is an XSD 1.1 type and is not supported",
                prefix, attr.name.local_name, type_ref.local_name
            )));
        }
    }

    if is_id_derived(schema, attr) && (attr.fixed.is_some() || attr.default.is_some()) {
        diags.push(Diagnostic::new(format!(
            "{}: attribute '{}': an attribute of type ID cannot declare a fixed or default value",
            prefix, attr.name.local_name
        )));
    }

    if is_notation_derived(schema, attr) {
        validate_notation_enumeration(schema, attr, prefix, diags);
    }

    if let Some(inline) = &attr.inline_type {
        validate_simple_type(schema, inline, diags);
    }
}

fn validate_notation_enumeration(
    schema: &XsdSchema,
    attr: &XsdAttribute,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let simple_type = match (&attr.type_ref, &attr.inline_type) {
        (Some(type_ref), _) => schema.lookup_simple_type(type_ref),
        (None, Some(inline)) => Some(inline.clone()),
        _ => None,
    };
    let Some(simple_type) = simple_type else {
        return;
    };
    let Some(values) = simple_type.enumeration_values() else {
        return;
    };

    for value in values {
        // Enumeration values name notations; prefixes were resolved by the
        // parser, so match on the local part
        let local = value.rsplit(':').next().unwrap_or(value);
        let declared = schema
            .notations
            .keys()
            .any(|qname| qname.local_name == local);
        if !declared {
            diags.push(Diagnostic::new(format!(
                "{}: attribute '{}': enumeration value '{}' does not reference a declared notation",
                prefix, attr.name.local_name, value
            )));
        }
    }
}

/// Report duplicate (namespace, local) pairs in one flattened collection.
pub fn check_attribute_uniqueness(
    collected: &CollectedAttributes,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let mut seen = std::collections::HashSet::new();
    for attr in &collected.attributes {
        if !seen.insert(attr.name.clone()) {
            diags.push(Diagnostic::new(format!(
                "{}: duplicate attribute '{}'",
                prefix, attr.name.local_name
            )));
        }
    }
}

/// Reject more than one effective attribute with an ID-derived type.
pub fn check_multiple_id_attributes(
    schema: &XsdSchema,
    uses: &IndexMap<QName, Arc<XsdAttribute>>,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let mut first: Option<&QName> = None;
    for (name, attr) in uses {
        if is_id_derived(schema, attr) {
            if let Some(existing) = first {
                diags.push(Diagnostic::new(format!(
                    "{}: attributes '{}' and '{}' both have ID-derived types; at most one is allowed",
                    prefix, existing.local_name, name.local_name
                )));
            } else {
                first = Some(name);
            }
        }
    }
}

/// Check the attribute-use rules of a restriction step.
pub fn check_attribute_restriction(
    schema: &XsdSchema,
    ct: &Arc<XsdComplexType>,
    base: &Arc<XsdComplexType>,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let base_uses = collect_effective_attribute_uses(schema, base);
    let mut sink = Vec::new();
    let base_wildcard = collapse_any_attributes(schema, base, prefix, &mut sink);

    let derived = collect_for_type(schema, ct);
    for attr in &derived.attributes {
        match base_uses.get(&attr.name) {
            Some(base_attr) => {
                check_use_restriction(schema, attr, base_attr, prefix, diags);
            }
            None => {
                if attr.use_mode == AttributeUse::Prohibited {
                    continue;
                }
                let matches_wildcard = base_wildcard
                    .as_ref()
                    .is_some_and(|w| w.matches(attr.name.namespace.as_deref()));
                if !matches_wildcard {
                    diags.push(Diagnostic::new(format!(
                        "{}: attribute '{}' has no corresponding attribute use in the base type",
                        prefix, attr.name.local_name
                    )));
                }
            }
        }
    }
}

fn check_use_restriction(
    schema: &XsdSchema,
    attr: &XsdAttribute,
    base_attr: &XsdAttribute,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    if base_attr.use_mode == AttributeUse::Required
        && attr.use_mode != AttributeUse::Required
    {
        diags.push(Diagnostic::new(format!(
            "{}: attribute '{}' is required in the base type and cannot become {}",
            prefix, attr.name.local_name, attr.use_mode
        )));
    }

    if let Some(base_fixed) = &base_attr.fixed {
        if attr.use_mode != AttributeUse::Prohibited {
            let matches = attr
                .fixed
                .as_ref()
                .is_some_and(|v| normalized_equal(v, base_fixed, fixed_white_space(schema, attr)));
            if !matches {
                diags.push(Diagnostic::new(format!(
                    "{}: attribute '{}': fixed value must match the base fixed value '{}'",
                    prefix, attr.name.local_name, base_fixed
                )));
            }
        }
    }

    if let (Some(derived_type), Some(base_type)) = (&attr.type_ref, &base_attr.type_ref) {
        if check_type_derivation(schema, derived_type, base_type) == DerivationCheck::NotDerived {
            diags.push(Diagnostic::new(format!(
                "{}: attribute '{}': type '{}' must be validly derived from the base attribute type '{}'",
                prefix, attr.name.local_name, derived_type.local_name, base_type.local_name
            )));
        }
    } else if let (Some(inline), Some(base_type)) = (&attr.inline_type, &base_attr.type_ref) {
        // An inline anonymous type restricts validly when its declared base
        // reaches the base attribute's type
        if let Some(inline_base) = &inline.base {
            if check_type_derivation(schema, inline_base, base_type) == DerivationCheck::NotDerived
            {
                diags.push(Diagnostic::new(format!(
                    "{}: attribute '{}': anonymous type must be validly derived from the base attribute type '{}'",
                    prefix, attr.name.local_name, base_type.local_name
                )));
            }
        }
    }
}

fn fixed_white_space(schema: &XsdSchema, attr: &XsdAttribute) -> super::facets::WhiteSpace {
    let builtin = match (&attr.type_ref, &attr.inline_type) {
        (Some(type_ref), _) => simple_types::resolve_named_builtin(schema, type_ref),
        (None, Some(inline)) => simple_types::resolve_base_builtin(schema, inline),
        _ => None,
    };
    builtin.map_or(super::facets::WhiteSpace::Collapse, |bt| bt.white_space)
}

/// Check the attribute-use rules of an extension step: every extension
/// attribute must introduce a name the base does not already use.
pub fn check_attribute_extension(
    schema: &XsdSchema,
    ct: &Arc<XsdComplexType>,
    base: &Arc<XsdComplexType>,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let base_uses = collect_effective_attribute_uses(schema, base);
    let derived = collect_for_type(schema, ct);

    for attr in &derived.attributes {
        if base_uses.contains_key(&attr.name) {
            diags.push(Diagnostic::new(format!(
                "{}: extension attribute '{}' is already declared in the base type",
                prefix, attr.name.local_name
            )));
        }
    }
}
