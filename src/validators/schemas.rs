//! Schema container, lookup helpers, and the structure-check driver
//!
//! The schema owns every global declaration in ordered maps. Lookups
//! return "not found" without raising - a missing referent belongs to the
//! resolver, and the validators skip their checks for it. The driver walks
//! the global declarations in source order (sweeping any map entries the
//! ordered list missed in sorted-QName order) and collects, never throws.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::Diagnostic;
use crate::names::is_valid_ncname;
use crate::namespaces::QName;

use super::attributes::{self, XsdAttribute, XsdAttributeGroup};
use super::builtins::{self, BuiltinType};
use super::complex_types::{self, XsdComplexType};
use super::elements::{check_substitution, XsdElement};
use super::groups::XsdGroup;
use super::identities::{self, ConstraintKind};
use super::models;
use super::particles;
use super::simple_types::{self, XsdSimpleType};

/// A resolved type: declared simple or complex, or an XSD built-in
#[derive(Debug, Clone)]
pub enum XsdType {
    /// Simple type definition
    Simple(Arc<XsdSimpleType>),
    /// Complex type definition
    Complex(Arc<XsdComplexType>),
    /// Built-in simple type
    Builtin(&'static BuiltinType),
}

/// XSD notation declaration
#[derive(Debug, Clone)]
pub struct XsdNotation {
    /// Notation name
    pub name: QName,
    /// System identifier
    pub system_id: Option<String>,
    /// Public identifier
    pub public_id: Option<String>,
}

impl XsdNotation {
    /// Create a notation with a system identifier
    pub fn with_system(name: QName, system_id: impl Into<String>) -> Self {
        Self {
            name,
            system_id: Some(system_id.into()),
            public_id: None,
        }
    }
}

/// Declaration kind of a global schema component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalKind {
    /// Simple or complex type
    Type,
    /// Element declaration
    Element,
    /// Attribute declaration
    Attribute,
    /// Named model group
    Group,
    /// Named attribute group
    AttributeGroup,
    /// Notation declaration
    Notation,
}

/// Form default for local declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormDefault {
    /// Local names are unqualified
    #[default]
    Unqualified,
    /// Local names are qualified by the target namespace
    Qualified,
}

/// Policy for `resolve_type_reference`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvePolicy {
    /// A missing referent is an error
    Strict,
    /// A missing referent yields None
    AllowMissing,
}

/// The schema root container
#[derive(Debug, Clone, Default)]
pub struct XsdSchema {
    /// Target namespace
    pub target_namespace: Option<String>,
    /// elementFormDefault
    pub element_form_default: FormDefault,
    /// attributeFormDefault
    pub attribute_form_default: FormDefault,
    /// Global type declarations
    pub types: IndexMap<QName, XsdType>,
    /// Global element declarations
    pub elements: IndexMap<QName, Arc<XsdElement>>,
    /// Global attribute declarations
    pub attributes: IndexMap<QName, Arc<XsdAttribute>>,
    /// Named model groups
    pub groups: IndexMap<QName, Arc<XsdGroup>>,
    /// Named attribute groups
    pub attribute_groups: IndexMap<QName, Arc<XsdAttributeGroup>>,
    /// Notation declarations
    pub notations: IndexMap<QName, XsdNotation>,
    /// Head QName to direct member QNames
    pub substitution_groups: IndexMap<QName, Vec<QName>>,
    /// Global declarations in schema-source order
    pub global_order: Vec<(GlobalKind, QName)>,
}

impl XsdSchema {
    /// Create an empty schema
    pub fn new(target_namespace: Option<&str>) -> Self {
        Self {
            target_namespace: target_namespace.map(String::from),
            ..Self::default()
        }
    }

    /// Add a global simple type
    pub fn add_simple_type(&mut self, name: QName, simple_type: XsdSimpleType) {
        self.types
            .insert(name.clone(), XsdType::Simple(Arc::new(simple_type)));
        self.global_order.push((GlobalKind::Type, name));
    }

    /// Add a global complex type
    pub fn add_complex_type(&mut self, name: QName, complex_type: Arc<XsdComplexType>) {
        self.types.insert(name.clone(), XsdType::Complex(complex_type));
        self.global_order.push((GlobalKind::Type, name));
    }

    /// Add a global element declaration
    pub fn add_element(&mut self, name: QName, element: XsdElement) {
        self.elements.insert(name.clone(), Arc::new(element));
        self.global_order.push((GlobalKind::Element, name));
    }

    /// Add a global attribute declaration
    pub fn add_attribute(&mut self, name: QName, attribute: XsdAttribute) {
        self.attributes.insert(name.clone(), Arc::new(attribute));
        self.global_order.push((GlobalKind::Attribute, name));
    }

    /// Add a named model group
    pub fn add_group(&mut self, name: QName, group: XsdGroup) {
        self.groups.insert(name.clone(), Arc::new(group));
        self.global_order.push((GlobalKind::Group, name));
    }

    /// Add a named attribute group
    pub fn add_attribute_group(&mut self, name: QName, group: XsdAttributeGroup) {
        self.attribute_groups.insert(name.clone(), Arc::new(group));
        self.global_order.push((GlobalKind::AttributeGroup, name));
    }

    /// Add a notation declaration
    pub fn add_notation(&mut self, name: QName) {
        self.notations
            .insert(name.clone(), XsdNotation::with_system(name.clone(), "urn:notation"));
        self.global_order.push((GlobalKind::Notation, name));
    }

    /// Look up a type by QName. Built-ins resolve independently of the
    /// declared types.
    pub fn lookup_type(&self, name: &QName) -> Option<XsdType> {
        if let Some(declared) = self.types.get(name) {
            return Some(declared.clone());
        }
        builtins::get_builtin_by_qname(name).map(XsdType::Builtin)
    }

    /// Look up a declared simple type by QName
    pub fn lookup_simple_type(&self, name: &QName) -> Option<Arc<XsdSimpleType>> {
        match self.types.get(name) {
            Some(XsdType::Simple(st)) => Some(st.clone()),
            _ => None,
        }
    }

    /// Look up a global element declaration
    pub fn lookup_element(&self, name: &QName) -> Option<Arc<XsdElement>> {
        self.elements.get(name).cloned()
    }

    /// Look up a global attribute declaration
    pub fn lookup_attribute(&self, name: &QName) -> Option<Arc<XsdAttribute>> {
        self.attributes.get(name).cloned()
    }

    /// Look up a named model group
    pub fn lookup_group(&self, name: &QName) -> Option<Arc<XsdGroup>> {
        self.groups.get(name).cloned()
    }

    /// Look up a named attribute group
    pub fn lookup_attribute_group(&self, name: &QName) -> Option<Arc<XsdAttributeGroup>> {
        self.attribute_groups.get(name).cloned()
    }

    /// Look up a notation declaration
    pub fn lookup_notation(&self, name: &QName) -> Option<&XsdNotation> {
        self.notations.get(name)
    }

    /// Direct members of a substitution group head
    pub fn substitution_members(&self, head: &QName) -> Option<&[QName]> {
        self.substitution_groups.get(head).map(|v| v.as_slice())
    }

    /// The QName an attribute use effectively binds, following references
    /// to the referenced declaration's name.
    pub fn effective_attribute_qname(&self, attr: &XsdAttribute) -> QName {
        if attr.is_reference {
            if let Some(referent) = self.lookup_attribute(&attr.name) {
                return referent.name.clone();
            }
        }
        attr.name.clone()
    }

    /// Resolve a type reference under a policy.
    pub fn resolve_type_reference(
        &self,
        name: &QName,
        policy: ResolvePolicy,
    ) -> Result<Option<XsdType>, Diagnostic> {
        match self.lookup_type(name) {
            Some(resolved) => Ok(Some(resolved)),
            None => match policy {
                ResolvePolicy::AllowMissing => Ok(None),
                ResolvePolicy::Strict => Err(Diagnostic::new(format!(
                    "unresolved type reference '{}'",
                    name
                ))),
            },
        }
    }

    /// Find an identity constraint by qualified name anywhere in the
    /// schema. Identity constraints share one schema-wide symbol space.
    pub fn lookup_identity_constraint(&self, name: &QName) -> Option<ConstraintKind> {
        let matches = |constraint: &super::identities::XsdIdentityConstraint| {
            constraint.name == name.local_name
                && self.target_namespace.as_deref() == name.namespace.as_deref()
        };

        for element in self.elements.values() {
            for constraint in &element.constraints {
                if matches(constraint) {
                    return Some(constraint.kind);
                }
            }
        }
        // Local elements declare constraints too; walk the content trees
        for declared in self.types.values() {
            if let XsdType::Complex(ct) = declared {
                if let Some(group) = ct.content_particle() {
                    let mut decls = Vec::new();
                    super::groups::collect_element_decls(self, group, &mut decls);
                    for decl in decls {
                        for constraint in &decl.constraints {
                            if matches(constraint) {
                                return Some(constraint.kind);
                            }
                        }
                    }
                }
            }
        }
        for group in self.groups.values() {
            let mut decls = Vec::new();
            super::groups::collect_element_decls(self, group, &mut decls);
            for decl in decls {
                for constraint in &decl.constraints {
                    if matches(constraint) {
                        return Some(constraint.kind);
                    }
                }
            }
        }
        None
    }
}

/// Validate the static structure of a schema, returning every diagnostic
/// in deterministic order. A missing schema yields exactly one diagnostic.
pub fn validate_structure(schema: Option<&XsdSchema>) -> Vec<Diagnostic> {
    let Some(schema) = schema else {
        return vec![Diagnostic::new("no schema")];
    };

    let mut diags = Vec::new();
    let mut seen: HashSet<(GlobalKind, QName)> = HashSet::new();

    for (kind, name) in &schema.global_order {
        if seen.insert((*kind, name.clone())) {
            validate_global(schema, *kind, name, &mut diags);
        }
    }

    // Map entries the ordered list missed are swept in sorted-QName order
    // so diagnostics stay deterministic
    sweep_remaining(schema, GlobalKind::Type, schema.types.keys(), &mut seen, &mut diags);
    sweep_remaining(schema, GlobalKind::Element, schema.elements.keys(), &mut seen, &mut diags);
    sweep_remaining(schema, GlobalKind::Attribute, schema.attributes.keys(), &mut seen, &mut diags);
    sweep_remaining(schema, GlobalKind::Group, schema.groups.keys(), &mut seen, &mut diags);
    sweep_remaining(
        schema,
        GlobalKind::AttributeGroup,
        schema.attribute_groups.keys(),
        &mut seen,
        &mut diags,
    );
    sweep_remaining(schema, GlobalKind::Notation, schema.notations.keys(), &mut seen, &mut diags);

    diags
}

fn sweep_remaining<'a>(
    schema: &XsdSchema,
    kind: GlobalKind,
    names: impl Iterator<Item = &'a QName>,
    seen: &mut HashSet<(GlobalKind, QName)>,
    diags: &mut Vec<Diagnostic>,
) {
    let mut remaining: Vec<&QName> = names
        .filter(|name| !seen.contains(&(kind, (*name).clone())))
        .collect();
    remaining.sort();
    for name in remaining {
        seen.insert((kind, name.clone()));
        validate_global(schema, kind, name, diags);
    }
}

fn validate_global(schema: &XsdSchema, kind: GlobalKind, name: &QName, diags: &mut Vec<Diagnostic>) {
    match kind {
        GlobalKind::Type => match schema.types.get(name) {
            Some(XsdType::Simple(st)) => simple_types::validate_simple_type(schema, st, diags),
            Some(XsdType::Complex(ct)) => {
                complex_types::validate_complex_type(schema, ct, diags)
            }
            _ => {}
        },
        GlobalKind::Element => {
            if let Some(element) = schema.elements.get(name) {
                validate_global_element(schema, element, diags);
            }
        }
        GlobalKind::Attribute => {
            if let Some(attr) = schema.attributes.get(name) {
                let prefix = format!("attribute {}", name.local_name);
                attributes::validate_attribute(schema, attr, &prefix, diags);
            }
        }
        GlobalKind::Group => {
            if let Some(group) = schema.groups.get(name) {
                let prefix = format!("group {}", name.local_name);
                particles::validate_particle_tree(schema, group, false, &prefix, diags);
                particles::check_element_declarations_consistent(schema, group, &prefix, diags);
                models::check_unique_particle_attribution(schema, group, &prefix, diags);
            }
        }
        GlobalKind::AttributeGroup => {
            if let Some(group) = schema.attribute_groups.get(name) {
                let prefix = format!("attributeGroup {}", name.local_name);
                let collected = attributes::collect_all_attributes(
                    schema,
                    &group.attributes,
                    &group.attribute_groups,
                    group.any_attribute.as_ref(),
                );
                for attr in &collected.attributes {
                    attributes::validate_attribute(schema, attr, &prefix, diags);
                }
                attributes::check_attribute_uniqueness(&collected, &prefix, diags);
            }
        }
        GlobalKind::Notation => {
            if let Some(notation) = schema.notations.get(name) {
                let prefix = format!("notation {}", name.local_name);
                if !is_valid_ncname(&notation.name.local_name) {
                    diags.push(Diagnostic::new(format!(
                        "{}: name must be a valid NCName",
                        prefix
                    )));
                }
                if notation.system_id.is_none() && notation.public_id.is_none() {
                    diags.push(Diagnostic::new(format!(
                        "{}: a notation must declare a system or public identifier",
                        prefix
                    )));
                }
            }
        }
    }
}

fn validate_global_element(schema: &XsdSchema, element: &Arc<XsdElement>, diags: &mut Vec<Diagnostic>) {
    let prefix = format!("element {}", element.name.local_name);

    if element.fixed.is_some() && element.default.is_some() {
        diags.push(Diagnostic::new(format!(
            "{}: fixed and default are mutually exclusive",
            prefix
        )));
    }

    identities::validate_identity_constraints(schema, element, &prefix, diags);

    match &element.inline_type {
        Some(XsdType::Simple(st)) => simple_types::validate_simple_type(schema, st, diags),
        Some(XsdType::Complex(ct)) => complex_types::validate_complex_type(schema, ct, diags),
        _ => {}
    }

    if let Some(head_name) = &element.substitution_group {
        // An unresolved head is the resolver's concern
        if let Some(head) = schema.lookup_element(head_name) {
            if let Err(err) = check_substitution(schema, &head, element) {
                diags.push(Diagnostic::new(format!("{}: {}", prefix, err)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::groups::ModelType;
    use crate::validators::particles::Occurs;

    fn named(local: &str) -> QName {
        QName::namespaced("http://example.com", local)
    }

    #[test]
    fn test_no_schema_diagnostic() {
        let diags = validate_structure(None);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "no schema");
    }

    #[test]
    fn test_empty_schema_is_valid() {
        let schema = XsdSchema::new(None);
        assert!(validate_structure(Some(&schema)).is_empty());
    }

    #[test]
    fn test_lookup_failure_returns_none() {
        let schema = XsdSchema::new(None);
        assert!(schema.lookup_type(&named("Missing")).is_none());
        assert!(schema.lookup_element(&named("Missing")).is_none());
        assert!(schema.lookup_group(&named("Missing")).is_none());
    }

    #[test]
    fn test_builtins_resolve_independently() {
        let schema = XsdSchema::new(None);
        let name = QName::namespaced(crate::XSD_NAMESPACE, "int");
        assert!(matches!(
            schema.lookup_type(&name),
            Some(XsdType::Builtin(bt)) if bt.name == "int"
        ));
    }

    #[test]
    fn test_resolve_type_reference_policies() {
        let schema = XsdSchema::new(None);
        let missing = named("Missing");

        assert!(matches!(
            schema.resolve_type_reference(&missing, ResolvePolicy::AllowMissing),
            Ok(None)
        ));
        assert!(schema
            .resolve_type_reference(&missing, ResolvePolicy::Strict)
            .is_err());
    }

    #[test]
    fn test_driver_sweeps_unlisted_entries_in_sorted_order() {
        let mut schema = XsdSchema::new(Some("http://example.com"));

        // Insert types without registering them in global_order, out of
        // alphabetical order; both carry the same violation
        let make_bad = |name: &str| {
            let mut group = XsdGroup::new(ModelType::Choice);
            group.add_element(XsdElement::local(QName::local("x"), Occurs::once()));
            group.add_element(XsdElement::local(QName::local("x"), Occurs::once()));
            Arc::new(XsdComplexType::element_only(Some(named(name)), group))
        };
        schema
            .types
            .insert(named("Zeta"), XsdType::Complex(make_bad("Zeta")));
        schema
            .types
            .insert(named("Alpha"), XsdType::Complex(make_bad("Alpha")));

        let diags = validate_structure(Some(&schema));
        let order: Vec<bool> = diags
            .iter()
            .map(|d| d.message.starts_with("type Alpha"))
            .collect();
        assert_eq!(order, vec![true, false], "diags: {:?}", diags);
    }

    #[test]
    fn test_determinism_two_runs_identical() {
        let mut schema = XsdSchema::new(Some("http://example.com"));
        let mut group = XsdGroup::new(ModelType::Choice);
        group.add_element(XsdElement::local(QName::local("a"), Occurs::once()));
        group.add_element(XsdElement::local(QName::local("a"), Occurs::once()));
        let ct = Arc::new(XsdComplexType::element_only(Some(named("T")), group));
        schema.add_complex_type(named("T"), ct);

        let first = validate_structure(Some(&schema));
        let second = validate_structure(Some(&schema));
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_substitution_checked_for_global_elements() {
        let mut schema = XsdSchema::new(Some("http://example.com"));
        let head_name = named("head");
        let member_name = named("member");

        let mut head = XsdElement::global(head_name.clone());
        head.block = crate::validators::helpers::DerivationSet::from_attr("substitution");
        schema.add_element(head_name.clone(), head);

        let mut member = XsdElement::global(member_name.clone());
        member.substitution_group = Some(head_name.clone());
        schema.add_element(member_name.clone(), member);

        schema
            .substitution_groups
            .insert(head_name, vec![member_name]);

        let diags = validate_structure(Some(&schema));
        assert!(diags
            .iter()
            .any(|d| d.message.contains("blocks substitution")));
    }
}
