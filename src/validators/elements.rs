//! XSD element declarations and substitution groups
//!
//! Element declarations double as particles: a declaration carries its own
//! occurrence bounds, and global declarations additionally head substitution
//! groups. The substitution-group derivation helper lives here because its
//! blocking rules hang off the head element and its type.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#cElement_Declarations

use crate::namespaces::QName;

use super::helpers::{Derivation, DerivationSet};
use super::identities::XsdIdentityConstraint;
use super::particles::Occurs;
use super::schemas::{XsdSchema, XsdType};
use super::visits::VisitTracker;

/// XSD element declaration
#[derive(Debug, Clone)]
pub struct XsdElement {
    /// Element name
    pub name: QName,
    /// Occurrence constraints (meaningful for particles, not globals)
    pub occurs: Occurs,
    /// Declared type reference
    pub type_ref: Option<QName>,
    /// Inline anonymous type, owned by this declaration
    pub inline_type: Option<XsdType>,
    /// Whether xsi:nil is permitted on instances
    pub nillable: bool,
    /// Fixed value constraint
    pub fixed: Option<String>,
    /// Default value constraint
    pub default: Option<String>,
    /// Blocked substitution/derivation methods
    pub block: DerivationSet,
    /// Finalized derivation methods (globals only)
    pub final_set: DerivationSet,
    /// Whether this particle is a reference to a global declaration
    pub is_reference: bool,
    /// Whether the element is abstract
    pub is_abstract: bool,
    /// Head of the substitution group this element belongs to
    pub substitution_group: Option<QName>,
    /// Identity constraints declared on this element
    pub constraints: Vec<XsdIdentityConstraint>,
}

impl XsdElement {
    /// Create a local element declaration
    pub fn local(name: QName, occurs: Occurs) -> Self {
        Self {
            name,
            occurs,
            type_ref: None,
            inline_type: None,
            nillable: false,
            fixed: None,
            default: None,
            block: DerivationSet::none(),
            final_set: DerivationSet::none(),
            is_reference: false,
            is_abstract: false,
            substitution_group: None,
            constraints: Vec::new(),
        }
    }

    /// Create a global element declaration
    pub fn global(name: QName) -> Self {
        Self::local(name, Occurs::once())
    }

    /// Create a reference particle to a global declaration
    pub fn reference(name: QName, occurs: Occurs) -> Self {
        Self {
            is_reference: true,
            ..Self::local(name, occurs)
        }
    }

    /// Set the declared type reference
    pub fn with_type(mut self, type_ref: QName) -> Self {
        self.type_ref = Some(type_ref);
        self
    }

    /// Set an inline anonymous type
    pub fn with_inline_type(mut self, inline: XsdType) -> Self {
        self.inline_type = Some(inline);
        self
    }

    /// Set a fixed value
    pub fn with_fixed(mut self, value: impl Into<String>) -> Self {
        self.fixed = Some(value.into());
        self
    }

    /// Add an identity constraint
    pub fn with_constraint(mut self, constraint: XsdIdentityConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// Check whether `member_name` is reachable from `head_name` through the
/// substitution-group graph, cycle-safe.
pub fn is_substitution_member(schema: &XsdSchema, head_name: &QName, member_name: &QName) -> bool {
    let mut tracker = VisitTracker::new();
    let mut queue = vec![head_name.clone()];
    while let Some(current) = queue.pop() {
        if !tracker.enter(current.clone()) {
            continue;
        }
        if let Some(members) = schema.substitution_members(&current) {
            for member in members {
                if member == member_name {
                    return true;
                }
                queue.push(member.clone());
            }
        }
    }
    false
}

/// Outcome of a derivation-step walk between two type names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivationSteps {
    /// The target was reached; the methods of each step, outermost first
    Found(Vec<Derivation>),
    /// The walk ended without reaching the target
    NotFound,
    /// A type reference did not resolve; the check must be skipped
    Unresolved,
}

/// Walk derivation links from `from` toward `to`, collecting the method of
/// each step. Builtin chains count as restriction steps.
pub fn derivation_steps(schema: &XsdSchema, from: &QName, to: &QName) -> DerivationSteps {
    let mut steps = Vec::new();
    let mut tracker = VisitTracker::new();
    let mut current = from.clone();

    loop {
        if current == *to {
            return DerivationSteps::Found(steps);
        }
        if !tracker.enter(current.clone()) {
            return DerivationSteps::NotFound;
        }

        match schema.lookup_type(&current) {
            Some(XsdType::Complex(ct)) => match &ct.base_type {
                Some(base) => {
                    let method = match ct.derivation {
                        Some(super::complex_types::DerivationMethod::Extension) => {
                            Derivation::Extension
                        }
                        _ => Derivation::Restriction,
                    };
                    steps.push(method);
                    current = base.clone();
                }
                None => return DerivationSteps::NotFound,
            },
            Some(XsdType::Simple(st)) => {
                use super::simple_types::TypeRef;
                let named_member = st.member_types.iter().find_map(|m| match m {
                    TypeRef::Named(name) => Some(name),
                    TypeRef::Inline(_) => None,
                });
                if let Some(base) = &st.base {
                    steps.push(Derivation::Restriction);
                    current = base.clone();
                } else if let Some(TypeRef::Named(item)) = &st.item_type {
                    steps.push(Derivation::List);
                    current = item.clone();
                } else if let Some(member) = named_member {
                    // A union reaches its target through any named member;
                    // the first is enough for blocking purposes
                    steps.push(Derivation::Union);
                    current = member.clone();
                } else {
                    return DerivationSteps::NotFound;
                }
            }
            Some(XsdType::Builtin(bt)) => match bt.base {
                Some(base) => {
                    steps.push(Derivation::Restriction);
                    current = QName::namespaced(crate::XSD_NAMESPACE, base);
                }
                None => return DerivationSteps::NotFound,
            },
            None => return DerivationSteps::Unresolved,
        }
    }
}

/// Check whether `member` may substitute for `head`.
///
/// Rejections: the head blocks substitution outright; the member is not in
/// the head's (transitive) substitution group; a derivation step between the
/// member's type and the head's type is blocked by the head or its type; or
/// the member's type is not validly derived from the head's type at all.
/// Unresolved type references skip the type-level checks.
pub fn check_substitution(
    schema: &XsdSchema,
    head: &XsdElement,
    member: &XsdElement,
) -> Result<(), String> {
    if head.block.contains(Derivation::Substitution) {
        return Err(format!(
            "element '{}' blocks substitution",
            head.name
        ));
    }

    if !is_substitution_member(schema, &head.name, &member.name) {
        return Err(format!(
            "element '{}' is not in the substitution group of '{}'",
            member.name, head.name
        ));
    }

    let (head_type, member_type) = match (&head.type_ref, &member.type_ref) {
        (Some(h), Some(m)) => (h, m),
        // Unresolved or inline types defer to the resolver
        _ => return Ok(()),
    };

    // The blocking set combines the head element's block and final sets
    // with its type's block
    let mut blocked = head.block.union_with(&head.final_set);
    if let Some(XsdType::Complex(ct)) = schema.lookup_type(head_type) {
        blocked = blocked.union_with(&ct.block);
    }

    match derivation_steps(schema, member_type, head_type) {
        DerivationSteps::Found(steps) => {
            for step in steps {
                if blocked.contains(step) {
                    return Err(format!(
                        "substitution of '{}' by '{}' is blocked for {}",
                        head.name, member.name, step
                    ));
                }
            }
            Ok(())
        }
        DerivationSteps::NotFound => Err(format!(
            "type of element '{}' is not validly derived from the type of '{}'",
            member.name, head.name
        )),
        DerivationSteps::Unresolved => Ok(()),
    }
}
