//! XSD particle occurrence model and particle-structure validation
//!
//! Particles define occurrence constraints (minOccurs, maxOccurs) for
//! content-model components. This module holds the `Occurs` value type, the
//! saturating occurrence arithmetic used for effective-range computation,
//! and the structural checks every particle tree must pass: occurs sanity,
//! `all`-group constraints, element references, inline types, and the
//! Element Declarations Consistent rule.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#cParticles

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Diagnostic;
use crate::namespaces::QName;

use super::groups::{ModelType, XsdGroup, XsdParticle};
use super::schemas::XsdSchema;

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max_occurs means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self {
            min: 1,
            max: Some(1),
        }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self {
            min: 0,
            max: Some(1),
        }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// One or more (1, unbounded)
    pub fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Empty (0, 0)
    pub fn empty() -> Self {
        Self {
            min: 0,
            max: Some(0),
        }
    }

    /// Check if this particle can be empty (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if this particle is empty (maxOccurs == 0)
    pub fn is_empty(&self) -> bool {
        self.max == Some(0)
    }

    /// Check if particle has maxOccurs == 1
    pub fn is_single(&self) -> bool {
        self.max == Some(1)
    }

    /// Check if particle can have multiple occurrences
    pub fn is_multiple(&self) -> bool {
        !self.is_empty() && !self.is_single()
    }

    /// Check if this particle has valid occurs restriction compared to another
    pub fn has_occurs_restriction(&self, other: &Occurs) -> bool {
        // Self must have >= min_occurs than other
        if self.min < other.min {
            return false;
        }

        // If self is empty, it's always a valid restriction
        if self.max == Some(0) {
            return true;
        }

        // If other is unbounded, self can be anything
        if other.max.is_none() {
            return true;
        }

        // If self is unbounded but other isn't, not a valid restriction
        if self.max.is_none() {
            return false;
        }

        // Both have bounds - self must have <= max_occurs
        self.max.unwrap() <= other.max.unwrap()
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

/// Helper for calculating combined min/max occurs for model groups.
///
/// All arithmetic saturates and records overflow; the particle validator
/// reports an overflowed calculation as its own diagnostic instead of
/// silently wrapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct OccursCalculator {
    /// Calculated minimum occurrences
    pub min_occurs: u32,
    /// Calculated maximum occurrences (None = unbounded)
    pub max_occurs: Option<u32>,
    /// Whether any operation exceeded the u32 range
    pub overflowed: bool,
}

impl OccursCalculator {
    /// Create a new calculator initialized to (0, 0)
    pub fn new() -> Self {
        Self {
            min_occurs: 0,
            max_occurs: Some(0),
            overflowed: false,
        }
    }

    /// Get as Occurs
    pub fn occurs(&self) -> Occurs {
        Occurs::new(self.min_occurs, self.max_occurs)
    }

    fn sat_add(&mut self, a: u32, b: u32) -> u32 {
        match a.checked_add(b) {
            Some(v) => v,
            None => {
                self.overflowed = true;
                u32::MAX
            }
        }
    }

    fn sat_mul(&mut self, a: u32, b: u32) -> u32 {
        match a.checked_mul(b) {
            Some(v) => v,
            None => {
                self.overflowed = true;
                u32::MAX
            }
        }
    }

    /// Add another particle's occurs (for sequence/all)
    pub fn add(&mut self, other: Occurs) {
        self.min_occurs = self.sat_add(self.min_occurs, other.min);
        match (self.max_occurs, other.max) {
            (Some(a), Some(b)) => self.max_occurs = Some(self.sat_add(a, b)),
            _ => self.max_occurs = None,
        }
    }

    /// Take the max of this and another (for choice)
    pub fn max_with(&mut self, other: Occurs) {
        // For choice: min is the min of all branches, max is unbounded if any is
        self.min_occurs = self.min_occurs.min(other.min);
        match (self.max_occurs, other.max) {
            (None, _) | (_, None) => self.max_occurs = None,
            (Some(a), Some(b)) => self.max_occurs = Some(a.max(b)),
        }
    }

    /// Multiply by another particle's occurs (for the enclosing group)
    pub fn multiply(&mut self, other: Occurs) {
        self.min_occurs = self.sat_mul(self.min_occurs, other.min);
        match (self.max_occurs, other.max) {
            (Some(0), _) => self.max_occurs = Some(0),
            (None, Some(0)) => self.max_occurs = Some(0),
            (Some(_), None) => self.max_occurs = None,
            (None, _) => {}
            (Some(a), Some(b)) => self.max_occurs = Some(self.sat_mul(a, b)),
        }
    }
}

/// Validate occurrence bounds of a single particle.
pub fn validate_occurs(occurs: &Occurs, prefix: &str, diags: &mut Vec<Diagnostic>) {
    if let Some(max) = occurs.max {
        if max == 0 && occurs.min > 0 {
            diags.push(Diagnostic::new(format!(
                "{}: maxOccurs cannot be 0 when minOccurs > 0",
                prefix
            )));
        } else if max != 0 && max < occurs.min {
            diags.push(Diagnostic::new(format!(
                "{}: maxOccurs ({}) must be >= minOccurs ({})",
                prefix, max, occurs.min
            )));
        }
    }
}

/// Recursively validate the structure of a particle tree.
///
/// `nested` is true when `group` sits inside another compositor, which is
/// what makes a nested `all` group illegal.
pub fn validate_particle_tree(
    schema: &XsdSchema,
    group: &XsdGroup,
    nested: bool,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    validate_occurs(&group.occurs, prefix, diags);

    if group.model == ModelType::All {
        validate_all_group(group, nested, prefix, diags);
    }

    // Saturating effective-occurs computation surfaces u32 overflow
    let mut calc = OccursCalculator::new();
    let mut first = true;
    for particle in &group.particles {
        let occurs = particle.occurs();
        match group.model {
            ModelType::Sequence | ModelType::All => calc.add(occurs),
            ModelType::Choice => {
                if first {
                    calc.add(occurs);
                    first = false;
                } else {
                    calc.max_with(occurs);
                }
            }
        }
    }
    calc.multiply(group.occurs);
    if calc.overflowed {
        diags.push(Diagnostic::new(format!(
            "{}: occurrence value exceeds uint32",
            prefix
        )));
    }

    for particle in &group.particles {
        match particle {
            XsdParticle::Element(elem) => {
                validate_occurs(&elem.occurs, prefix, diags);
                if elem.is_reference {
                    // A missing referent is the resolver's diagnostic, not ours
                    if let Some(referent) = schema.lookup_element(&elem.name) {
                        if referent.type_ref.is_none() && referent.inline_type.is_none() {
                            diags.push(Diagnostic::new(format!(
                                "{}: referenced element '{}' has no type",
                                prefix, elem.name
                            )));
                        }
                    }
                } else {
                    super::identities::validate_identity_constraints(schema, elem, prefix, diags);
                    match &elem.inline_type {
                        Some(super::schemas::XsdType::Simple(st)) => {
                            super::simple_types::validate_simple_type(schema, st, diags);
                        }
                        Some(super::schemas::XsdType::Complex(ct)) => {
                            super::complex_types::validate_complex_type(schema, ct, diags);
                        }
                        _ => {}
                    }
                }
            }
            XsdParticle::Any(any) => {
                validate_occurs(&any.occurs, prefix, diags);
            }
            XsdParticle::Group(inner) => {
                if inner.group_ref.is_some() {
                    // Named groups are validated as globals; only the
                    // reference occurs needs checking here
                    validate_occurs(&inner.occurs, prefix, diags);
                } else {
                    validate_particle_tree(schema, inner, true, prefix, diags);
                }
            }
        }
    }
}

fn validate_all_group(group: &XsdGroup, nested: bool, prefix: &str, diags: &mut Vec<Diagnostic>) {
    if nested {
        diags.push(Diagnostic::new(format!(
            "{}: an 'all' group cannot be nested inside another model group",
            prefix
        )));
    }
    if group.occurs.min > 1 {
        diags.push(Diagnostic::new(format!(
            "{}: minOccurs of an 'all' group must be 0 or 1",
            prefix
        )));
    }
    if group.occurs.max != Some(1) {
        diags.push(Diagnostic::new(format!(
            "{}: maxOccurs of an 'all' group must be 1",
            prefix
        )));
    }

    let mut seen = std::collections::HashSet::new();
    for particle in &group.particles {
        match particle {
            XsdParticle::Element(elem) => {
                if let Some(max) = elem.occurs.max {
                    if max > 1 {
                        diags.push(Diagnostic::new(format!(
                            "{}: element '{}' in an 'all' group must have maxOccurs <= 1",
                            prefix, elem.name
                        )));
                    }
                } else {
                    diags.push(Diagnostic::new(format!(
                        "{}: element '{}' in an 'all' group must have maxOccurs <= 1",
                        prefix, elem.name
                    )));
                }
                if !seen.insert(elem.name.clone()) {
                    diags.push(Diagnostic::new(format!(
                        "{}: duplicate element '{}' in 'all' group",
                        prefix, elem.name
                    )));
                }
            }
            _ => {
                diags.push(Diagnostic::new(format!(
                    "{}: an 'all' group may contain only element declarations",
                    prefix
                )));
            }
        }
    }
}

/// How an element particle binds to its type, for the Element Declarations
/// Consistent rule. Named references compare by QName; anonymous inline
/// types must be pointer-identical.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TypeBinding {
    Named(QName),
    Inline(usize),
    Untyped,
}

fn type_binding(schema: &XsdSchema, elem: &Arc<super::elements::XsdElement>) -> TypeBinding {
    if elem.is_reference {
        return match schema.lookup_element(&elem.name) {
            Some(referent) => type_binding_of_decl(&referent),
            None => TypeBinding::Untyped,
        };
    }
    type_binding_of_decl(elem)
}

fn type_binding_of_decl(decl: &super::elements::XsdElement) -> TypeBinding {
    if let Some(type_ref) = &decl.type_ref {
        TypeBinding::Named(type_ref.clone())
    } else if let Some(inline) = &decl.inline_type {
        match inline {
            super::schemas::XsdType::Simple(st) => TypeBinding::Inline(Arc::as_ptr(st) as usize),
            super::schemas::XsdType::Complex(ct) => TypeBinding::Inline(Arc::as_ptr(ct) as usize),
            super::schemas::XsdType::Builtin(bt) => {
                TypeBinding::Inline(*bt as *const _ as usize)
            }
        }
    } else {
        TypeBinding::Untyped
    }
}

/// Enforce Element Declarations Consistent: every occurrence of a QName in
/// one particle tree must bind to the same type.
pub fn check_element_declarations_consistent(
    schema: &XsdSchema,
    group: &XsdGroup,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let mut bindings: HashMap<QName, TypeBinding> = HashMap::new();
    let mut tracker = super::visits::VisitTracker::new();
    collect_bindings(schema, group, &mut bindings, &mut tracker, prefix, diags);
}

fn collect_bindings(
    schema: &XsdSchema,
    group: &XsdGroup,
    bindings: &mut HashMap<QName, TypeBinding>,
    tracker: &mut super::visits::VisitTracker<QName>,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    for particle in &group.particles {
        match particle {
            XsdParticle::Element(elem) => {
                let binding = type_binding(schema, elem);
                if binding == TypeBinding::Untyped {
                    continue;
                }
                match bindings.get(&elem.name) {
                    Some(existing) if *existing != binding => {
                        diags.push(Diagnostic::new(format!(
                            "{}: inconsistent declarations for element '{}': all uses of a name must have the same type",
                            prefix, elem.name
                        )));
                    }
                    Some(_) => {}
                    None => {
                        bindings.insert(elem.name.clone(), binding);
                    }
                }
            }
            XsdParticle::Any(_) => {}
            XsdParticle::Group(inner) => {
                if let Some(ref_name) = &inner.group_ref {
                    if tracker.enter(ref_name.clone()) {
                        if let Some(referent) = schema.lookup_group(ref_name) {
                            collect_bindings(schema, &referent, bindings, tracker, prefix, diags);
                        }
                    }
                } else {
                    collect_bindings(schema, inner, bindings, tracker, prefix, diags);
                }
            }
        }
    }
}
