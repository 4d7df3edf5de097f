//! XSD model groups
//!
//! This module implements model groups for XSD content models:
//! - xs:sequence - ordered content
//! - xs:choice - alternative content
//! - xs:all - unordered content (elements only in XSD 1.0)
//!
//! plus the particle sum type, pointless-group normalization, and named
//! group-reference expansion used by the derivation and UPA checks.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#Model_Groups

use std::sync::Arc;

use crate::namespaces::QName;

use super::elements::XsdElement;
use super::particles::Occurs;
use super::schemas::XsdSchema;
use super::visits::VisitTracker;
use super::wildcards::XsdAnyElement;

/// Model group compositor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelType {
    /// Ordered sequence of particles
    #[default]
    Sequence,
    /// One of multiple alternatives
    Choice,
    /// Unordered set of particles
    All,
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence"),
            Self::Choice => write!(f, "choice"),
            Self::All => write!(f, "all"),
        }
    }
}

/// A particle in a content model (element, wildcard, or nested group)
#[derive(Debug, Clone)]
pub enum XsdParticle {
    /// Element declaration or reference
    Element(Arc<XsdElement>),
    /// Wildcard (xs:any)
    Any(Arc<XsdAnyElement>),
    /// Nested model group or named group reference
    Group(Arc<XsdGroup>),
}

impl XsdParticle {
    /// Get the occurrence constraints
    pub fn occurs(&self) -> Occurs {
        match self {
            Self::Element(e) => e.occurs,
            Self::Any(a) => a.occurs,
            Self::Group(g) => g.occurs,
        }
    }

    /// Check if this particle is emptiable
    pub fn is_emptiable(&self) -> bool {
        match self {
            Self::Element(e) => e.occurs.is_emptiable(),
            Self::Any(a) => a.occurs.is_emptiable(),
            Self::Group(g) => g.is_emptiable(),
        }
    }

    /// Get effective minimum occurs
    pub fn effective_min_occurs(&self) -> u32 {
        match self {
            Self::Element(e) => e.occurs.min,
            Self::Any(a) => a.occurs.min,
            Self::Group(g) => g.effective_min_occurs(),
        }
    }

    /// Get effective maximum occurs (None = unbounded)
    pub fn effective_max_occurs(&self) -> Option<u32> {
        match self {
            Self::Element(e) => e.occurs.max,
            Self::Any(a) => a.occurs.max,
            Self::Group(g) => g.effective_max_occurs(),
        }
    }
}

/// XSD model group (sequence, choice, all)
#[derive(Debug, Clone)]
pub struct XsdGroup {
    /// Optional name for named model groups
    pub name: Option<QName>,
    /// Model type (sequence, choice, all)
    pub model: ModelType,
    /// Particles in this group
    pub particles: Vec<XsdParticle>,
    /// Occurrence constraints
    pub occurs: Occurs,
    /// Reference to a named group (for xs:group ref="...")
    pub group_ref: Option<QName>,
}

impl XsdGroup {
    /// Create a new model group
    pub fn new(model: ModelType) -> Self {
        Self {
            name: None,
            model,
            particles: Vec::new(),
            occurs: Occurs::once(),
            group_ref: None,
        }
    }

    /// Create a named model group
    pub fn named(name: QName, model: ModelType) -> Self {
        Self {
            name: Some(name),
            ..Self::new(model)
        }
    }

    /// Create a group reference
    pub fn reference(ref_name: QName, occurs: Occurs) -> Self {
        Self {
            name: None,
            model: ModelType::Sequence, // resolved from the referenced group
            particles: Vec::new(),
            occurs,
            group_ref: Some(ref_name),
        }
    }

    /// Add a particle to the group
    pub fn add_particle(&mut self, particle: XsdParticle) {
        self.particles.push(particle);
    }

    /// Add an element particle
    pub fn add_element(&mut self, element: XsdElement) {
        self.particles.push(XsdParticle::Element(Arc::new(element)));
    }

    /// Add a wildcard particle
    pub fn add_any(&mut self, any: XsdAnyElement) {
        self.particles.push(XsdParticle::Any(Arc::new(any)));
    }

    /// Add a nested group
    pub fn add_group(&mut self, group: XsdGroup) {
        self.particles.push(XsdParticle::Group(Arc::new(group)));
    }

    /// Check if group has no particles
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Number of direct particles
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Iterate over direct particles
    pub fn iter(&self) -> impl Iterator<Item = &XsdParticle> {
        self.particles.iter()
    }

    /// Check if the group can match empty content
    pub fn is_emptiable(&self) -> bool {
        if self.occurs.min == 0 || self.particles.is_empty() {
            return true;
        }

        match self.model {
            // Choice is emptiable if any branch is emptiable
            ModelType::Choice => self.particles.iter().any(|p| p.is_emptiable()),
            // Sequence/All is emptiable only if all particles are emptiable
            ModelType::Sequence | ModelType::All => {
                self.particles.iter().all(|p| p.is_emptiable())
            }
        }
    }

    /// Calculate effective minimum occurs across the nested structure
    pub fn effective_min_occurs(&self) -> u32 {
        if self.occurs.min == 0 || self.particles.is_empty() {
            return 0;
        }

        let effective_items: Vec<_> = self
            .particles
            .iter()
            .filter(|p| p.effective_max_occurs() != Some(0))
            .collect();

        if effective_items.is_empty() {
            return 0;
        }

        match self.model {
            ModelType::Choice => {
                let min = effective_items
                    .iter()
                    .map(|p| p.effective_min_occurs())
                    .min()
                    .unwrap_or(0);
                self.occurs.min.saturating_mul(min)
            }
            ModelType::All | ModelType::Sequence => {
                let sum = effective_items
                    .iter()
                    .map(|p| p.effective_min_occurs())
                    .fold(0u32, u32::saturating_add);
                self.occurs.min.saturating_mul(sum)
            }
        }
    }

    /// Calculate effective maximum occurs across the nested structure
    pub fn effective_max_occurs(&self) -> Option<u32> {
        if self.occurs.max == Some(0) || self.particles.is_empty() {
            return Some(0);
        }

        let effective_items: Vec<_> = self
            .particles
            .iter()
            .filter(|p| p.effective_max_occurs() != Some(0))
            .collect();

        if effective_items.is_empty() {
            return Some(0);
        }

        let group_max = self.occurs.max?;

        match self.model {
            ModelType::Choice => {
                let mut max = 0u32;
                for item in &effective_items {
                    max = max.max(item.effective_max_occurs()?);
                }
                Some(group_max.saturating_mul(max))
            }
            ModelType::All | ModelType::Sequence => {
                let mut sum = 0u32;
                for item in &effective_items {
                    sum = sum.saturating_add(item.effective_max_occurs()?);
                }
                Some(group_max.saturating_mul(sum))
            }
        }
    }

    /// Check if this group is "pointless" and can be collapsed into its
    /// parent: a 1..1 group with a single child, or with children all of the
    /// parent's compositor kind.
    pub fn is_pointless(&self, parent_model: ModelType) -> bool {
        if self.particles.is_empty() {
            return true;
        }
        if self.occurs != Occurs::once() {
            return false;
        }
        if self.particles.len() == 1 {
            return true;
        }
        self.model == parent_model
    }
}

/// Collapse pointless groups in a particle, recursively.
///
/// A 1..1 group with exactly one child is replaced by the child; nested
/// groups of the same compositor as their 1..1 parent are flattened into it.
/// The input is never mutated; untouched subtrees are shared.
pub fn normalize_particle(particle: &XsdParticle) -> XsdParticle {
    match particle {
        XsdParticle::Element(_) | XsdParticle::Any(_) => particle.clone(),
        XsdParticle::Group(group) => {
            if group.group_ref.is_some() {
                return particle.clone();
            }

            let children: Vec<XsdParticle> =
                group.particles.iter().map(normalize_particle).collect();

            // 1..1 wrapper around a single particle disappears
            if group.occurs == Occurs::once() && children.len() == 1 {
                return children.into_iter().next().unwrap();
            }

            // Flatten same-kind 1..1 child groups into this one
            let mut flattened = Vec::with_capacity(children.len());
            for child in children {
                match child {
                    XsdParticle::Group(inner)
                        if inner.group_ref.is_none()
                            && inner.model == group.model
                            && inner.occurs == Occurs::once() =>
                    {
                        flattened.extend(inner.particles.iter().cloned());
                    }
                    other => flattened.push(other),
                }
            }

            XsdParticle::Group(Arc::new(XsdGroup {
                name: group.name.clone(),
                model: group.model,
                particles: flattened,
                occurs: group.occurs,
                group_ref: None,
            }))
        }
    }
}

/// Expand named group references into their referenced content.
///
/// The referenced group's compositor and particles are substituted with the
/// reference's occurrence bounds. Reference cycles and unresolved names
/// expand to an empty group so walks terminate without false errors.
pub fn expand_group_refs(schema: &XsdSchema, group: &XsdGroup) -> Arc<XsdGroup> {
    let mut tracker = VisitTracker::new();
    expand_group(schema, group, &mut tracker)
}

fn expand_group(
    schema: &XsdSchema,
    group: &XsdGroup,
    tracker: &mut VisitTracker<QName>,
) -> Arc<XsdGroup> {
    if let Some(ref_name) = &group.group_ref {
        let expanded = match schema.lookup_group(ref_name) {
            Some(referent) if tracker.enter(ref_name.clone()) => {
                let inner = expand_group(schema, &referent, tracker);
                XsdGroup {
                    name: Some(ref_name.clone()),
                    model: inner.model,
                    particles: inner.particles.clone(),
                    occurs: group.occurs,
                    group_ref: None,
                }
            }
            _ => XsdGroup {
                name: Some(ref_name.clone()),
                model: ModelType::Sequence,
                particles: Vec::new(),
                occurs: group.occurs,
                group_ref: None,
            },
        };
        return Arc::new(expanded);
    }

    let particles = group
        .particles
        .iter()
        .map(|p| match p {
            XsdParticle::Group(inner) => {
                XsdParticle::Group(expand_group(schema, inner, tracker))
            }
            other => other.clone(),
        })
        .collect();

    Arc::new(XsdGroup {
        name: group.name.clone(),
        model: group.model,
        particles,
        occurs: group.occurs,
        group_ref: None,
    })
}

/// Collect every element declaration reachable in a particle tree,
/// following named group references with cycle protection.
pub fn collect_element_decls(
    schema: &XsdSchema,
    group: &XsdGroup,
    out: &mut Vec<Arc<XsdElement>>,
) {
    let mut tracker = VisitTracker::new();
    collect_elements_inner(schema, group, &mut tracker, out);
}

fn collect_elements_inner(
    schema: &XsdSchema,
    group: &XsdGroup,
    tracker: &mut VisitTracker<QName>,
    out: &mut Vec<Arc<XsdElement>>,
) {
    for particle in &group.particles {
        match particle {
            XsdParticle::Element(elem) => out.push(elem.clone()),
            XsdParticle::Any(_) => {}
            XsdParticle::Group(inner) => {
                if let Some(ref_name) = &inner.group_ref {
                    if tracker.enter(ref_name.clone()) {
                        if let Some(referent) = schema.lookup_group(ref_name) {
                            collect_elements_inner(schema, &referent, tracker, out);
                        }
                    }
                } else {
                    collect_elements_inner(schema, inner, tracker, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::elements::XsdElement;

    fn elem(name: &str, occurs: Occurs) -> XsdElement {
        XsdElement::local(QName::local(name), occurs)
    }

    #[test]
    fn test_group_creation() {
        let group = XsdGroup::new(ModelType::Sequence);
        assert_eq!(group.model, ModelType::Sequence);
        assert!(group.is_empty());
        assert_eq!(group.occurs, Occurs::once());
    }

    #[test]
    fn test_is_emptiable_sequence() {
        let mut group = XsdGroup::new(ModelType::Sequence);
        assert!(group.is_emptiable());

        group.add_element(elem("required", Occurs::once()));
        assert!(!group.is_emptiable());

        group.add_element(elem("optional", Occurs::optional()));
        assert!(!group.is_emptiable());
    }

    #[test]
    fn test_is_emptiable_choice() {
        let mut group = XsdGroup::new(ModelType::Choice);
        group.add_element(elem("required", Occurs::once()));
        group.add_element(elem("optional", Occurs::optional()));
        assert!(group.is_emptiable());
    }

    #[test]
    fn test_effective_occurs_sequence() {
        let mut group = XsdGroup::new(ModelType::Sequence);
        group.add_element(elem("a", Occurs::new(2, Some(5))));
        group.add_element(elem("b", Occurs::optional()));

        assert_eq!(group.effective_min_occurs(), 2);
        assert_eq!(group.effective_max_occurs(), Some(6));
    }

    #[test]
    fn test_effective_occurs_choice() {
        let mut group = XsdGroup::new(ModelType::Choice);
        group.add_element(elem("a", Occurs::new(2, Some(5))));
        group.add_element(elem("b", Occurs::new(1, Some(3))));

        assert_eq!(group.effective_min_occurs(), 1);
        assert_eq!(group.effective_max_occurs(), Some(5));
    }

    #[test]
    fn test_effective_occurs_unbounded() {
        let mut group = XsdGroup::new(ModelType::Choice);
        group.add_element(elem("a", Occurs::new(1, Some(5))));
        group.add_element(elem("b", Occurs::one_or_more()));
        assert_eq!(group.effective_max_occurs(), None);
    }

    #[test]
    fn test_is_pointless() {
        let empty = XsdGroup::new(ModelType::Sequence);
        assert!(empty.is_pointless(ModelType::Sequence));

        let mut single = XsdGroup::new(ModelType::Sequence);
        single.add_element(elem("e", Occurs::once()));
        assert!(single.is_pointless(ModelType::Choice));

        let mut multi = XsdGroup::new(ModelType::Sequence);
        multi.add_element(elem("a", Occurs::once()));
        multi.add_element(elem("b", Occurs::once()));
        assert!(multi.is_pointless(ModelType::Sequence));
        assert!(!multi.is_pointless(ModelType::Choice));

        let mut repeated = XsdGroup::new(ModelType::Sequence);
        repeated.occurs = Occurs::zero_or_more();
        repeated.add_element(elem("e", Occurs::once()));
        assert!(!repeated.is_pointless(ModelType::Sequence));
    }

    #[test]
    fn test_normalize_unwraps_single_child() {
        let mut inner = XsdGroup::new(ModelType::Sequence);
        inner.add_element(elem("a", Occurs::new(2, Some(3))));

        let mut outer = XsdGroup::new(ModelType::Choice);
        outer.add_group(inner);

        let normalized = normalize_particle(&XsdParticle::Group(Arc::new(outer)));
        match normalized {
            XsdParticle::Element(e) => assert_eq!(e.occurs, Occurs::new(2, Some(3))),
            other => panic!("expected element after collapsing, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_flattens_same_kind() {
        let mut inner = XsdGroup::new(ModelType::Sequence);
        inner.add_element(elem("b", Occurs::once()));
        inner.add_element(elem("c", Occurs::once()));

        let mut outer = XsdGroup::new(ModelType::Sequence);
        outer.add_element(elem("a", Occurs::once()));
        outer.add_group(inner);

        let normalized = normalize_particle(&XsdParticle::Group(Arc::new(outer)));
        match normalized {
            XsdParticle::Group(g) => {
                assert_eq!(g.len(), 3);
                assert!(g.iter().all(|p| matches!(p, XsdParticle::Element(_))));
            }
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_keeps_repeated_group() {
        let mut inner = XsdGroup::new(ModelType::Sequence);
        inner.occurs = Occurs::zero_or_more();
        inner.add_element(elem("a", Occurs::once()));

        let mut outer = XsdGroup::new(ModelType::Sequence);
        outer.add_element(elem("x", Occurs::once()));
        outer.add_group(inner);

        let normalized = normalize_particle(&XsdParticle::Group(Arc::new(outer)));
        match normalized {
            XsdParticle::Group(g) => {
                assert_eq!(g.len(), 2);
                assert!(matches!(&g.particles[1], XsdParticle::Group(_)));
            }
            other => panic!("expected group, got {:?}", other),
        }
    }
}
