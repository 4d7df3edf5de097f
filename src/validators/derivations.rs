//! Particle Derivation OK (PDO)
//!
//! The pair-wise comparison of a restriction's content model against its
//! base content model: Element:Element, Element:Wildcard,
//! Wildcard:Wildcard, RecurseAsIfGroup, Recurse/RecurseLax for same-kind
//! groups, and the compositor-change matrix (NSRecurseCheckCardinality,
//! all-tightening, MapAndSum). Particles are normalized and group
//! references expanded before dispatch.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#cos-particle-restrict

use std::sync::Arc;

use crate::error::Diagnostic;
use crate::namespaces::QName;

use super::elements::{is_substitution_member, XsdElement};
use super::groups::{expand_group_refs, normalize_particle, ModelType, XsdGroup, XsdParticle};
use super::helpers::normalized_equal;
use super::particles::Occurs;
use super::schemas::{XsdSchema, XsdType};
use super::simple_types::{check_type_derivation, DerivationCheck};
use super::wildcards::XsdAnyElement;

/// Check that a derived content model is a valid restriction of its base
/// content model, reporting the first violation found per particle pair.
pub fn check_particle_restriction(
    schema: &XsdSchema,
    derived: &Arc<XsdGroup>,
    base: &Arc<XsdGroup>,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let derived = normalize_particle(&XsdParticle::Group(expand_group_refs(schema, derived)));
    let base = normalize_particle(&XsdParticle::Group(expand_group_refs(schema, base)));

    if let Err(err) = restriction_ok(schema, &derived, &base) {
        diags.push(Diagnostic::new(format!(
            "{}: ComplexContent restriction: {}",
            prefix, err
        )));
    }
}

fn describe(particle: &XsdParticle) -> String {
    match particle {
        XsdParticle::Element(e) => format!("element '{}'", e.name.local_name),
        XsdParticle::Any(_) => "wildcard".to_string(),
        XsdParticle::Group(g) => format!("{} group", g.model),
    }
}

fn fmt_occurs(occurs: Occurs) -> String {
    match occurs.max {
        Some(max) => format!("[{}, {}]", occurs.min, max),
        None => format!("[{}, unbounded]", occurs.min),
    }
}

fn occurs_within(derived: Occurs, base: Occurs, what: &str) -> Result<(), String> {
    if derived.has_occurs_restriction(&base) {
        Ok(())
    } else {
        Err(format!(
            "{}: occurrence range {} must be within the base range {}",
            what,
            fmt_occurs(derived),
            fmt_occurs(base)
        ))
    }
}

fn scale_occurs(group: Occurs, child: Occurs) -> Occurs {
    let min = group.min.saturating_mul(child.min);
    let max = match (group.max, child.max) {
        (Some(a), Some(b)) => Some(a.saturating_mul(b)),
        _ => None,
    };
    Occurs::new(min, max)
}

fn with_occurs(particle: &XsdParticle, occurs: Occurs) -> XsdParticle {
    match particle {
        XsdParticle::Element(e) => {
            let mut elem = (**e).clone();
            elem.occurs = occurs;
            XsdParticle::Element(Arc::new(elem))
        }
        XsdParticle::Any(a) => {
            let mut any = (**a).clone();
            any.occurs = occurs;
            XsdParticle::Any(Arc::new(any))
        }
        XsdParticle::Group(g) => {
            let mut group = (**g).clone();
            group.occurs = occurs;
            XsdParticle::Group(Arc::new(group))
        }
    }
}

/// Recursive dispatch over the (derived, base) particle pair.
fn restriction_ok(
    schema: &XsdSchema,
    derived: &XsdParticle,
    base: &XsdParticle,
) -> Result<(), String> {
    match (derived, base) {
        (XsdParticle::Element(d), XsdParticle::Element(b)) => element_vs_element(schema, d, b),
        (XsdParticle::Element(d), XsdParticle::Any(b)) => element_vs_wildcard(d, b),
        (XsdParticle::Any(d), XsdParticle::Any(b)) => wildcard_vs_wildcard(d, b),
        (XsdParticle::Any(_), XsdParticle::Element(b)) => Err(format!(
            "a wildcard cannot restrict the base element '{}'",
            b.name.local_name
        )),
        (XsdParticle::Element(_), XsdParticle::Group(b)) => {
            // RecurseAsIfGroup: the element counts as a 1..1 group of the
            // base compositor
            element_vs_group(schema, derived, b)
        }
        (XsdParticle::Group(d), XsdParticle::Any(b)) => {
            ns_recurse_check_cardinality(schema, d, b)
        }
        (XsdParticle::Group(d), XsdParticle::Element(_)) => {
            // A group with a single 0..1/1..1 child can still restrict an
            // element through that child
            if d.particles.len() == 1 && d.occurs.is_single() {
                let child = with_occurs(
                    &d.particles[0],
                    scale_occurs(d.occurs, d.particles[0].occurs()),
                );
                restriction_ok(schema, &child, base)
            } else {
                Err(format!(
                    "a {} group cannot restrict the base {}",
                    d.model,
                    describe(base)
                ))
            }
        }
        (XsdParticle::Any(_), XsdParticle::Group(b)) => Err(format!(
            "a wildcard cannot restrict the base {}",
            describe(&XsdParticle::Group(b.clone()))
        )),
        (XsdParticle::Group(d), XsdParticle::Group(b)) => group_vs_group(schema, d, b),
    }
}

/// The effective white space for fixed-value comparison, keyed to the
/// element's declared type.
fn element_white_space(schema: &XsdSchema, element: &XsdElement) -> super::facets::WhiteSpace {
    let builtin = match (&element.type_ref, &element.inline_type) {
        (Some(type_ref), _) => super::simple_types::resolve_named_builtin(schema, type_ref),
        (None, Some(XsdType::Simple(inline))) => {
            super::simple_types::resolve_base_builtin(schema, inline)
        }
        _ => None,
    };
    builtin.map_or(super::facets::WhiteSpace::Collapse, |bt| bt.white_space)
}

/// The inline anonymous type of an element, following references to their
/// global declaration.
fn element_inline_type(schema: &XsdSchema, element: &XsdElement) -> Option<XsdType> {
    if element.is_reference {
        let decl = schema.lookup_element(&element.name)?;
        return decl.inline_type.clone();
    }
    element.inline_type.clone()
}

fn element_type_name(schema: &XsdSchema, element: &XsdElement) -> Option<QName> {
    if element.is_reference {
        let decl = schema.lookup_element(&element.name)?;
        return decl.type_ref.clone();
    }
    element.type_ref.clone()
}

fn element_vs_element(
    schema: &XsdSchema,
    derived: &Arc<XsdElement>,
    base: &Arc<XsdElement>,
) -> Result<(), String> {
    if derived.name != base.name
        && !is_substitution_member(schema, &derived.name, &base.name)
    {
        return Err(format!(
            "element '{}' does not match the base element '{}'",
            derived.name.local_name, base.name.local_name
        ));
    }

    occurs_within(
        derived.occurs,
        base.occurs,
        &format!("element '{}'", derived.name.local_name),
    )?;

    if derived.nillable && !base.nillable {
        return Err(format!(
            "element '{}' cannot become nillable in a restriction",
            derived.name.local_name
        ));
    }

    if !derived.block.is_superset_of(&base.block) {
        return Err(format!(
            "element '{}': block must be a superset of the base element's block",
            derived.name.local_name
        ));
    }

    if let Some(base_fixed) = &base.fixed {
        let white_space = element_white_space(schema, derived);
        let matches = derived
            .fixed
            .as_ref()
            .is_some_and(|v| normalized_equal(v, base_fixed, white_space));
        if !matches {
            return Err(format!(
                "element '{}': fixed value must match the base fixed value '{}'",
                derived.name.local_name, base_fixed
            ));
        }
    }

    check_element_type_derivation(schema, derived, base)
}

fn check_element_type_derivation(
    schema: &XsdSchema,
    derived: &Arc<XsdElement>,
    base: &Arc<XsdElement>,
) -> Result<(), String> {
    let Some(base_name) = element_type_name(schema, base) else {
        // Anonymous or absent base type: nothing to compare against by name
        return Ok(());
    };

    if let Some(derived_name) = element_type_name(schema, derived) {
        if derived_name == base_name {
            return Ok(());
        }
        return match check_type_derivation(schema, &derived_name, &base_name) {
            DerivationCheck::Derived | DerivationCheck::Unresolved => Ok(()),
            DerivationCheck::NotDerived => Err(format!(
                "element '{}': type '{}' must be validly derived from the base type '{}'",
                derived.name.local_name, derived_name.local_name, base_name.local_name
            )),
        };
    }

    // An inline anonymous type restricts validly when it declares the base
    // (or something derived from it) explicitly
    let inline_base = match element_inline_type(schema, derived) {
        Some(XsdType::Simple(st)) => st.base.clone(),
        Some(XsdType::Complex(ct)) => ct.base_type.clone(),
        _ => return Ok(()),
    };
    match inline_base {
        Some(inline_base) => match check_type_derivation(schema, &inline_base, &base_name) {
            DerivationCheck::NotDerived if inline_base != base_name => Err(format!(
                "element '{}': anonymous type must be derived from the base type '{}'",
                derived.name.local_name, base_name.local_name
            )),
            _ => Ok(()),
        },
        None => Ok(()),
    }
}

fn element_vs_wildcard(
    derived: &Arc<XsdElement>,
    base: &Arc<XsdAnyElement>,
) -> Result<(), String> {
    if !base.matches(derived.name.namespace.as_deref()) {
        return Err(format!(
            "element '{}' is not within the namespace constraint of the base wildcard",
            derived.name.local_name
        ));
    }
    occurs_within(
        derived.occurs,
        base.occurs,
        &format!("element '{}'", derived.name.local_name),
    )
}

fn wildcard_vs_wildcard(
    derived: &Arc<XsdAnyElement>,
    base: &Arc<XsdAnyElement>,
) -> Result<(), String> {
    if !derived
        .wildcard
        .process_contents
        .is_restriction_of(&base.wildcard.process_contents)
    {
        return Err(format!(
            "wildcard processContents '{}' is weaker than the base '{}'",
            derived.wildcard.process_contents, base.wildcard.process_contents
        ));
    }
    if !derived.wildcard.is_subset_of(&base.wildcard) {
        return Err(
            "wildcard namespace constraint is not a subset of the base wildcard".to_string(),
        );
    }
    occurs_within(derived.occurs, base.occurs, "wildcard")
}

/// RecurseAsIfGroup: a derived element against a base model group.
fn element_vs_group(
    schema: &XsdSchema,
    derived: &XsdParticle,
    base: &Arc<XsdGroup>,
) -> Result<(), String> {
    match base.model {
        ModelType::Choice => {
            // The element must cleanly match some alternative; keep the
            // error of the closest partial match for the report
            let mut last_err = None;
            for child in &base.particles {
                let scaled = with_occurs(child, scale_occurs(base.occurs, child.occurs()));
                match restriction_ok(schema, derived, &scaled) {
                    Ok(()) => return Ok(()),
                    Err(err) => last_err = Some(err),
                }
            }
            Err(last_err.unwrap_or_else(|| {
                format!("{} has no match in the base choice group", describe(derived))
            }))
        }
        ModelType::Sequence | ModelType::All => {
            let mut matched = false;
            let mut position = 0;
            for (index, child) in base.particles.iter().enumerate() {
                match restriction_ok(schema, derived, child) {
                    Ok(()) => {
                        matched = true;
                        position = index;
                        break;
                    }
                    Err(err) => {
                        // Only emptiable base children may be skipped over
                        if !child.is_emptiable() {
                            return Err(err);
                        }
                    }
                }
            }
            if !matched {
                return Err(format!(
                    "{} has no match in the base {} group",
                    describe(derived),
                    base.model
                ));
            }
            for (index, child) in base.particles.iter().enumerate().skip(position + 1) {
                if !child.is_emptiable() {
                    return Err(format!(
                        "required particle at position {} is missing",
                        index + 1
                    ));
                }
            }
            Ok(())
        }
    }
}

/// NSRecurseCheckCardinality: a derived group against a base wildcard.
fn ns_recurse_check_cardinality(
    schema: &XsdSchema,
    derived: &Arc<XsdGroup>,
    base: &Arc<XsdAnyElement>,
) -> Result<(), String> {
    // Children are checked against the wildcard constraint alone; the
    // cardinality of the whole group is checked once below
    let unbounded_base = Arc::new(XsdAnyElement::new(
        base.wildcard.clone(),
        Occurs::zero_or_more(),
    ));
    for child in &derived.particles {
        restriction_ok(schema, child, &XsdParticle::Any(unbounded_base.clone()))?;
    }

    let effective = Occurs::new(
        derived.effective_min_occurs(),
        derived.effective_max_occurs(),
    );
    occurs_within(effective, base.occurs, "group content")
}

fn group_vs_group(
    schema: &XsdSchema,
    derived: &Arc<XsdGroup>,
    base: &Arc<XsdGroup>,
) -> Result<(), String> {
    if derived.model == base.model {
        return recurse_groups(schema, derived, base);
    }

    // Compositor changed: only a few combinations are admissible
    if base
        .particles
        .iter()
        .any(|p| matches!(p, XsdParticle::Any(_)))
    {
        return recurse_against_mixed_base(schema, derived, base);
    }

    if derived.model == ModelType::All && derived.particles.len() == 1 {
        let child = with_occurs(
            &derived.particles[0],
            scale_occurs(derived.occurs, derived.particles[0].occurs()),
        );
        return restriction_ok(schema, &child, &XsdParticle::Group(base.clone()));
    }

    if base.model == ModelType::All
        && matches!(derived.model, ModelType::Sequence | ModelType::Choice)
    {
        return recurse_unordered(schema, derived, base);
    }

    if base.model == ModelType::Choice && derived.model == ModelType::Sequence {
        return map_and_sum(schema, derived, base);
    }

    Err(format!(
        "a {} group cannot restrict a {} group",
        derived.model, base.model
    ))
}

/// Recurse (sequence, all) and RecurseLax (choice): order-preserving match
/// of derived children onto base children.
fn recurse_groups(
    schema: &XsdSchema,
    derived: &Arc<XsdGroup>,
    base: &Arc<XsdGroup>,
) -> Result<(), String> {
    occurs_within(
        derived.occurs,
        base.occurs,
        &format!("{} group", derived.model),
    )?;

    let lax = base.model == ModelType::Choice;
    let mut base_index = 0;

    'derived: for child in &derived.particles {
        let mut last_err = None;
        while base_index < base.particles.len() {
            let base_child = &base.particles[base_index];
            match restriction_ok(schema, child, base_child) {
                Ok(()) => {
                    // A repeatable base wildcard can absorb further derived
                    // children; anything else advances
                    let absorbing = matches!(base_child, XsdParticle::Any(a)
                        if !a.occurs.is_single() && !a.occurs.is_empty());
                    if !absorbing {
                        base_index += 1;
                    }
                    continue 'derived;
                }
                Err(err) => {
                    if !lax && !base_child.is_emptiable() {
                        return Err(err);
                    }
                    last_err = Some(err);
                    base_index += 1;
                }
            }
        }
        return Err(last_err.unwrap_or_else(|| {
            format!(
                "{} has no corresponding particle in the base {} group",
                describe(child),
                base.model
            )
        }));
    }

    if !lax {
        for (index, child) in base.particles.iter().enumerate().skip(base_index) {
            if !child.is_emptiable() {
                return Err(format!(
                    "required particle at position {} is missing",
                    index + 1
                ));
            }
        }
    }

    Ok(())
}

/// A derived group against a base that mixes elements and wildcards:
/// every derived child must restrict some base child, with the overall
/// cardinality bounded by the base group.
fn recurse_against_mixed_base(
    schema: &XsdSchema,
    derived: &Arc<XsdGroup>,
    base: &Arc<XsdGroup>,
) -> Result<(), String> {
    for child in &derived.particles {
        let mut matched = false;
        let mut last_err = None;
        for base_child in &base.particles {
            let scaled = with_occurs(
                base_child,
                scale_occurs(base.occurs, base_child.occurs()),
            );
            match restriction_ok(schema, child, &scaled) {
                Ok(()) => {
                    matched = true;
                    break;
                }
                Err(err) => last_err = Some(err),
            }
        }
        if !matched {
            return Err(last_err.unwrap_or_else(|| {
                format!(
                    "{} has no corresponding particle in the base group",
                    describe(child)
                )
            }));
        }
    }

    let effective = Occurs::new(
        derived.effective_min_occurs(),
        derived.effective_max_occurs(),
    );
    let base_effective = Occurs::new(base.effective_min_occurs(), base.effective_max_occurs());
    occurs_within(effective, base_effective, "group content")
}

/// Sequence/choice tightening of an unordered base: each derived child maps
/// to a distinct base child; base children left unmatched must be
/// emptiable.
fn recurse_unordered(
    schema: &XsdSchema,
    derived: &Arc<XsdGroup>,
    base: &Arc<XsdGroup>,
) -> Result<(), String> {
    occurs_within(
        derived.occurs,
        base.occurs,
        &format!("{} group", derived.model),
    )?;

    let mut used = vec![false; base.particles.len()];

    for child in &derived.particles {
        let mut matched = false;
        let mut last_err = None;
        for (index, base_child) in base.particles.iter().enumerate() {
            if used[index] {
                continue;
            }
            match restriction_ok(schema, child, base_child) {
                Ok(()) => {
                    used[index] = true;
                    matched = true;
                    break;
                }
                Err(err) => last_err = Some(err),
            }
        }
        if !matched {
            return Err(last_err.unwrap_or_else(|| {
                format!(
                    "{} has no corresponding particle in the base all group",
                    describe(child)
                )
            }));
        }
    }

    if derived.model == ModelType::Sequence {
        for (index, base_child) in base.particles.iter().enumerate() {
            if !used[index] && !base_child.is_emptiable() {
                return Err(format!(
                    "required particle at position {} is missing",
                    index + 1
                ));
            }
        }
    }

    Ok(())
}

/// MapAndSum: a sequence tightening a choice. Each derived child must
/// restrict some base alternative; the summed occurrence of the sequence
/// must fit in the base group's occurrence range.
fn map_and_sum(
    schema: &XsdSchema,
    derived: &Arc<XsdGroup>,
    base: &Arc<XsdGroup>,
) -> Result<(), String> {
    for child in &derived.particles {
        let mut matched = false;
        let mut last_err = None;
        for base_child in &base.particles {
            // Occurrence is accounted for at the group level here
            let relaxed = with_occurs(base_child, Occurs::zero_or_more());
            match restriction_ok(schema, child, &relaxed) {
                Ok(()) => {
                    matched = true;
                    break;
                }
                Err(err) => last_err = Some(err),
            }
        }
        if !matched {
            return Err(last_err.unwrap_or_else(|| {
                format!(
                    "{} has no corresponding alternative in the base choice group",
                    describe(child)
                )
            }));
        }
    }

    let effective = Occurs::new(
        derived.effective_min_occurs(),
        derived.effective_max_occurs(),
    );
    let base_effective = Occurs::new(base.effective_min_occurs(), base.effective_max_occurs());
    occurs_within(effective, base_effective, "sequence content")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::wildcards::{NamespaceConstraint, ProcessContents, XsdWildcard};

    fn elem(name: &str, occurs: Occurs) -> XsdElement {
        XsdElement::local(QName::local(name), occurs)
    }

    fn group_of(model: ModelType, elems: &[(&str, Occurs)]) -> Arc<XsdGroup> {
        let mut group = XsdGroup::new(model);
        for (name, occurs) in elems {
            group.add_element(elem(name, *occurs));
        }
        Arc::new(group)
    }

    fn check(derived: &Arc<XsdGroup>, base: &Arc<XsdGroup>) -> Vec<Diagnostic> {
        let schema = XsdSchema::new(None);
        let mut diags = Vec::new();
        check_particle_restriction(&schema, derived, base, "type T", &mut diags);
        diags
    }

    #[test]
    fn test_same_sequence_accepted() {
        let base = group_of(
            ModelType::Sequence,
            &[("a", Occurs::once()), ("b", Occurs::optional())],
        );
        let derived = group_of(
            ModelType::Sequence,
            &[("a", Occurs::once()), ("b", Occurs::optional())],
        );
        assert!(check(&derived, &base).is_empty());
    }

    #[test]
    fn test_dropping_optional_accepted() {
        let base = group_of(
            ModelType::Sequence,
            &[("a", Occurs::once()), ("b", Occurs::optional())],
        );
        let derived = group_of(ModelType::Sequence, &[("a", Occurs::once())]);
        assert!(check(&derived, &base).is_empty());
    }

    #[test]
    fn test_dropping_required_rejected() {
        let base = group_of(
            ModelType::Sequence,
            &[("a", Occurs::once()), ("b", Occurs::once())],
        );
        let derived = group_of(ModelType::Sequence, &[("a", Occurs::once())]);
        let diags = check(&derived, &base);
        assert_eq!(diags.len(), 1);
        assert!(diags[0]
            .message
            .contains("required particle at position 2 is missing"));
    }

    #[test]
    fn test_widening_occurs_rejected() {
        let base = group_of(ModelType::Sequence, &[("a", Occurs::new(1, Some(2)))]);
        let derived = group_of(ModelType::Sequence, &[("a", Occurs::new(1, Some(5)))]);
        let diags = check(&derived, &base);
        assert!(diags[0].message.contains("occurrence range"));
    }

    #[test]
    fn test_choice_subset_accepted() {
        let base = group_of(
            ModelType::Choice,
            &[("a", Occurs::once()), ("b", Occurs::once())],
        );
        let derived = group_of(ModelType::Choice, &[("b", Occurs::once())]);
        assert!(check(&derived, &base).is_empty());
    }

    #[test]
    fn test_choice_new_alternative_rejected() {
        let base = group_of(
            ModelType::Choice,
            &[("a", Occurs::once()), ("b", Occurs::once())],
        );
        let derived = group_of(
            ModelType::Choice,
            &[("a", Occurs::once()), ("c", Occurs::once())],
        );
        let diags = check(&derived, &base);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_recurse_as_if_group_choice() {
        // A single element restricting a choice picks its alternative;
        // normalization turns the 1..1 derived wrapper into the element
        let base = group_of(
            ModelType::Choice,
            &[("a", Occurs::once()), ("b", Occurs::once())],
        );
        let derived = group_of(ModelType::Sequence, &[("b", Occurs::once())]);
        assert!(check(&derived, &base).is_empty());
    }

    #[test]
    fn test_recurse_as_if_group_sequence_requires_rest_emptiable() {
        let base = group_of(
            ModelType::Sequence,
            &[("a", Occurs::once()), ("b", Occurs::optional())],
        );
        let derived = group_of(ModelType::Sequence, &[("a", Occurs::once())]);
        assert!(check(&derived, &base).is_empty());

        let base_required = group_of(
            ModelType::Sequence,
            &[("a", Occurs::once()), ("b", Occurs::once())],
        );
        let derived_single = group_of(ModelType::Sequence, &[("a", Occurs::once())]);
        assert!(!check(&derived_single, &base_required).is_empty());
    }

    #[test]
    fn test_nillable_cannot_appear() {
        let base = group_of(ModelType::Sequence, &[("a", Occurs::once())]);
        let mut derived_group = XsdGroup::new(ModelType::Sequence);
        let mut nillable = elem("a", Occurs::once());
        nillable.nillable = true;
        derived_group.add_element(nillable);
        let diags = check(&Arc::new(derived_group), &base);
        assert!(diags[0].message.contains("cannot become nillable"));
    }

    #[test]
    fn test_element_vs_wildcard_namespace() {
        let mut base_group = XsdGroup::new(ModelType::Sequence);
        base_group.add_any(XsdAnyElement::new(
            XsdWildcard::new(
                NamespaceConstraint::Other,
                ProcessContents::Lax,
                Some("http://t.example"),
            ),
            Occurs::zero_or_more(),
        ));
        let base = Arc::new(base_group);

        let mut ok_group = XsdGroup::new(ModelType::Sequence);
        ok_group.add_element(XsdElement::local(
            QName::namespaced("http://other.example", "a"),
            Occurs::once(),
        ));
        assert!(check(&Arc::new(ok_group), &base).is_empty());

        let mut bad_group = XsdGroup::new(ModelType::Sequence);
        bad_group.add_element(XsdElement::local(
            QName::namespaced("http://t.example", "a"),
            Occurs::once(),
        ));
        let diags = check(&Arc::new(bad_group), &base);
        assert!(diags[0]
            .message
            .contains("not within the namespace constraint"));
    }

    #[test]
    fn test_wildcard_vs_wildcard_process_contents() {
        let mut base_group = XsdGroup::new(ModelType::Sequence);
        base_group.add_any(XsdAnyElement::new(
            XsdWildcard::new(NamespaceConstraint::Any, ProcessContents::Lax, None),
            Occurs::zero_or_more(),
        ));
        let base = Arc::new(base_group);

        let mut weak_group = XsdGroup::new(ModelType::Sequence);
        weak_group.add_any(XsdAnyElement::new(
            XsdWildcard::new(NamespaceConstraint::Any, ProcessContents::Skip, None),
            Occurs::zero_or_more(),
        ));
        let diags = check(&Arc::new(weak_group), &base);
        assert!(diags[0].message.contains("processContents"));
    }

    #[test]
    fn test_map_and_sum() {
        // choice (a|b) 0..4 tightened into a fixed sequence of a and b
        let mut base_group = XsdGroup::new(ModelType::Choice);
        base_group.occurs = Occurs::new(0, Some(4));
        base_group.add_element(elem("a", Occurs::once()));
        base_group.add_element(elem("b", Occurs::once()));
        let base = Arc::new(base_group);

        let derived = group_of(
            ModelType::Sequence,
            &[("a", Occurs::once()), ("b", Occurs::once())],
        );
        assert!(check(&derived, &base).is_empty());

        let too_many = group_of(
            ModelType::Sequence,
            &[
                ("a", Occurs::new(3, Some(3))),
                ("b", Occurs::new(2, Some(2))),
            ],
        );
        let diags = check(&too_many, &base);
        assert!(diags[0].message.contains("occurrence range"));
    }

    #[test]
    fn test_all_tightened_to_sequence() {
        let base = group_of(
            ModelType::All,
            &[("a", Occurs::once()), ("b", Occurs::once())],
        );
        let derived = group_of(
            ModelType::Sequence,
            &[("b", Occurs::once()), ("a", Occurs::once())],
        );
        assert!(check(&derived, &base).is_empty());

        let missing = group_of(ModelType::Sequence, &[("a", Occurs::once())]);
        let diags = check(&missing, &base);
        assert!(diags[0]
            .message
            .contains("required particle at position 2 is missing"));
    }

    #[test]
    fn test_group_vs_wildcard_cardinality() {
        let mut base_group = XsdGroup::new(ModelType::Sequence);
        base_group.add_any(XsdAnyElement::new(
            XsdWildcard::new(NamespaceConstraint::Any, ProcessContents::Lax, None),
            Occurs::new(0, Some(2)),
        ));
        let base = Arc::new(base_group);

        let derived = group_of(
            ModelType::Sequence,
            &[("a", Occurs::once()), ("b", Occurs::once())],
        );
        assert!(check(&derived, &base).is_empty());

        let too_many = group_of(
            ModelType::Sequence,
            &[
                ("a", Occurs::new(2, Some(2))),
                ("b", Occurs::new(1, Some(1))),
            ],
        );
        let diags = check(&too_many, &base);
        assert!(diags[0].message.contains("occurrence range"));
    }
}
