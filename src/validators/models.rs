//! Content-model determinism (Unique Particle Attribution)
//!
//! A Glushkov position automaton is built over a relaxed clone of the
//! content model: group references expanded, `all` treated as `choice`,
//! and every bounded maxOccurs above 1 widened to unbounded. Two positions
//! that are simultaneously reachable and overlap - same element name, a
//! substitutable name, or intersecting wildcard constraints - violate UPA.
//! The source particles are never mutated.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#cos-nonambig

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::error::Diagnostic;
use crate::namespaces::QName;

use super::elements::{check_substitution, is_substitution_member, XsdElement};
use super::groups::{expand_group_refs, ModelType, XsdGroup, XsdParticle};
use super::helpers::Derivation;
use super::particles::Occurs;
use super::schemas::XsdSchema;
use super::wildcards::{NamespaceConstraint, XsdAnyElement};

/// A leaf of the position automaton
#[derive(Debug, Clone)]
enum Leaf {
    Element(Arc<XsdElement>),
    Any(Arc<XsdAnyElement>),
}

/// The relaxed particle tree with leaves replaced by position ids
#[derive(Debug)]
enum Node {
    Leaf { position: usize, occurs: Occurs },
    Sequence { children: Vec<Node>, occurs: Occurs },
    Choice { children: Vec<Node>, occurs: Occurs },
}

/// Per-validation-call caches for the substitutability decisions
#[derive(Default)]
struct UpaCache {
    substitutable: HashMap<(QName, QName), bool>,
}

/// Check Unique Particle Attribution over a content model.
pub fn check_unique_particle_attribution(
    schema: &XsdSchema,
    group: &Arc<XsdGroup>,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    // Work on an expanded clone; relaxation must never touch the schema
    let expanded = expand_group_refs(schema, group);

    let mut leaves: Vec<Leaf> = Vec::new();
    let root = build_node(&expanded, &mut leaves);

    let mut follow: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); leaves.len()];
    let analysis = analyze(&root, &mut follow);

    let mut cache = UpaCache::default();
    let mut reported: HashSet<(usize, usize)> = HashSet::new();

    check_set(
        schema,
        &analysis.first,
        &leaves,
        &mut cache,
        &mut reported,
        prefix,
        diags,
    );
    for set in &follow {
        check_set(schema, set, &leaves, &mut cache, &mut reported, prefix, diags);
    }
}

fn relaxed_occurs(occurs: Occurs) -> Occurs {
    // Any bounded maximum above 1 widens to unbounded; UPA is a state-level
    // overlap check, so widening the co-reachable set is sound
    match occurs.max {
        Some(max) if max > 1 => Occurs::new(occurs.min, None),
        _ => occurs,
    }
}

fn build_node(group: &XsdGroup, leaves: &mut Vec<Leaf>) -> Node {
    let children = group
        .particles
        .iter()
        .map(|particle| match particle {
            XsdParticle::Element(elem) => {
                let position = leaves.len();
                leaves.push(Leaf::Element(elem.clone()));
                Node::Leaf {
                    position,
                    occurs: relaxed_occurs(elem.occurs),
                }
            }
            XsdParticle::Any(any) => {
                let position = leaves.len();
                leaves.push(Leaf::Any(any.clone()));
                Node::Leaf {
                    position,
                    occurs: relaxed_occurs(any.occurs),
                }
            }
            XsdParticle::Group(inner) => build_node(inner, leaves),
        })
        .collect();

    let occurs = relaxed_occurs(group.occurs);
    match group.model {
        ModelType::Sequence => Node::Sequence { children, occurs },
        // `all` is treated as choice for co-reachability purposes
        ModelType::Choice | ModelType::All => Node::Choice { children, occurs },
    }
}

struct Analysis {
    nullable: bool,
    first: BTreeSet<usize>,
    last: BTreeSet<usize>,
}

fn analyze(node: &Node, follow: &mut Vec<BTreeSet<usize>>) -> Analysis {
    match node {
        Node::Leaf { position, occurs } => {
            if occurs.max.is_none() {
                let p = *position;
                follow[p].insert(p);
            }
            Analysis {
                nullable: occurs.min == 0 || occurs.max == Some(0),
                first: BTreeSet::from([*position]),
                last: BTreeSet::from([*position]),
            }
        }
        Node::Sequence { children, occurs } => {
            let parts: Vec<Analysis> = children.iter().map(|c| analyze(c, follow)).collect();

            let mut first = BTreeSet::new();
            for part in &parts {
                first.extend(part.first.iter().copied());
                if !part.nullable {
                    break;
                }
            }

            let mut last = BTreeSet::new();
            for part in parts.iter().rev() {
                last.extend(part.last.iter().copied());
                if !part.nullable {
                    break;
                }
            }

            // Each position's follow set gains the firsts of the following
            // siblings up to (and including) the first non-nullable one
            for i in 0..parts.len() {
                let mut successors = BTreeSet::new();
                for part in &parts[i + 1..] {
                    successors.extend(part.first.iter().copied());
                    if !part.nullable {
                        break;
                    }
                }
                for p in &parts[i].last {
                    follow[*p].extend(successors.iter().copied());
                }
            }

            let nullable = parts.iter().all(|p| p.nullable) || occurs.min == 0;
            apply_repetition(&first, &last, *occurs, follow);

            Analysis {
                nullable,
                first,
                last,
            }
        }
        Node::Choice { children, occurs } => {
            let mut first = BTreeSet::new();
            let mut last = BTreeSet::new();
            let mut nullable = children.is_empty() || occurs.min == 0;
            for child in children {
                let part = analyze(child, follow);
                first.extend(part.first.iter().copied());
                last.extend(part.last.iter().copied());
                nullable = nullable || part.nullable;
            }

            apply_repetition(&first, &last, *occurs, follow);

            Analysis {
                nullable,
                first,
                last,
            }
        }
    }
}

fn apply_repetition(
    first: &BTreeSet<usize>,
    last: &BTreeSet<usize>,
    occurs: Occurs,
    follow: &mut [BTreeSet<usize>],
) {
    if occurs.max.is_none() {
        for p in last {
            follow[*p].extend(first.iter().copied());
        }
    }
}

fn check_set(
    schema: &XsdSchema,
    set: &BTreeSet<usize>,
    leaves: &[Leaf],
    cache: &mut UpaCache,
    reported: &mut HashSet<(usize, usize)>,
    prefix: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let positions: Vec<usize> = set.iter().copied().collect();
    for (i, &p) in positions.iter().enumerate() {
        for &q in &positions[i + 1..] {
            if reported.contains(&(p, q)) {
                continue;
            }
            if overlap(schema, &leaves[p], &leaves[q], cache) {
                reported.insert((p, q));
                diags.push(Diagnostic::new(format!(
                    "{}: Unique Particle Attribution: two particles may match {}",
                    prefix,
                    conflict_subject(&leaves[p], &leaves[q])
                )));
            }
        }
    }
}

fn conflict_subject(a: &Leaf, b: &Leaf) -> String {
    match (a, b) {
        (Leaf::Element(e), _) | (_, Leaf::Element(e)) => {
            format!("element '{}'", e.name.local_name)
        }
        _ => "the same element".to_string(),
    }
}

fn overlap(schema: &XsdSchema, a: &Leaf, b: &Leaf, cache: &mut UpaCache) -> bool {
    match (a, b) {
        (Leaf::Element(x), Leaf::Element(y)) => {
            if x.name == y.name {
                return true;
            }
            substitutable(schema, &x.name, &y.name, cache)
                || substitutable(schema, &y.name, &x.name, cache)
        }
        (Leaf::Element(e), Leaf::Any(w)) | (Leaf::Any(w), Leaf::Element(e)) => {
            element_matches_wildcard(schema, e, w)
        }
        (Leaf::Any(x), Leaf::Any(y)) => {
            // A repeated wildcard is not in conflict with itself
            if Arc::ptr_eq(x, y) {
                return false;
            }
            wildcards_overlap(&x.wildcard, &y.wildcard)
        }
    }
}

/// Whether `member` can substitute for `head`, applying the head's block
/// and the per-step blocking of the derivation chain.
fn substitutable(
    schema: &XsdSchema,
    head: &QName,
    member: &QName,
    cache: &mut UpaCache,
) -> bool {
    let key = (head.clone(), member.clone());
    if let Some(&decision) = cache.substitutable.get(&key) {
        return decision;
    }

    let decision = match (schema.lookup_element(head), schema.lookup_element(member)) {
        (Some(head_decl), Some(member_decl)) => {
            !head_decl.block.contains(Derivation::Substitution)
                && check_substitution(schema, &head_decl, &member_decl).is_ok()
        }
        // Without both declarations, fall back to the raw membership graph
        _ => is_substitution_member(schema, head, member),
    };

    cache.substitutable.insert(key, decision);
    decision
}

fn element_matches_wildcard(schema: &XsdSchema, element: &XsdElement, any: &XsdAnyElement) -> bool {
    if any.matches(element.name.namespace.as_deref()) {
        return true;
    }

    // A substitution-group member admitted by the wildcard also collides
    let mut queue = vec![element.name.clone()];
    let mut seen = HashSet::new();
    while let Some(current) = queue.pop() {
        if !seen.insert(current.clone()) {
            continue;
        }
        if let Some(members) = schema.substitution_members(&current) {
            for member in members {
                if any.matches(member.namespace.as_deref()) {
                    return true;
                }
                queue.push(member.clone());
            }
        }
    }
    false
}

fn wildcards_overlap(a: &super::wildcards::XsdWildcard, b: &super::wildcards::XsdWildcard) -> bool {
    match a.intersect(b) {
        Some(intersection) => match &intersection.namespace {
            NamespaceConstraint::Enumeration(items) => !items.is_empty(),
            _ => true,
        },
        // The not-expressible case only arises for overlapping negations
        None => true,
    }
}
