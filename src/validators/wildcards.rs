//! XSD wildcard validators and namespace-constraint algebra
//!
//! This module implements wildcards for XSD element and attribute content
//! (xs:any, xs:anyAttribute) and the namespace-constraint lattice the
//! derivation checks depend on: the match predicate, the subset relation,
//! and intersection/union with the "not expressible" outcomes of XSD 1.0.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#Wildcards

use super::particles::Occurs;

/// Process contents mode for wildcards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    /// Validate strictly - element/attribute must be declared
    #[default]
    Strict,
    /// Validate if declaration found, otherwise accept
    Lax,
    /// Skip validation entirely
    Skip,
}

impl ProcessContents {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Skip => 0,
            Self::Lax => 1,
            Self::Strict => 2,
        }
    }

    /// Check if this mode is at least as strict as another.
    ///
    /// The lattice is strict > lax > skip; a derived wildcard must sit at or
    /// above its base to be a valid restriction.
    pub fn is_restriction_of(&self, other: &Self) -> bool {
        self.rank() >= other.rank()
    }
}

impl std::fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// One member of an enumerated namespace constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceItem {
    /// The absent namespace (`##local`)
    Absent,
    /// The `##targetNamespace` placeholder, resolved against the declaring
    /// schema's target namespace
    Target,
    /// A concrete namespace URI
    Uri(String),
}

impl NamespaceItem {
    /// Resolve to a concrete namespace value (None = absent) against the
    /// declaring schema's target namespace.
    pub fn resolve<'a>(&'a self, target: Option<&'a str>) -> Option<&'a str> {
        match self {
            Self::Absent => None,
            Self::Target => target,
            Self::Uri(uri) => Some(uri.as_str()),
        }
    }
}

/// Namespace constraint for wildcards
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceConstraint {
    /// Any namespace is allowed (##any)
    #[default]
    Any,
    /// Any namespace except the target namespace and the absent namespace
    /// (##other)
    Other,
    /// Any namespace except the absent one. Arises from algebra on ##other
    /// constraints; has no direct surface syntax in XSD 1.0.
    NotAbsent,
    /// Specific set of allowed namespaces (`##local`, `##targetNamespace`,
    /// URIs)
    Enumeration(Vec<NamespaceItem>),
}

impl NamespaceConstraint {
    /// An enumeration containing only the absent namespace (`##local`)
    pub fn local_only() -> Self {
        Self::Enumeration(vec![NamespaceItem::Absent])
    }

    /// An enumeration containing only the target namespace placeholder
    pub fn target_only() -> Self {
        Self::Enumeration(vec![NamespaceItem::Target])
    }
}

/// Kinds a constraint can take once its enumeration shape is classified.
/// Single-item enumerations of the target placeholder or the absent
/// namespace get their own subset rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstraintKind<'a> {
    Any,
    NotAbsent,
    Other,
    TargetOnly,
    LocalOnly,
    List(&'a [NamespaceItem]),
}

fn classify(constraint: &NamespaceConstraint) -> ConstraintKind<'_> {
    match constraint {
        NamespaceConstraint::Any => ConstraintKind::Any,
        NamespaceConstraint::NotAbsent => ConstraintKind::NotAbsent,
        NamespaceConstraint::Other => ConstraintKind::Other,
        NamespaceConstraint::Enumeration(items) => match items.as_slice() {
            [NamespaceItem::Target] => ConstraintKind::TargetOnly,
            [NamespaceItem::Absent] => ConstraintKind::LocalOnly,
            list => ConstraintKind::List(list),
        },
    }
}

/// Base wildcard component: a namespace constraint plus processContents,
/// carrying the declaring schema's target namespace so the
/// `##targetNamespace` placeholder and `##other` can resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XsdWildcard {
    /// Namespace constraint
    pub namespace: NamespaceConstraint,
    /// Process contents mode
    pub process_contents: ProcessContents,
    /// Target namespace of the declaring schema
    pub target_namespace: Option<String>,
}

impl XsdWildcard {
    /// Create a wildcard with the given constraint
    pub fn new(
        namespace: NamespaceConstraint,
        process_contents: ProcessContents,
        target_namespace: Option<&str>,
    ) -> Self {
        Self {
            namespace,
            process_contents,
            target_namespace: target_namespace.map(String::from),
        }
    }

    /// Create a ##any wildcard
    pub fn any() -> Self {
        Self {
            namespace: NamespaceConstraint::Any,
            process_contents: ProcessContents::Strict,
            target_namespace: None,
        }
    }

    /// Check whether a namespace value (None = absent) matches this wildcard.
    pub fn matches(&self, namespace: Option<&str>) -> bool {
        match &self.namespace {
            NamespaceConstraint::Any => true,
            NamespaceConstraint::NotAbsent => namespace.is_some(),
            NamespaceConstraint::Other => {
                namespace.is_some() && namespace != self.target_namespace.as_deref()
            }
            NamespaceConstraint::Enumeration(items) => items
                .iter()
                .any(|item| item.resolve(self.target_namespace.as_deref()) == namespace),
        }
    }

    /// Check whether every namespace matching `self` also matches `other`.
    pub fn is_subset_of(&self, other: &XsdWildcard) -> bool {
        use ConstraintKind::*;

        let target1 = self.target_namespace.as_deref();
        let target2 = other.target_namespace.as_deref();

        match (classify(&self.namespace), classify(&other.namespace)) {
            (_, Any) => true,
            (Any, _) => false,

            (NotAbsent, NotAbsent) => true,
            (NotAbsent, Other) => target2.is_none(),
            (NotAbsent, _) => false,

            (Other, NotAbsent) => true,
            (Other, Other) => target2.is_none() || target1 == target2,
            (Other, _) => false,

            (List(items), _) => items
                .iter()
                .all(|item| other.matches(item.resolve(target1))),

            (TargetOnly, NotAbsent) => true,
            (TargetOnly, Other) => target2.is_none() || target1 != target2,
            (TargetOnly, TargetOnly) => true,
            (TargetOnly, LocalOnly) => target1.is_none(),
            (TargetOnly, List(items)) => items
                .iter()
                .any(|item| item.resolve(target2) == target1),

            (LocalOnly, NotAbsent) => false,
            (LocalOnly, Other) => target2.is_none(),
            (LocalOnly, TargetOnly) => target2.is_none(),
            (LocalOnly, LocalOnly) => true,
            (LocalOnly, List(items)) => {
                items.iter().any(|item| item.resolve(target2).is_none())
            }
        }
    }

    /// Check if this wildcard is a valid restriction of another: the
    /// processContents must not weaken and the namespace constraint must be
    /// a subset.
    pub fn is_restriction_of(&self, other: &XsdWildcard) -> bool {
        self.process_contents.is_restriction_of(&other.process_contents)
            && self.is_subset_of(other)
    }

    /// Resolve this wildcard's enumeration to concrete values (None = absent).
    fn resolved_items(&self) -> Option<Vec<Option<String>>> {
        match &self.namespace {
            NamespaceConstraint::Enumeration(items) => Some(
                items
                    .iter()
                    .map(|item| {
                        item.resolve(self.target_namespace.as_deref())
                            .map(String::from)
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    /// The concrete namespace excluded by ##other (None when the schema has
    /// no target namespace, making ##other equivalent to not-absent).
    fn other_excluded(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Intersect two wildcards.
    ///
    /// Returns `None` for the XSD 1.0 "not expressible" case: the
    /// intersection of two ##other constraints with different, present
    /// target namespaces. The result keeps `self`'s processContents and
    /// carries the target namespace of whichever operand shaped it.
    pub fn intersect(&self, other: &XsdWildcard) -> Option<XsdWildcard> {
        let (namespace, target_namespace) = intersect_constraints(self, other)?;
        Some(XsdWildcard {
            namespace,
            process_contents: self.process_contents,
            target_namespace,
        })
    }

    /// Union two wildcards.
    ///
    /// Returns `None` for the XSD 1.0 "not expressible" case: a ##other
    /// united with an enumeration that contains the absent namespace but not
    /// the excluded one. The result keeps `self`'s processContents and
    /// carries the target namespace of whichever operand shaped it.
    pub fn union(&self, other: &XsdWildcard) -> Option<XsdWildcard> {
        let (namespace, target_namespace) = union_constraints(self, other)?;
        Some(XsdWildcard {
            namespace,
            process_contents: self.process_contents,
            target_namespace,
        })
    }
}

fn enumeration_of(values: Vec<Option<String>>) -> NamespaceConstraint {
    NamespaceConstraint::Enumeration(
        values
            .into_iter()
            .map(|v| match v {
                None => NamespaceItem::Absent,
                Some(uri) => NamespaceItem::Uri(uri),
            })
            .collect(),
    )
}

type CombineResult = Option<(NamespaceConstraint, Option<String>)>;

// A ##other with no target namespace excludes only the absent namespace
fn normalized_kind(w: &XsdWildcard) -> NamespaceConstraint {
    match (&w.namespace, w.other_excluded()) {
        (NamespaceConstraint::Other, None) => NamespaceConstraint::NotAbsent,
        (c, _) => c.clone(),
    }
}

fn intersect_constraints(w1: &XsdWildcard, w2: &XsdWildcard) -> CombineResult {
    use NamespaceConstraint::*;

    match (normalized_kind(w1), normalized_kind(w2)) {
        (Any, _) => Some((normalized_kind(w2), w2.target_namespace.clone())),
        (_, Any) => Some((normalized_kind(w1), w1.target_namespace.clone())),

        (NotAbsent, NotAbsent) => Some((NotAbsent, None)),
        (NotAbsent, Other) => Some((Other, w2.target_namespace.clone())),
        (Other, NotAbsent) => Some((Other, w1.target_namespace.clone())),

        (Other, Other) => {
            if w1.other_excluded() == w2.other_excluded() {
                Some((Other, w1.target_namespace.clone()))
            } else {
                // not {t1, absent} ∩ not {t2, absent} with t1 != t2 has no
                // single-constraint form in XSD 1.0
                None
            }
        }

        (Enumeration(_), NotAbsent) => Some((
            enumeration_of(
                w1.resolved_items()
                    .unwrap()
                    .into_iter()
                    .filter(|v| v.is_some())
                    .collect(),
            ),
            None,
        )),
        (NotAbsent, Enumeration(_)) => Some((
            enumeration_of(
                w2.resolved_items()
                    .unwrap()
                    .into_iter()
                    .filter(|v| v.is_some())
                    .collect(),
            ),
            None,
        )),

        (Enumeration(_), Other) => {
            let excluded = w2.other_excluded().map(String::from);
            Some((
                enumeration_of(
                    w1.resolved_items()
                        .unwrap()
                        .into_iter()
                        .filter(|v| v.is_some() && *v != excluded)
                        .collect(),
                ),
                None,
            ))
        }
        (Other, Enumeration(_)) => {
            let excluded = w1.other_excluded().map(String::from);
            Some((
                enumeration_of(
                    w2.resolved_items()
                        .unwrap()
                        .into_iter()
                        .filter(|v| v.is_some() && *v != excluded)
                        .collect(),
                ),
                None,
            ))
        }

        (Enumeration(_), Enumeration(_)) => {
            let left = w1.resolved_items().unwrap();
            let right = w2.resolved_items().unwrap();
            Some((
                enumeration_of(left.into_iter().filter(|v| right.contains(v)).collect()),
                None,
            ))
        }
    }
}

fn union_constraints(w1: &XsdWildcard, w2: &XsdWildcard) -> CombineResult {
    use NamespaceConstraint::*;

    match (normalized_kind(w1), normalized_kind(w2)) {
        (Any, _) | (_, Any) => Some((Any, None)),

        (NotAbsent, NotAbsent) => Some((NotAbsent, None)),
        (NotAbsent, Other) | (Other, NotAbsent) => Some((NotAbsent, None)),

        (Other, Other) => {
            if w1.other_excluded() == w2.other_excluded() {
                Some((Other, w1.target_namespace.clone()))
            } else {
                // Negations of different values unite to not-absent
                Some((NotAbsent, None))
            }
        }

        (Enumeration(_), Enumeration(_)) => {
            let mut values = w1.resolved_items().unwrap();
            for value in w2.resolved_items().unwrap() {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            Some((enumeration_of(values), None))
        }

        (Other, Enumeration(_)) => union_other_with_set(w1, w2),
        (Enumeration(_), Other) => union_other_with_set(w2, w1),
        (NotAbsent, Enumeration(_)) => union_not_absent_with_set(w2),
        (Enumeration(_), NotAbsent) => union_not_absent_with_set(w1),
    }
}

fn union_other_with_set(other: &XsdWildcard, set: &XsdWildcard) -> CombineResult {
    let excluded = other.other_excluded().map(String::from);
    let values = set.resolved_items().unwrap();
    let has_excluded = values.iter().any(|v| *v == excluded);
    let has_absent = values.iter().any(|v| v.is_none());

    match (has_excluded, has_absent) {
        (true, true) => Some((NamespaceConstraint::Any, None)),
        (true, false) => Some((NamespaceConstraint::NotAbsent, None)),
        // The set admits the absent namespace but not the excluded value:
        // XSD 1.0's union is not expressible here
        (false, true) => None,
        (false, false) => Some((NamespaceConstraint::Other, other.target_namespace.clone())),
    }
}

fn union_not_absent_with_set(set: &XsdWildcard) -> CombineResult {
    let values = set.resolved_items().unwrap();
    if values.iter().any(|v| v.is_none()) {
        Some((NamespaceConstraint::Any, None))
    } else {
        Some((NamespaceConstraint::NotAbsent, None))
    }
}

/// XSD any element wildcard (xs:any)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XsdAnyElement {
    /// Base wildcard
    pub wildcard: XsdWildcard,
    /// Occurrence constraints
    pub occurs: Occurs,
}

impl XsdAnyElement {
    /// Create a new any element wildcard
    pub fn new(wildcard: XsdWildcard, occurs: Occurs) -> Self {
        Self { wildcard, occurs }
    }

    /// Create a ##any/lax wildcard accepting zero or more elements
    pub fn any() -> Self {
        Self {
            wildcard: XsdWildcard::new(NamespaceConstraint::Any, ProcessContents::Lax, None),
            occurs: Occurs::zero_or_more(),
        }
    }

    /// Check whether a namespace matches this wildcard
    pub fn matches(&self, namespace: Option<&str>) -> bool {
        self.wildcard.matches(namespace)
    }

    /// Check if this is a valid restriction of another any element:
    /// occurrence range, processContents, and namespace subset.
    pub fn is_restriction_of(&self, other: &XsdAnyElement) -> bool {
        self.occurs.has_occurs_restriction(&other.occurs)
            && self.wildcard.is_restriction_of(&other.wildcard)
    }
}

/// XSD any attribute wildcard (xs:anyAttribute)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XsdAnyAttribute {
    /// Base wildcard
    pub wildcard: XsdWildcard,
}

impl XsdAnyAttribute {
    /// Create a new any attribute wildcard
    pub fn new(wildcard: XsdWildcard) -> Self {
        Self { wildcard }
    }

    /// Check whether a namespace matches this wildcard
    pub fn matches(&self, namespace: Option<&str>) -> bool {
        self.wildcard.matches(namespace)
    }

    /// Check if this is a valid restriction of another any attribute
    pub fn is_restriction_of(&self, other: &XsdAnyAttribute) -> bool {
        self.wildcard.is_restriction_of(&other.wildcard)
    }
}
