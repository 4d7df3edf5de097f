//! Validator helper types
//!
//! Shared bits used across the validators: the derivation-control sets
//! parsed from `final`/`block` attributes and whiteSpace-normalized value
//! comparison for fixed/default values.

use super::facets::WhiteSpace;

/// XSD final attribute values
pub const XSD_FINAL_ATTRIBUTE_VALUES: &[&str] =
    &["restriction", "extension", "list", "union", "substitution"];

/// A single derivation control keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// Derivation by extension
    Extension,
    /// Derivation by restriction
    Restriction,
    /// Derivation by list construction
    List,
    /// Derivation by union construction
    Union,
    /// Element substitution
    Substitution,
}

impl std::fmt::Display for Derivation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extension => write!(f, "extension"),
            Self::Restriction => write!(f, "restriction"),
            Self::List => write!(f, "list"),
            Self::Union => write!(f, "union"),
            Self::Substitution => write!(f, "substitution"),
        }
    }
}

/// A set of derivation controls, as carried by `final` and `block`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DerivationSet {
    /// Controls restriction
    pub restriction: bool,
    /// Controls extension
    pub extension: bool,
    /// Controls list derivation
    pub list: bool,
    /// Controls union derivation
    pub union: bool,
    /// Controls substitution
    pub substitution: bool,
}

impl DerivationSet {
    /// The empty set
    pub fn none() -> Self {
        Self::default()
    }

    /// The `#all` set
    pub fn all() -> Self {
        Self {
            restriction: true,
            extension: true,
            list: true,
            union: true,
            substitution: true,
        }
    }

    /// Parse from a `final`/`block` attribute value
    pub fn from_attr(value: &str) -> Self {
        let mut set = Self::default();
        for token in value.split_whitespace() {
            match token {
                "#all" => return Self::all(),
                "restriction" => set.restriction = true,
                "extension" => set.extension = true,
                "list" => set.list = true,
                "union" => set.union = true,
                "substitution" => set.substitution = true,
                _ => {}
            }
        }
        set
    }

    /// Check whether a derivation control is in the set
    pub fn contains(&self, derivation: Derivation) -> bool {
        match derivation {
            Derivation::Restriction => self.restriction,
            Derivation::Extension => self.extension,
            Derivation::List => self.list,
            Derivation::Union => self.union,
            Derivation::Substitution => self.substitution,
        }
    }

    /// Check whether this set contains every control of `other`
    pub fn is_superset_of(&self, other: &DerivationSet) -> bool {
        (!other.restriction || self.restriction)
            && (!other.extension || self.extension)
            && (!other.list || self.list)
            && (!other.union || self.union)
            && (!other.substitution || self.substitution)
    }

    /// Union with another set
    pub fn union_with(&self, other: &DerivationSet) -> Self {
        Self {
            restriction: self.restriction || other.restriction,
            extension: self.extension || other.extension,
            list: self.list || other.list,
            union: self.union || other.union,
            substitution: self.substitution || other.substitution,
        }
    }
}

/// Compare two lexical values for equality after whiteSpace normalization.
///
/// Used for fixed-value agreement along derivation chains, where the
/// normalization mode comes from the declared type of the component.
pub fn normalized_equal(a: &str, b: &str, white_space: WhiteSpace) -> bool {
    white_space.normalize(a) == white_space.normalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_set_from_attr() {
        let set = DerivationSet::from_attr("restriction extension");
        assert!(set.restriction);
        assert!(set.extension);
        assert!(!set.list);

        let all = DerivationSet::from_attr("#all");
        assert_eq!(all, DerivationSet::all());

        let empty = DerivationSet::from_attr("");
        assert_eq!(empty, DerivationSet::none());
    }

    #[test]
    fn test_derivation_set_contains() {
        let set = DerivationSet::from_attr("substitution");
        assert!(set.contains(Derivation::Substitution));
        assert!(!set.contains(Derivation::Extension));
    }

    #[test]
    fn test_derivation_set_superset() {
        let big = DerivationSet::from_attr("restriction extension");
        let small = DerivationSet::from_attr("extension");
        assert!(big.is_superset_of(&small));
        assert!(!small.is_superset_of(&big));
        assert!(small.is_superset_of(&DerivationSet::none()));
    }

    #[test]
    fn test_derivation_set_union() {
        let a = DerivationSet::from_attr("restriction");
        let b = DerivationSet::from_attr("substitution");
        let merged = a.union_with(&b);
        assert!(merged.restriction);
        assert!(merged.substitution);
        assert!(!merged.extension);
    }

    #[test]
    fn test_normalized_equal() {
        assert!(normalized_equal(" a  b ", "a b", WhiteSpace::Collapse));
        assert!(!normalized_equal(" a  b ", "a b", WhiteSpace::Preserve));
        assert!(normalized_equal("a\tb", "a b", WhiteSpace::Replace));
    }
}
