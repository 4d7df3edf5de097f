//! XSD built-in type registry
//!
//! Every XSD 1.0 built-in simple type with its variety, primitive, ordering,
//! whiteSpace behavior, and the implicit bound facets the derived integer
//! types carry (`int` contributes [-2147483648, 2147483647], and so on).
//! XSD 1.1-only type ids are known solely so they can be rejected with a
//! specific diagnostic.
//!
//! Reference: https://www.w3.org/TR/xmlschema-2/#built-in-datatypes

use std::collections::HashMap;

use crate::namespaces::QName;
use crate::XSD_NAMESPACE;

use super::facets::WhiteSpace;
use super::simple_types::SimpleTypeVariety;

/// Primitive datatype a built-in ultimately derives from; selects the
/// comparator the facet engine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// xs:string and its derivations
    String,
    /// xs:boolean
    Boolean,
    /// xs:decimal and the integer tower
    Decimal,
    /// xs:float
    Float,
    /// xs:double
    Double,
    /// xs:duration (partially ordered)
    Duration,
    /// xs:dateTime
    DateTime,
    /// xs:time
    Time,
    /// xs:date
    Date,
    /// xs:gYearMonth
    GYearMonth,
    /// xs:gYear
    GYear,
    /// xs:gMonthDay
    GMonthDay,
    /// xs:gDay
    GDay,
    /// xs:gMonth
    GMonth,
    /// xs:hexBinary
    HexBinary,
    /// xs:base64Binary
    Base64Binary,
    /// xs:anyURI
    AnyUri,
    /// xs:QName
    QName,
    /// xs:NOTATION
    Notation,
}

impl Primitive {
    /// Whether values of this primitive have an order the range facets can
    /// use. Duration counts as ordered (partially).
    pub fn is_ordered(&self) -> bool {
        !matches!(
            self,
            Self::String
                | Self::Boolean
                | Self::HexBinary
                | Self::Base64Binary
                | Self::AnyUri
                | Self::QName
                | Self::Notation
        )
    }

    /// Whether the length facets measure values of this primitive
    pub fn has_length(&self) -> bool {
        matches!(
            self,
            Self::String
                | Self::HexBinary
                | Self::Base64Binary
                | Self::AnyUri
                | Self::QName
                | Self::Notation
        )
    }
}

/// One XSD built-in simple type
#[derive(Debug)]
pub struct BuiltinType {
    /// Local name in the XSD namespace
    pub name: &'static str,
    /// Base type local name (None for anySimpleType)
    pub base: Option<&'static str>,
    /// Ultimate primitive
    pub primitive: Primitive,
    /// Variety (the three built-in list types are List)
    pub variety: SimpleTypeVariety,
    /// whiteSpace behavior
    pub white_space: WhiteSpace,
    /// Implicit minInclusive bound (lexical)
    pub min_bound: Option<&'static str>,
    /// Implicit maxInclusive bound (lexical)
    pub max_bound: Option<&'static str>,
}

impl BuiltinType {
    /// Qualified name of this builtin
    pub fn qname(&self) -> QName {
        QName::namespaced(XSD_NAMESPACE, self.name)
    }
}

const fn atomic(
    name: &'static str,
    base: Option<&'static str>,
    primitive: Primitive,
    white_space: WhiteSpace,
) -> BuiltinType {
    BuiltinType {
        name,
        base,
        primitive,
        variety: SimpleTypeVariety::Atomic,
        white_space,
        min_bound: None,
        max_bound: None,
    }
}

const fn list(name: &'static str, item: &'static str) -> BuiltinType {
    BuiltinType {
        name,
        base: Some(item),
        primitive: Primitive::String,
        variety: SimpleTypeVariety::List,
        white_space: WhiteSpace::Collapse,
        min_bound: None,
        max_bound: None,
    }
}

const fn integer(
    name: &'static str,
    base: &'static str,
    min_bound: Option<&'static str>,
    max_bound: Option<&'static str>,
) -> BuiltinType {
    BuiltinType {
        name,
        base: Some(base),
        primitive: Primitive::Decimal,
        variety: SimpleTypeVariety::Atomic,
        white_space: WhiteSpace::Collapse,
        min_bound,
        max_bound,
    }
}

static BUILTIN_TYPES: &[BuiltinType] = &[
    atomic("anySimpleType", None, Primitive::String, WhiteSpace::Preserve),
    // Primitives
    atomic("string", Some("anySimpleType"), Primitive::String, WhiteSpace::Preserve),
    atomic("boolean", Some("anySimpleType"), Primitive::Boolean, WhiteSpace::Collapse),
    atomic("decimal", Some("anySimpleType"), Primitive::Decimal, WhiteSpace::Collapse),
    atomic("float", Some("anySimpleType"), Primitive::Float, WhiteSpace::Collapse),
    atomic("double", Some("anySimpleType"), Primitive::Double, WhiteSpace::Collapse),
    atomic("duration", Some("anySimpleType"), Primitive::Duration, WhiteSpace::Collapse),
    atomic("dateTime", Some("anySimpleType"), Primitive::DateTime, WhiteSpace::Collapse),
    atomic("time", Some("anySimpleType"), Primitive::Time, WhiteSpace::Collapse),
    atomic("date", Some("anySimpleType"), Primitive::Date, WhiteSpace::Collapse),
    atomic("gYearMonth", Some("anySimpleType"), Primitive::GYearMonth, WhiteSpace::Collapse),
    atomic("gYear", Some("anySimpleType"), Primitive::GYear, WhiteSpace::Collapse),
    atomic("gMonthDay", Some("anySimpleType"), Primitive::GMonthDay, WhiteSpace::Collapse),
    atomic("gDay", Some("anySimpleType"), Primitive::GDay, WhiteSpace::Collapse),
    atomic("gMonth", Some("anySimpleType"), Primitive::GMonth, WhiteSpace::Collapse),
    atomic("hexBinary", Some("anySimpleType"), Primitive::HexBinary, WhiteSpace::Collapse),
    atomic("base64Binary", Some("anySimpleType"), Primitive::Base64Binary, WhiteSpace::Collapse),
    atomic("anyURI", Some("anySimpleType"), Primitive::AnyUri, WhiteSpace::Collapse),
    atomic("QName", Some("anySimpleType"), Primitive::QName, WhiteSpace::Collapse),
    atomic("NOTATION", Some("anySimpleType"), Primitive::Notation, WhiteSpace::Collapse),
    // String tower
    atomic("normalizedString", Some("string"), Primitive::String, WhiteSpace::Replace),
    atomic("token", Some("normalizedString"), Primitive::String, WhiteSpace::Collapse),
    atomic("language", Some("token"), Primitive::String, WhiteSpace::Collapse),
    atomic("NMTOKEN", Some("token"), Primitive::String, WhiteSpace::Collapse),
    atomic("Name", Some("token"), Primitive::String, WhiteSpace::Collapse),
    atomic("NCName", Some("Name"), Primitive::String, WhiteSpace::Collapse),
    atomic("ID", Some("NCName"), Primitive::String, WhiteSpace::Collapse),
    atomic("IDREF", Some("NCName"), Primitive::String, WhiteSpace::Collapse),
    atomic("ENTITY", Some("NCName"), Primitive::String, WhiteSpace::Collapse),
    // Built-in list types
    list("NMTOKENS", "NMTOKEN"),
    list("IDREFS", "IDREF"),
    list("ENTITIES", "ENTITY"),
    // Integer tower with implicit bounds
    integer("integer", "decimal", None, None),
    integer("nonPositiveInteger", "integer", None, Some("0")),
    integer("negativeInteger", "nonPositiveInteger", None, Some("-1")),
    integer(
        "long",
        "integer",
        Some("-9223372036854775808"),
        Some("9223372036854775807"),
    ),
    integer("int", "long", Some("-2147483648"), Some("2147483647")),
    integer("short", "int", Some("-32768"), Some("32767")),
    integer("byte", "short", Some("-128"), Some("127")),
    integer("nonNegativeInteger", "integer", Some("0"), None),
    integer(
        "unsignedLong",
        "nonNegativeInteger",
        Some("0"),
        Some("18446744073709551615"),
    ),
    integer("unsignedInt", "unsignedLong", Some("0"), Some("4294967295")),
    integer("unsignedShort", "unsignedInt", Some("0"), Some("65535")),
    integer("unsignedByte", "unsignedShort", Some("0"), Some("255")),
    integer("positiveInteger", "nonNegativeInteger", Some("1"), None),
];

/// Type ids that only exist in XSD 1.1; the checker rejects them.
pub const XSD_11_BUILTIN_IDS: &[&str] = &[
    "anyAtomicType",
    "dateTimeStamp",
    "dayTimeDuration",
    "yearMonthDuration",
    "precisionDecimal",
    "error",
];

lazy_static::lazy_static! {
    static ref BUILTIN_MAP: HashMap<&'static str, &'static BuiltinType> = {
        let mut m = HashMap::new();
        for builtin in BUILTIN_TYPES {
            m.insert(builtin.name, builtin);
        }
        m
    };

    /// The `xs:anyType` qualified name
    pub static ref XS_ANY_TYPE: QName = QName::namespaced(XSD_NAMESPACE, "anyType");
    /// The `xs:anySimpleType` qualified name
    pub static ref XS_ANY_SIMPLE_TYPE: QName = QName::namespaced(XSD_NAMESPACE, "anySimpleType");
}

/// Look up a built-in type by local name
pub fn get_builtin(name: &str) -> Option<&'static BuiltinType> {
    BUILTIN_MAP.get(name).copied()
}

/// Look up a built-in type by qualified name (must be in the XSD namespace)
pub fn get_builtin_by_qname(qname: &QName) -> Option<&'static BuiltinType> {
    match qname.namespace.as_deref() {
        Some(XSD_NAMESPACE) => get_builtin(&qname.local_name),
        _ => None,
    }
}

/// Check whether a name is an XSD 1.1-only built-in id
pub fn is_xsd11_builtin(name: &str) -> bool {
    XSD_11_BUILTIN_IDS.contains(&name)
}

/// Walk base links from a built-in toward anySimpleType, checking for an
/// ancestor (or self) with the given local name.
pub fn is_builtin_derived_from(builtin: &BuiltinType, ancestor: &str) -> bool {
    let mut current = Some(builtin);
    while let Some(bt) = current {
        if bt.name == ancestor {
            return true;
        }
        current = bt.base.and_then(get_builtin);
    }
    false
}

/// Collect the implicit bound facets contributed by a built-in and its
/// ancestors: the nearest declared bound of each kind wins.
pub fn implicit_bounds(builtin: &BuiltinType) -> (Option<&'static str>, Option<&'static str>) {
    let mut min = None;
    let mut max = None;
    let mut current = Some(builtin);
    while let Some(bt) = current {
        if min.is_none() {
            min = bt.min_bound;
        }
        if max.is_none() {
            max = bt.max_bound;
        }
        current = bt.base.and_then(get_builtin);
    }
    (min, max)
}
