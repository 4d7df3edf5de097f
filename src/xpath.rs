//! Restricted XPath subset for identity constraints
//!
//! XSD selector and field expressions use a small XPath subset: an optional
//! `.//` prefix, `/`-separated child steps (`child::` axis allowed), `.`
//! steps, name tests with optional prefixes, and - for fields only - a final
//! attribute test. This module parses that subset and reports which rule an
//! expression violates.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#coss-identity-constraint

use crate::error::XPathError;
use crate::namespaces::{NamespaceContext, QName};

/// Axis of a parsed step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// The child:: axis (explicit or implied)
    Child,
    /// The attribute:: axis (`@name` or `attribute::name`)
    Attribute,
}

/// Node test of a parsed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// The context node (`.`)
    SelfNode,
    /// Any element/attribute (`*`)
    Any,
    /// Any name in a namespace (`ns:*`)
    NamespaceWildcard(String),
    /// A specific name, prefix already resolved
    Name(QName),
}

/// One step of a path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Step axis
    pub axis: Axis,
    /// Step node test
    pub test: NodeTest,
}

/// A single path of a selector/field expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    /// Whether the path started with `.//`
    pub descendant: bool,
    /// The steps, in document order
    pub steps: Vec<Step>,
}

/// A parsed selector or field expression: one or more `|`-separated paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPath {
    /// The alternative paths
    pub paths: Vec<PathExpr>,
}

/// Parse a selector xpath expression.
///
/// Attribute tests are rejected outright.
pub fn parse_selector(expr: &str, ctx: &NamespaceContext) -> Result<IdentityPath, XPathError> {
    let path = parse_paths(expr, ctx, false)?;
    Ok(path)
}

/// Parse a field xpath expression.
///
/// An attribute test is permitted, but only as the final step of a path.
pub fn parse_field(expr: &str, ctx: &NamespaceContext) -> Result<IdentityPath, XPathError> {
    let path = parse_paths(expr, ctx, true)?;
    Ok(path)
}

fn parse_paths(
    expr: &str,
    ctx: &NamespaceContext,
    allow_attribute: bool,
) -> Result<IdentityPath, XPathError> {
    if expr.trim().is_empty() {
        return Err(XPathError::Empty);
    }

    let mut paths = Vec::new();
    for alternative in expr.split('|') {
        paths.push(parse_path(alternative.trim(), ctx, allow_attribute)?);
    }
    Ok(IdentityPath { paths })
}

fn parse_path(
    path: &str,
    ctx: &NamespaceContext,
    allow_attribute: bool,
) -> Result<PathExpr, XPathError> {
    if path.is_empty() {
        return Err(XPathError::Empty);
    }

    let (descendant, rest) = match path.strip_prefix(".//") {
        Some(rest) => (true, rest),
        None => (false, path),
    };
    if rest.is_empty() {
        return Err(XPathError::BadStep(path.to_string()));
    }

    let raw_steps: Vec<&str> = rest.split('/').map(str::trim).collect();
    let last = raw_steps.len() - 1;

    let mut steps = Vec::with_capacity(raw_steps.len());
    for (i, raw) in raw_steps.iter().enumerate() {
        let step = parse_step(raw, ctx)?;
        if step.axis == Axis::Attribute {
            if !allow_attribute {
                return Err(XPathError::AttributeNotAllowed);
            }
            if i != last {
                return Err(XPathError::AttributeNotLast);
            }
        }
        steps.push(step);
    }

    Ok(PathExpr { descendant, steps })
}

fn parse_step(raw: &str, ctx: &NamespaceContext) -> Result<Step, XPathError> {
    if raw.is_empty() {
        // An empty step means "//" appeared mid-path, which the subset forbids
        return Err(XPathError::BadStep("//".to_string()));
    }
    if raw == ".." || raw.starts_with("../") {
        return Err(XPathError::ParentNavigation);
    }
    if raw == "." {
        return Ok(Step {
            axis: Axis::Child,
            test: NodeTest::SelfNode,
        });
    }

    // Explicit axis?
    let (axis, rest) = if let Some(rest) = raw.strip_prefix("child::") {
        (Axis::Child, rest)
    } else if let Some(rest) = raw.strip_prefix("attribute::") {
        (Axis::Attribute, rest)
    } else if let Some(rest) = raw.strip_prefix('@') {
        (Axis::Attribute, rest)
    } else if let Some((axis_name, _)) = raw.split_once("::") {
        return Err(XPathError::ForbiddenAxis(axis_name.to_string()));
    } else {
        (Axis::Child, raw)
    };

    // Node-kind tests (text(), node(), comment(), ...) are outside the subset
    if rest.contains('(') {
        return Err(XPathError::ForbiddenNodeTest(rest.to_string()));
    }
    if rest == ".." {
        return Err(XPathError::ParentNavigation);
    }

    let test = parse_name_test(rest, ctx)?;
    Ok(Step { axis, test })
}

fn parse_name_test(raw: &str, ctx: &NamespaceContext) -> Result<NodeTest, XPathError> {
    if raw.is_empty() {
        return Err(XPathError::BadStep(raw.to_string()));
    }
    if raw == "*" {
        return Ok(NodeTest::Any);
    }

    if let Some((prefix, local)) = raw.split_once(':') {
        let namespace = ctx
            .get_namespace(prefix)
            .ok_or_else(|| XPathError::BadStep(raw.to_string()))?;
        if local == "*" {
            return Ok(NodeTest::NamespaceWildcard(namespace.to_string()));
        }
        if !crate::names::is_valid_ncname(local) {
            return Err(XPathError::BadStep(raw.to_string()));
        }
        return Ok(NodeTest::Name(QName::namespaced(namespace, local)));
    }

    if !crate::names::is_valid_ncname(raw) {
        return Err(XPathError::BadStep(raw.to_string()));
    }
    // Unprefixed names in identity-constraint paths are in no namespace
    Ok(NodeTest::Name(QName::local(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> NamespaceContext {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("p", "http://example.com/parts");
        ctx
    }

    #[test]
    fn test_selector_simple() {
        let path = parse_selector("p:part", &ctx()).unwrap();
        assert_eq!(path.paths.len(), 1);
        assert!(!path.paths[0].descendant);
        assert_eq!(
            path.paths[0].steps[0].test,
            NodeTest::Name(QName::namespaced("http://example.com/parts", "part"))
        );
    }

    #[test]
    fn test_selector_descendant_prefix() {
        let path = parse_selector(".//p:part/p:item", &ctx()).unwrap();
        assert!(path.paths[0].descendant);
        assert_eq!(path.paths[0].steps.len(), 2);
    }

    #[test]
    fn test_selector_alternatives() {
        let path = parse_selector("p:a | p:b", &ctx()).unwrap();
        assert_eq!(path.paths.len(), 2);
    }

    #[test]
    fn test_selector_child_axis() {
        let path = parse_selector("child::p:part", &ctx()).unwrap();
        assert_eq!(path.paths[0].steps[0].axis, Axis::Child);
    }

    #[test]
    fn test_selector_rejects_attribute() {
        assert_eq!(
            parse_selector("@code", &ctx()),
            Err(XPathError::AttributeNotAllowed)
        );
        assert_eq!(
            parse_selector("attribute::code", &ctx()),
            Err(XPathError::AttributeNotAllowed)
        );
    }

    #[test]
    fn test_selector_rejects_parent() {
        assert_eq!(
            parse_selector("../part", &ctx()),
            Err(XPathError::ParentNavigation)
        );
    }

    #[test]
    fn test_selector_rejects_text() {
        assert_eq!(
            parse_selector("part/text()", &ctx()),
            Err(XPathError::ForbiddenNodeTest("text()".to_string()))
        );
    }

    #[test]
    fn test_selector_rejects_forbidden_axis() {
        assert_eq!(
            parse_selector("descendant::part", &ctx()),
            Err(XPathError::ForbiddenAxis("descendant".to_string()))
        );
    }

    #[test]
    fn test_selector_rejects_empty() {
        assert_eq!(parse_selector("", &ctx()), Err(XPathError::Empty));
        assert_eq!(parse_selector("   ", &ctx()), Err(XPathError::Empty));
    }

    #[test]
    fn test_field_attribute_final() {
        let path = parse_field("p:part/@code", &ctx()).unwrap();
        let steps = &path.paths[0].steps;
        assert_eq!(steps[1].axis, Axis::Attribute);
    }

    #[test]
    fn test_field_attribute_not_last() {
        assert_eq!(
            parse_field("@code/p:part", &ctx()),
            Err(XPathError::AttributeNotLast)
        );
    }

    #[test]
    fn test_field_self_step() {
        let path = parse_field(".", &ctx()).unwrap();
        assert_eq!(path.paths[0].steps[0].test, NodeTest::SelfNode);
    }

    #[test]
    fn test_mid_path_descendant_rejected() {
        assert!(matches!(
            parse_selector("a//b", &ctx()),
            Err(XPathError::BadStep(_))
        ));
    }

    #[test]
    fn test_unknown_prefix_rejected() {
        assert!(matches!(
            parse_selector("q:part", &ctx()),
            Err(XPathError::BadStep(_))
        ));
    }
}
