//! Tree-sitter helpers shared by identifier assignment and mapping

use crate::error::IndexError;
use crate::language::SourceLanguage;
use sandbox_core::constants::OID_ATTRIBUTE;
use sandbox_core::TextPosition;
use tree_sitter::{Node, Point, Tree};

/// Parse source, refusing trees that contain error or missing nodes
pub(crate) fn parse(source: &str, language: SourceLanguage) -> Result<Tree, IndexError> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language.tree_sitter_language())
        .map_err(|e| IndexError::ParserInit(e.to_string()))?;

    let tree = parser.parse(source, None).ok_or(IndexError::ParseFailed)?;

    let root = tree.root_node();
    if root.has_error() {
        let at = first_error(root).map_or(root.start_position(), |n| n.start_position());
        return Err(IndexError::SyntaxError {
            line: at.row + 1,
            column: at.column,
        });
    }
    Ok(tree)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

/// Convert a tree-sitter point to a 1-based line position
pub(crate) fn position(point: Point) -> TextPosition {
    TextPosition::new(point.row + 1, point.column)
}

/// Text of a node
pub(crate) fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Whether `child` is the node stored under `field` of `parent`
pub(crate) fn is_field(parent: Node<'_>, field: &str, child: Node<'_>) -> bool {
    parent
        .child_by_field_name(field)
        .is_some_and(|n| n.id() == child.id())
}

/// A JSX element in either of its two syntactic shapes
#[derive(Debug, Clone, Copy)]
pub(crate) struct JsxElement<'t> {
    /// `jsx_element` or `jsx_self_closing_element`
    pub(crate) element: Node<'t>,
    /// Node holding the name and attributes
    pub(crate) opening: Node<'t>,
    pub(crate) closing: Option<Node<'t>>,
}

impl<'t> JsxElement<'t> {
    pub(crate) fn from_node(node: Node<'t>) -> Option<Self> {
        match node.kind() {
            "jsx_element" => Some(Self {
                element: node,
                opening: node.child_by_field_name("open_tag")?,
                closing: node.child_by_field_name("close_tag"),
            }),
            "jsx_self_closing_element" => Some(Self {
                element: node,
                opening: node,
                closing: None,
            }),
            _ => None,
        }
    }

    /// Tag name as written, absent for `<>` fragments
    pub(crate) fn tag_name<'s>(&self, source: &'s str) -> Option<&'s str> {
        self.opening
            .child_by_field_name("name")
            .map(|n| text(n, source))
    }

    /// `<>`, `<Fragment>` and `<React.Fragment>` never carry identifiers
    pub(crate) fn is_fragment(&self, source: &str) -> bool {
        match self.tag_name(source) {
            None => true,
            Some(name) => matches!(name, "Fragment" | "React.Fragment"),
        }
    }

    /// The `data-oid` attribute, if present
    pub(crate) fn oid_attribute(&self, source: &str) -> Option<OidAttribute<'t>> {
        let mut cursor = self.opening.walk();
        let attributes: Vec<Node<'t>> = self
            .opening
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "jsx_attribute")
            .collect();

        attributes.into_iter().find_map(|attribute| {
            let mut cursor = attribute.walk();
            let mut parts = attribute.named_children(&mut cursor);
            let name = parts.next()?;
            if text(name, source) != OID_ATTRIBUTE {
                return None;
            }
            Some(OidAttribute {
                attribute,
                value: parts.next(),
            })
        })
    }

    /// Byte offset where a new attribute is inserted
    ///
    /// Directly after the last attribute, or after the name when there are
    /// none, so `<div>` becomes `<div data-oid="…">` and `<img />` becomes
    /// `<img data-oid="…" />`.
    pub(crate) fn insertion_point(&self) -> usize {
        let mut cursor = self.opening.walk();
        self.opening
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .last()
            .map_or_else(|| self.opening.start_byte() + 1, |n| n.end_byte())
    }
}

/// A `data-oid` attribute and its value node
#[derive(Debug, Clone, Copy)]
pub(crate) struct OidAttribute<'t> {
    pub(crate) attribute: Node<'t>,
    pub(crate) value: Option<Node<'t>>,
}

impl OidAttribute<'_> {
    /// Literal string value, if the attribute is `data-oid="…"`
    pub(crate) fn literal<'s>(&self, source: &'s str) -> Option<&'s str> {
        let value = self.value?;
        if value.kind() != "string" {
            return None;
        }
        let raw = text(value, source);
        raw.get(1..raw.len().saturating_sub(1))
    }
}

/// Visit every JSX element in document order
pub(crate) fn elements(root: Node<'_>) -> Vec<JsxElement<'_>> {
    let mut found = Vec::new();
    let mut cursor = root.walk();
    loop {
        if let Some(element) = JsxElement::from_node(cursor.node()) {
            found.push(element);
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return found;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_tsx() {
        let tree = parse("const a = <div className=\"x\">{b}</div>;", SourceLanguage::Tsx);
        assert!(tree.is_ok());
    }

    #[test]
    fn parse_reports_syntax_errors() {
        let err = parse("export default function App( { return <div> }", SourceLanguage::Tsx)
            .unwrap_err();
        assert!(matches!(err, IndexError::SyntaxError { .. }));
    }

    #[test]
    fn finds_elements_in_document_order() {
        let source = "const a = <main><h1>T</h1><img src=\"x\" /></main>;";
        let tree = parse(source, SourceLanguage::Tsx).unwrap();
        let names: Vec<&str> = elements(tree.root_node())
            .iter()
            .filter_map(|e| e.tag_name(source))
            .collect();
        assert_eq!(names, vec!["main", "h1", "img"]);
    }

    #[test]
    fn fragments_are_detected() {
        let source = "const a = <><React.Fragment><p /></React.Fragment></>;";
        let tree = parse(source, SourceLanguage::Tsx).unwrap();
        let found = elements(tree.root_node());
        let flags: Vec<bool> = found.iter().map(|e| e.is_fragment(source)).collect();
        assert_eq!(flags, vec![true, true, false]);
    }

    #[test]
    fn reads_oid_literal() {
        let source = "const a = <div id=\"k\" data-oid=\"abc1234\">x</div>;";
        let tree = parse(source, SourceLanguage::Tsx).unwrap();
        let element = elements(tree.root_node())[0];
        let attr = element.oid_attribute(source).unwrap();
        assert_eq!(attr.literal(source), Some("abc1234"));
    }

    #[test]
    fn insertion_after_last_attribute() {
        let source = "const a = <img src=\"x\" />;";
        let tree = parse(source, SourceLanguage::Tsx).unwrap();
        let element = elements(tree.root_node())[0];
        let at = element.insertion_point();
        assert_eq!(&source[..at], "const a = <img src=\"x\"");
    }
}
