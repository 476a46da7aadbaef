//! Template nodes: where an identified element lives in source
//!
//! A [`TemplateNode`] stores only a location, never a copy of the element
//! text. Slicing it out of the *current* file content is only correct as
//! long as the file is reindexed after every change.

use crate::path::SandboxPath;
use serde::{Deserialize, Serialize};

/// Position in source text
///
/// `line` is 1-based, `column` is a 0-based UTF-8 byte offset within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextPosition {
    /// 1-based line
    pub line: usize,
    /// 0-based byte column
    pub column: usize,
}

impl TextPosition {
    /// Create position
    #[inline]
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Byte offset of this position in `content`
    ///
    /// Returns `None` when the position lies outside the text or splits a
    /// multi-byte character.
    #[must_use]
    pub fn to_offset(&self, content: &str) -> Option<usize> {
        if self.line == 0 {
            return None;
        }
        let mut start = 0usize;
        for _ in 1..self.line {
            let newline = content[start..].find('\n')?;
            start += newline + 1;
        }
        let line_end = content[start..]
            .find('\n')
            .map_or(content.len(), |i| start + i);
        let offset = start + self.column;
        (offset <= line_end && content.is_char_boundary(offset)).then_some(offset)
    }
}

/// Span of an opening or closing tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateTag {
    /// Tag start
    pub start: TextPosition,
    /// Tag end (exclusive)
    pub end: TextPosition,
}

/// How an element is produced at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DynamicType {
    /// Direct branch of a ternary or a logical short-circuit
    Conditional,
    /// Direct body of an array `.map` callback
    ArrayIteration,
}

/// Structural role of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoreElementType {
    /// Value returned by its enclosing component
    ComponentRoot,
    /// The document `<body>`
    DocumentBody,
}

/// Location and structural metadata for one identified element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateNode {
    /// File the element lives in
    pub path: SandboxPath,
    /// Element name as written (`div`, `Card`, `motion.div`)
    pub tag_name: String,
    /// Start of the element
    pub start_position: TextPosition,
    /// End of the element (exclusive)
    pub end_position: TextPosition,
    /// Opening tag span (the whole element when self-closing)
    pub start_tag: TemplateTag,
    /// Closing tag span, absent for self-closing elements
    pub end_tag: Option<TemplateTag>,
    /// Nearest enclosing named component
    pub component: Option<String>,
    /// Runtime production of the element
    pub dynamic_type: Option<DynamicType>,
    /// Structural role
    pub core_element_type: Option<CoreElementType>,
}

impl TemplateNode {
    /// Slice this element out of `content`
    #[must_use]
    pub fn slice<'a>(&self, content: &'a str) -> Option<&'a str> {
        let start = self.start_position.to_offset(content)?;
        let end = self.end_position.to_offset(content)?;
        content.get(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(start: TextPosition, end: TextPosition) -> TemplateNode {
        TemplateNode {
            path: "a.tsx".parse().unwrap(),
            tag_name: "div".to_string(),
            start_position: start,
            end_position: end,
            start_tag: TemplateTag { start, end },
            end_tag: None,
            component: None,
            dynamic_type: None,
            core_element_type: None,
        }
    }

    #[test]
    fn offsets_on_first_and_later_lines() {
        let content = "ab\ncdé\nf";
        assert_eq!(TextPosition::new(1, 0).to_offset(content), Some(0));
        assert_eq!(TextPosition::new(2, 1).to_offset(content), Some(4));
        assert_eq!(TextPosition::new(3, 1).to_offset(content), Some(content.len()));
    }

    #[test]
    fn offsets_out_of_range() {
        let content = "ab\ncdé";
        assert_eq!(TextPosition::new(0, 0).to_offset(content), None);
        assert_eq!(TextPosition::new(1, 3).to_offset(content), None);
        assert_eq!(TextPosition::new(5, 0).to_offset(content), None);
        // inside the two-byte é
        assert_eq!(TextPosition::new(2, 3).to_offset(content), None);
    }

    #[test]
    fn slice_multiline_element() {
        let content = "return (\n  <div>\n    Hi\n  </div>\n);";
        let n = node(TextPosition::new(2, 2), TextPosition::new(4, 8));
        assert_eq!(n.slice(content), Some("<div>\n    Hi\n  </div>"));
    }

    #[test]
    fn serializes_camel_case() {
        let mut n = node(TextPosition::new(1, 0), TextPosition::new(1, 5));
        n.dynamic_type = Some(DynamicType::ArrayIteration);
        n.core_element_type = Some(CoreElementType::ComponentRoot);
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["startPosition"]["line"], 1);
        assert_eq!(value["dynamicType"], "array-iteration");
        assert_eq!(value["coreElementType"], "component-root");
        assert!(value["endTag"].is_null());
    }
}
