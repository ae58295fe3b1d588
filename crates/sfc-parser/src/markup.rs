//! Location-annotated markup tree.
//!
//! Every node carries the [`Span`] of the source that produced it: absolute
//! byte offsets plus 1-based line and column of the start. Elements also
//! carry the spans of their start and end tags.

use serde::Serialize;
use sfc_lexer::Span;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MarkupNode {
    Document(Vec<MarkupNode>),
    Fragment(Vec<MarkupNode>),
    Doctype { name: String, span: Span },
    CData { data: String, span: Span },
    /// `data` is the body between `<!--` and `-->`.
    Comment { data: String, span: Span },
    /// `value` has character references decoded.
    Text { value: String, span: Span },
    Element(MarkupElement),
}

impl MarkupNode {
    /// Children of a document, fragment or element; an element that has a
    /// `content` fragment yields that instead.
    pub fn children(&self) -> &[MarkupNode] {
        match self {
            MarkupNode::Document(children) | MarkupNode::Fragment(children) => children,
            MarkupNode::Element(element) => element.child_nodes(),
            _ => &[],
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            MarkupNode::Document(_) | MarkupNode::Fragment(_) => None,
            MarkupNode::Doctype { span, .. }
            | MarkupNode::CData { span, .. }
            | MarkupNode::Comment { span, .. }
            | MarkupNode::Text { span, .. } => Some(*span),
            MarkupNode::Element(element) => Some(element.span),
        }
    }

    pub fn as_element(&self) -> Option<&MarkupElement> {
        match self {
            MarkupNode::Element(element) => Some(element),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkupElement {
    /// Tag name as written.
    pub name: String,
    pub attrs: Vec<MarkupAttr>,
    pub children: Vec<MarkupNode>,
    /// Children of a `template` element live here instead of `children`.
    pub content: Option<Vec<MarkupNode>>,
    pub self_closing: bool,
    pub span: Span,
    pub start_tag: Span,
    /// Absent for void, self-closing and implicitly closed elements.
    pub end_tag: Option<Span>,
}

impl MarkupElement {
    pub fn child_nodes(&self) -> &[MarkupNode] {
        self.content.as_deref().unwrap_or(&self.children)
    }

    /// Whether the tag name matches `name`, ignoring ASCII case.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// The first attribute named `name`, ignoring ASCII case.
    pub fn attr(&self, name: &str) -> Option<&MarkupAttr> {
        self.attrs.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkupAttr {
    pub name: String,
    /// Decoded value; `None` for a bare attribute.
    pub value: Option<String>,
    pub span: Span,
}
