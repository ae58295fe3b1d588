//! Markup tree builder.
//!
//! Nests the flat token stream from [`sfc_lexer::Scanner`] into a
//! [`MarkupNode`] tree. Neither the scanner nor the builder ever rejects
//! markup.
//!
//! - void elements and self-closing tags never take children;
//! - an end tag closes the nearest open element with the same name, and
//!   implicitly closes every element opened after it;
//! - an end tag with no open counterpart is dropped;
//! - elements still open at the end of input are closed implicitly.

use html_escape::decode_html_entities;
use sfc_lexer::token::is_void_element;
use sfc_lexer::{AttrToken, MarkupKind, MarkupToken, Scanner, Span, StartTag};
use tracing::debug;

use crate::markup::{MarkupAttr, MarkupElement, MarkupNode};

/// Markup tree builder.
pub struct MarkupParser<'a> {
    source: &'a str,
    open: Vec<MarkupElement>,
    nodes: Vec<MarkupNode>,
}

impl<'a> MarkupParser<'a> {
    /// Create a new builder over `source`.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            open: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Parse a whole document into a [`MarkupNode::Document`].
    pub fn parse(source: &str) -> MarkupNode {
        let tokens = Scanner::tokenize(source);
        MarkupNode::Document(MarkupParser::new(source).build(tokens))
    }

    /// Parse a snippet into a [`MarkupNode::Fragment`].
    pub fn parse_fragment(source: &str) -> MarkupNode {
        let tokens = Scanner::tokenize(source);
        MarkupNode::Fragment(MarkupParser::new(source).build(tokens))
    }

    /// Nest `tokens` and return the top-level nodes.
    pub fn build(mut self, tokens: Vec<MarkupToken>) -> Vec<MarkupNode> {
        for token in tokens {
            self.process(token);
        }
        while let Some(element) = self.open.pop() {
            self.close(element, None);
        }
        self.nodes
    }

    fn process(&mut self, token: MarkupToken) {
        let span = token.span;
        match token.kind {
            MarkupKind::StartTag(tag) => self.open_element(tag, span),
            MarkupKind::EndTag { name } => self.end_tag(&name, span),
            MarkupKind::Text => {
                let raw = &self.source[span.start..span.end];
                let value = if self.in_raw_text() {
                    raw.to_string()
                } else {
                    decode_html_entities(raw).into_owned()
                };
                self.append(MarkupNode::Text { value, span });
            }
            MarkupKind::Comment { data } => self.append(MarkupNode::Comment { data, span }),
            MarkupKind::Doctype { name } => self.append(MarkupNode::Doctype { name, span }),
            MarkupKind::CData { data } => self.append(MarkupNode::CData { data, span }),
        }
    }

    // =========================================================================
    // Elements
    // =========================================================================

    fn open_element(&mut self, tag: StartTag, span: Span) {
        let StartTag {
            name,
            attrs,
            self_closing,
        } = tag;

        let content = name.eq_ignore_ascii_case("template").then(Vec::new);
        let element = MarkupElement {
            attrs: dedup_attrs(attrs),
            children: Vec::new(),
            content,
            self_closing,
            span,
            start_tag: span,
            end_tag: None,
            name,
        };

        if self_closing || is_void_element(&element.name) {
            self.append(MarkupNode::Element(element));
        } else {
            self.open.push(element);
        }
    }

    fn end_tag(&mut self, name: &str, span: Span) {
        let Some(index) = self.open.iter().rposition(|e| e.is(name)) else {
            debug!(name, offset = span.start, "dropping unmatched end tag");
            return;
        };

        while self.open.len() > index + 1 {
            if let Some(element) = self.open.pop() {
                debug!(name = %element.name, offset = element.span.start, "closing element implicitly");
                self.close(element, None);
            }
        }
        if let Some(element) = self.open.pop() {
            self.close(element, Some(span));
        }
    }

    /// Finish `element` and attach it to its parent.
    fn close(&mut self, mut element: MarkupElement, end_tag: Option<Span>) {
        let end = match end_tag {
            Some(tag) => tag.end,
            None => element
                .child_nodes()
                .last()
                .and_then(MarkupNode::span)
                .map_or(element.start_tag.end, |span| span.end),
        };
        let start = element.start_tag;
        element.span = Span::new(start.start, end, start.line, start.column);
        element.end_tag = end_tag;
        self.append(MarkupNode::Element(element));
    }

    fn append(&mut self, node: MarkupNode) {
        match self.open.last_mut() {
            Some(parent) => match parent.content.as_mut() {
                Some(content) => content.push(node),
                None => parent.children.push(node),
            },
            None => self.nodes.push(node),
        }
    }

    /// Whether text here belongs to a `script` or `style` element and is
    /// kept verbatim.
    fn in_raw_text(&self) -> bool {
        self.open
            .last()
            .is_some_and(|e| e.is("script") || e.is("style"))
    }
}

/// Decode attribute values and drop repeated names, keeping the first.
fn dedup_attrs(attrs: Vec<AttrToken>) -> Vec<MarkupAttr> {
    let mut result: Vec<MarkupAttr> = Vec::with_capacity(attrs.len());
    for attr in attrs {
        if result.iter().any(|a| a.name.eq_ignore_ascii_case(&attr.name)) {
            debug!(name = %attr.name, "dropping duplicate attribute");
            continue;
        }
        result.push(MarkupAttr {
            value: attr.value.map(|v| decode_html_entities(&v).into_owned()),
            name: attr.name,
            span: attr.span,
        });
    }
    result
}
