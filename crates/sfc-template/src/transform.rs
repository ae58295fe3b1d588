//! Template transformer.
//!
//! Walks a markup tree once, in document order, building the node arena and
//! the token store side by side. Every node boundary is also a token
//! boundary; `<div :a="b">x {{ y }}</div>` yields the tokens
//!
//! ```text
//! <  div  :a  =  "  b  "  >  x  {{  y  }}  </  div  >
//! ```
//!
//! Interpolations and directive values are handed to the [`Bridge`]; a
//! failed reparse is recorded on its container and the walk goes on.

use html_escape::decode_html_entities;
use sfc_lexer::{Comment, CommentKind, Range, Span, Token, TokenKind, TokenStore};
use sfc_parser::{MarkupAttr, MarkupElement, MarkupNode, ParseScript};
use tracing::{debug, trace};

use crate::bridge::Bridge;
use crate::directive::DirectiveKey;
use crate::node::{ExpressionContainer, Node, NodeId, NodeKind, TemplateBody};
use crate::options::{OptionsError, Syntax, TemplateOptions};

/// Transform `nodes`, the top-level entries of a markup tree over `source`.
///
/// # Panics
///
/// If `nodes` contains a document or fragment node.
pub fn transform(
    nodes: &[MarkupNode],
    source: &str,
    parser: &impl ParseScript,
    options: &TemplateOptions,
) -> Result<TemplateBody, OptionsError> {
    let syntax = Syntax::new(options)?;
    Ok(Transformer::new(source, parser, &syntax).run(nodes))
}

struct Transformer<'a, P> {
    bridge: Bridge<'a, P>,
    syntax: &'a Syntax,
    nodes: Vec<Node>,
    tokens: TokenStore,
    comments: Vec<Comment>,
}

impl<'a, P: ParseScript> Transformer<'a, P> {
    fn new(source: &'a str, parser: &'a P, syntax: &'a Syntax) -> Self {
        Self {
            bridge: Bridge::new(source, parser),
            syntax,
            nodes: Vec::new(),
            tokens: TokenStore::new(),
            comments: Vec::new(),
        }
    }

    fn run(mut self, nodes: &[MarkupNode]) -> TemplateBody {
        let root = self.push(NodeKind::Document { children: Vec::new() }, Range::default());

        let mut children = Vec::new();
        for node in nodes {
            self.visit(node, &mut children);
        }

        let range = match (self.tokens.tokens().first(), self.tokens.last()) {
            (Some(first), Some(last)) => Range::new(first.start(), last.end()),
            _ => Range::default(),
        };
        let loc = self.bridge.lines().location(range);
        let document = &mut self.nodes[root.index()];
        document.kind = NodeKind::Document { children };
        document.range = range;
        document.loc = loc;
        self.adopt(root);

        debug!(
            nodes = self.nodes.len(),
            tokens = self.tokens.len(),
            comments = self.comments.len(),
            "template transformed"
        );
        TemplateBody {
            nodes: self.nodes,
            tokens: self.tokens,
            comments: self.comments,
        }
    }

    // =========================================================================
    // Arena
    // =========================================================================

    fn push(&mut self, kind: NodeKind, range: Range) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            range,
            loc: self.bridge.lines().location(range),
            parent: None,
        });
        id
    }

    /// Point every node owned by `id` back at it.
    fn adopt(&mut self, id: NodeId) {
        for child in self.nodes[id.index()].owned() {
            self.nodes[child.index()].parent = Some(id);
        }
    }

    /// Record a token over `start..end`. Empty ranges are skipped.
    fn token(&mut self, kind: TokenKind, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let source = self.bridge.source();
        let token = Token::from_source(kind, source, Range::new(start, end), self.bridge.lines());
        self.tokens.push(token);
    }

    // =========================================================================
    // Visitor
    // =========================================================================

    fn visit(&mut self, node: &MarkupNode, out: &mut Vec<NodeId>) {
        match node {
            MarkupNode::Document(_) | MarkupNode::Fragment(_) => {
                panic!("document and fragment nodes cannot be transformed")
            }
            MarkupNode::Comment { data, span } => self.visit_comment(data, *span),
            MarkupNode::Text { span, .. } => self.visit_text(*span, out),
            MarkupNode::Element(element) => out.push(self.visit_element(element)),
            MarkupNode::Doctype { span, .. } => {
                debug!(offset = span.start, "ignoring doctype");
            }
            MarkupNode::CData { span, .. } => {
                debug!(offset = span.start, "ignoring CDATA section");
            }
        }
    }

    fn visit_comment(&mut self, data: &str, span: Span) {
        let range = span.range();
        self.token(TokenKind::HtmlComment, range.start, range.end);
        self.comments.push(Comment {
            kind: CommentKind::Html,
            value: data.to_string(),
            range,
            loc: self.bridge.lines().location(range),
        });
    }

    /// Split a text run on interpolations.
    fn visit_text(&mut self, span: Span, out: &mut Vec<NodeId>) {
        let source = self.bridge.source();
        let (open, close) = self.syntax.delimiter_sizes();
        let found: Vec<(usize, usize)> = self
            .syntax
            .interpolations(&source[span.start..span.end])
            .collect();

        let mut last = span.start;
        for (start, end) in found {
            let (start, end) = (span.start + start, span.start + end);
            if last < start {
                out.push(self.text(last, start));
            }
            out.push(self.container(start, end, open, close));
            last = end;
        }
        if last < span.end {
            out.push(self.text(last, span.end));
        }
    }

    fn text(&mut self, start: usize, end: usize) -> NodeId {
        let raw = &self.bridge.source()[start..end];
        let kind = NodeKind::Text {
            value: decode_html_entities(raw).into_owned(),
            raw: raw.to_string(),
        };
        self.token(TokenKind::HtmlText, start, end);
        self.push(kind, Range::new(start, end))
    }

    /// An expression container over `start..end`, whose first `open` and
    /// last `close` bytes are delimiters.
    fn container(&mut self, start: usize, end: usize, open: usize, close: usize) -> NodeId {
        self.token(TokenKind::Punctuator, start, start + open);

        let code = trim_whitespace(self.bridge.source(), start + open, end - close);
        let container = match self.bridge.reparse(code) {
            Ok(reparsed) => {
                for token in reparsed.tokens {
                    self.tokens.push(token);
                }
                self.comments.extend(reparsed.comments);
                ExpressionContainer::Expression(reparsed.expression)
            }
            Err(error) => {
                trace!(start, end, %error, "keeping syntax error on container");
                ExpressionContainer::SyntaxError(error)
            }
        };

        self.token(TokenKind::Punctuator, end - close, end);
        self.push(NodeKind::ExpressionContainer(container), Range::new(start, end))
    }

    // =========================================================================
    // Elements
    // =========================================================================

    fn visit_element(&mut self, element: &MarkupElement) -> NodeId {
        let tag = element.start_tag.range();

        self.token(TokenKind::Punctuator, tag.start, tag.start + 1);
        let name_end = self.identifier_end(tag.start + 1, tag.end);
        self.token(TokenKind::HtmlIdentifier, tag.start + 1, name_end);

        let attributes: Vec<NodeId> = element
            .attrs
            .iter()
            .map(|attr| self.attribute(attr))
            .collect();

        let closer = if element.self_closing { 2 } else { 1 };
        self.token(TokenKind::Punctuator, tag.end - closer, tag.end);
        let start_tag = self.push(
            NodeKind::StartTag {
                self_closing: element.self_closing,
            },
            tag,
        );

        let mut children = Vec::new();
        for child in element.child_nodes() {
            self.visit(child, &mut children);
        }

        let end_tag = element.end_tag.map(|span| self.end_tag(span));

        let end = match element.end_tag {
            Some(span) => span.end,
            None => self.tokens.last().map_or(tag.end, Token::end).max(tag.end),
        };
        let id = self.push(
            NodeKind::Element {
                name: element.name.clone(),
                start_tag,
                end_tag,
                attributes,
                children,
            },
            Range::new(tag.start, end),
        );
        self.adopt(id);
        id
    }

    fn end_tag(&mut self, span: Span) -> NodeId {
        let range = span.range();
        self.token(TokenKind::Punctuator, range.start, range.start + 2);
        let name_end = self.identifier_end(range.start + 2, range.end - 1);
        self.token(TokenKind::HtmlIdentifier, range.start + 2, name_end);
        self.token(TokenKind::Punctuator, range.end - 1, range.end);
        self.push(NodeKind::EndTag, range)
    }

    fn attribute(&mut self, attr: &MarkupAttr) -> NodeId {
        let source = self.bridge.source();
        let range = attr.span.range();
        let name_end = range.start + attr.name.len();
        let (key_start, key_end) = trim_invalid(source, range.start, name_end);
        let raw_key = &source[key_start..key_end];
        let directive = self.syntax.is_directive(raw_key);

        let key_kind = if directive {
            NodeKind::DirectiveKey(DirectiveKey::parse(raw_key, self.syntax.directive_prefix()))
        } else {
            NodeKind::Identifier {
                name: raw_key.to_string(),
            }
        };
        self.token(TokenKind::HtmlIdentifier, key_start, key_end);
        let key = self.push(key_kind, Range::new(key_start, key_end));

        let equals = attr
            .value
            .as_ref()
            .and_then(|_| source[name_end..range.end].find('='))
            .map(|i| name_end + i);

        // `a=` with nothing after the `=` has no value node.
        let value = equals.and_then(|eq| {
            self.token(TokenKind::Punctuator, eq, eq + 1);

            let rest = &source[eq + 1..range.end];
            let start = range.end - rest.trim_start().len();
            let quote = match source[start..range.end].chars().next() {
                Some('"' | '\'') => 1,
                None => return None,
                _ => 0,
            };

            Some(if directive {
                self.container(start, range.end, quote, quote)
            } else {
                self.literal(attr, start, range.end)
            })
        });

        let id = self.push(NodeKind::Attribute { key, value }, range);
        self.adopt(id);
        id
    }

    fn literal(&mut self, attr: &MarkupAttr, start: usize, end: usize) -> NodeId {
        self.token(TokenKind::HtmlAttributeValue, start, end);
        let kind = NodeKind::Literal {
            value: attr.value.clone().unwrap_or_default(),
            raw: self.bridge.source()[start..end].to_string(),
        };
        self.push(kind, Range::new(start, end))
    }

    /// End of the run of attribute-name characters starting at `start`.
    fn identifier_end(&self, start: usize, limit: usize) -> usize {
        let source = self.bridge.source();
        if start >= limit {
            return start;
        }
        source[start..limit]
            .char_indices()
            .find(|&(_, c)| !is_valid_char(c))
            .map_or(limit, |(i, _)| start + i)
    }
}

/// Whether `c` may appear in an attribute or tag name.
fn is_valid_char(c: char) -> bool {
    let code = c as u32;
    let invalid = matches!(code, 0x00..=0x20 | 0x7F..=0x9F | 0xFDD0..=0xFDEF)
        || matches!(c, '"' | '\'' | '>' | '/' | '=')
        || code & 0xFFFE == 0xFFFE;
    !invalid
}

/// Shrink `start..end` past invalid name characters on both sides.
fn trim_invalid(source: &str, start: usize, end: usize) -> (usize, usize) {
    let text = &source[start..end];
    let head = start + (text.len() - text.trim_start_matches(|c: char| !is_valid_char(c)).len());
    let tail = start + text.trim_end_matches(|c: char| !is_valid_char(c)).len();
    (head, tail.max(head))
}

/// Shrink `start..end` past whitespace on both sides.
fn trim_whitespace(source: &str, start: usize, end: usize) -> Range {
    if start >= end {
        return Range::new(start, start);
    }
    let text = &source[start..end];
    let head = start + (text.len() - text.trim_start().len());
    let tail = start + text.trim_end().len();
    Range::new(head, tail.max(head))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sfc_lexer::Skip;
    use sfc_parser::{ExprKind, MarkupParser, ScriptParser};

    fn run(source: &str) -> TemplateBody {
        run_with(source, &TemplateOptions::default())
    }

    fn run_with(source: &str, options: &TemplateOptions) -> TemplateBody {
        let nodes = match MarkupParser::parse_fragment(source) {
            MarkupNode::Fragment(nodes) => nodes,
            other => panic!("expected fragment, got {other:?}"),
        };
        transform(&nodes, source, &ScriptParser, options).unwrap()
    }

    fn types(body: &TemplateBody, ids: &[NodeId]) -> Vec<&'static str> {
        ids.iter().map(|&id| body.node(id).type_name()).collect()
    }

    fn raws(body: &TemplateBody) -> Vec<&str> {
        body.tokens.iter().map(|t| t.raw.as_str()).collect()
    }

    fn element_parts(body: &TemplateBody, id: NodeId) -> (NodeId, Option<NodeId>, Vec<NodeId>) {
        match &body.node(id).kind {
            NodeKind::Element {
                start_tag,
                end_tag,
                attributes,
                ..
            } => (*start_tag, *end_tag, attributes.clone()),
            other => panic!("expected element, got {other:?}"),
        }
    }

    fn attribute_parts(body: &TemplateBody, id: NodeId) -> (&NodeKind, Option<&NodeKind>) {
        match &body.node(id).kind {
            NodeKind::Attribute { key, value } => {
                (&body.node(*key).kind, value.map(|v| &body.node(v).kind))
            }
            other => panic!("expected attribute, got {other:?}"),
        }
    }

    // =========================================================================
    // Text and interpolation
    // =========================================================================

    #[test]
    fn test_empty_template() {
        let body = run("");
        assert_eq!(body.len(), 1);
        assert!(body.root().children().is_empty());
        assert_eq!(body.root().range, Range::new(0, 0));
        assert!(body.tokens.is_empty());
    }

    #[test]
    fn test_interpolation_splits_text() {
        let body = run("a {{ b }} c");
        let children = body.root().children();
        assert_eq!(types(&body, children), vec!["Text", "ExpressionContainer", "Text"]);
        assert_eq!(raws(&body), vec!["a ", "{{", "b", "}}", " c"]);

        match &body.node(children[1]).kind {
            NodeKind::ExpressionContainer(container) => {
                let expression = container.expression().unwrap();
                assert_eq!(expression.as_identifier(), Some("b"));
                assert_eq!(expression.range, Range::new(5, 6));
            }
            other => panic!("expected container, got {other:?}"),
        }
        assert_eq!(body.node(children[1]).range, Range::new(2, 9));
    }

    #[test]
    fn test_adjacent_interpolations_have_no_empty_text() {
        let body = run("{{a}}{{b}}");
        assert_eq!(
            types(&body, body.root().children()),
            vec!["ExpressionContainer", "ExpressionContainer"]
        );
    }

    #[test]
    fn test_syntax_error_is_isolated() {
        let body = run("<p>x {{ +++ }} y {{ z }}</p>");
        let errors = body.syntax_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(raws(&body), vec![
            "<", "p", ">", "x ", "{{", "}}", " y ", "{{", "z", "}}", "</", "p", ">"
        ]);
    }

    #[test]
    fn test_text_value_is_decoded() {
        let body = run("a &amp; b");
        match &body.node(body.root().children()[0]).kind {
            NodeKind::Text { value, raw } => {
                assert_eq!(value, "a & b");
                assert_eq!(raw, "a &amp; b");
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_delimiters() {
        let options = TemplateOptions {
            interpolation: ("[[".to_string(), "]]".to_string()),
            ..TemplateOptions::default()
        };
        let body = run_with("x [[ y ]] {{ z }}", &options);
        assert_eq!(raws(&body), vec!["x ", "[[", "y", "]]", " {{ z }}"]);
    }

    // =========================================================================
    // Elements
    // =========================================================================

    #[test]
    fn test_element_tokens_and_nodes() {
        let body = run("<div>\n  <br/>\n</div>");
        assert_eq!(raws(&body), vec![
            "<", "div", ">", "\n  ", "<", "br", "/>", "\n", "</", "div", ">"
        ]);

        let div = body.root().children()[0];
        assert_eq!(body.node(div).range, Range::new(0, 20));
        assert_eq!(types(&body, body.children(div)), vec!["Text", "Element", "Text"]);

        let br = body.children(div)[1];
        let (start_tag, end_tag, _) = element_parts(&body, br);
        assert_eq!(end_tag, None);
        assert_eq!(body.node(start_tag).kind, NodeKind::StartTag { self_closing: true });
        assert_eq!(body.node(br).range, Range::new(8, 13));
    }

    #[test]
    fn test_parents_are_linked() {
        let body = run("<div id=x><p>t</p></div>");
        let div = body.root().children()[0];
        let p = body.children(div)[0];
        let (_, _, attributes) = element_parts(&body, div);

        assert_eq!(body.parent(div), Some(TemplateBody::ROOT));
        assert_eq!(body.parent(p), Some(div));
        assert_eq!(body.parent(attributes[0]), Some(div));
        assert_eq!(body.parent(body.children(p)[0]), Some(p));
        assert_eq!(body.root().parent, None);
    }

    #[test]
    fn test_template_content_is_visited() {
        let body = run("<template><b>x</b></template>");
        let template = body.root().children()[0];
        assert_eq!(types(&body, body.children(template)), vec!["Element"]);
    }

    #[test]
    fn test_unclosed_element_ends_at_last_token() {
        let body = run("<div><p>text");
        let div = body.root().children()[0];
        assert_eq!(body.node(div).range, Range::new(0, 12));
        let (_, end_tag, _) = element_parts(&body, div);
        assert_eq!(end_tag, None);
    }

    #[test]
    fn test_comments_and_doctype() {
        let body = run("<!DOCTYPE html><!-- note --><p></p>");
        assert_eq!(types(&body, body.root().children()), vec!["Element"]);
        assert_eq!(body.comments.len(), 1);
        assert_eq!(body.comments[0].value, " note ");
        assert_eq!(body.tokens.tokens()[0].kind, TokenKind::HtmlComment);
        assert_eq!(body.root().range, Range::new(15, 35));
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    #[test]
    fn test_plain_attribute() {
        let body = run("<a href=\"x&amp;y\" hidden>");
        let a = body.root().children()[0];
        let (_, _, attributes) = element_parts(&body, a);

        let (key, value) = attribute_parts(&body, attributes[0]);
        assert_eq!(key, &NodeKind::Identifier { name: "href".to_string() });
        assert_eq!(
            value,
            Some(&NodeKind::Literal {
                value: "x&y".to_string(),
                raw: "\"x&amp;y\"".to_string(),
            })
        );

        let (key, value) = attribute_parts(&body, attributes[1]);
        assert_eq!(key, &NodeKind::Identifier { name: "hidden".to_string() });
        assert_eq!(value, None);
        assert_eq!(raws(&body), vec!["<", "a", "href", "=", "\"x&amp;y\"", "hidden", ">"]);
    }

    #[test]
    fn test_directive_attribute() {
        let body = run("<a v-on:click.stop=\"go(1)\">");
        let a = body.root().children()[0];
        let (_, _, attributes) = element_parts(&body, a);
        let (key, value) = attribute_parts(&body, attributes[0]);

        match key {
            NodeKind::DirectiveKey(key) => {
                assert_eq!(key.name, "on");
                assert_eq!(key.argument.as_deref(), Some("click"));
                assert_eq!(key.modifiers, vec!["stop".to_string()]);
            }
            other => panic!("expected directive key, got {other:?}"),
        }
        match value {
            Some(NodeKind::ExpressionContainer(container)) => {
                let expression = container.expression().unwrap();
                assert!(matches!(expression.kind, ExprKind::Call { .. }));
            }
            other => panic!("expected container, got {other:?}"),
        }
        assert_eq!(raws(&body), vec![
            "<", "a", "v-on:click.stop", "=", "\"", "go", "(", "1", ")", "\"", ">"
        ]);
    }

    #[test]
    fn test_unquoted_directive_value() {
        let body = run("<a :b=c>");
        assert_eq!(raws(&body), vec!["<", "a", ":b", "=", "c", ">"]);
    }

    #[test]
    fn test_directive_without_value() {
        let body = run("<p v-else>x</p>");
        let p = body.root().children()[0];
        let (_, _, attributes) = element_parts(&body, p);
        let (key, value) = attribute_parts(&body, attributes[0]);
        assert!(matches!(key, NodeKind::DirectiveKey(k) if k.name == "else"));
        assert_eq!(value, None);
    }

    #[test]
    fn test_empty_unquoted_value_is_omitted() {
        for (source, written) in [("<a :b=>", ":b="), ("<a :b= >", ":b="), ("<a c=>", "c=")] {
            let body = run(source);
            let a = body.root().children()[0];
            let (_, _, attributes) = element_parts(&body, a);
            let (_, value) = attribute_parts(&body, attributes[0]);
            assert_eq!(value, None, "{source}");
            assert!(body.syntax_errors().is_empty(), "{source}");

            assert_eq!(body.node(attributes[0]).range.slice(source), written);
            let last = body.last_token(attributes[0], Skip::default()).map(|t| t.raw.as_str());
            assert_eq!(last, Some("="), "{source}");
        }
    }

    #[test]
    fn test_directive_syntax_error() {
        let body = run("<a :b=\"1 +\" c=d>");
        assert_eq!(body.syntax_errors().len(), 1);
        assert_eq!(raws(&body), vec!["<", "a", ":b", "=", "\"", "\"", "c", "=", "d", ">"]);
    }

    // =========================================================================
    // Token lookups
    // =========================================================================

    #[test]
    fn test_node_token_lookups() {
        let body = run("<p>{{ a /* c */ }}</p>");
        let p = body.root().children()[0];
        let container = body.children(p)[0];

        let raw = |t: Option<&Token>| t.map(|t| t.raw.clone());
        assert_eq!(raw(body.first_token(p, Skip::default())), Some("<".to_string()));
        assert_eq!(raw(body.last_token(p, Skip::default())), Some(">".to_string()));
        assert_eq!(raw(body.token_before(container, Skip::default())), Some(">".to_string()));
        assert_eq!(raw(body.token_after(container, Skip::default())), Some("</".to_string()));
        assert_eq!(raw(body.last_token(container, Skip::new(1))), Some("a".to_string()));
        assert_eq!(
            raw(body.last_token(container, Skip::new(1).with_comments())),
            Some("/* c */".to_string())
        );
        assert_eq!(body.comments.len(), 1);
    }

    #[test]
    #[should_panic(expected = "document and fragment nodes cannot be transformed")]
    fn test_fragment_entry_panics() {
        let options = TemplateOptions::default();
        let _ = transform(&[MarkupNode::Fragment(vec![])], "", &ScriptParser, &options);
    }

    #[test]
    fn test_valid_name_chars() {
        assert!(is_valid_char('a'));
        assert!(is_valid_char(':'));
        assert!(is_valid_char('é'));
        for c in [' ', '"', '\'', '>', '/', '=', '\u{7f}', '\u{fdd0}', '\u{fffe}', '\u{1fffe}'] {
            assert!(!is_valid_char(c), "{c:?}");
        }
    }
}
