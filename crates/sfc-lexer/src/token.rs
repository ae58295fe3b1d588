use serde::Serialize;

use crate::position::{end_location, LineIndex, Location, Position, Range};

/// A location annotation from the markup scanner.
///
/// Offsets are absolute byte offsets; `line` and `column` are both 1-based
/// and describe `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn range(&self) -> Range {
        Range::new(self.start, self.end)
    }
}

/// Token classification shared by markup-derived and script-derived tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // Script
    Punctuator,
    Identifier,
    Keyword,
    Boolean,
    Null,
    Numeric,
    String,
    Template,

    // Markup
    #[serde(rename = "HTMLIdentifier")]
    HtmlIdentifier,
    #[serde(rename = "HTMLText")]
    HtmlText,
    #[serde(rename = "HTMLAttributeValue")]
    HtmlAttributeValue,

    // Comments
    #[serde(rename = "Line")]
    LineComment,
    #[serde(rename = "Block")]
    BlockComment,
    #[serde(rename = "HTMLComment")]
    HtmlComment,
}

impl TokenKind {
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::LineComment | TokenKind::BlockComment | TokenKind::HtmlComment
        )
    }
}

/// A lexical unit with its exact source slice and location.
///
/// `raw` is always the source text covered by `range`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub raw: String,
    pub range: Range,
    pub loc: Location,
}

impl Token {
    /// Build a token from its raw text and start position; the end position
    /// is derived from `raw`.
    pub fn new(kind: TokenKind, raw: impl Into<String>, start: usize, position: Position) -> Self {
        let raw = raw.into();
        let end = end_location(&raw, position.line, position.column);
        Self {
            kind,
            range: Range::new(start, start + raw.len()),
            loc: Location::new(position, end),
            raw,
        }
    }

    /// Slice `range` out of `source`, positioning it with `lines`.
    pub fn from_source(kind: TokenKind, source: &str, range: Range, lines: &LineIndex) -> Self {
        Self::new(kind, range.slice(source), range.start, lines.position(range.start))
    }

    /// Derive a token straight from a markup location annotation.
    pub fn from_span(kind: TokenKind, span: Span, source: &str) -> Self {
        let raw = &source[span.start..span.end];
        Self::new(kind, raw, span.start, Position::new(span.line, span.column - 1))
    }

    pub fn start(&self) -> usize {
        self.range.start
    }

    pub fn end(&self) -> usize {
        self.range.end
    }
}

/// A comment collected from markup or from a script.
///
/// `value` is the body with its delimiters stripped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    #[serde(rename = "type")]
    pub kind: CommentKind,
    pub value: String,
    pub range: Range,
    pub loc: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommentKind {
    Line,
    Block,
    #[serde(rename = "HTMLComment")]
    Html,
}

impl CommentKind {
    pub fn token_kind(self) -> TokenKind {
        match self {
            CommentKind::Line => TokenKind::LineComment,
            CommentKind::Block => TokenKind::BlockComment,
            CommentKind::Html => TokenKind::HtmlComment,
        }
    }
}

impl Comment {
    /// The comment as a token over `source`, the text it was collected from.
    pub fn to_token(&self, source: &str) -> Token {
        Token {
            kind: self.kind.token_kind(),
            raw: self.range.slice(source).to_string(),
            range: self.range,
            loc: self.loc,
        }
    }
}

/// HTML5 void elements (no children, no end tag).
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Check if a tag name is an HTML5 void element.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Elements whose content is scanned as a single text run.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_span_converts_column() {
        let source = "<a>\n  text\n</a>";
        let token = Token::from_span(TokenKind::HtmlText, Span::new(4, 10, 2, 1), source);
        assert_eq!(token.raw, "  text");
        assert_eq!(token.range, Range::new(4, 10));
        assert_eq!(token.loc.start, Position::new(2, 0));
        assert_eq!(token.loc.end, Position::new(2, 6));
    }

    #[test]
    fn test_from_source_multiline() {
        let source = "a\nbc\nd";
        let lines = LineIndex::new(source);
        let token = Token::from_source(TokenKind::HtmlText, source, Range::new(1, 5), &lines);
        assert_eq!(token.raw, "\nbc\n");
        assert_eq!(token.loc.start, Position::new(1, 1));
        assert_eq!(token.loc.end, Position::new(3, 0));
    }

    #[test]
    fn test_comment_kinds() {
        assert!(TokenKind::HtmlComment.is_comment());
        assert!(TokenKind::LineComment.is_comment());
        assert!(!TokenKind::Punctuator.is_comment());
        assert_eq!(CommentKind::Block.token_kind(), TokenKind::BlockComment);
    }

    #[test]
    fn test_void_elements() {
        assert!(is_void_element("br"));
        assert!(is_void_element("IMG"));
        assert!(!is_void_element("div"));
    }
}
