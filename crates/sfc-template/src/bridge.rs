//! Offset-preserving reparse of template sub-ranges.
//!
//! The script parser only ever sees whole texts, so a sub-range of the
//! template is handed to it padded: every character before the range is
//! blanked out (line terminators survive) and the code is wrapped in
//! parentheses, the opening one taking the place of the last blank before
//! the range. Offsets, lines and columns reported by the parser then refer
//! to the template source directly.
//!
//! Entity references in the code are decoded before parsing, which shortens
//! the text. Positions past a reference are mapped back onto the source
//! afterwards, so token text always matches the source it covers.

use html_escape::decode_html_entities;
use sfc_lexer::{blank_out, Comment, LineIndex, Location, Range, Token, TokenKind};
use sfc_parser::{Expression, ParseError, ParseScript, Script, Statement, StmtKind};
use tracing::{debug, trace};

/// A successfully reparsed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Reparsed {
    pub expression: Expression,
    /// Expression and comment tokens, sorted by start. The wrapper
    /// parentheses are not included.
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
}

/// Reparses sub-ranges of one source text with a script parser.
pub struct Bridge<'a, P> {
    source: &'a str,
    lines: LineIndex,
    parser: &'a P,
}

impl<'a, P: ParseScript> Bridge<'a, P> {
    pub fn new(source: &'a str, parser: &'a P) -> Self {
        Self {
            source,
            lines: LineIndex::new(source),
            parser,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    /// Parse `code` as a single expression.
    ///
    /// Entity references in the code are decoded before parsing. Nothing is
    /// committed anywhere on failure; the caller decides what to keep.
    pub fn reparse(&self, code: Range) -> Result<Reparsed, ParseError> {
        let mut padded = blank_out(&self.source[..code.start]);
        let Some(open) = padded.rfind(' ') else {
            return Err(ParseError::at(
                "No room to wrap the expression".to_string(),
                code.start,
                &self.lines,
            ));
        };
        let decoded = Decoded::new(code.slice(self.source));
        padded.replace_range(open..open + 1, "(");
        padded.push_str(&decoded.text);
        padded.push(')');

        let wrapped = Wrapped {
            code,
            decoded,
            open,
            close: padded.len() - 1,
        };

        trace!(start = code.start, end = code.end, "reparsing expression");
        let script = self
            .parser
            .parse_script(&padded)
            .map_err(|e| self.relocate_error(e, &wrapped))
            .inspect_err(|e| {
                debug!(start = code.start, error = %e, "expression failed to parse");
            })?;

        self.unwrap(script, &wrapped, &padded)
    }

    /// Take the wrapped expression out of `script` and anchor it on the
    /// source.
    fn unwrap(
        &self,
        script: Script,
        wrapped: &Wrapped,
        padded: &str,
    ) -> Result<Reparsed, ParseError> {
        let Wrapped {
            code, open, close, ..
        } = *wrapped;
        let Script {
            program,
            mut tokens,
            mut comments,
        } = script;

        let mut body = program.body.into_iter();
        let expression = match (body.next(), body.next()) {
            (
                Some(Statement {
                    kind: StmtKind::Expression(expression),
                    ..
                }),
                None,
            ) => expression,
            _ => {
                return Err(ParseError::at(
                    "Expected a single expression".to_string(),
                    code.start,
                    &self.lines,
                ))
            }
        };

        let parenthesized = tokens.first().is_some_and(|t| is_paren(t, "(", open))
            && tokens.last().is_some_and(|t| is_paren(t, ")", close));
        if !parenthesized {
            return Err(ParseError::at(
                "Expected a single expression".to_string(),
                code.start,
                &self.lines,
            ));
        }
        tokens.pop();
        tokens.remove(0);

        // `a) + (b` parses once wrapped but escapes its container.
        if expression.range.start < code.start || expression.range.end > close {
            let offset = unbalanced_close(&tokens)
                .map_or(code.start, |offset| wrapped.to_source(offset, false));
            return Err(ParseError::at(
                "Unexpected token ')'".to_string(),
                offset,
                &self.lines,
            ));
        }

        let mut merged: Vec<Token> = tokens;
        merged.extend(comments.iter().map(|c| c.to_token(padded)));
        merged.sort_by_key(|t| t.range.start);

        let mut expression = expression;
        if !wrapped.decoded.entities.is_empty() {
            let mut anchor = |range: &mut Range, loc: &mut Location| {
                *range = wrapped.to_source_range(*range);
                *loc = self.lines.location(*range);
            };
            expression.for_each_span_mut(&mut anchor);
            for token in &mut merged {
                anchor(&mut token.range, &mut token.loc);
                token.raw = token.range.slice(self.source).to_string();
            }
            for comment in &mut comments {
                anchor(&mut comment.range, &mut comment.loc);
            }
        }

        trace!(tokens = merged.len(), comments = comments.len(), "expression reparsed");
        Ok(Reparsed {
            expression,
            tokens: merged,
            comments,
        })
    }

    /// A parser error reported against the padded text, moved onto the
    /// source.
    fn relocate_error(&self, error: ParseError, wrapped: &Wrapped) -> ParseError {
        if wrapped.decoded.entities.is_empty() || error.index < wrapped.code.start {
            return error;
        }
        let offset = wrapped.to_source(error.index, false).min(self.source.len());
        ParseError::at(error.message, offset, &self.lines)
    }
}

/// Code as handed to the parser, with the offsets of its wrapper
/// parentheses in the padded text.
struct Wrapped {
    code: Range,
    decoded: Decoded,
    open: usize,
    close: usize,
}

impl Wrapped {
    /// Source offset of padded offset `offset`.
    fn to_source(&self, offset: usize, end: bool) -> usize {
        if offset < self.code.start {
            return offset;
        }
        self.code.start + self.decoded.source_offset(offset - self.code.start, end)
    }

    fn to_source_range(&self, range: Range) -> Range {
        Range::new(self.to_source(range.start, false), self.to_source(range.end, true))
    }
}

/// Code with its entity references decoded.
struct Decoded {
    text: String,
    /// Each replaced reference: its range in `text` and in the code.
    entities: Vec<(Range, Range)>,
}

impl Decoded {
    fn new(code: &str) -> Self {
        let mut text = String::with_capacity(code.len());
        let mut entities = Vec::new();
        let mut last = 0;

        for (at, _) in code.match_indices('&') {
            let Some(len) = reference_len(&code[at..]) else {
                continue;
            };
            let reference = &code[at..at + len];
            let value = decode_html_entities(reference);
            if value == reference {
                continue;
            }
            text.push_str(&code[last..at]);
            let start = text.len();
            text.push_str(&value);
            entities.push((Range::new(start, text.len()), Range::new(at, at + len)));
            last = at + len;
        }
        text.push_str(&code[last..]);

        Self { text, entities }
    }

    /// Offset in the code of `offset` in the decoded text. Inside a decoded
    /// reference, a start maps to the reference start and an end to its end.
    fn source_offset(&self, offset: usize, end: bool) -> usize {
        let (mut decoded_end, mut source_end) = (0, 0);
        for (decoded, source) in &self.entities {
            if offset <= decoded.start {
                break;
            }
            if offset < decoded.end {
                return if end { source.end } else { source.start };
            }
            (decoded_end, source_end) = (decoded.end, source.end);
        }
        source_end + (offset - decoded_end)
    }
}

/// Length of the `&name;` or `&#digits;` reference at the start of `text`.
fn reference_len(text: &str) -> Option<usize> {
    let body = text[1..].find(|c: char| !(c.is_ascii_alphanumeric() || c == '#'))? + 1;
    (body > 1 && text[body..].starts_with(';')).then_some(body + 1)
}

fn is_paren(token: &Token, raw: &str, offset: usize) -> bool {
    token.kind == TokenKind::Punctuator && token.raw == raw && token.range.start == offset
}

/// Start of the first `)` with no matching `(` before it.
fn unbalanced_close(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for token in tokens.iter().filter(|t| t.kind == TokenKind::Punctuator) {
        match token.raw.as_str() {
            "(" => depth += 1,
            ")" if depth == 0 => return Some(token.range.start),
            ")" => depth -= 1,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sfc_lexer::Position;
    use sfc_parser::{ExprKind, ScriptParser};

    fn code_range(source: &str, code: &str) -> Range {
        let start = source.find(code).unwrap();
        Range::new(start, start + code.len())
    }

    fn raws(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.raw.as_str()).collect()
    }

    #[test]
    fn test_offsets_point_into_source() {
        let source = "<p>{{ a + b }}</p>";
        let bridge = Bridge::new(source, &ScriptParser);
        let reparsed = bridge.reparse(code_range(source, "a + b")).unwrap();

        assert_eq!(reparsed.expression.range, Range::new(6, 11));
        assert_eq!(raws(&reparsed.tokens), vec!["a", "+", "b"]);
        for token in &reparsed.tokens {
            assert_eq!(token.range.slice(source), token.raw);
        }
    }

    #[test]
    fn test_lines_and_columns_survive_padding() {
        let source = "<div>\n  <p>{{\n    count }}</p>";
        let bridge = Bridge::new(source, &ScriptParser);
        let reparsed = bridge.reparse(code_range(source, "count")).unwrap();

        assert_eq!(reparsed.expression.as_identifier(), Some("count"));
        assert_eq!(reparsed.expression.loc.start, Position::new(3, 4));
        assert_eq!(reparsed.expression.loc.end, Position::new(3, 9));
    }

    #[test]
    fn test_object_literal_is_an_expression() {
        let source = "<a :b=\"{ c: 1 }\">";
        let bridge = Bridge::new(source, &ScriptParser);
        let reparsed = bridge.reparse(code_range(source, "{ c: 1 }")).unwrap();
        assert!(matches!(reparsed.expression.kind, ExprKind::Object(_)));
        assert_eq!(raws(&reparsed.tokens), vec!["{", "c", ":", "1", "}"]);
    }

    #[test]
    fn test_comments_become_tokens_too() {
        let source = "{{ a /* b */ }}";
        let bridge = Bridge::new(source, &ScriptParser);
        let reparsed = bridge.reparse(code_range(source, "a /* b */")).unwrap();

        assert_eq!(reparsed.comments.len(), 1);
        assert_eq!(reparsed.comments[0].value, " b ");
        assert_eq!(raws(&reparsed.tokens), vec!["a", "/* b */"]);
        assert_eq!(reparsed.tokens[1].kind, TokenKind::BlockComment);
    }

    #[test]
    fn test_entities_are_decoded() {
        let source = "<a :b=\"x &amp;&amp; y\">";
        let bridge = Bridge::new(source, &ScriptParser);
        let reparsed = bridge.reparse(code_range(source, "x &amp;&amp; y")).unwrap();
        assert!(matches!(reparsed.expression.kind, ExprKind::Logical { .. }));
    }

    #[test]
    fn test_decoded_tokens_point_into_source() {
        let source = "<a :b=\"x &amp;&amp; y\">";
        let bridge = Bridge::new(source, &ScriptParser);
        let reparsed = bridge.reparse(code_range(source, "x &amp;&amp; y")).unwrap();

        assert_eq!(raws(&reparsed.tokens), vec!["x", "&amp;&amp;", "y"]);
        assert_eq!(reparsed.expression.range, Range::new(7, 21));
        assert_eq!(reparsed.tokens[2].range, Range::new(20, 21));
        assert_eq!(reparsed.tokens[2].loc.start, Position::new(1, 20));
        match &reparsed.expression.kind {
            ExprKind::Logical { right, .. } => assert_eq!(right.range, Range::new(20, 21)),
            other => panic!("expected logical, got {other:?}"),
        }
    }

    #[test]
    fn test_decoded_comment_points_into_source() {
        let source = "{{ a /* &lt; */ }}";
        let bridge = Bridge::new(source, &ScriptParser);
        let reparsed = bridge.reparse(code_range(source, "a /* &lt; */")).unwrap();

        assert_eq!(reparsed.comments[0].value, " < ");
        assert_eq!(reparsed.comments[0].range, Range::new(5, 15));
        assert_eq!(raws(&reparsed.tokens), vec!["a", "/* &lt; */"]);
    }

    #[test]
    fn test_error_after_entity_points_into_source() {
        let source = "{{ a &amp;&amp; * }}";
        let bridge = Bridge::new(source, &ScriptParser);
        let err = bridge.reparse(code_range(source, "a &amp;&amp; *")).unwrap_err();
        assert_eq!(err.index, 16);
        assert_eq!(err.column, 17);
    }

    #[test]
    fn test_unknown_references_are_kept() {
        let decoded = Decoded::new("a &nope; &amp b &#60; c");
        assert_eq!(decoded.text, "a &nope; &amp b < c");
        assert_eq!(decoded.entities, vec![(Range::new(16, 17), Range::new(16, 21))]);
        assert_eq!(decoded.source_offset(18, false), 22);
    }

    #[test]
    fn test_syntax_error_is_positioned_in_source() {
        let source = "<p>\n{{ +++ }}</p>";
        let bridge = Bridge::new(source, &ScriptParser);
        let err = bridge.reparse(code_range(source, "+++")).unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_wrapper_escape_is_rejected() {
        let source = "{{ a) + (b }}";
        let bridge = Bridge::new(source, &ScriptParser);
        let err = bridge.reparse(code_range(source, "a) + (b")).unwrap_err();
        assert_eq!(err.message, "Unexpected token ')'");
        assert_eq!(err.index, 4);
    }

    #[test]
    fn test_statement_sequence_is_rejected() {
        let source = "{{ a); (b }}";
        let bridge = Bridge::new(source, &ScriptParser);
        let err = bridge.reparse(code_range(source, "a); (b")).unwrap_err();
        assert_eq!(err.message, "Expected a single expression");
    }

    #[test]
    fn test_parser_failure_is_passed_through() {
        let failing = |_: &str| -> Result<Script, ParseError> {
            Err(ParseError {
                message: "nope".to_string(),
                line: 9,
                column: 9,
                index: 99,
            })
        };
        let source = "{{ a }}";
        let bridge = Bridge::new(source, &failing);
        let err = bridge.reparse(code_range(source, "a")).unwrap_err();
        assert_eq!((err.message.as_str(), err.line), ("nope", 9));
    }

    #[test]
    fn test_no_room_for_wrapper() {
        let bridge = Bridge::new("a", &ScriptParser);
        assert!(bridge.reparse(Range::new(0, 1)).is_err());
    }
}
