//! SFC Parser
//!
//! Two parsers live here:
//!
//! - the markup tree builder ([`MarkupParser`]), which nests scanner
//!   tokens into a location-annotated [`MarkupNode`] tree;
//! - the script parser ([`ExprParser`]), an ECMAScript subset parser that
//!   returns a program together with its tokens and comments.
//!
//! Callers that need script parsing depend on the [`ParseScript`]
//! capability rather than on [`ExprParser`] directly, so any closure with
//! the right signature can stand in for it.

pub mod ast;
pub mod expr_lexer;
pub mod expr_parser;
pub mod markup;
pub mod parser;

use serde::Serialize;
use sfc_lexer::LineIndex;

pub use ast::{ExprKind, Expression, Program, Script, Statement, StmtKind};
pub use expr_parser::ExprParser;
pub use markup::{MarkupAttr, MarkupElement, MarkupNode};
pub use parser::MarkupParser;

/// Parser error with position information.
///
/// `line` and `column` are 1-based; `index` is the byte offset.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("Parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub index: usize,
}

impl ParseError {
    /// An error at byte `offset` of the text indexed by `lines`.
    pub fn at(message: String, offset: usize, lines: &LineIndex) -> Self {
        let position = lines.position(offset);
        Self {
            message,
            line: position.line,
            column: position.column + 1,
            index: offset,
        }
    }
}

/// The capability of parsing script source into a [`Script`].
///
/// Implementations must be pure: the same input always yields the same
/// output.
pub trait ParseScript {
    fn parse_script(&self, code: &str) -> Result<Script, ParseError>;
}

impl<F> ParseScript for F
where
    F: Fn(&str) -> Result<Script, ParseError>,
{
    fn parse_script(&self, code: &str) -> Result<Script, ParseError> {
        self(code)
    }
}

/// The built-in [`ParseScript`] implementation, backed by [`ExprParser`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptParser;

impl ParseScript for ScriptParser {
    fn parse_script(&self, code: &str) -> Result<Script, ParseError> {
        ExprParser::parse_script(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_with(parser: &impl ParseScript, code: &str) -> Result<Script, ParseError> {
        parser.parse_script(code)
    }

    #[test]
    fn test_closure_is_a_script_parser() {
        let failing = |_: &str| -> Result<Script, ParseError> {
            Err(ParseError {
                message: "nope".into(),
                line: 1,
                column: 1,
                index: 0,
            })
        };
        assert_eq!(parse_with(&failing, "a").unwrap_err().message, "nope");
    }

    #[test]
    fn test_builtin_script_parser() {
        let script = parse_with(&ScriptParser, "a + 1").unwrap();
        assert_eq!(script.tokens.len(), 3);
    }

    #[test]
    fn test_error_display() {
        let lines = LineIndex::new("ab\ncd");
        let err = ParseError::at("Unexpected token".into(), 4, &lines);
        assert_eq!(err.to_string(), "Parse error at line 2, column 2: Unexpected token");
    }
}
