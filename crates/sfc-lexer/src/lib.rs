//! SFC Lexer
//!
//! Lexical layer shared by the single-file component (SFC) crates:
//! byte-offset and line/column arithmetic, the token model, the ordered
//! token store used for boundary lookups, and the markup scanner that splits
//! template source into tags, text runs and comments.
//!
//! # Example
//!
//! ```
//! use sfc_lexer::Scanner;
//!
//! let tokens = Scanner::tokenize("<p>hi</p>");
//! assert_eq!(tokens.len(), 3);
//! ```

pub mod position;
pub mod scanner;
pub mod store;
pub mod token;

pub use position::{blank_out, end_location, is_line_terminator, LineIndex, Location, Position, Range};
pub use scanner::{AttrToken, MarkupKind, MarkupToken, Scanner, StartTag};
pub use store::{HasRange, Skip, TokenStore};
pub use token::{Comment, CommentKind, Span, Token, TokenKind};
