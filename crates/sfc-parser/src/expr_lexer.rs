//! Lexer for script source.
//!
//! Tokenizes the ECMAScript subset accepted by
//! [`ExprParser`](crate::expr_parser::ExprParser). Offsets are byte offsets
//! into the input; comments are collected on the side and never reach the
//! parser.
//!
//! # Examples
//!
//! ```
//! use sfc_parser::expr_lexer::{ExprLexer, ExprTokenKind};
//!
//! let lexed = ExprLexer::tokenize("count + 1").unwrap();
//! assert_eq!(lexed.tokens[0].kind, ExprTokenKind::Identifier);
//! assert_eq!(lexed.tokens[1].kind, ExprTokenKind::Plus);
//! assert_eq!(lexed.tokens[2].kind, ExprTokenKind::Number);
//! ```

use sfc_lexer::{is_line_terminator, Comment, CommentKind, LineIndex, Range, TokenKind};

use crate::ParseError;

/// A token produced by the script lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprToken {
    pub kind: ExprTokenKind,
    pub range: Range,
    pub value: TokenValue,
    /// Whether a line terminator appears between this token and the previous one.
    pub newline_before: bool,
}

/// Token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprTokenKind {
    // Literals
    Number,
    String,
    Template,
    Boolean,
    Null,

    // Identifiers & keywords
    Identifier,
    Keyword,

    // Arithmetic
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,

    // Comparison
    EqEq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    Lte,
    Gte,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    UShr,

    // Logical
    And,
    Or,
    Not,
    QuestionQuestion,

    // Assignment
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    AndEq,
    OrEq,
    QuestionQuestionEq,

    // Update
    PlusPlus,
    MinusMinus,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // Punctuation
    Dot,
    Comma,
    Colon,
    Semicolon,
    Question,
    Arrow,
    OptionalChain,

    // End of input
    Eof,
}

impl ExprTokenKind {
    /// The ESTree token type reported for this kind.
    pub fn token_kind(self) -> TokenKind {
        match self {
            ExprTokenKind::Number => TokenKind::Numeric,
            ExprTokenKind::String => TokenKind::String,
            ExprTokenKind::Template => TokenKind::Template,
            ExprTokenKind::Boolean => TokenKind::Boolean,
            ExprTokenKind::Null => TokenKind::Null,
            ExprTokenKind::Identifier => TokenKind::Identifier,
            ExprTokenKind::Keyword => TokenKind::Keyword,
            _ => TokenKind::Punctuator,
        }
    }
}

/// The value carried by a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    None,
    Number(f64),
    String(String),
    Boolean(bool),
    /// Identifier or keyword text.
    Identifier(String),
}

const KEYWORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "export", "extends", "finally", "for", "function", "if", "import", "in",
    "instanceof", "new", "return", "super", "switch", "this", "throw", "try", "typeof", "var",
    "void", "while", "with",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Tokens and comments of one input.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexed {
    /// Always ends with an [`ExprTokenKind::Eof`] token.
    pub tokens: Vec<ExprToken>,
    pub comments: Vec<Comment>,
}

/// Script lexer.
pub struct ExprLexer<'a> {
    source: &'a str,
    lines: &'a LineIndex,
    pos: usize,
    newline_before: bool,
    comments: Vec<Comment>,
}

impl<'a> ExprLexer<'a> {
    /// Create a new lexer over `source`; `lines` must index the same text.
    pub fn new(source: &'a str, lines: &'a LineIndex) -> Self {
        Self {
            source,
            lines,
            pos: 0,
            newline_before: false,
            comments: Vec::new(),
        }
    }

    /// Tokenize the entire source.
    pub fn tokenize(source: &str) -> Result<Lexed, ParseError> {
        let lines = LineIndex::new(source);
        ExprLexer::new(source, &lines).run()
    }

    /// Consume the lexer, producing every token and comment.
    pub fn run(mut self) -> Result<Lexed, ParseError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == ExprTokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(Lexed {
            tokens,
            comments: self.comments,
        })
    }

    /// Read the next token from the source.
    pub fn next_token(&mut self) -> Result<ExprToken, ParseError> {
        self.newline_before = false;
        self.skip_trivia()?;

        let start = self.pos;
        if self.is_at_end() {
            return Ok(self.token(ExprTokenKind::Eof, start, TokenValue::None));
        }

        let ch = self.current();
        let next = self.peek();

        match ch {
            '0'..='9' => self.read_number(start),
            '.' if next.is_some_and(|c| c.is_ascii_digit()) => self.read_number(start),

            '\'' | '"' => self.read_string(start),
            '`' => self.read_template(start),

            c if is_identifier_start(c) => self.read_identifier(start),

            _ => self.read_punctuator(start),
        }
    }

    // --- Private helpers ---

    fn read_punctuator(&mut self, start: usize) -> Result<ExprToken, ParseError> {
        use ExprTokenKind::*;

        // Longest match first.
        const PUNCTUATORS: &[(&str, ExprTokenKind)] = &[
            (">>>", UShr),
            ("===", StrictEq),
            ("!==", StrictNotEq),
            ("&&=", AndEq),
            ("||=", OrEq),
            ("??=", QuestionQuestionEq),
            ("**", StarStar),
            ("==", EqEq),
            ("!=", NotEq),
            ("<=", Lte),
            (">=", Gte),
            ("<<", Shl),
            (">>", Shr),
            ("&&", And),
            ("||", Or),
            ("??", QuestionQuestion),
            ("+=", PlusEq),
            ("-=", MinusEq),
            ("*=", StarEq),
            ("/=", SlashEq),
            ("%=", PercentEq),
            ("++", PlusPlus),
            ("--", MinusMinus),
            ("=>", Arrow),
            ("+", Plus),
            ("-", Minus),
            ("*", Star),
            ("/", Slash),
            ("%", Percent),
            ("<", Lt),
            (">", Gt),
            ("&", Amp),
            ("|", Pipe),
            ("^", Caret),
            ("~", Tilde),
            ("!", Not),
            ("=", Eq),
            ("(", LParen),
            (")", RParen),
            ("[", LBracket),
            ("]", RBracket),
            ("{", LBrace),
            ("}", RBrace),
            (".", Dot),
            (",", Comma),
            (":", Colon),
            (";", Semicolon),
            ("?", Question),
        ];

        let rest = self.rest();

        // `?.` followed by a digit is a conditional and a number: `a?.5:b`.
        if rest.starts_with("?.") && !rest[2..].starts_with(|c: char| c.is_ascii_digit()) {
            self.pos += 2;
            return Ok(self.token(OptionalChain, start, TokenValue::None));
        }

        match PUNCTUATORS.iter().find(|(text, _)| rest.starts_with(text)) {
            Some(&(text, kind)) => {
                self.pos += text.len();
                Ok(self.token(kind, start, TokenValue::None))
            }
            None => Err(self.error(
                format!("Unexpected character '{}'", self.current()),
                start,
            )),
        }
    }

    fn read_number(&mut self, start: usize) -> Result<ExprToken, ParseError> {
        let radix = match (self.current(), self.peek()) {
            ('0', Some('x' | 'X')) => 16,
            ('0', Some('o' | 'O')) => 8,
            ('0', Some('b' | 'B')) => 2,
            _ => 10,
        };

        let value = if radix == 10 {
            self.eat_digits();
            if self.at('.') {
                self.advance();
                self.eat_digits();
            }
            if self.at('e') || self.at('E') {
                self.advance();
                if self.at('+') || self.at('-') {
                    self.advance();
                }
                if !self.current_is(|c| c.is_ascii_digit()) {
                    return Err(self.error("Invalid number".into(), start));
                }
                self.eat_digits();
            }
            let text = &self.source[start..self.pos];
            text.parse::<f64>()
                .map_err(|_| self.error(format!("Invalid number: '{text}'"), start))?
        } else {
            self.pos += 2;
            let digits_start = self.pos;
            while self.current_is(|c| c.is_digit(radix)) {
                self.advance();
            }
            let digits = &self.source[digits_start..self.pos];
            if digits.is_empty() {
                return Err(self.error("Expected number in radix".into(), start));
            }
            u64::from_str_radix(digits, radix)
                .map(|n| n as f64)
                .map_err(|_| self.error(format!("Invalid number: '{digits}'"), start))?
        };

        if self.current_is(is_identifier_start) {
            return Err(self.error(
                "Identifier directly after number".into(),
                self.pos,
            ));
        }

        Ok(self.token(ExprTokenKind::Number, start, TokenValue::Number(value)))
    }

    fn read_string(&mut self, start: usize) -> Result<ExprToken, ParseError> {
        let quote = self.current();
        self.advance(); // skip opening quote

        let mut value = String::new();

        loop {
            if self.is_at_end() || self.current_is(|c| c == '\n' || c == '\r') {
                return Err(self.error("Unterminated string constant".into(), start));
            }
            let c = self.current();
            if c == quote {
                break;
            }
            if c == '\\' {
                self.read_escape(&mut value, start)?;
            } else {
                value.push(c);
                self.advance();
            }
        }

        self.advance(); // skip closing quote

        Ok(self.token(ExprTokenKind::String, start, TokenValue::String(value)))
    }

    /// A template literal without substitutions.
    fn read_template(&mut self, start: usize) -> Result<ExprToken, ParseError> {
        self.advance(); // skip opening backtick

        let mut value = String::new();

        loop {
            if self.is_at_end() {
                return Err(self.error("Unterminated template".into(), start));
            }
            match self.current() {
                '`' => break,
                '$' if self.peek() == Some('{') => {
                    return Err(self.error(
                        "Template substitutions are not supported".into(),
                        self.pos,
                    ));
                }
                '\\' => self.read_escape(&mut value, start)?,
                c => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        self.advance(); // skip closing backtick

        Ok(self.token(ExprTokenKind::Template, start, TokenValue::String(value)))
    }

    /// Decode one escape sequence starting at the backslash.
    fn read_escape(&mut self, value: &mut String, start: usize) -> Result<(), ParseError> {
        self.advance(); // skip backslash
        if self.is_at_end() {
            return Err(self.error("Unterminated escape sequence".into(), start));
        }

        let escape_start = self.pos;
        let c = self.current();
        self.advance();

        match c {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'b' => value.push('\u{8}'),
            'f' => value.push('\u{c}'),
            'v' => value.push('\u{b}'),
            '0' if !self.current_is(|c| c.is_ascii_digit()) => value.push('\0'),
            'x' => {
                let code = self.read_hex(2, escape_start)?;
                value.push(self.code_point(code, escape_start)?);
            }
            'u' if self.at('{') => {
                self.advance();
                let digits_start = self.pos;
                while self.current_is(|c| c.is_ascii_hexdigit()) {
                    self.advance();
                }
                let digits = &self.source[digits_start..self.pos];
                if digits.is_empty() || !self.at('}') {
                    return Err(self.error("Bad character escape sequence".into(), escape_start));
                }
                let code = u32::from_str_radix(digits, 16)
                    .map_err(|_| self.error("Code point out of bounds".into(), escape_start))?;
                self.advance();
                value.push(self.code_point(code, escape_start)?);
            }
            'u' => {
                let code = self.read_hex(4, escape_start)?;
                value.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            '\r' => {
                if self.at('\n') {
                    self.advance();
                }
            }
            c if is_line_terminator(c) => {}
            c => value.push(c),
        }
        Ok(())
    }

    fn read_hex(&mut self, len: usize, escape_start: usize) -> Result<u32, ParseError> {
        let digits = self.rest().get(..len).unwrap_or("");
        if digits.len() != len || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(self.error("Bad character escape sequence".into(), escape_start));
        }
        self.pos += len;
        u32::from_str_radix(digits, 16)
            .map_err(|_| self.error("Bad character escape sequence".into(), escape_start))
    }

    fn code_point(&self, code: u32, escape_start: usize) -> Result<char, ParseError> {
        char::from_u32(code).ok_or_else(|| self.error("Code point out of bounds".into(), escape_start))
    }

    fn read_identifier(&mut self, start: usize) -> Result<ExprToken, ParseError> {
        while self.current_is(is_identifier_part) {
            self.advance();
        }

        let text = &self.source[start..self.pos];

        let token = match text {
            "true" => self.token(ExprTokenKind::Boolean, start, TokenValue::Boolean(true)),
            "false" => self.token(ExprTokenKind::Boolean, start, TokenValue::Boolean(false)),
            "null" => self.token(ExprTokenKind::Null, start, TokenValue::None),
            word if is_keyword(word) => self.token(
                ExprTokenKind::Keyword,
                start,
                TokenValue::Identifier(word.to_string()),
            ),
            _ => self.token(
                ExprTokenKind::Identifier,
                start,
                TokenValue::Identifier(text.to_string()),
            ),
        };
        Ok(token)
    }

    /// Skip whitespace and comments, collecting the comments.
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            if self.is_at_end() {
                return Ok(());
            }
            let c = self.current();
            if is_line_terminator(c) {
                self.newline_before = true;
                self.advance();
            } else if c.is_whitespace() || c == '\u{feff}' {
                self.advance();
            } else if self.rest().starts_with("//") {
                self.skip_line_comment();
            } else if self.rest().starts_with("/*") {
                self.skip_block_comment()?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_line_comment(&mut self) {
        let start = self.pos;
        self.pos += 2;
        while !self.is_at_end() && !self.current_is(is_line_terminator) {
            self.advance();
        }
        self.push_comment(CommentKind::Line, start, start + 2, self.pos);
    }

    fn skip_block_comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let body_start = start + 2;
        let Some(len) = self.source[body_start..].find("*/") else {
            return Err(self.error("Unterminated comment".into(), start));
        };
        let body_end = body_start + len;
        if self.source[body_start..body_end].contains(is_line_terminator) {
            self.newline_before = true;
        }
        self.pos = body_end + 2;
        self.push_comment(CommentKind::Block, start, body_start, body_end);
        Ok(())
    }

    fn push_comment(&mut self, kind: CommentKind, start: usize, body_start: usize, body_end: usize) {
        let range = Range::new(start, self.pos);
        self.comments.push(Comment {
            kind,
            value: self.source[body_start..body_end].to_string(),
            range,
            loc: self.lines.location(range),
        });
    }

    fn token(&self, kind: ExprTokenKind, start: usize, value: TokenValue) -> ExprToken {
        ExprToken {
            kind,
            range: Range::new(start, self.pos),
            value,
            newline_before: self.newline_before,
        }
    }

    fn error(&self, message: String, offset: usize) -> ParseError {
        ParseError::at(message, offset, self.lines)
    }

    fn eat_digits(&mut self) {
        while self.current_is(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn current(&self) -> char {
        self.rest().chars().next().unwrap_or('\0')
    }

    fn current_is(&self, f: impl Fn(char) -> bool) -> bool {
        self.rest().chars().next().is_some_and(f)
    }

    fn at(&self, c: char) -> bool {
        self.rest().starts_with(c)
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn advance(&mut self) {
        if let Some(c) = self.rest().chars().next() {
            self.pos += c.len_utf8();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '\u{200c}' || c == '\u{200d}'
}
