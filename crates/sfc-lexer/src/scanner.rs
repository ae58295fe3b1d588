use tracing::{debug, trace};

use crate::token::{is_raw_text_element, Span};

/// A markup-level token: tag, text run, comment or declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupToken {
    pub kind: MarkupKind,
    pub span: Span,
}

impl MarkupToken {
    pub fn new(kind: MarkupKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupKind {
    StartTag(StartTag),
    EndTag { name: String },
    Text,
    Comment { data: String },
    Doctype { name: String },
    CData { data: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartTag {
    pub name: String,
    pub attrs: Vec<AttrToken>,
    pub self_closing: bool,
}

/// An attribute as written: name, undecoded value without quotes, and the
/// span from the first character of the name to the end of the value.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrToken {
    pub name: String,
    pub value: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    pos: usize,
    line: usize,
    column: usize,
}

/// Markup scanner.
///
/// Splits template source into tags, text runs and comments, recording the
/// byte span and 1-based line/column of each. Content of raw-text elements
/// (`script`, `style`, `textarea`, `title`) is a single text run.
///
/// Scanning never fails. A tag cut off by the end of input is scanned as
/// text, and an unterminated comment or declaration runs to the end.
pub struct Scanner<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<MarkupToken>,
    raw_text: Option<String>,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            raw_text: None,
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    pub fn tokenize(source: &str) -> Vec<MarkupToken> {
        let mut scanner = Scanner::new(source);
        scanner.scan_tokens();
        trace!(count = scanner.tokens.len(), "scanned markup");
        scanner.tokens
    }

    fn scan_tokens(&mut self) {
        while !self.is_at_end() {
            self.scan_token();
        }
    }

    fn scan_token(&mut self) {
        if let Some(name) = self.raw_text.take() {
            self.scan_raw_text(&name);
            return;
        }

        let rest = self.rest();
        if rest.starts_with("<!--") {
            self.scan_comment();
        } else if rest.starts_with("<![CDATA[") {
            self.scan_cdata();
        } else if starts_with_ignore_case(rest, "<!doctype") {
            self.scan_doctype();
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            self.scan_bogus_comment();
        } else if rest.starts_with("</") && self.peek_at(2).is_ascii_alphabetic() {
            self.scan_end_tag();
        } else if rest.starts_with('<') && self.peek_next().is_ascii_alphabetic() {
            self.scan_start_tag();
        } else {
            self.scan_text();
        }
    }

    // --- Scanners ---

    /// Scan text up to the next construct. A `<` that does not open a tag,
    /// comment or declaration is part of the text.
    fn scan_text(&mut self) {
        let start = self.checkpoint();
        self.advance();
        while !self.is_at_end() && !self.at_construct() {
            self.advance();
        }
        self.emit_from(start, MarkupKind::Text);
    }

    fn scan_raw_text(&mut self, name: &str) {
        let start = self.checkpoint();
        while !self.is_at_end() && !self.at_end_tag_of(name) {
            self.advance();
        }
        if self.pos > start.pos {
            self.emit_from(start, MarkupKind::Text);
        }
    }

    /// Scan `<!-- ... -->`. An unterminated comment runs to the end of input.
    fn scan_comment(&mut self) {
        let start = self.checkpoint();
        self.advance_n("<!--".len());
        let body_start = self.pos;

        let data = match self.rest().find("-->") {
            Some(len) => {
                let data = self.source[body_start..body_start + len].to_string();
                self.advance_to(body_start + len + "-->".len());
                data
            }
            None => {
                self.advance_to(self.source.len());
                self.source[body_start..].to_string()
            }
        };

        self.emit_from(start, MarkupKind::Comment { data });
    }

    fn scan_cdata(&mut self) {
        let start = self.checkpoint();
        self.advance_n("<![CDATA[".len());
        let body_start = self.pos;

        let data = match self.rest().find("]]>") {
            Some(len) => {
                let data = self.source[body_start..body_start + len].to_string();
                self.advance_to(body_start + len + "]]>".len());
                data
            }
            None => {
                self.advance_to(self.source.len());
                self.source[body_start..].to_string()
            }
        };

        self.emit_from(start, MarkupKind::CData { data });
    }

    /// Scan `<!doctype ...>`. An unterminated doctype runs to the end of
    /// input.
    fn scan_doctype(&mut self) {
        let start = self.checkpoint();
        self.advance_n("<!doctype".len());
        let body_start = self.pos;

        let name = match self.rest().find('>') {
            Some(len) => {
                let name = self.source[body_start..body_start + len].trim().to_string();
                self.advance_to(body_start + len + 1);
                name
            }
            None => {
                self.advance_to(self.source.len());
                self.source[body_start..].trim().to_string()
            }
        };

        self.emit_from(start, MarkupKind::Doctype { name });
    }

    /// `<?...>` and `<!...>` that is not a comment, CDATA or doctype.
    fn scan_bogus_comment(&mut self) {
        let start = self.checkpoint();
        let body_start = if self.rest().starts_with("<!") {
            self.pos + 2
        } else {
            self.pos + 1
        };
        self.advance_to(body_start);

        let data = match self.rest().find('>') {
            Some(len) => {
                let data = self.source[body_start..body_start + len].to_string();
                self.advance_to(body_start + len + 1);
                data
            }
            None => {
                self.advance_to(self.source.len());
                self.source[body_start..].to_string()
            }
        };

        self.emit_from(start, MarkupKind::Comment { data });
    }

    fn scan_end_tag(&mut self) {
        let start = self.checkpoint();
        self.advance_n(2); // consume `</`

        let name = self.scan_tag_name();

        while !self.is_at_end() && self.peek() != '>' {
            self.advance();
        }
        if self.is_at_end() {
            self.unterminated(start, &name);
            return;
        }
        self.advance(); // consume `>`

        self.emit_from(start, MarkupKind::EndTag { name });
    }

    fn scan_start_tag(&mut self) {
        let start = self.checkpoint();
        self.advance(); // consume `<`

        let name = self.scan_tag_name();
        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                self.unterminated(start, &name);
                return;
            }

            match self.peek() {
                '>' => {
                    self.advance();
                    break;
                }
                '/' if self.peek_next() == '>' => {
                    self.advance_n(2);
                    self_closing = true;
                    break;
                }
                '/' => self.advance(),
                _ => attrs.push(self.scan_attribute()),
            }
        }

        if !self_closing && is_raw_text_element(&name) {
            self.raw_text = Some(name.clone());
        }

        self.emit_from(
            start,
            MarkupKind::StartTag(StartTag {
                name,
                attrs,
                self_closing,
            }),
        );
    }

    /// Scan `name`, `name=value`, `name="value"` or `name='value'`. A quoted
    /// value left open runs to the end of input.
    fn scan_attribute(&mut self) -> AttrToken {
        let start = self.checkpoint();

        // A leading `=` belongs to the name.
        self.advance();
        while !self.is_at_end() && !is_attribute_name_end(self.peek()) {
            self.advance();
        }
        let name = self.source[start.pos..self.pos].to_string();
        let after_name = self.checkpoint();

        self.skip_whitespace();
        if self.is_at_end() || self.peek() != '=' {
            self.restore(after_name);
            return AttrToken {
                name,
                value: None,
                span: self.span_from(start),
            };
        }
        self.advance(); // consume `=`
        let after_equals = self.checkpoint();
        self.skip_whitespace();

        let value = match self.peek() {
            quote @ ('"' | '\'') => {
                self.advance();
                let value_start = self.pos;
                while !self.is_at_end() && self.peek() != quote {
                    self.advance();
                }
                let value = self.source[value_start..self.pos].to_string();
                self.advance(); // consume closing quote
                value
            }
            _ => {
                let value_start = self.pos;
                while !self.is_at_end() && !self.peek().is_whitespace() && self.peek() != '>' {
                    self.advance();
                }
                if self.pos == value_start {
                    self.restore(after_equals);
                }
                self.source[value_start..self.pos].to_string()
            }
        };

        AttrToken {
            name,
            value: Some(value),
            span: self.span_from(start),
        }
    }

    fn scan_tag_name(&mut self) -> String {
        let start = self.pos;
        while !self.is_at_end() {
            let c = self.peek();
            if c.is_whitespace() || c == '/' || c == '>' {
                break;
            }
            self.advance();
        }
        self.source[start..self.pos].to_string()
    }

    // --- Helpers ---

    fn at_construct(&self) -> bool {
        let rest = self.rest();
        if rest.starts_with("<!") || rest.starts_with("<?") {
            return true;
        }
        if rest.starts_with("</") {
            return self.peek_at(2).is_ascii_alphabetic();
        }
        rest.starts_with('<') && self.peek_next().is_ascii_alphabetic()
    }

    fn at_end_tag_of(&self, name: &str) -> bool {
        let rest = self.rest();
        let Some(after) = rest.strip_prefix("</") else {
            return false;
        };
        if after.len() < name.len() || !after.is_char_boundary(name.len()) {
            return false;
        }
        if !after[..name.len()].eq_ignore_ascii_case(name) {
            return false;
        }
        match after[name.len()..].chars().next() {
            None => true,
            Some(c) => c.is_whitespace() || c == '/' || c == '>',
        }
    }

    /// Input ended inside the tag opened at `start`: the tag is text,
    /// joined to any text run right before it.
    fn unterminated(&mut self, start: Checkpoint, name: &str) {
        debug!(offset = start.pos, name, "unterminated tag scanned as text");
        self.raw_text = None;
        match self.tokens.last_mut() {
            Some(last) if last.kind == MarkupKind::Text && last.span.end == start.pos => {
                last.span.end = self.pos;
            }
            _ => self.emit_from(start, MarkupKind::Text),
        }
    }

    fn emit_from(&mut self, start: Checkpoint, kind: MarkupKind) {
        let span = self.span_from(start);
        self.tokens.push(MarkupToken::new(kind, span));
    }

    fn span_from(&self, start: Checkpoint) -> Span {
        Span::new(start.pos, self.pos, start.line, start.column)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.line = checkpoint.line;
        self.column = checkpoint.column;
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> char {
        self.rest().chars().next().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.peek_at(1)
    }

    fn peek_at(&self, n: usize) -> char {
        self.rest().chars().nth(n).unwrap_or('\0')
    }

    /// Advance one character, keeping line and column in step.
    /// `\r\n` ends a single line.
    fn advance(&mut self) {
        let Some(c) = self.rest().chars().next() else {
            return;
        };
        self.pos += c.len_utf8();
        match c {
            '\n' | '\u{2028}' | '\u{2029}' => {
                self.line += 1;
                self.column = 1;
            }
            '\r' if self.peek() != '\n' => {
                self.line += 1;
                self.column = 1;
            }
            _ => self.column += c.len_utf8(),
        }
    }

    fn advance_n(&mut self, chars: usize) {
        for _ in 0..chars {
            self.advance();
        }
    }

    fn advance_to(&mut self, offset: usize) {
        while self.pos < offset && !self.is_at_end() {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}

fn is_attribute_name_end(c: char) -> bool {
    c.is_whitespace() || matches!(c, '/' | '>' | '=')
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}
