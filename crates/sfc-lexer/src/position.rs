//! Offset and line/column arithmetic.
//!
//! Every span in the tree is derived through the helpers here so that a
//! token's end location always agrees with recomputing it from its own raw
//! text. Offsets and columns are measured in bytes; lines are 1-based and
//! columns 0-based.

use serde::Serialize;

/// A line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A half-open byte range against the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "range start {start} is after end {end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `other` lies entirely inside this range.
    pub fn contains(&self, other: Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Start and end positions of a node or token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

impl Location {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// `\r\n`, `\r`, `\n`, U+2028 and U+2029.
pub fn is_line_terminator(c: char) -> bool {
    matches!(c, '\r' | '\n' | '\u{2028}' | '\u{2029}')
}

/// Compute where `raw` ends when it starts at `start_line`/`start_column`.
///
/// `\r\n` counts as a single terminator. Without a terminator the column
/// advances by the length of `raw`; otherwise the column is the length of
/// the text after the last terminator.
pub fn end_location(raw: &str, start_line: usize, start_column: usize) -> Position {
    let mut line = start_line;
    let mut last_line_start = None;
    let mut chars = raw.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_line_terminator(c) {
            continue;
        }
        let mut end = i + c.len_utf8();
        if c == '\r' {
            if let Some(&(_, '\n')) = chars.peek() {
                chars.next();
                end += 1;
            }
        }
        line += 1;
        last_line_start = Some(end);
    }

    match last_line_start {
        None => Position::new(start_line, start_column + raw.len()),
        Some(head) => Position::new(line, raw.len() - head),
    }
}

/// Replace every character of `text` except line terminators with spaces.
///
/// The result has the same byte length and the same line structure as
/// `text`, so text appended to it starts at the same line and column it
/// would have after `text`.
pub fn blank_out(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_line_terminator(c) {
            out.push(c);
        } else {
            out.extend(std::iter::repeat(' ').take(c.len_utf8()));
        }
    }
    out
}

/// Offsets of line heads, for mapping byte offsets to positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    heads: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut heads = Vec::new();
        let mut chars = text.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            if !is_line_terminator(c) {
                continue;
            }
            let mut end = i + c.len_utf8();
            if c == '\r' {
                if let Some(&(_, '\n')) = chars.peek() {
                    chars.next();
                    end += 1;
                }
            }
            heads.push(end);
        }

        Self { heads }
    }

    /// Line/column of a byte offset.
    pub fn position(&self, offset: usize) -> Position {
        let preceding = self.heads.partition_point(|&head| head <= offset);
        let column = match preceding {
            0 => offset,
            n => offset - self.heads[n - 1],
        };
        Position::new(preceding + 1, column)
    }

    pub fn location(&self, range: Range) -> Location {
        Location::new(self.position(range.start), self.position(range.end))
    }

    pub fn line_count(&self) -> usize {
        self.heads.len() + 1
    }
}
