//! Ordered token sequence with boundary lookups.
//!
//! Tokens are appended in source order and never overlap. Each token is
//! indexed by its start and end offsets so that the first/last token of a
//! node, and the tokens around it, can be found without a search.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::position::Range;
use crate::token::Token;

/// Anything with a byte range that starts and ends on token boundaries.
pub trait HasRange {
    fn range(&self) -> Range;
}

impl HasRange for Token {
    fn range(&self) -> Range {
        self.range
    }
}

impl HasRange for Range {
    fn range(&self) -> Range {
        *self
    }
}

/// Options for boundary lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Skip {
    /// Number of matching tokens to pass over.
    pub skip: usize,
    /// Whether comment tokens count as matches.
    pub include_comments: bool,
}

impl Skip {
    pub fn new(skip: usize) -> Self {
        Self {
            skip,
            include_comments: false,
        }
    }

    pub fn with_comments(mut self) -> Self {
        self.include_comments = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStore {
    tokens: Vec<Token>,
    starts: HashMap<usize, usize>,
    ends: HashMap<usize, usize>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token.
    ///
    /// # Panics
    ///
    /// If the token starts before the end of the last token.
    pub fn push(&mut self, token: Token) {
        if let Some(last) = self.tokens.last() {
            assert!(
                token.start() >= last.end(),
                "token {:?} at {}..{} overlaps previous token ending at {}",
                token.raw,
                token.start(),
                token.end(),
                last.end()
            );
        }

        let index = self.tokens.len();
        self.starts.insert(token.start(), index);
        self.ends.insert(token.end(), index);
        self.tokens.push(token);
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn last(&self) -> Option<&Token> {
        self.tokens.last()
    }

    pub fn into_vec(self) -> Vec<Token> {
        self.tokens
    }

    /// The first token inside `node`.
    pub fn first_token(&self, node: &impl HasRange, options: Skip) -> Option<&Token> {
        let range = node.range();
        let offset = self.start_index(range.start);
        let mut skip = options.skip;

        if options.include_comments {
            return self
                .tokens
                .get(offset + skip)
                .filter(|token| token.end() <= range.end);
        }

        for token in &self.tokens[offset..] {
            if token.end() > range.end {
                break;
            }
            if token.kind.is_comment() {
                continue;
            }
            if skip > 0 {
                skip -= 1;
                continue;
            }
            return Some(token);
        }
        None
    }

    /// The last token inside `node`.
    pub fn last_token(&self, node: &impl HasRange, options: Skip) -> Option<&Token> {
        let range = node.range();
        let offset = self.end_index(range.end);
        let mut skip = options.skip;

        if options.include_comments {
            return offset
                .checked_sub(skip)
                .map(|i| &self.tokens[i])
                .filter(|token| token.start() >= range.start);
        }

        for token in self.tokens[..=offset].iter().rev() {
            if token.start() < range.start {
                break;
            }
            if token.kind.is_comment() {
                continue;
            }
            if skip > 0 {
                skip -= 1;
                continue;
            }
            return Some(token);
        }
        None
    }

    /// A token before `node`. Not bounded by the node's parent.
    pub fn token_before(&self, node: &impl HasRange, options: Skip) -> Option<&Token> {
        let offset = self.start_index(node.range().start);
        let mut skip = options.skip;

        if options.include_comments {
            return offset
                .checked_sub(skip + 1)
                .map(|i| &self.tokens[i]);
        }

        for token in self.tokens[..offset].iter().rev() {
            if token.kind.is_comment() {
                continue;
            }
            if skip > 0 {
                skip -= 1;
                continue;
            }
            return Some(token);
        }
        None
    }

    /// A token after `node`. Not bounded by the node's parent.
    pub fn token_after(&self, node: &impl HasRange, options: Skip) -> Option<&Token> {
        let offset = self.end_index(node.range().end);
        let mut skip = options.skip;

        if options.include_comments {
            return self.tokens.get(offset + 1 + skip);
        }

        for token in &self.tokens[offset + 1..] {
            if token.kind.is_comment() {
                continue;
            }
            if skip > 0 {
                skip -= 1;
                continue;
            }
            return Some(token);
        }
        None
    }

    fn start_index(&self, offset: usize) -> usize {
        match self.starts.get(&offset) {
            Some(&index) => index,
            None => panic!("offset {offset} is not the start of any token"),
        }
    }

    fn end_index(&self, offset: usize) -> usize {
        match self.ends.get(&offset) {
            Some(&index) => index,
            None => panic!("offset {offset} is not the end of any token"),
        }
    }
}

impl Serialize for TokenStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tokens.serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a TokenStore {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{LineIndex, Range};
    use crate::token::TokenKind;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "<a>x<!--c-->y</a>";

    fn store() -> TokenStore {
        let lines = LineIndex::new(SOURCE);
        let mut store = TokenStore::new();
        for (kind, start, end) in [
            (TokenKind::Punctuator, 0, 1),
            (TokenKind::HtmlIdentifier, 1, 2),
            (TokenKind::Punctuator, 2, 3),
            (TokenKind::HtmlText, 3, 4),
            (TokenKind::HtmlComment, 4, 12),
            (TokenKind::HtmlText, 12, 13),
            (TokenKind::Punctuator, 13, 15),
            (TokenKind::HtmlIdentifier, 15, 16),
            (TokenKind::Punctuator, 16, 17),
        ] {
            store.push(Token::from_source(kind, SOURCE, Range::new(start, end), &lines));
        }
        store
    }

    fn raw(token: Option<&Token>) -> Option<&str> {
        token.map(|t| t.raw.as_str())
    }

    #[test]
    fn test_first_and_last_token() {
        let store = store();
        let element = Range::new(0, 17);
        assert_eq!(raw(store.first_token(&element, Skip::default())), Some("<"));
        assert_eq!(raw(store.first_token(&element, Skip::new(1))), Some("a"));
        assert_eq!(raw(store.last_token(&element, Skip::default())), Some(">"));
        assert_eq!(raw(store.last_token(&element, Skip::new(2))), Some("</"));
    }

    #[test]
    fn test_first_token_skips_comments() {
        let store = store();
        let children = Range::new(3, 13);
        assert_eq!(raw(store.first_token(&children, Skip::new(1))), Some("y"));
        assert_eq!(
            raw(store.first_token(&children, Skip::new(1).with_comments())),
            Some("<!--c-->")
        );
    }

    #[test]
    fn test_first_token_bounded_by_node() {
        let store = store();
        let text = Range::new(3, 4);
        assert_eq!(raw(store.first_token(&text, Skip::default())), Some("x"));
        assert_eq!(store.first_token(&text, Skip::new(1)), None);
        assert_eq!(store.first_token(&text, Skip::new(1).with_comments()), None);
    }

    #[test]
    fn test_last_token_bounded_by_node() {
        let store = store();
        let text = Range::new(12, 13);
        assert_eq!(store.last_token(&text, Skip::new(1)), None);
        assert_eq!(store.last_token(&text, Skip::new(1).with_comments()), None);
    }

    #[test]
    fn test_token_before_and_after() {
        let store = store();
        let y = Range::new(12, 13);
        assert_eq!(raw(store.token_before(&y, Skip::default())), Some("x"));
        assert_eq!(
            raw(store.token_before(&y, Skip::default().with_comments())),
            Some("<!--c-->")
        );
        assert_eq!(raw(store.token_after(&y, Skip::default())), Some("</"));
        assert_eq!(raw(store.token_after(&y, Skip::new(2))), Some(">"));
        assert_eq!(store.token_after(&y, Skip::new(3)), None);
    }

    #[test]
    fn test_token_before_is_unbounded() {
        let store = store();
        let x = Range::new(3, 4);
        assert_eq!(raw(store.token_before(&x, Skip::new(2))), Some("<"));
        assert_eq!(store.token_before(&x, Skip::new(3)), None);
        assert_eq!(store.token_before(&x, Skip::new(3).with_comments()), None);
    }

    #[test]
    fn test_token_after_skips_comments() {
        let store = store();
        let x = Range::new(3, 4);
        assert_eq!(raw(store.token_after(&x, Skip::default())), Some("y"));
        assert_eq!(
            raw(store.token_after(&x, Skip::default().with_comments())),
            Some("<!--c-->")
        );
    }

    #[test]
    #[should_panic(expected = "overlaps previous token")]
    fn test_push_rejects_overlap() {
        let lines = LineIndex::new(SOURCE);
        let mut store = TokenStore::new();
        store.push(Token::from_source(TokenKind::Punctuator, SOURCE, Range::new(0, 3), &lines));
        store.push(Token::from_source(TokenKind::Punctuator, SOURCE, Range::new(2, 4), &lines));
    }

    #[test]
    #[should_panic(expected = "is not the start of any token")]
    fn test_unrecorded_boundary_panics() {
        let store = store();
        store.first_token(&Range::new(5, 12), Skip::default());
    }

    #[test]
    fn test_len_and_into_vec() {
        let store = store();
        assert_eq!(store.len(), 9);
        assert_eq!(store.into_vec().len(), 9);
    }
}
