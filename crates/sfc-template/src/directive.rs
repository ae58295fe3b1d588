//! Directive attribute names.

use serde::Serialize;

/// Directive names with built-in meaning.
pub const KNOWN_DIRECTIVES: &[&str] = &[
    "text", "html", "show", "if", "else", "else-if", "for", "on", "bind", "model", "pre", "cloak",
    "once",
];

/// A directive attribute name split into its parts.
///
/// `v-on:click.stop` has name `on`, argument `click` and modifiers
/// `["stop"]`. The shorthands `:` and `@` keep the sigil as the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectiveKey {
    pub name: String,
    pub argument: Option<String>,
    pub modifiers: Vec<String>,
    pub shorthand: bool,
}

impl DirectiveKey {
    /// Decompose `raw`. Never fails: malformed names produce empty parts.
    pub fn parse(raw: &str, prefix: &str) -> Self {
        let mut name = None;
        let mut shorthand = false;
        let mut remain = raw;

        if let Some(sigil @ (':' | '@')) = raw.chars().next() {
            name = Some(sigil.to_string());
            shorthand = true;
            remain = &raw[1..];
        } else if let Some((head, tail)) = raw.split_once(':') {
            name = Some(head.to_string());
            remain = tail;
        }

        let mut pieces = remain.split('.');
        let first = pieces.next().unwrap_or_default().to_string();
        let modifiers = pieces.map(str::to_string).collect();

        let (name, argument) = match name {
            None => (first, None),
            Some(name) => (name, Some(first)),
        };
        let name = match name.strip_prefix(prefix) {
            Some(stripped) => stripped.to_string(),
            None => name,
        };

        Self {
            name,
            argument,
            modifiers,
            shorthand,
        }
    }

    /// Whether this is a built-in directive. Shorthands stand for `bind`
    /// and `on`.
    pub fn is_known(&self) -> bool {
        self.shorthand || KNOWN_DIRECTIVES.contains(&self.name.as_str())
    }
}
