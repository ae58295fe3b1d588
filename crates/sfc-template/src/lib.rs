//! SFC Template
//!
//! Turns the template of a single-file component into one syntax tree whose
//! nodes and tokens all carry exact byte ranges and line/column locations in
//! the component source. Interpolations and directive values are reparsed
//! as script expressions in place; a bad expression is recorded on its
//! container instead of failing the whole template.
//!
//! ```text
//! source → MarkupParser → MarkupNode tree → transform() → TemplateBody
//!                                               │
//!                                    Bridge ⇄ ParseScript
//! ```
//!
//! # Example
//!
//! ```
//! use sfc_parser::ScriptParser;
//! use sfc_template::{parse_template, TemplateOptions};
//!
//! let body = parse_template("<p>{{ count }}</p>", &ScriptParser, &TemplateOptions::default()).unwrap();
//! assert!(body.syntax_errors().is_empty());
//! ```

pub mod bridge;
pub mod component;
pub mod directive;
pub mod node;
pub mod options;
pub mod transform;

pub use bridge::{Bridge, Reparsed};
pub use component::{
    parse_component, parse_template, split_component, Component, ComponentBlocks, ComponentError,
};
pub use directive::{DirectiveKey, KNOWN_DIRECTIVES};
pub use node::{ExpressionContainer, Node, NodeId, NodeKind, TemplateBody, TreeView};
pub use options::{OptionsError, ParserOptions, Syntax, TemplateOptions};
pub use transform::transform;
