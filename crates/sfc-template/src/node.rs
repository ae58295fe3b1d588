//! Template syntax tree.
//!
//! Nodes live in an arena owned by [`TemplateBody`] and refer to each other
//! by [`NodeId`]. Every node knows its parent; the root [`NodeKind::Document`]
//! is always [`TemplateBody::ROOT`].

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use sfc_lexer::{Comment, HasRange, Location, Range, Skip, Token, TokenStore};
use sfc_parser::{Expression, ParseError};

use crate::directive::DirectiveKey;

/// Index of a node in its [`TemplateBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub range: Range,
    pub loc: Location,
    pub parent: Option<NodeId>,
}

impl HasRange for Node {
    fn range(&self) -> Range {
        self.range
    }
}

impl Node {
    /// Content children of a document or element.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Document { children } | NodeKind::Element { children, .. } => children,
            _ => &[],
        }
    }

    /// Every node owned by this one, in source order.
    pub fn owned(&self) -> Vec<NodeId> {
        match &self.kind {
            NodeKind::Document { children } => children.clone(),
            NodeKind::Element {
                start_tag,
                end_tag,
                attributes,
                children,
                ..
            } => std::iter::once(*start_tag)
                .chain(attributes.iter().copied())
                .chain(children.iter().copied())
                .chain(end_tag.iter().copied())
                .collect(),
            NodeKind::Attribute { key, value } => std::iter::once(*key).chain(*value).collect(),
            _ => Vec::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NodeKind {
    Document {
        children: Vec<NodeId>,
    },
    Element {
        name: String,
        start_tag: NodeId,
        end_tag: Option<NodeId>,
        attributes: Vec<NodeId>,
        children: Vec<NodeId>,
    },
    StartTag {
        self_closing: bool,
    },
    EndTag,
    Attribute {
        key: NodeId,
        value: Option<NodeId>,
    },
    /// A plain attribute name.
    Identifier {
        name: String,
    },
    DirectiveKey(DirectiveKey),
    /// A plain attribute value. `raw` includes the quotes.
    Literal {
        value: String,
        raw: String,
    },
    Text {
        value: String,
        raw: String,
    },
    ExpressionContainer(ExpressionContainer),
}

impl NodeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Document { .. } => "Document",
            NodeKind::Element { .. } => "Element",
            NodeKind::StartTag { .. } => "StartTag",
            NodeKind::EndTag => "EndTag",
            NodeKind::Attribute { .. } => "Attribute",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::DirectiveKey(_) => "DirectiveKey",
            NodeKind::Literal { .. } => "Literal",
            NodeKind::Text { .. } => "Text",
            NodeKind::ExpressionContainer(_) => "ExpressionContainer",
        }
    }
}

/// An interpolation or directive value: the parsed expression, or the
/// error that prevented parsing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExpressionContainer {
    #[serde(rename = "expression")]
    Expression(Expression),
    #[serde(rename = "syntaxError")]
    SyntaxError(ParseError),
}

impl ExpressionContainer {
    pub fn expression(&self) -> Option<&Expression> {
        match self {
            ExpressionContainer::Expression(expr) => Some(expr),
            ExpressionContainer::SyntaxError(_) => None,
        }
    }

    pub fn syntax_error(&self) -> Option<&ParseError> {
        match self {
            ExpressionContainer::Expression(_) => None,
            ExpressionContainer::SyntaxError(err) => Some(err),
        }
    }
}

/// The result of transforming a template: the node arena plus every token
/// and comment, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateBody {
    pub(crate) nodes: Vec<Node>,
    pub tokens: TokenStore,
    pub comments: Vec<Comment>,
}

impl TemplateBody {
    pub const ROOT: NodeId = NodeId(0);

    pub fn root(&self) -> &Node {
        &self.nodes[Self::ROOT.index()]
    }

    /// # Panics
    ///
    /// If `id` does not belong to this body.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Every syntax error captured in an expression container, in source
    /// order.
    pub fn syntax_errors(&self) -> Vec<&ParseError> {
        let mut errors: Vec<&ParseError> = self
            .nodes
            .iter()
            .filter_map(|node| match &node.kind {
                NodeKind::ExpressionContainer(container) => container.syntax_error(),
                _ => None,
            })
            .collect();
        errors.sort_by_key(|e| e.index);
        errors
    }

    pub fn first_token(&self, id: NodeId, options: Skip) -> Option<&Token> {
        self.tokens.first_token(self.node(id), options)
    }

    pub fn last_token(&self, id: NodeId, options: Skip) -> Option<&Token> {
        self.tokens.last_token(self.node(id), options)
    }

    pub fn token_before(&self, id: NodeId, options: Skip) -> Option<&Token> {
        self.tokens.token_before(self.node(id), options)
    }

    pub fn token_after(&self, id: NodeId, options: Skip) -> Option<&Token> {
        self.tokens.token_after(self.node(id), options)
    }

    /// A nested view of the tree rooted at `id`, for serialization.
    pub fn tree(&self, id: NodeId) -> TreeView<'_> {
        TreeView { body: self, id }
    }
}

impl Serialize for TemplateBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("root", &self.tree(Self::ROOT))?;
        map.serialize_entry("tokens", &self.tokens)?;
        map.serialize_entry("comments", &self.comments)?;
        map.end()
    }
}

/// A node serialized with its owned nodes inlined.
pub struct TreeView<'a> {
    body: &'a TemplateBody,
    id: NodeId,
}

impl TreeView<'_> {
    fn child(&self, id: NodeId) -> Self {
        TreeView { body: self.body, id }
    }

    fn children(&self, ids: &[NodeId]) -> Vec<Self> {
        ids.iter().map(|&id| self.child(id)).collect()
    }
}

impl Serialize for TreeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.body.node(self.id);
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", node.type_name())?;
        map.serialize_entry("range", &node.range)?;
        map.serialize_entry("loc", &node.loc)?;

        match &node.kind {
            NodeKind::Document { children } => {
                map.serialize_entry("children", &self.children(children))?;
            }
            NodeKind::Element {
                name,
                start_tag,
                end_tag,
                attributes,
                children,
            } => {
                map.serialize_entry("name", name)?;
                map.serialize_entry("startTag", &self.child(*start_tag))?;
                map.serialize_entry("attributes", &self.children(attributes))?;
                map.serialize_entry("children", &self.children(children))?;
                map.serialize_entry("endTag", &end_tag.map(|id| self.child(id)))?;
            }
            NodeKind::StartTag { self_closing } => {
                map.serialize_entry("selfClosing", self_closing)?;
            }
            NodeKind::EndTag => {}
            NodeKind::Attribute { key, value } => {
                map.serialize_entry("key", &self.child(*key))?;
                map.serialize_entry("value", &value.map(|id| self.child(id)))?;
            }
            NodeKind::Identifier { name } => {
                map.serialize_entry("name", name)?;
            }
            NodeKind::DirectiveKey(key) => {
                map.serialize_entry("name", &key.name)?;
                map.serialize_entry("argument", &key.argument)?;
                map.serialize_entry("modifiers", &key.modifiers)?;
                map.serialize_entry("shorthand", &key.shorthand)?;
            }
            NodeKind::Literal { value, raw } | NodeKind::Text { value, raw } => {
                map.serialize_entry("value", value)?;
                map.serialize_entry("raw", raw)?;
            }
            NodeKind::ExpressionContainer(container) => {
                map.serialize_entry("expression", &container.expression())?;
                map.serialize_entry("syntaxError", &container.syntax_error())?;
            }
        }

        map.end()
    }
}
