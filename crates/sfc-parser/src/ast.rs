//! Script syntax tree.
//!
//! An ESTree-shaped tree for the script subset understood by
//! [`ExprParser`](crate::expr_parser::ExprParser). Every node carries its
//! byte range and line/column location relative to the text handed to the
//! parser; the template bridge pads that text so these are absolute.

use serde::Serialize;
use sfc_lexer::{Comment, Location, Range, Token};

// ---------------------------------------------------------------------------
// Parse result
// ---------------------------------------------------------------------------

/// The output of a script parse: the tree plus its tokens and comments in
/// source order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Script {
    pub program: Program,
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub body: Vec<Statement>,
    pub range: Range,
    pub loc: Location,
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub kind: StmtKind,
    pub range: Range,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StmtKind {
    /// `expr;`
    Expression(Expression),

    /// `let a = 1, b;`
    VariableDeclaration {
        kind: VarKind,
        declarations: Vec<VariableDeclarator>,
    },

    /// `function name(a, b) { ... }`
    Function {
        id: Expression,
        params: Vec<Expression>,
        body: Block,
    },

    /// `return expr;`
    Return(Option<Expression>),

    /// `if (test) consequent else alternate`
    If {
        test: Expression,
        consequent: Box<Statement>,
        alternate: Option<Box<Statement>>,
    },

    /// `{ ... }`
    Block(Block),

    /// `;`
    Empty,

    /// `import a, { b as c } from "d";`
    Import {
        specifiers: Vec<ImportSpecifier>,
        source: String,
    },

    /// `export default expr;`
    ExportDefault(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub body: Vec<Statement>,
    pub range: Range,
    pub loc: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclarator {
    pub id: Expression,
    pub init: Option<Expression>,
    pub range: Range,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSpecifier {
    /// `None` for the default import.
    pub imported: Option<String>,
    pub local: Expression,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// A complete expression node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    pub kind: ExprKind,
    pub range: Range,
    pub loc: Location,
}

impl Expression {
    /// The identifier name, if this is a bare identifier.
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    /// Numeric literal: `42`, `3.14`, `0xff`
    Number(f64),

    /// String literal: `"hello"`, `'world'`
    String(String),

    /// Template literal without substitutions: `` `text` ``
    Template(String),

    /// Boolean literal: `true`, `false`
    Boolean(bool),

    /// Null literal
    Null,

    /// Identifier: `count`, `isActive`, `undefined`
    Identifier(String),

    /// `this`
    This,

    /// Binary operation: `a + b`, `count > 0`
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },

    /// Short-circuit operation: `a && b`, `a ?? b`
    Logical {
        left: Box<Expression>,
        op: LogicalOp,
        right: Box<Expression>,
    },

    /// Unary operation: `!active`, `-count`, `typeof x`
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },

    /// `++count`, `count--`
    Update {
        op: UpdateOp,
        prefix: bool,
        operand: Box<Expression>,
    },

    /// Member access: `user.name`, `items[0]`, `user?.name`
    Member {
        object: Box<Expression>,
        property: Box<Expression>,
        computed: bool,
        optional: bool,
    },

    /// Function call: `save()`, `items.push(item)`, `fn?.()`
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        optional: bool,
    },

    /// `new Date()`
    New {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },

    /// Ternary: `count > 0 ? 'yes' : 'no'`
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },

    /// Object literal: `{ count: 0, name }`
    Object(Vec<Property>),

    /// Array literal: `[1, 2, 3]`
    Array(Vec<Expression>),

    /// Arrow function: `(x) => x + 1`, `() => { ... }`
    Arrow {
        params: Vec<Expression>,
        body: ArrowBody,
    },

    /// Assignment: `count = 5`, `count += 1`
    Assignment {
        target: Box<Expression>,
        op: AssignOp,
        value: Box<Expression>,
    },

    /// Comma-separated expressions: `a, b`
    Sequence(Vec<Expression>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ArrowBody {
    Expression(Box<Expression>),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub key: Expression,
    pub value: Expression,
    pub computed: bool,
    pub shorthand: bool,
    pub range: Range,
    pub loc: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Eq,
    Neq,
    StrictEq,
    StrictNeq,
    Lt,
    Gt,
    Lte,
    Gte,
    In,
    Instanceof,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicalOp {
    And,
    Or,
    NullishCoalescing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    Typeof,
    Void,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    NullishAssign,
}

// ---------------------------------------------------------------------------
// Span rewriting
// ---------------------------------------------------------------------------

/// A callback over the range and location of a node.
pub type SpanFn<'a> = dyn FnMut(&mut Range, &mut Location) + 'a;

impl Expression {
    /// Call `f` on the range and location of this expression and of every
    /// node inside it, outermost first.
    pub fn for_each_span_mut(&mut self, f: &mut SpanFn<'_>) {
        f(&mut self.range, &mut self.loc);
        match &mut self.kind {
            ExprKind::Number(_)
            | ExprKind::String(_)
            | ExprKind::Template(_)
            | ExprKind::Boolean(_)
            | ExprKind::Null
            | ExprKind::Identifier(_)
            | ExprKind::This => {}
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                left.for_each_span_mut(f);
                right.for_each_span_mut(f);
            }
            ExprKind::Unary { operand, .. } | ExprKind::Update { operand, .. } => {
                operand.for_each_span_mut(f);
            }
            ExprKind::Member {
                object, property, ..
            } => {
                object.for_each_span_mut(f);
                property.for_each_span_mut(f);
            }
            ExprKind::Call {
                callee, arguments, ..
            }
            | ExprKind::New { callee, arguments } => {
                callee.for_each_span_mut(f);
                for argument in arguments {
                    argument.for_each_span_mut(f);
                }
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                test.for_each_span_mut(f);
                consequent.for_each_span_mut(f);
                alternate.for_each_span_mut(f);
            }
            ExprKind::Object(properties) => {
                for property in properties {
                    f(&mut property.range, &mut property.loc);
                    property.key.for_each_span_mut(f);
                    property.value.for_each_span_mut(f);
                }
            }
            ExprKind::Array(elements) | ExprKind::Sequence(elements) => {
                for element in elements {
                    element.for_each_span_mut(f);
                }
            }
            ExprKind::Arrow { params, body } => {
                for param in params {
                    param.for_each_span_mut(f);
                }
                match body {
                    ArrowBody::Expression(expression) => expression.for_each_span_mut(f),
                    ArrowBody::Block(block) => block.for_each_span_mut(f),
                }
            }
            ExprKind::Assignment { target, value, .. } => {
                target.for_each_span_mut(f);
                value.for_each_span_mut(f);
            }
        }
    }
}

impl Block {
    pub fn for_each_span_mut(&mut self, f: &mut SpanFn<'_>) {
        f(&mut self.range, &mut self.loc);
        for statement in &mut self.body {
            statement.for_each_span_mut(f);
        }
    }
}

impl Statement {
    pub fn for_each_span_mut(&mut self, f: &mut SpanFn<'_>) {
        f(&mut self.range, &mut self.loc);
        match &mut self.kind {
            StmtKind::Expression(expression)
            | StmtKind::Return(Some(expression))
            | StmtKind::ExportDefault(expression) => expression.for_each_span_mut(f),
            StmtKind::Return(None) | StmtKind::Empty => {}
            StmtKind::VariableDeclaration { declarations, .. } => {
                for declarator in declarations {
                    f(&mut declarator.range, &mut declarator.loc);
                    declarator.id.for_each_span_mut(f);
                    if let Some(init) = &mut declarator.init {
                        init.for_each_span_mut(f);
                    }
                }
            }
            StmtKind::Function { id, params, body } => {
                id.for_each_span_mut(f);
                for param in params {
                    param.for_each_span_mut(f);
                }
                body.for_each_span_mut(f);
            }
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                test.for_each_span_mut(f);
                consequent.for_each_span_mut(f);
                if let Some(alternate) = alternate {
                    alternate.for_each_span_mut(f);
                }
            }
            StmtKind::Block(block) => block.for_each_span_mut(f),
            StmtKind::Import { specifiers, .. } => {
                for specifier in specifiers {
                    specifier.local.for_each_span_mut(f);
                }
            }
        }
    }
}
