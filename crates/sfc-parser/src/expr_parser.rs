//! Script parser.
//!
//! Parses token streams from [`expr_lexer`](crate::expr_lexer) into a
//! [`Script`]: recursive descent for statements, Pratt parsing for binary
//! operator precedence.

use sfc_lexer::{LineIndex, Location, Range, Token};

use crate::ast::*;
use crate::expr_lexer::{ExprLexer, ExprToken, ExprTokenKind, TokenValue};
use crate::ParseError;

type Result<T> = std::result::Result<T, ParseError>;

/// Binary and logical operators share one precedence table.
#[derive(Debug, Clone, Copy)]
enum InfixOp {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Script parser over one input text.
pub struct ExprParser<'a> {
    source: &'a str,
    lines: &'a LineIndex,
    tokens: Vec<ExprToken>,
    pos: usize,
    prev_end: usize,
}

impl<'a> ExprParser<'a> {
    /// Create a new parser for the given tokens; the last token must be
    /// [`ExprTokenKind::Eof`].
    pub fn new(source: &'a str, lines: &'a LineIndex, tokens: Vec<ExprToken>) -> Self {
        Self {
            source,
            lines,
            tokens,
            pos: 0,
            prev_end: 0,
        }
    }

    /// Parse a complete script, returning the program with its tokens and
    /// comments.
    pub fn parse_script(source: &str) -> Result<Script> {
        let lines = LineIndex::new(source);
        let lexed = ExprLexer::new(source, &lines).run()?;

        let tokens = lexed
            .tokens
            .iter()
            .filter(|t| t.kind != ExprTokenKind::Eof)
            .map(|t| Token::from_source(t.kind.token_kind(), source, t.range, &lines))
            .collect();

        let mut parser = ExprParser::new(source, &lines, lexed.tokens);
        let program = parser.parse_program()?;

        Ok(Script {
            program,
            tokens,
            comments: lexed.comments,
        })
    }

    /// Parse source consisting of exactly one expression.
    pub fn parse_expression(source: &str) -> Result<Expression> {
        let lines = LineIndex::new(source);
        let lexed = ExprLexer::new(source, &lines).run()?;
        let mut parser = ExprParser::new(source, &lines, lexed.tokens);
        let expr = parser.parse_sequence()?;
        parser.expect(ExprTokenKind::Eof)?;
        Ok(expr)
    }

    // --- Statements ---

    fn parse_program(&mut self) -> Result<Program> {
        let start = self.current().range.start;
        let mut body = Vec::new();
        while !self.check(ExprTokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        let range = Range::new(start, self.source.len());
        Ok(Program {
            body,
            range,
            loc: self.lines.location(range),
        })
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        let start = self.current().range.start;

        let kind = match self.current().kind {
            ExprTokenKind::LBrace => StmtKind::Block(self.parse_block()?),
            ExprTokenKind::Semicolon => {
                self.advance();
                StmtKind::Empty
            }
            ExprTokenKind::Keyword => match self.word() {
                "var" => self.parse_variable_declaration(VarKind::Var)?,
                "const" => self.parse_variable_declaration(VarKind::Const)?,
                "function" => self.parse_function()?,
                "return" => self.parse_return()?,
                "if" => self.parse_if()?,
                "import" => self.parse_import()?,
                "export" => self.parse_export_default()?,
                "this" | "typeof" | "void" | "delete" | "new" => self.parse_expression_statement()?,
                word => {
                    let message = format!("Unexpected keyword '{word}'");
                    return Err(self.error_at_current(message));
                }
            },
            ExprTokenKind::Identifier if self.word() == "let" && self.starts_binding(1) => {
                self.parse_variable_declaration(VarKind::Let)?
            }
            _ => self.parse_expression_statement()?,
        };

        Ok(self.statement(kind, start))
    }

    fn parse_block(&mut self) -> Result<Block> {
        let start = self.current().range.start;
        self.expect(ExprTokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.check(ExprTokenKind::RBrace) {
            if self.check(ExprTokenKind::Eof) {
                return Err(self.unexpected());
            }
            body.push(self.parse_statement()?);
        }
        self.advance();
        let (range, loc) = self.finish(start);
        Ok(Block { body, range, loc })
    }

    fn parse_expression_statement(&mut self) -> Result<StmtKind> {
        let expr = self.parse_sequence()?;
        self.consume_semicolon()?;
        Ok(StmtKind::Expression(expr))
    }

    fn parse_variable_declaration(&mut self, kind: VarKind) -> Result<StmtKind> {
        self.advance(); // var / let / const
        let mut declarations = Vec::new();

        loop {
            let start = self.current().range.start;
            let id = self.parse_binding_identifier()?;
            let init = if self.eat(ExprTokenKind::Eq) {
                Some(self.parse_assignment()?)
            } else {
                if kind == VarKind::Const {
                    return Err(self.error_at_current("Missing initializer in const declaration".into()));
                }
                None
            };
            let (range, loc) = self.finish(start);
            declarations.push(VariableDeclarator { id, init, range, loc });

            if !self.eat(ExprTokenKind::Comma) {
                break;
            }
        }

        self.consume_semicolon()?;
        Ok(StmtKind::VariableDeclaration { kind, declarations })
    }

    fn parse_function(&mut self) -> Result<StmtKind> {
        self.advance(); // function
        let id = self.parse_binding_identifier()?;
        self.expect(ExprTokenKind::LParen)?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(StmtKind::Function { id, params, body })
    }

    fn parse_return(&mut self) -> Result<StmtKind> {
        self.advance(); // return
        let argument = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_sequence()?)
        };
        self.consume_semicolon()?;
        Ok(StmtKind::Return(argument))
    }

    fn parse_if(&mut self) -> Result<StmtKind> {
        self.advance(); // if
        self.expect(ExprTokenKind::LParen)?;
        let test = self.parse_sequence()?;
        self.expect(ExprTokenKind::RParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.check_word("else") {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_import(&mut self) -> Result<StmtKind> {
        self.advance(); // import
        let mut specifiers = Vec::new();

        if !self.check(ExprTokenKind::String) {
            if self.check(ExprTokenKind::Identifier) {
                let local = self.parse_binding_identifier()?;
                specifiers.push(ImportSpecifier {
                    imported: None,
                    local,
                });
                if !self.eat(ExprTokenKind::Comma) {
                    return self.finish_import(specifiers);
                }
            }

            self.expect(ExprTokenKind::LBrace)?;
            while !self.eat(ExprTokenKind::RBrace) {
                let imported = self.parse_property_name()?;
                let local = if self.check_word("as") {
                    self.advance();
                    self.parse_binding_identifier()?
                } else {
                    match imported.as_identifier() {
                        Some(name) if !crate::expr_lexer::is_keyword(name) => imported.clone(),
                        _ => return Err(self.unexpected()),
                    }
                };
                let imported = imported.as_identifier().map(str::to_string);
                specifiers.push(ImportSpecifier { imported, local });
                if !self.check(ExprTokenKind::RBrace) {
                    self.expect(ExprTokenKind::Comma)?;
                }
            }
        }

        self.finish_import(specifiers)
    }

    fn finish_import(&mut self, specifiers: Vec<ImportSpecifier>) -> Result<StmtKind> {
        if !specifiers.is_empty() {
            if !self.check_word("from") {
                return Err(self.unexpected());
            }
            self.advance();
        }
        let source = match &self.current().value {
            TokenValue::String(value) if self.check(ExprTokenKind::String) => value.clone(),
            _ => return Err(self.unexpected()),
        };
        self.advance();
        self.consume_semicolon()?;
        Ok(StmtKind::Import { specifiers, source })
    }

    fn parse_export_default(&mut self) -> Result<StmtKind> {
        self.advance(); // export
        if !self.check_word("default") {
            return Err(self.unexpected());
        }
        self.advance();
        let declaration = self.parse_assignment()?;
        self.consume_semicolon()?;
        Ok(StmtKind::ExportDefault(declaration))
    }

    /// Automatic semicolon insertion: a `;`, or a `}`, end of input, or line
    /// break before the next token.
    fn consume_semicolon(&mut self) -> Result<()> {
        if self.eat(ExprTokenKind::Semicolon) || self.at_statement_end() {
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn at_statement_end(&self) -> bool {
        let token = self.current();
        matches!(
            token.kind,
            ExprTokenKind::Semicolon | ExprTokenKind::RBrace | ExprTokenKind::Eof
        ) || token.newline_before
    }

    // --- Expressions ---

    /// `a, b, c`
    fn parse_sequence(&mut self) -> Result<Expression> {
        let start = self.current().range.start;
        let first = self.parse_assignment()?;
        if !self.check(ExprTokenKind::Comma) {
            return Ok(first);
        }

        let mut expressions = vec![first];
        while self.eat(ExprTokenKind::Comma) {
            expressions.push(self.parse_assignment()?);
        }
        Ok(self.expression(ExprKind::Sequence(expressions), start))
    }

    fn parse_assignment(&mut self) -> Result<Expression> {
        if self.at_arrow() {
            return self.parse_arrow();
        }

        let start = self.current().range.start;
        let target = self.parse_conditional()?;

        let op = match self.current().kind {
            ExprTokenKind::Eq => AssignOp::Assign,
            ExprTokenKind::PlusEq => AssignOp::AddAssign,
            ExprTokenKind::MinusEq => AssignOp::SubAssign,
            ExprTokenKind::StarEq => AssignOp::MulAssign,
            ExprTokenKind::SlashEq => AssignOp::DivAssign,
            ExprTokenKind::PercentEq => AssignOp::ModAssign,
            ExprTokenKind::AndEq => AssignOp::AndAssign,
            ExprTokenKind::OrEq => AssignOp::OrAssign,
            ExprTokenKind::QuestionQuestionEq => AssignOp::NullishAssign,
            _ => return Ok(target),
        };

        if !is_assignable(&target) {
            return Err(self.error_at(target.range.start, "Invalid left-hand side in assignment".into()));
        }

        self.advance();
        let value = self.parse_assignment()?;
        Ok(self.expression(
            ExprKind::Assignment {
                target: Box::new(target),
                op,
                value: Box::new(value),
            },
            start,
        ))
    }

    /// Whether an arrow function starts here: `x =>` or `( ... ) =>`.
    fn at_arrow(&self) -> bool {
        match self.current().kind {
            ExprTokenKind::Identifier => self.peek_kind(1) == ExprTokenKind::Arrow,
            ExprTokenKind::LParen => {
                let mut depth = 0usize;
                for (i, token) in self.tokens[self.pos..].iter().enumerate() {
                    match token.kind {
                        ExprTokenKind::LParen | ExprTokenKind::LBracket | ExprTokenKind::LBrace => {
                            depth += 1
                        }
                        ExprTokenKind::RParen | ExprTokenKind::RBracket | ExprTokenKind::RBrace => {
                            depth = depth.saturating_sub(1);
                            if depth == 0 {
                                return self.peek_kind(i + 1) == ExprTokenKind::Arrow;
                            }
                        }
                        ExprTokenKind::Eof => return false,
                        _ => {}
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn parse_arrow(&mut self) -> Result<Expression> {
        let start = self.current().range.start;

        let params = if self.eat(ExprTokenKind::LParen) {
            self.parse_params()?
        } else {
            vec![self.parse_binding_identifier()?]
        };

        if self.current().newline_before {
            return Err(self.unexpected());
        }
        self.expect(ExprTokenKind::Arrow)?;

        let body = if self.check(ExprTokenKind::LBrace) {
            ArrowBody::Block(self.parse_block()?)
        } else {
            ArrowBody::Expression(Box::new(self.parse_assignment()?))
        };

        Ok(self.expression(ExprKind::Arrow { params, body }, start))
    }

    /// Parameter list after the opening paren, through the closing paren.
    fn parse_params(&mut self) -> Result<Vec<Expression>> {
        let mut params = Vec::new();
        while !self.eat(ExprTokenKind::RParen) {
            params.push(self.parse_binding_identifier()?);
            if !self.check(ExprTokenKind::RParen) {
                self.expect(ExprTokenKind::Comma)?;
            }
        }
        Ok(params)
    }

    fn parse_conditional(&mut self) -> Result<Expression> {
        let start = self.current().range.start;
        let test = self.parse_binary(0)?;

        if !self.eat(ExprTokenKind::Question) {
            return Ok(test);
        }

        let consequent = self.parse_assignment()?;
        self.expect(ExprTokenKind::Colon)?;
        let alternate = self.parse_assignment()?;

        Ok(self.expression(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            start,
        ))
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expression> {
        let start = self.current().range.start;
        let mut left = self.parse_unary()?;

        while let Some((precedence, op)) = self.infix_operator() {
            if precedence < min_precedence {
                break;
            }
            self.advance();

            // `**` is right-associative.
            let next = match op {
                InfixOp::Binary(BinaryOp::Exp) => precedence,
                _ => precedence + 1,
            };
            let right = Box::new(self.parse_binary(next)?);
            let left_box = Box::new(left);

            let kind = match op {
                InfixOp::Binary(op) => ExprKind::Binary {
                    left: left_box,
                    op,
                    right,
                },
                InfixOp::Logical(op) => ExprKind::Logical {
                    left: left_box,
                    op,
                    right,
                },
            };
            left = self.expression(kind, start);
        }

        Ok(left)
    }

    fn infix_operator(&self) -> Option<(u8, InfixOp)> {
        use BinaryOp::*;

        let token = self.current();
        let entry = match token.kind {
            ExprTokenKind::QuestionQuestion => (1, InfixOp::Logical(LogicalOp::NullishCoalescing)),
            ExprTokenKind::Or => (1, InfixOp::Logical(LogicalOp::Or)),
            ExprTokenKind::And => (2, InfixOp::Logical(LogicalOp::And)),
            ExprTokenKind::Pipe => (3, InfixOp::Binary(BitOr)),
            ExprTokenKind::Caret => (4, InfixOp::Binary(BitXor)),
            ExprTokenKind::Amp => (5, InfixOp::Binary(BitAnd)),
            ExprTokenKind::EqEq => (6, InfixOp::Binary(Eq)),
            ExprTokenKind::NotEq => (6, InfixOp::Binary(Neq)),
            ExprTokenKind::StrictEq => (6, InfixOp::Binary(StrictEq)),
            ExprTokenKind::StrictNotEq => (6, InfixOp::Binary(StrictNeq)),
            ExprTokenKind::Lt => (7, InfixOp::Binary(Lt)),
            ExprTokenKind::Gt => (7, InfixOp::Binary(Gt)),
            ExprTokenKind::Lte => (7, InfixOp::Binary(Lte)),
            ExprTokenKind::Gte => (7, InfixOp::Binary(Gte)),
            ExprTokenKind::Keyword if self.word() == "in" => (7, InfixOp::Binary(In)),
            ExprTokenKind::Keyword if self.word() == "instanceof" => (7, InfixOp::Binary(Instanceof)),
            ExprTokenKind::Shl => (8, InfixOp::Binary(Shl)),
            ExprTokenKind::Shr => (8, InfixOp::Binary(Shr)),
            ExprTokenKind::UShr => (8, InfixOp::Binary(UShr)),
            ExprTokenKind::Plus => (9, InfixOp::Binary(Add)),
            ExprTokenKind::Minus => (9, InfixOp::Binary(Sub)),
            ExprTokenKind::Star => (10, InfixOp::Binary(Mul)),
            ExprTokenKind::Slash => (10, InfixOp::Binary(Div)),
            ExprTokenKind::Percent => (10, InfixOp::Binary(Mod)),
            ExprTokenKind::StarStar => (11, InfixOp::Binary(Exp)),
            _ => return None,
        };
        Some(entry)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        let start = self.current().range.start;

        let op = match self.current().kind {
            ExprTokenKind::Not => UnaryOp::Not,
            ExprTokenKind::Minus => UnaryOp::Neg,
            ExprTokenKind::Plus => UnaryOp::Plus,
            ExprTokenKind::Tilde => UnaryOp::BitNot,
            ExprTokenKind::Keyword if self.word() == "typeof" => UnaryOp::Typeof,
            ExprTokenKind::Keyword if self.word() == "void" => UnaryOp::Void,
            ExprTokenKind::Keyword if self.word() == "delete" => UnaryOp::Delete,
            ExprTokenKind::PlusPlus | ExprTokenKind::MinusMinus => {
                let op = self.update_operator();
                self.advance();
                let operand = self.parse_unary()?;
                if !is_assignable(&operand) {
                    return Err(self.error_at(
                        operand.range.start,
                        "Invalid left-hand side expression in prefix operation".into(),
                    ));
                }
                return Ok(self.expression(
                    ExprKind::Update {
                        op,
                        prefix: true,
                        operand: Box::new(operand),
                    },
                    start,
                ));
            }
            _ => return self.parse_postfix(),
        };

        self.advance();
        let operand = self.parse_unary()?;
        Ok(self.expression(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            start,
        ))
    }

    fn parse_postfix(&mut self) -> Result<Expression> {
        let start = self.current().range.start;
        let operand = self.parse_left_hand_side()?;

        let is_update = matches!(
            self.current().kind,
            ExprTokenKind::PlusPlus | ExprTokenKind::MinusMinus
        );
        if !is_update || self.current().newline_before {
            return Ok(operand);
        }

        if !is_assignable(&operand) {
            return Err(self.error_at(
                operand.range.start,
                "Invalid left-hand side expression in postfix operation".into(),
            ));
        }

        let op = self.update_operator();
        self.advance();
        Ok(self.expression(
            ExprKind::Update {
                op,
                prefix: false,
                operand: Box::new(operand),
            },
            start,
        ))
    }

    fn update_operator(&self) -> UpdateOp {
        if self.check(ExprTokenKind::PlusPlus) {
            UpdateOp::Increment
        } else {
            UpdateOp::Decrement
        }
    }

    fn parse_left_hand_side(&mut self) -> Result<Expression> {
        let start = self.current().range.start;
        let expr = if self.check_word("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        self.parse_suffixes(expr, start, true)
    }

    fn parse_new(&mut self) -> Result<Expression> {
        let start = self.current().range.start;
        self.advance(); // new

        let callee_start = self.current().range.start;
        let callee = if self.check_word("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        let callee = self.parse_suffixes(callee, callee_start, false)?;

        let arguments = if self.eat(ExprTokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        Ok(self.expression(
            ExprKind::New {
                callee: Box::new(callee),
                arguments,
            },
            start,
        ))
    }

    /// Member accesses and (when `allow_call`) calls following `expr`.
    fn parse_suffixes(&mut self, mut expr: Expression, start: usize, allow_call: bool) -> Result<Expression> {
        loop {
            let kind = match self.current().kind {
                ExprTokenKind::Dot => {
                    self.advance();
                    let property = self.parse_member_name()?;
                    member(expr, property, false, false)
                }
                ExprTokenKind::LBracket => {
                    self.advance();
                    let property = self.parse_sequence()?;
                    self.expect(ExprTokenKind::RBracket)?;
                    member(expr, property, true, false)
                }
                ExprTokenKind::LParen if allow_call => {
                    self.advance();
                    let arguments = self.parse_arguments()?;
                    ExprKind::Call {
                        callee: Box::new(expr),
                        arguments,
                        optional: false,
                    }
                }
                ExprTokenKind::OptionalChain if allow_call => {
                    self.advance();
                    if self.eat(ExprTokenKind::LParen) {
                        let arguments = self.parse_arguments()?;
                        ExprKind::Call {
                            callee: Box::new(expr),
                            arguments,
                            optional: true,
                        }
                    } else if self.eat(ExprTokenKind::LBracket) {
                        let property = self.parse_sequence()?;
                        self.expect(ExprTokenKind::RBracket)?;
                        member(expr, property, true, true)
                    } else {
                        let property = self.parse_member_name()?;
                        member(expr, property, false, true)
                    }
                }
                _ => return Ok(expr),
            };
            expr = self.expression(kind, start);
        }
    }

    /// Arguments after the opening paren, through the closing paren.
    fn parse_arguments(&mut self) -> Result<Vec<Expression>> {
        let mut arguments = Vec::new();
        while !self.eat(ExprTokenKind::RParen) {
            arguments.push(self.parse_assignment()?);
            if !self.check(ExprTokenKind::RParen) {
                self.expect(ExprTokenKind::Comma)?;
            }
        }
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let token = self.current().clone();
        let start = token.range.start;

        let kind = match (token.kind, token.value) {
            (ExprTokenKind::Number, TokenValue::Number(n)) => ExprKind::Number(n),
            (ExprTokenKind::String, TokenValue::String(s)) => ExprKind::String(s),
            (ExprTokenKind::Template, TokenValue::String(s)) => ExprKind::Template(s),
            (ExprTokenKind::Boolean, TokenValue::Boolean(b)) => ExprKind::Boolean(b),
            (ExprTokenKind::Null, _) => ExprKind::Null,
            (ExprTokenKind::Identifier, TokenValue::Identifier(name)) => ExprKind::Identifier(name),
            (ExprTokenKind::Keyword, TokenValue::Identifier(word)) if word == "this" => ExprKind::This,
            (ExprTokenKind::LParen, _) => {
                self.advance();
                let expr = self.parse_sequence()?;
                self.expect(ExprTokenKind::RParen)?;
                return Ok(expr);
            }
            (ExprTokenKind::LBracket, _) => {
                self.advance();
                return self.parse_array(start);
            }
            (ExprTokenKind::LBrace, _) => {
                self.advance();
                return self.parse_object(start);
            }
            _ => return Err(self.unexpected()),
        };

        self.advance();
        Ok(self.expression(kind, start))
    }

    fn parse_array(&mut self, start: usize) -> Result<Expression> {
        let mut elements = Vec::new();
        while !self.eat(ExprTokenKind::RBracket) {
            elements.push(self.parse_assignment()?);
            if !self.check(ExprTokenKind::RBracket) {
                self.expect(ExprTokenKind::Comma)?;
            }
        }
        Ok(self.expression(ExprKind::Array(elements), start))
    }

    fn parse_object(&mut self, start: usize) -> Result<Expression> {
        let mut properties = Vec::new();
        while !self.eat(ExprTokenKind::RBrace) {
            properties.push(self.parse_property()?);
            if !self.check(ExprTokenKind::RBrace) {
                self.expect(ExprTokenKind::Comma)?;
            }
        }
        Ok(self.expression(ExprKind::Object(properties), start))
    }

    fn parse_property(&mut self) -> Result<Property> {
        let start = self.current().range.start;

        let (key, computed) = if self.eat(ExprTokenKind::LBracket) {
            let key = self.parse_assignment()?;
            self.expect(ExprTokenKind::RBracket)?;
            (key, true)
        } else {
            (self.parse_property_name()?, false)
        };

        let shorthand = !computed
            && self.current().kind != ExprTokenKind::Colon
            && self.tokens[self.pos - 1].kind == ExprTokenKind::Identifier;

        let value = if shorthand {
            key.clone()
        } else {
            self.expect(ExprTokenKind::Colon)?;
            self.parse_assignment()?
        };

        let (range, loc) = self.finish(start);
        Ok(Property {
            key,
            value,
            computed,
            shorthand,
            range,
            loc,
        })
    }

    /// An object key or import name: identifier, keyword, string or number.
    fn parse_property_name(&mut self) -> Result<Expression> {
        let token = self.current().clone();
        let kind = match (token.kind, token.value) {
            (ExprTokenKind::String, TokenValue::String(s)) => ExprKind::String(s),
            (ExprTokenKind::Number, TokenValue::Number(n)) => ExprKind::Number(n),
            _ => return self.parse_member_name(),
        };
        self.advance();
        Ok(self.expression(kind, token.range.start))
    }

    /// A property name after `.`: any identifier name, keywords included.
    fn parse_member_name(&mut self) -> Result<Expression> {
        let token = self.current();
        let start = token.range.start;
        match token.kind {
            ExprTokenKind::Identifier
            | ExprTokenKind::Keyword
            | ExprTokenKind::Boolean
            | ExprTokenKind::Null => {
                let name = token.range.slice(self.source).to_string();
                self.advance();
                Ok(self.expression(ExprKind::Identifier(name), start))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_binding_identifier(&mut self) -> Result<Expression> {
        let token = self.current();
        let start = token.range.start;
        match (&token.kind, &token.value) {
            (ExprTokenKind::Identifier, TokenValue::Identifier(name)) => {
                let name = name.clone();
                self.advance();
                Ok(self.expression(ExprKind::Identifier(name), start))
            }
            _ => Err(self.unexpected()),
        }
    }

    // --- Token helpers ---

    fn current(&self) -> &ExprToken {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self, offset: usize) -> ExprTokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(ExprTokenKind::Eof, |t| t.kind)
    }

    /// Text of the current identifier or keyword, or `""`.
    fn word(&self) -> &str {
        match &self.current().value {
            TokenValue::Identifier(word) => word,
            _ => "",
        }
    }

    fn check(&self, kind: ExprTokenKind) -> bool {
        self.current().kind == kind
    }

    fn check_word(&self, word: &str) -> bool {
        matches!(
            self.current().kind,
            ExprTokenKind::Identifier | ExprTokenKind::Keyword
        ) && self.word() == word
    }

    /// Whether the token at `offset` can start a binding (`let x`).
    fn starts_binding(&self, offset: usize) -> bool {
        matches!(
            self.peek_kind(offset),
            ExprTokenKind::Identifier | ExprTokenKind::LBracket | ExprTokenKind::LBrace
        )
    }

    fn advance(&mut self) {
        if self.current().kind != ExprTokenKind::Eof {
            self.prev_end = self.current().range.end;
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: ExprTokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: ExprTokenKind) -> Result<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Range and location from `start` to the end of the last consumed token.
    fn finish(&self, start: usize) -> (Range, Location) {
        let range = Range::new(start, self.prev_end.max(start));
        (range, self.lines.location(range))
    }

    fn expression(&self, kind: ExprKind, start: usize) -> Expression {
        let (range, loc) = self.finish(start);
        Expression { kind, range, loc }
    }

    fn statement(&self, kind: StmtKind, start: usize) -> Statement {
        let (range, loc) = self.finish(start);
        Statement { kind, range, loc }
    }

    fn unexpected(&self) -> ParseError {
        let token = self.current();
        let message = match token.kind {
            ExprTokenKind::Eof => "Unexpected end of input".to_string(),
            _ => format!("Unexpected token '{}'", token.range.slice(self.source)),
        };
        self.error_at_current(message)
    }

    fn error_at_current(&self, message: String) -> ParseError {
        self.error_at(self.current().range.start, message)
    }

    fn error_at(&self, offset: usize, message: String) -> ParseError {
        ParseError::at(message, offset, self.lines)
    }
}

fn member(object: Expression, property: Expression, computed: bool, optional: bool) -> ExprKind {
    ExprKind::Member {
        object: Box::new(object),
        property: Box::new(property),
        computed,
        optional,
    }
}

fn is_assignable(expr: &Expression) -> bool {
    match &expr.kind {
        ExprKind::Identifier(_) => true,
        ExprKind::Member { optional, .. } => !optional,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sfc_lexer::{CommentKind, Position, TokenKind};

    fn parse(source: &str) -> Expression {
        ExprParser::parse_expression(source).unwrap()
    }

    fn parse_err(source: &str) -> ParseError {
        ExprParser::parse_expression(source).unwrap_err()
    }

    fn ident(expr: &Expression) -> &str {
        expr.as_identifier().unwrap()
    }

    // --- Literals & primaries ---

    #[test]
    fn test_literals() {
        assert_eq!(parse("42").kind, ExprKind::Number(42.0));
        assert_eq!(parse("'hi'").kind, ExprKind::String("hi".into()));
        assert_eq!(parse("true").kind, ExprKind::Boolean(true));
        assert_eq!(parse("null").kind, ExprKind::Null);
        assert_eq!(parse("this").kind, ExprKind::This);
        assert_eq!(parse("`t`").kind, ExprKind::Template("t".into()));
    }

    #[test]
    fn test_parenthesized_range_is_inner() {
        let expr = parse("( a )");
        assert_eq!(ident(&expr), "a");
        assert_eq!(expr.range, Range::new(2, 3));
    }

    // --- Operators ---

    #[test]
    fn test_precedence() {
        let expr = parse("a + b * c");
        let ExprKind::Binary { op, right, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_left_associative() {
        let expr = parse("a - b - c");
        let ExprKind::Binary { left, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(left.range, Range::new(0, 5));
    }

    #[test]
    fn test_exponent_right_associative() {
        let expr = parse("a ** b ** c");
        let ExprKind::Binary { right, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(right.range, Range::new(5, 11));
    }

    #[test]
    fn test_logical_and_nullish() {
        let expr = parse("a ?? b && c");
        let ExprKind::Logical { op, right, .. } = expr.kind else {
            panic!("expected logical");
        };
        assert_eq!(op, LogicalOp::NullishCoalescing);
        assert!(matches!(right.kind, ExprKind::Logical { op: LogicalOp::And, .. }));
    }

    #[test]
    fn test_unary_and_update() {
        assert!(matches!(parse("!a").kind, ExprKind::Unary { op: UnaryOp::Not, .. }));
        assert!(matches!(parse("typeof a").kind, ExprKind::Unary { op: UnaryOp::Typeof, .. }));
        assert!(matches!(
            parse("count++").kind,
            ExprKind::Update { prefix: false, op: UpdateOp::Increment, .. }
        ));
        assert!(matches!(
            parse("--a.b").kind,
            ExprKind::Update { prefix: true, op: UpdateOp::Decrement, .. }
        ));
    }

    #[test]
    fn test_conditional() {
        let expr = parse("count > 0 ? 'yes' : 'no'");
        assert!(matches!(expr.kind, ExprKind::Conditional { .. }));
        assert_eq!(expr.range, Range::new(0, 24));
    }

    #[test]
    fn test_assignment() {
        let expr = parse("a.b += 1");
        let ExprKind::Assignment { op, target, .. } = expr.kind else {
            panic!("expected assignment");
        };
        assert_eq!(op, AssignOp::AddAssign);
        assert!(matches!(target.kind, ExprKind::Member { .. }));
    }

    #[test]
    fn test_sequence() {
        let expr = parse("a, b, c");
        let ExprKind::Sequence(items) = expr.kind else {
            panic!("expected sequence");
        };
        assert_eq!(items.len(), 3);
    }

    // --- Member access & calls ---

    #[test]
    fn test_member_chain() {
        let expr = parse("user.profile[key]?.name");
        let ExprKind::Member {
            optional, computed, object, ..
        } = expr.kind
        else {
            panic!("expected member");
        };
        assert!(optional);
        assert!(!computed);
        assert!(matches!(object.kind, ExprKind::Member { computed: true, .. }));
    }

    #[test]
    fn test_keyword_property_name() {
        let expr = parse("a.default");
        let ExprKind::Member { property, .. } = expr.kind else {
            panic!("expected member");
        };
        assert_eq!(ident(&property), "default");
    }

    #[test]
    fn test_call() {
        let expr = parse("items.push(item, 1)");
        let ExprKind::Call { arguments, optional, .. } = expr.kind else {
            panic!("expected call");
        };
        assert_eq!(arguments.len(), 2);
        assert!(!optional);
    }

    #[test]
    fn test_new() {
        let expr = parse("new Date(1).getTime()");
        let ExprKind::Call { callee, .. } = expr.kind else {
            panic!("expected call");
        };
        let ExprKind::Member { object, .. } = callee.kind else {
            panic!("expected member");
        };
        assert!(matches!(object.kind, ExprKind::New { .. }));
    }

    // --- Arrays, objects, arrows ---

    #[test]
    fn test_array() {
        assert!(matches!(parse("[1, 2, ]").kind, ExprKind::Array(ref items) if items.len() == 2));
    }

    #[test]
    fn test_object() {
        let expr = parse("{ count: 0, name, [key]: 1, 'q': 2 }");
        let ExprKind::Object(properties) = expr.kind else {
            panic!("expected object");
        };
        assert_eq!(properties.len(), 4);
        assert!(properties[1].shorthand);
        assert!(properties[2].computed);
        assert!(!properties[3].shorthand);
    }

    #[test]
    fn test_arrow_forms() {
        assert!(matches!(parse("x => x + 1").kind, ExprKind::Arrow { ref params, .. } if params.len() == 1));
        assert!(matches!(parse("() => {}").kind, ExprKind::Arrow { body: ArrowBody::Block(_), .. }));
        assert!(matches!(parse("(a, b) => a").kind, ExprKind::Arrow { ref params, .. } if params.len() == 2));
    }

    #[test]
    fn test_parenthesized_call_is_not_arrow() {
        assert!(matches!(parse("(a)(b)").kind, ExprKind::Call { .. }));
    }

    // --- Errors ---

    #[test]
    fn test_triple_plus_is_error() {
        let err = parse_err("+++");
        assert!(err.message.contains("Unexpected end of input"));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_err("1 = a");
        assert!(err.message.contains("Invalid left-hand side"));
        assert_eq!(err.index, 0);
    }

    #[test]
    fn test_invalid_update_target() {
        assert!(parse_err("a()++").message.contains("postfix"));
        assert!(parse_err("++1").message.contains("prefix"));
    }

    #[test]
    fn test_unexpected_token_position() {
        let err = parse_err("a\n  b c");
        assert_eq!((err.line, err.column, err.index), (2, 3, 4));
        assert!(err.message.contains("'b'"));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(ExprParser::parse_expression("a b").is_err());
    }

    // --- Scripts ---

    #[test]
    fn test_script_tokens_and_comments() {
        let script = ExprParser::parse_script("let a = 1 // one\nfoo(a)").unwrap();
        assert_eq!(script.program.body.len(), 2);
        let kinds: Vec<TokenKind> = script.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Punctuator,
                TokenKind::Numeric,
                TokenKind::Identifier,
                TokenKind::Punctuator,
                TokenKind::Identifier,
                TokenKind::Punctuator,
            ]
        );
        assert_eq!(script.comments.len(), 1);
        assert_eq!(script.comments[0].kind, CommentKind::Line);
        assert_eq!(script.tokens[4].loc.start, Position::new(2, 0));
    }

    #[test]
    fn test_script_statements() {
        let source = "import a, { b as c } from 'd'\n\
                      export default { data() {} }";
        // Methods are outside the supported subset.
        assert!(ExprParser::parse_script(source).is_err());

        let source = "import a, { b as c } from 'd'\n\
                      const x = 1, y = 2;\n\
                      function f(p) { if (p) return p; else { return } }\n\
                      export default { x, y: f }";
        let script = ExprParser::parse_script(source).unwrap();
        let body = &script.program.body;
        assert_eq!(body.len(), 4);
        assert!(matches!(body[0].kind, StmtKind::Import { ref specifiers, .. } if specifiers.len() == 2));
        assert!(matches!(
            body[1].kind,
            StmtKind::VariableDeclaration { kind: VarKind::Const, ref declarations } if declarations.len() == 2
        ));
        assert!(matches!(body[2].kind, StmtKind::Function { .. }));
        assert!(matches!(body[3].kind, StmtKind::ExportDefault(_)));
    }

    #[test]
    fn test_wrapped_expression_statement() {
        let script = ExprParser::parse_script("   ( a + b )").unwrap();
        let StmtKind::Expression(ref expr) = script.program.body[0].kind else {
            panic!("expected expression statement");
        };
        assert_eq!(expr.range, Range::new(5, 10));
        assert_eq!(script.tokens.first().map(|t| t.raw.as_str()), Some("("));
        assert_eq!(script.tokens.last().map(|t| t.raw.as_str()), Some(")"));
    }

    #[test]
    fn test_asi_requires_line_break() {
        assert!(ExprParser::parse_script("a\nb").is_ok());
        assert!(ExprParser::parse_script("a b").is_err());
    }

    #[test]
    fn test_unsupported_keyword() {
        let err = ExprParser::parse_script("for (;;) {}").unwrap_err();
        assert!(err.message.contains("'for'"));
    }

    #[test]
    fn test_const_requires_initializer() {
        assert!(ExprParser::parse_script("const a;").is_err());
    }

    #[test]
    fn test_empty_script() {
        let script = ExprParser::parse_script("").unwrap();
        assert!(script.program.body.is_empty());
        assert!(script.tokens.is_empty());
    }
}
