//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 10. `=` (assignment — member/index targets only)
//! 9. `?:` (conditional)
//! 8. `??` (nullish coalescing)
//! 7. `||`
//! 6. `&&`
//! 5. `==`, `!=`, `===`, `!==`
//! 4. `<`, `>`, `<=`, `>=`
//! 3. `+`, `-`
//! 2. `*`, `/`, `%`
//! 1. unary `!`, `-`, `+`, `typeof`, `await`
//! 0. `.` (member), `[...]` (index), `()` (call)
//!
//! Arrow functions are detected by lookahead (`async`? then an identifier
//! or a balanced paren group, then `=>`) and parsed at assignment level,
//! matching their position in the JS grammar.

use rulescript_lexer::token::TokenKind;
use rulescript_types::ast::*;
use rulescript_types::{ErrorCode, Span};

use crate::parser::Parser;

/// Maximum expression nesting depth.
const MAX_EXPR_DEPTH: u32 = 64;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPR_DEPTH {
            self.error_at_current(
                ErrorCode::NESTING_LIMIT_EXCEEDED,
                format!("maximum expression nesting depth is {MAX_EXPR_DEPTH}"),
            );
            self.expr_depth -= 1;
            return None;
        }
        let result = self.parse_assignment();
        self.expr_depth -= 1;
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `AssignExpr = ArrowFunction | ConditionalExpr [ "=" AssignExpr ]`
    fn parse_assignment(&mut self) -> Option<Expr> {
        if self.is_arrow_ahead() {
            return self.parse_arrow();
        }

        let left = self.parse_conditional()?;
        if self.eat(&TokenKind::Eq) {
            if !matches!(left.kind, ExprKind::Member { .. } | ExprKind::Index { .. }) {
                self.error_at(
                    ErrorCode::INVALID_ASSIGNMENT_TARGET,
                    "assignment target must be a property path (e.g. global.flag = true)",
                    left.span,
                );
                return None;
            }
            let value = self.parse_assignment()?;
            let span = left.span.merge(value.span);
            return Some(Expr::new(
                ExprKind::Assign {
                    target: Box::new(left),
                    value: Box::new(value),
                },
                span,
            ));
        }
        Some(left)
    }

    /// `ConditionalExpr = NullishExpr [ "?" AssignExpr ":" AssignExpr ]`
    fn parse_conditional(&mut self) -> Option<Expr> {
        let test = self.parse_nullish()?;
        if self.eat(&TokenKind::Question) {
            let consequent = self.parse_assignment()?;
            self.expect(&TokenKind::Colon)?;
            let alternate = self.parse_assignment()?;
            let span = test.span.merge(alternate.span);
            return Some(Expr::new(
                ExprKind::Conditional {
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                },
                span,
            ));
        }
        Some(test)
    }

    /// `NullishExpr = OrExpr { "??" OrExpr }`
    fn parse_nullish(&mut self) -> Option<Expr> {
        let mut left = self.parse_or()?;
        while self.eat(&TokenKind::QuestionQuestion) {
            let right = self.parse_or()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Logical {
                    left: Box::new(left),
                    op: LogicalOp::Nullish,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `OrExpr = AndExpr { "||" AndExpr }`
    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::PipePipe) {
            let right = self.parse_and()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Logical {
                    left: Box::new(left),
                    op: LogicalOp::Or,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `AndExpr = EqualityExpr { "&&" EqualityExpr }`
    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::AmpAmp) {
            let right = self.parse_equality()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Logical {
                    left: Box::new(left),
                    op: LogicalOp::And,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `EqualityExpr = RelationalExpr { ("==" | "!=" | "===" | "!==") RelationalExpr }`
    ///
    /// Loose and strict forms parse to the same operators — evaluation is
    /// strict either way.
    fn parse_equality(&mut self) -> Option<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq | TokenKind::EqEqEq => BinOp::Eq,
                TokenKind::BangEq | TokenKind::BangEqEq => BinOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `RelationalExpr = AddExpr { ("<" | ">" | "<=" | ">=") AddExpr }`
    fn parse_relational(&mut self) -> Option<Expr> {
        let mut left = self.parse_add()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => BinOp::Less,
                TokenKind::Greater => BinOp::Greater,
                TokenKind::LessEq => BinOp::LessEq,
                TokenKind::GreaterEq => BinOp::GreaterEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_add()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `AddExpr = MulExpr { ("+" | "-") MulExpr }`
    fn parse_add(&mut self) -> Option<Expr> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `MulExpr = UnaryExpr { ("*" | "/" | "%") UnaryExpr }`
    fn parse_mul(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `UnaryExpr = ("!" | "-" | "+" | "typeof" | "await") UnaryExpr | PostfixExpr`
    fn parse_unary(&mut self) -> Option<Expr> {
        let start = self.current_span();

        if self.eat(&TokenKind::Await) {
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span);
            return Some(Expr::new(ExprKind::Await(Box::new(operand)), span));
        }

        let op = match self.peek_kind() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::TypeOf => UnaryOp::TypeOf,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// `PostfixExpr = PrimaryExpr { "." Ident | "[" Expr "]" | "(" Args ")" }`
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.too_many_errors() {
                return None;
            }
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.expect_identifier()?;
                    let span = expr.span.merge(property.span);
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    let close = self.expect(&TokenKind::RBracket)?;
                    let span = expr.span.merge(close.span);
                    expr = Expr::new(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    while !self.check(&TokenKind::RParen) {
                        if self.at_end() {
                            self.error_at_current(
                                ErrorCode::UNEXPECTED_EOF,
                                "unterminated argument list",
                            );
                            return None;
                        }
                        args.push(self.parse_expression()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    let close = self.expect(&TokenKind::RParen)?;
                    let span = expr.span.merge(close.span);
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }

        Some(expr)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let span = self.current_span();
        match self.peek_kind().clone() {
            TokenKind::NumberLit(n) => {
                self.advance();
                Some(Expr::new(ExprKind::NumberLit(n), span))
            }
            TokenKind::StringLiteral(s) => {
                self.advance();
                Some(Expr::new(ExprKind::StringLit(s), span))
            }
            TokenKind::True => {
                self.advance();
                Some(Expr::new(ExprKind::BoolLit(true), span))
            }
            TokenKind::False => {
                self.advance();
                Some(Expr::new(ExprKind::BoolLit(false), span))
            }
            TokenKind::Null => {
                self.advance();
                Some(Expr::new(ExprKind::NullLit, span))
            }
            TokenKind::Undefined => {
                self.advance();
                Some(Expr::new(ExprKind::UndefinedLit, span))
            }
            TokenKind::TemplateStart(first) => {
                self.advance();
                self.parse_template(first, span)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Some(Expr::new(ExprKind::Identifier(name), span))
            }
            TokenKind::LBracket => {
                self.advance();
                self.parse_array_literal(span)
            }
            TokenKind::LBrace => {
                self.advance();
                self.parse_object_literal(span)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                let close = self.expect(&TokenKind::RParen)?;
                Some(Expr::new(
                    ExprKind::Paren(Box::new(inner)),
                    span.merge(close.span),
                ))
            }
            TokenKind::Eof => {
                self.error_at_current(ErrorCode::UNEXPECTED_EOF, "expected an expression");
                None
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected an expression, got '{other}'"),
                );
                None
            }
        }
    }

    /// Parse the rest of an interpolated template after its `TemplateStart`.
    fn parse_template(&mut self, first: String, start: Span) -> Option<Expr> {
        let mut parts = Vec::new();
        if !first.is_empty() {
            parts.push(TemplatePart::Literal(first));
        }

        loop {
            self.expect(&TokenKind::InterpolationStart)?;
            let expr = self.parse_expression()?;
            parts.push(TemplatePart::Expr(expr));
            self.expect(&TokenKind::InterpolationEnd)?;

            match self.peek_kind().clone() {
                TokenKind::TemplatePart(text) => {
                    self.advance();
                    if !text.is_empty() {
                        parts.push(TemplatePart::Literal(text));
                    }
                }
                TokenKind::TemplateEnd(text) => {
                    let end = self.advance().span;
                    if !text.is_empty() {
                        parts.push(TemplatePart::Literal(text));
                    }
                    return Some(Expr::new(
                        ExprKind::TemplateLit(parts),
                        start.merge(end),
                    ));
                }
                other => {
                    self.error_at_current(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("expected template continuation, got '{other}'"),
                    );
                    return None;
                }
            }
        }
    }

    /// `[ a, b, c ]` — trailing comma tolerated.
    fn parse_array_literal(&mut self, start: Span) -> Option<Expr> {
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            if self.at_end() {
                self.error_at_current(ErrorCode::UNEXPECTED_EOF, "unterminated array literal");
                return None;
            }
            elements.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(&TokenKind::RBracket)?;
        Some(Expr::new(
            ExprKind::ArrayLit(elements),
            start.merge(close.span),
        ))
    }

    /// `{ key: value, "quoted key": value, shorthand }` — trailing comma tolerated.
    fn parse_object_literal(&mut self, start: Span) -> Option<Expr> {
        let mut entries = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.at_end() {
                self.error_at_current(ErrorCode::UNEXPECTED_EOF, "unterminated object literal");
                return None;
            }

            let key_span = self.current_span();
            let (key, is_ident_key) = match self.peek_kind().clone() {
                TokenKind::Identifier(name) => {
                    self.advance();
                    (name, true)
                }
                TokenKind::StringLiteral(s) => {
                    self.advance();
                    (s, false)
                }
                // Reserved words are valid property names: `{ null: 1 }`
                kind @ (TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::Undefined
                | TokenKind::Async
                | TokenKind::Await
                | TokenKind::TypeOf) => {
                    self.advance();
                    (kind.to_string(), false)
                }
                other => {
                    self.error_at_current(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("expected property name, got '{other}'"),
                    );
                    return None;
                }
            };

            let value = if self.eat(&TokenKind::Colon) {
                self.parse_expression()?
            } else if is_ident_key {
                // Shorthand: `{ a }` is `{ a: a }`
                Expr::new(ExprKind::Identifier(key.clone()), key_span)
            } else {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected ':', got '{}'", self.peek_kind()),
                );
                return None;
            };

            let span = key_span.merge(value.span);
            entries.push(ObjectEntry { key, value, span });

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(&TokenKind::RBrace)?;
        Some(Expr::new(
            ExprKind::ObjectLit(entries),
            start.merge(close.span),
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Arrow Functions
    // ══════════════════════════════════════════════════════════════════════════

    /// Check whether an arrow function starts at the current position:
    /// optional `async`, then either `ident =>` or a balanced `( ... )`
    /// group immediately followed by `=>`.
    pub(crate) fn is_arrow_ahead(&self) -> bool {
        let mut i = 0;
        if matches!(self.look_ahead(0), TokenKind::Async) {
            i = 1;
        }
        match self.look_ahead(i) {
            TokenKind::Identifier(_) => matches!(self.look_ahead(i + 1), TokenKind::FatArrow),
            TokenKind::LParen => {
                let mut depth = 1usize;
                let mut j = i + 1;
                loop {
                    match self.look_ahead(j) {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                return matches!(self.look_ahead(j + 1), TokenKind::FatArrow);
                            }
                        }
                        TokenKind::Eof => return false,
                        _ => {}
                    }
                    j += 1;
                }
            }
            _ => false,
        }
    }

    /// Parse an arrow function. The caller has already confirmed the
    /// lookahead, so the parameter list and `=>` are expected to be there.
    fn parse_arrow(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let is_async = self.eat(&TokenKind::Async);

        let params = match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                vec![Ident::new(name, span)]
            }
            TokenKind::LParen => {
                self.advance();
                let mut params = Vec::new();
                while !self.check(&TokenKind::RParen) {
                    params.push(self.expect_identifier()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RParen)?;
                params
            }
            _ => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "expected arrow function parameters",
                );
                return None;
            }
        };

        self.expect(&TokenKind::FatArrow)?;

        if self.check(&TokenKind::LBrace) {
            let span = self.current_span();
            self.error_with_suggestion(
                ErrorCode::BLOCK_BODY_LAMBDA,
                "arrow function bodies must be expressions",
                span,
                "return the value directly; wrap an object literal in parentheses: () => ({ ... })",
            );
            return None;
        }

        let body = self.parse_assignment()?;
        let span = start.merge(body.span);
        Some(Expr::new(
            ExprKind::Arrow(ArrowFunction {
                params,
                body: Box::new(body),
                is_async,
            }),
            span,
        ))
    }
}
