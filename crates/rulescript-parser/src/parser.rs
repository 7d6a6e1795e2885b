//! Core parser infrastructure: token cursor, error reporting, helpers.

use rulescript_lexer::token::{Token, TokenKind};
use rulescript_lexer::Lexer;
use rulescript_types::ast::Expr;
use rulescript_types::{ErrorCode, ScriptError, Source, Span, SyntaxErrors, MAX_ERRORS};

/// The rulescript parser.
///
/// Consumes a token stream produced by the lexer and builds a single
/// expression AST — snippets are expression-only. Collects errors rather
/// than failing on the first one.
pub struct Parser<'src> {
    /// The token stream.
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    /// Source for error context.
    src: &'src Source,
    /// Collected errors.
    errors: SyntaxErrors,
    /// Current expression nesting depth (max 64).
    pub(crate) expr_depth: u32,
}

/// Result of parsing.
pub struct ParseResult {
    pub expr: Option<Expr>,
    pub errors: SyntaxErrors,
}

/// Lex and parse a snippet in one step.
pub fn parse_snippet(src: &Source) -> ParseResult {
    let lexed = Lexer::new(src).lex();
    if lexed.errors.has_errors() {
        return ParseResult {
            expr: None,
            errors: lexed.errors,
        };
    }
    Parser::new(lexed.tokens, src).parse()
}

impl<'src> Parser<'src> {
    /// Create a new parser from a token stream and its source.
    pub fn new(tokens: Vec<Token>, src: &'src Source) -> Self {
        Self {
            tokens,
            pos: 0,
            src,
            errors: SyntaxErrors::empty(),
            expr_depth: 0,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream should end with Eof")
        })
    }

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    /// Returns `true` if the current token is `Eof`.
    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind exactly.
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Look ahead by `n` tokens from current position.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        let idx = self.pos + n;
        self.tokens
            .get(idx)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind. Returns the token if matched, or emits an error.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected '{}', got '{}'", expected, self.peek_kind()),
            );
            None
        }
    }

    /// Expect an identifier token. Returns the name and span.
    pub(crate) fn expect_identifier(&mut self) -> Option<rulescript_types::ast::Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(rulescript_types::ast::Ident::new(name, span))
            }
            _ => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected identifier, got '{}'", self.peek_kind()),
                );
                None
            }
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Report an error at the current token position.
    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    /// Report an error at a specific span.
    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.src.line(span.start_line).unwrap_or("").to_string();
        let error = ScriptError::new(code, message, span, source_line);
        self.errors.push_error(error);
    }

    /// Report an error with a fix suggestion.
    pub(crate) fn error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let source_line = self.src.line(span.start_line).unwrap_or("").to_string();
        let error =
            ScriptError::new(code, message, span, source_line).with_suggestion(suggestion);
        self.errors.push_error(error);
    }

    /// Returns `true` if we've hit the error limit and should stop.
    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.has_errors() && self.errors.total_errors >= MAX_ERRORS
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a single expression.
    ///
    /// Trailing semicolons are tolerated (authors paste them in); anything
    /// else left over after the expression is a `TRAILING_INPUT` error —
    /// this is what rejects free text like `hello world`.
    pub fn parse(mut self) -> ParseResult {
        if self.at_end() {
            self.error_at_current(ErrorCode::UNEXPECTED_EOF, "expected an expression");
            return ParseResult {
                expr: None,
                errors: self.errors,
            };
        }

        let expr = self.parse_expression();

        while self.eat(&TokenKind::Semicolon) {}
        if expr.is_some() && !self.at_end() {
            self.error_at_current(
                ErrorCode::TRAILING_INPUT,
                format!("unexpected '{}' after expression", self.peek_kind()),
            );
        }

        ParseResult {
            expr: if self.errors.has_errors() { None } else { expr },
            errors: self.errors,
        }
    }
}
