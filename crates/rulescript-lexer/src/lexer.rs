//! Core rulescript lexer — converts snippet text to a token stream.
//!
//! Features:
//! - All expression-language tokens (operators, punctuation, literals,
//!   the seven reserved words)
//! - `'...'` / `"..."` strings and backtick templates with `${expr}`
//!   interpolation via a mode stack
//! - Comments skipped at the token level (`// ...` and `/* ... */`), so
//!   comment-like text inside string literals is never touched
//! - Error recovery: collects up to 20 errors instead of stopping at the first

use rulescript_types::{ErrorCode, ScriptError, Source, Span, SyntaxErrors, MAX_ERRORS};

use crate::token::{Token, TokenKind};

/// Lexer mode — tracks whether we're scanning top-level code or inside
/// a template literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Normal code scanning.
    Normal,
    /// Inside a backtick template — scanning text until `` ` `` or `${`.
    Template,
    /// Inside a `${...}` interpolation expression. The `u32` tracks the
    /// brace depth so we know when the interpolation's closing `}` is reached.
    Interpolation { brace_depth: u32 },
}

/// The rulescript lexer.
///
/// Converts snippet text into a vector of [`Token`]s, collecting up to
/// [`MAX_ERRORS`] errors along the way.
pub struct Lexer<'src> {
    /// The full snippet text as bytes.
    source: &'src [u8],
    /// Source for error-line context.
    src: &'src Source,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    col: u32,
    /// Collected errors.
    errors: SyntaxErrors,
    /// Mode stack for template interpolation.
    mode_stack: Vec<Mode>,
    /// Pending tokens to emit before the next scan (used for interpolation).
    pending: Vec<Token>,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    /// Errors encountered during lexing.
    pub errors: SyntaxErrors,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given snippet.
    pub fn new(src: &'src Source) -> Self {
        Self {
            source: src.text.as_bytes(),
            src,
            pos: 0,
            line: 1,
            col: 1,
            errors: SyntaxErrors::empty(),
            mode_stack: vec![Mode::Normal],
            pending: Vec::new(),
        }
    }

    /// Lex the entire snippet into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.has_errors() && self.errors.total_errors >= MAX_ERRORS {
                break;
            }

            // Drain any pending tokens first (e.g. InterpolationStart after TemplateStart)
            if let Some(pending) = self.pending.pop() {
                tokens.push(pending);
                continue;
            }

            let token = match self.current_mode() {
                Mode::Normal => self.scan_normal(),
                Mode::Template => self.scan_template_continuation(),
                Mode::Interpolation { .. } => self.scan_normal(),
            };

            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);

            if is_eof {
                break;
            }
        }

        // Ensure token stream always ends with Eof
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Mode stack helpers
    // ─────────────────────────────────────────────────────────────

    fn current_mode(&self) -> Mode {
        *self.mode_stack.last().unwrap_or(&Mode::Normal)
    }

    fn push_mode(&mut self, mode: Mode) {
        self.mode_stack.push(mode);
    }

    fn pop_mode(&mut self) {
        if self.mode_stack.len() > 1 {
            self.mode_stack.pop();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.src.line(span.start_line).unwrap_or("").to_string();
        let err = ScriptError::new(code, message, span, source_line);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip whitespace (including newlines — the language is
    /// expression-only, so line breaks carry no meaning) and comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(ch) = self.peek() {
                        if ch == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start_line = self.line;
                    let start_col = self.col;
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while let Some(ch) = self.peek() {
                        if ch == b'*' && self.peek_at(1) == Some(b'/') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        let span = self.span_from(start_line, start_col);
                        self.emit_error(
                            ErrorCode::UNTERMINATED_COMMENT,
                            "unterminated block comment",
                            span,
                        );
                    }
                }
                _ => break,
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Normal-mode scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan one token in normal (non-template) mode.
    fn scan_normal(&mut self) -> Token {
        self.skip_trivia();

        // If we've hit the error cap, stop immediately
        if self.errors.has_errors() && self.errors.total_errors >= MAX_ERRORS {
            return Token::new(TokenKind::Eof, self.current_span());
        }

        if self.at_end() {
            // If we're still inside a template or interpolation, that's an error
            if self
                .mode_stack
                .iter()
                .any(|m| matches!(m, Mode::Template | Mode::Interpolation { .. }))
            {
                self.emit_error(
                    ErrorCode::UNTERMINATED_STRING,
                    "unterminated template literal",
                    self.current_span(),
                );
            }
            return Token::new(TokenKind::Eof, self.current_span());
        }

        let start_pos = self.pos;
        let start_line = self.line;
        let start_col = self.col;
        let ch = self.advance().unwrap();

        match ch {
            // ── String literals ──
            b'\'' | b'"' => self.scan_string(ch, start_line, start_col),
            b'`' => self.scan_template(start_line, start_col),

            // ── Number literals ──
            b'0'..=b'9' => self.scan_number(start_pos, start_line, start_col),

            // ── Identifiers & keywords ──
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' => {
                self.scan_identifier(start_pos, start_line, start_col)
            }

            // ── Operators & punctuation ──
            b'+' => Token::new(TokenKind::Plus, self.span_from(start_line, start_col)),
            b'-' => Token::new(TokenKind::Minus, self.span_from(start_line, start_col)),
            b'*' => Token::new(TokenKind::Star, self.span_from(start_line, start_col)),
            b'/' => {
                // `//` and `/*` were consumed by skip_trivia, so bare / is division
                Token::new(TokenKind::Slash, self.span_from(start_line, start_col))
            }
            b'%' => Token::new(TokenKind::Percent, self.span_from(start_line, start_col)),

            b'=' => {
                if self.peek() == Some(b'>') {
                    self.advance();
                    Token::new(TokenKind::FatArrow, self.span_from(start_line, start_col))
                } else if self.peek() == Some(b'=') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        Token::new(TokenKind::EqEqEq, self.span_from(start_line, start_col))
                    } else {
                        Token::new(TokenKind::EqEq, self.span_from(start_line, start_col))
                    }
                } else {
                    Token::new(TokenKind::Eq, self.span_from(start_line, start_col))
                }
            }

            b'!' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        Token::new(TokenKind::BangEqEq, self.span_from(start_line, start_col))
                    } else {
                        Token::new(TokenKind::BangEq, self.span_from(start_line, start_col))
                    }
                } else {
                    Token::new(TokenKind::Bang, self.span_from(start_line, start_col))
                }
            }

            b'<' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    Token::new(TokenKind::LessEq, self.span_from(start_line, start_col))
                } else {
                    Token::new(TokenKind::Less, self.span_from(start_line, start_col))
                }
            }

            b'>' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    Token::new(TokenKind::GreaterEq, self.span_from(start_line, start_col))
                } else {
                    Token::new(TokenKind::Greater, self.span_from(start_line, start_col))
                }
            }

            b'&' => {
                if self.peek() == Some(b'&') {
                    self.advance();
                    Token::new(TokenKind::AmpAmp, self.span_from(start_line, start_col))
                } else {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "unexpected character '&' (use '&&')",
                        span,
                    );
                    self.scan_normal()
                }
            }

            b'|' => {
                if self.peek() == Some(b'|') {
                    self.advance();
                    Token::new(TokenKind::PipePipe, self.span_from(start_line, start_col))
                } else {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "unexpected character '|' (use '||')",
                        span,
                    );
                    self.scan_normal()
                }
            }

            b'?' => {
                if self.peek() == Some(b'?') {
                    self.advance();
                    Token::new(
                        TokenKind::QuestionQuestion,
                        self.span_from(start_line, start_col),
                    )
                } else {
                    Token::new(TokenKind::Question, self.span_from(start_line, start_col))
                }
            }

            b'(' => Token::new(TokenKind::LParen, self.span_from(start_line, start_col)),
            b')' => Token::new(TokenKind::RParen, self.span_from(start_line, start_col)),
            b'[' => Token::new(TokenKind::LBracket, self.span_from(start_line, start_col)),
            b']' => Token::new(TokenKind::RBracket, self.span_from(start_line, start_col)),
            b'.' => Token::new(TokenKind::Dot, self.span_from(start_line, start_col)),
            b',' => Token::new(TokenKind::Comma, self.span_from(start_line, start_col)),
            b':' => Token::new(TokenKind::Colon, self.span_from(start_line, start_col)),
            b';' => Token::new(TokenKind::Semicolon, self.span_from(start_line, start_col)),

            b'{' => {
                // If we're in interpolation mode, track brace depth
                if let Some(Mode::Interpolation { brace_depth }) = self.mode_stack.last_mut() {
                    *brace_depth += 1;
                }
                Token::new(TokenKind::LBrace, self.span_from(start_line, start_col))
            }

            b'}' => {
                // Check if this closes an interpolation
                let mode = self.current_mode();
                if let Mode::Interpolation { brace_depth } = mode {
                    if brace_depth == 0 {
                        // This `}` ends the interpolation — switch back to template mode
                        self.pop_mode();
                        self.push_mode(Mode::Template);
                        return Token::new(
                            TokenKind::InterpolationEnd,
                            self.span_from(start_line, start_col),
                        );
                    } else if let Some(Mode::Interpolation { brace_depth }) =
                        self.mode_stack.last_mut()
                    {
                        *brace_depth -= 1;
                    }
                }
                Token::new(TokenKind::RBrace, self.span_from(start_line, start_col))
            }

            _ => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("unexpected character '{}'", ch as char),
                    span,
                );
                // Error recovery: skip the character and try again
                self.scan_normal()
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, start_pos: usize, start_line: u32, start_col: u32) -> Token {
        // We already consumed the first digit
        while let Some(b'0'..=b'9') = self.peek() {
            self.advance();
        }

        // Fractional part
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.advance(); // consume '.'
            while let Some(b'0'..=b'9') = self.peek() {
                self.advance();
            }
        }

        // Exponent part: `1e6`, `2.5E-3`
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign_offset = if matches!(self.peek_at(1), Some(b'+' | b'-')) {
                2
            } else {
                1
            };
            if matches!(self.peek_at(sign_offset), Some(b'0'..=b'9')) {
                for _ in 0..sign_offset {
                    self.advance();
                }
                while let Some(b'0'..=b'9') = self.peek() {
                    self.advance();
                }
            }
        }

        let span = self.span_from(start_line, start_col);
        let text = std::str::from_utf8(&self.source[start_pos..self.pos]).unwrap_or("0");
        let value: f64 = text.parse().unwrap_or(0.0);

        Token::new(TokenKind::NumberLit(value), span)
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, start_pos: usize, start_line: u32, start_col: u32) -> Token {
        // First character was already consumed (letter, `_`, or `$`)
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$' {
                self.advance();
            } else {
                break;
            }
        }

        let span = self.span_from(start_line, start_col);
        let text = std::str::from_utf8(&self.source[start_pos..self.pos]).unwrap_or("");

        let kind = TokenKind::from_keyword(text)
            .unwrap_or_else(|| TokenKind::Identifier(text.to_string()));

        Token::new(kind, span)
    }

    // ─────────────────────────────────────────────────────────────
    // String literals & templates
    // ─────────────────────────────────────────────────────────────

    /// Scan a `'...'` or `"..."` string literal after the opening quote.
    /// Plain strings have no interpolation and may not span lines.
    fn scan_string(&mut self, quote: u8, start_line: u32, start_col: u32) -> Token {
        let mut buf = String::new();

        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "unterminated string literal",
                        span,
                    );
                    return Token::new(
                        TokenKind::StringLiteral(buf),
                        self.span_from(start_line, start_col),
                    );
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    return Token::new(
                        TokenKind::StringLiteral(buf),
                        self.span_from(start_line, start_col),
                    );
                }
                Some(b'\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch as char);
                }
            }
        }
    }

    /// Scan a backtick template after the opening `` ` ``.
    /// Handles two cases:
    /// 1. No interpolation → a complete `StringLiteral`
    /// 2. Interpolation → `TemplateStart`, then mode switch
    fn scan_template(&mut self, start_line: u32, start_col: u32) -> Token {
        let mut buf = String::new();

        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "unterminated template literal",
                        span,
                    );
                    return Token::new(
                        TokenKind::StringLiteral(buf),
                        self.span_from(start_line, start_col),
                    );
                }
                Some(b'`') => {
                    self.advance();
                    return Token::new(
                        TokenKind::StringLiteral(buf),
                        self.span_from(start_line, start_col),
                    );
                }
                Some(b'\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some(b'$') if self.peek_at(1) == Some(b'{') => {
                    // Start of interpolation
                    self.advance(); // consume '$'
                    self.advance(); // consume '{'
                    let interp_span = self.span_from(self.line, self.col.saturating_sub(2));
                    self.push_mode(Mode::Interpolation { brace_depth: 0 });
                    // Queue InterpolationStart so it appears after TemplateStart
                    self.pending
                        .push(Token::new(TokenKind::InterpolationStart, interp_span));
                    return Token::new(
                        TokenKind::TemplateStart(buf),
                        self.span_from(start_line, start_col),
                    );
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch as char);
                }
            }
        }
    }

    /// Continue scanning template content after an interpolation ends.
    /// Called when we're in `Mode::Template`.
    fn scan_template_continuation(&mut self) -> Token {
        let start_line = self.line;
        let start_col = self.col;
        let mut buf = String::new();

        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "unterminated template literal",
                        span,
                    );
                    self.pop_mode();
                    return Token::new(
                        TokenKind::TemplateEnd(buf),
                        self.span_from(start_line, start_col),
                    );
                }
                Some(b'`') => {
                    self.advance();
                    self.pop_mode();
                    return Token::new(
                        TokenKind::TemplateEnd(buf),
                        self.span_from(start_line, start_col),
                    );
                }
                Some(b'\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some(b'$') if self.peek_at(1) == Some(b'{') => {
                    // Another interpolation
                    self.advance(); // consume '$'
                    self.advance(); // consume '{'
                    let interp_span = self.span_from(self.line, self.col.saturating_sub(2));
                    // Replace current Template mode with Interpolation
                    self.pop_mode();
                    self.push_mode(Mode::Interpolation { brace_depth: 0 });
                    // Queue InterpolationStart so it appears after TemplatePart
                    self.pending
                        .push(Token::new(TokenKind::InterpolationStart, interp_span));
                    return Token::new(
                        TokenKind::TemplatePart(buf),
                        self.span_from(start_line, start_col),
                    );
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch as char);
                }
            }
        }
    }

    /// Scan an escape sequence after seeing the `\`.
    /// Returns the unescaped character, or `None` if invalid (error emitted).
    fn scan_escape_sequence(&mut self) -> Option<char> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance(); // consume the '\'

        match self.advance() {
            Some(b'n') => Some('\n'),
            Some(b't') => Some('\t'),
            Some(b'r') => Some('\r'),
            Some(ch @ (b'u' | b'x')) => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::INVALID_ESCAPE,
                    format!("numeric escape sequences ('\\{}') are not supported", ch as char),
                    span,
                );
                Some(ch as char) // error recovery: emit the char as-is
            }
            // `\"`, `\'`, `` \` ``, `\\`, `\$`, and any other escaped
            // character pass through unchanged
            Some(ch) => Some(ch as char),
            None => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNEXPECTED_EOF,
                    "unexpected end of input in escape sequence",
                    span,
                );
                None
            }
        }
    }
}
