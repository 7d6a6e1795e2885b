//! Code preparation: comment stripping, whitespace normalization, and
//! arrow-shape classification.
//!
//! Stripping is string-literal-aware — it tracks `'`, `"`, and backtick
//! modes character by character, so comment-like text inside literals
//! survives. Classification is token-based: the normalized code is lexed
//! and the token stream is checked for an (optionally `async`) parameter
//! list followed by `=>` at top level.

use rulescript_lexer::token::TokenKind;
use rulescript_lexer::Lexer;
use rulescript_types::Source;

/// The output of [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    /// Comment-stripped, trimmed code.
    pub code: String,
    /// Whether the code looks like an (optionally async) arrow function.
    pub is_arrow_shaped: bool,
}

/// Normalize raw snippet text: strip `//` and `/* */` comments, trim
/// surrounding whitespace, and classify the remainder.
pub fn normalize(source: &str) -> Prepared {
    let code = strip_comments(source).trim().to_string();
    let is_arrow_shaped = !code.is_empty() && is_arrow_shaped(&code);
    Prepared {
        code,
        is_arrow_shaped,
    }
}

#[derive(Clone, Copy, PartialEq)]
enum StripMode {
    Normal,
    Single,
    Double,
    Template,
}

/// Remove comments outside of string/template literals.
///
/// Known limitation: interpolation expressions inside templates are
/// treated as template text, so a backtick nested inside `${...}` ends
/// the template early. The observed rule corpus never does this.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut mode = StripMode::Normal;

    while let Some(ch) = chars.next() {
        match mode {
            StripMode::Normal => match ch {
                '/' if chars.peek() == Some(&'/') => {
                    // Line comment: drop until end of line, keep the newline
                    for c in chars.by_ref() {
                        if c == '\n' {
                            out.push('\n');
                            break;
                        }
                    }
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    // Block comment: drop until `*/` (or end of input)
                    let mut prev = '\0';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        prev = c;
                    }
                }
                '\'' => {
                    mode = StripMode::Single;
                    out.push(ch);
                }
                '"' => {
                    mode = StripMode::Double;
                    out.push(ch);
                }
                '`' => {
                    mode = StripMode::Template;
                    out.push(ch);
                }
                _ => out.push(ch),
            },
            StripMode::Single | StripMode::Double | StripMode::Template => {
                out.push(ch);
                match ch {
                    '\\' => {
                        // Escaped character passes through untouched
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    }
                    '\'' if mode == StripMode::Single => mode = StripMode::Normal,
                    '"' if mode == StripMode::Double => mode = StripMode::Normal,
                    '`' if mode == StripMode::Template => mode = StripMode::Normal,
                    // A raw newline ends a single-line string (the lexer
                    // will report it; stripping just stops protecting)
                    '\n' if mode != StripMode::Template => mode = StripMode::Normal,
                    _ => {}
                }
            }
        }
    }

    out
}

/// Token-based arrow-shape check: optional `async`, then a bare
/// identifier or a balanced `( ... )` group, then `=>`.
fn is_arrow_shaped(code: &str) -> bool {
    let src = Source::new(code);
    // Classification tolerates lex errors further in — the head shape is
    // all that matters here
    let tokens = Lexer::new(&src).lex().tokens;

    let kind_at = |i: usize| tokens.get(i).map(|t| &t.kind);

    let mut i = 0;
    if kind_at(i) == Some(&TokenKind::Async) {
        i = 1;
    }
    match kind_at(i) {
        Some(TokenKind::Identifier(_)) => kind_at(i + 1) == Some(&TokenKind::FatArrow),
        Some(TokenKind::LParen) => {
            let mut depth = 1usize;
            let mut j = i + 1;
            loop {
                match kind_at(j) {
                    Some(TokenKind::LParen) => depth += 1,
                    Some(TokenKind::RParen) => {
                        depth -= 1;
                        if depth == 0 {
                            return kind_at(j + 1) == Some(&TokenKind::FatArrow);
                        }
                    }
                    Some(TokenKind::Eof) | None => return false,
                    _ => {}
                }
                j += 1;
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_line_comment() {
        assert_eq!(normalize("1 + 1 // c").code, "1 + 1");
    }

    #[test]
    fn test_strip_block_comment_and_trim() {
        assert_eq!(normalize("\n/* c */\n 1 + 1 // c").code, "1 + 1");
    }

    #[test]
    fn test_comment_markers_inside_strings_survive() {
        assert_eq!(
            normalize("'http://example.com' // real comment").code,
            "'http://example.com'"
        );
        assert_eq!(normalize("\"/* keep */\"").code, "\"/* keep */\"");
        assert_eq!(normalize("`a // b`").code, "`a // b`");
    }

    #[test]
    fn test_empty_after_stripping() {
        assert_eq!(normalize("  /* only a comment */  ").code, "");
        assert_eq!(normalize("// nothing else").code, "");
        assert_eq!(normalize("").code, "");
    }

    #[test]
    fn test_arrow_classification() {
        assert!(normalize("(a, b) => a + b").is_arrow_shaped);
        assert!(normalize("  () => 1 ").is_arrow_shaped);
        assert!(normalize("x => x").is_arrow_shaped);
        assert!(normalize("async (a) => a").is_arrow_shaped);
        assert!(normalize("((a), (b)) => 1").is_arrow_shaped);
    }

    #[test]
    fn test_non_arrow_classification() {
        assert!(!normalize("1 + 1").is_arrow_shaped);
        assert!(!normalize("free text label").is_arrow_shaped);
        assert!(!normalize("'quoted'").is_arrow_shaped);
        assert!(!normalize("(1 + 2) * 3").is_arrow_shaped);
        assert!(!normalize("f(x)").is_arrow_shaped);
        assert!(!normalize("").is_arrow_shaped);
    }

    #[test]
    fn test_arrow_with_leading_comment() {
        let prepared = normalize("/* doc */ (value) => value * 2");
        assert_eq!(prepared.code, "(value) => value * 2");
        assert!(prepared.is_arrow_shaped);
    }
}
