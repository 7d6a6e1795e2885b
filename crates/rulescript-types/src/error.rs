use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of syntax errors reported before fail-fast.
pub const MAX_ERRORS: usize = 20;

/// Numeric error code (E100–E199).
///
/// Authored snippets only ever fail syntactically at this layer; runtime
/// failures are modeled separately by the evaluator and sandbox crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNTERMINATED_STRING: Self = Self(101);
    pub const UNTERMINATED_COMMENT: Self = Self(102);
    pub const INVALID_ESCAPE: Self = Self(103);
    pub const UNEXPECTED_EOF: Self = Self(104);
    pub const TRAILING_INPUT: Self = Self(105);
    pub const BLOCK_BODY_LAMBDA: Self = Self(106);
    pub const INVALID_ASSIGNMENT_TARGET: Self = Self(107);
    pub const NESTING_LIMIT_EXCEEDED: Self = Self(108);
    pub const AWAIT_OUTSIDE_FUNCTION: Self = Self(109);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured syntax diagnostic for an authored snippet.
///
/// The sandbox's error translator renders these into the uniform
/// `Sandbox error: ...` shape; host UIs that want structure (admin
/// editors, rule linters) consume the serialized form directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptError {
    /// Error code (e.g., E100).
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// Source location.
    #[serde(flatten)]
    pub span: Span,
    /// The exact source line for context.
    pub source_line: String,
    /// Optional fix suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ScriptError {
    /// Create a new error.
    pub fn new(
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            source_line: source_line.into(),
            suggestion: None,
        }
    }

    /// Attach a fix suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.span, self.code, self.message)
    }
}

impl std::error::Error for ScriptError {}

/// Collected syntax errors for one snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxErrors {
    pub errors: Vec<ScriptError>,
    pub total_errors: usize,
}

impl SyntaxErrors {
    /// Create an empty result (no errors).
    pub fn empty() -> Self {
        Self {
            errors: Vec::new(),
            total_errors: 0,
        }
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Add an error, respecting the MAX_ERRORS limit.
    pub fn push_error(&mut self, error: ScriptError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// The first collected error, if any.
    ///
    /// The sandbox reports snippets through a single uniform error, so the
    /// first diagnostic is the one that surfaces to callers.
    pub fn first(&self) -> Option<&ScriptError> {
        self.errors.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::UNEXPECTED_TOKEN), "E100");
        assert_eq!(format!("{}", ErrorCode::TRAILING_INPUT), "E105");
    }

    #[test]
    fn test_script_error_creation() {
        let err = ScriptError::new(
            ErrorCode::UNEXPECTED_TOKEN,
            "unexpected token '}'",
            Span::new(1, 5, 1, 6),
            "a + }",
        );
        assert_eq!(err.code, ErrorCode::UNEXPECTED_TOKEN);
        assert!(err.suggestion.is_none());
    }

    #[test]
    fn test_script_error_with_suggestion() {
        let err = ScriptError::new(
            ErrorCode::BLOCK_BODY_LAMBDA,
            "arrow function bodies must be expressions",
            Span::new(1, 10, 1, 11),
            "(a) => { a }",
        )
        .with_suggestion("wrap an object literal body in parentheses: (a) => ({ ... })");
        assert!(err.suggestion.is_some());
    }

    #[test]
    fn test_script_error_json_serialization() {
        let err = ScriptError::new(
            ErrorCode::UNTERMINATED_STRING,
            "unterminated string literal",
            Span::new(1, 3, 1, 9),
            "x + 'abc",
        );
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"code\""));
        assert!(json.contains("\"message\""));
        assert!(json.contains("\"source_line\""));
        assert!(json.contains("\"start_line\""));

        let deserialized: ScriptError = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.code, err.code);
        assert_eq!(deserialized.message, err.message);
    }

    #[test]
    fn test_syntax_errors_max_limit() {
        let mut errs = SyntaxErrors::empty();
        for i in 0..25 {
            errs.push_error(ScriptError::new(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("error {i}"),
                Span::point(1, i as u32 + 1),
                "",
            ));
        }
        // Only 20 stored, but total count is 25
        assert_eq!(errs.errors.len(), 20);
        assert_eq!(errs.total_errors, 25);
        assert!(errs.has_errors());
    }

    #[test]
    fn test_syntax_errors_empty() {
        let errs = SyntaxErrors::empty();
        assert!(!errs.has_errors());
        assert!(errs.first().is_none());
    }
}
