//! Shared types for the rulescript expression engine.
//!
//! This crate defines the expression AST, source spans, and the structured
//! syntax-diagnostic types used by the lexer, parser, and sandbox layers.

pub mod ast;
mod error;
mod span;

pub use error::{ErrorCode, ScriptError, SyntaxErrors, MAX_ERRORS};
pub use span::{Source, Span};
