//! The error translator: every failure mode funnels into one uniform
//! [`SandboxError`] shape.
//!
//! Message template:
//! `Sandbox error: "<original message>"` [` in <fn>`] [` called by <caller>`],
//! with the trimmed offending source on the following line for syntax
//! failures. Nothing else in the workspace constructs `SandboxError`.

use crate::CallMeta;
use rulescript_eval::EvalError;
use rulescript_types::{ScriptError, SyntaxErrors};
use std::fmt;

/// Which failure family produced a [`SandboxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxErrorKind {
    /// Source was missing under `throw_on_undefined`.
    CodeUndefined,
    /// Source did not parse as an expression/function.
    Syntax,
    /// Parsed code threw during execution.
    Runtime,
    /// `$.workflow.<name>` was referenced but not registered.
    GlobalFunctionNotFound,
}

/// The underlying failure, preserved for callers that want structure.
#[derive(Debug, Clone)]
pub enum SandboxCause {
    Syntax(ScriptError),
    Runtime(EvalError),
}

/// The single uniform error surfaced for every evaluation failure.
#[derive(Debug, Clone)]
pub struct SandboxError {
    pub kind: SandboxErrorKind,
    /// The original message (parser message, thrown message, or
    /// "Code is undefined").
    pub message: String,
    /// Call-site attribution supplied by the caller.
    pub meta: CallMeta,
    /// The offending source, present for syntax failures.
    pub snippet: Option<String>,
    cause: Option<SandboxCause>,
}

impl SandboxError {
    /// The underlying structured failure, if any.
    pub fn cause(&self) -> Option<&SandboxCause> {
        self.cause.as_ref()
    }
}

impl fmt::Display for SandboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sandbox error: \"{}\"", self.message)?;
        if let Some(name) = &self.meta.fn_name {
            write!(f, " in {name}")?;
        }
        if let Some(caller) = &self.meta.caller {
            write!(f, " called by {caller}")?;
        }
        if let Some(snippet) = &self.snippet {
            write!(f, "\n{snippet}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SandboxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Some(SandboxCause::Syntax(e)) => Some(e),
            Some(SandboxCause::Runtime(e)) => Some(e),
            None => None,
        }
    }
}

/// Missing source under `throw_on_undefined`.
pub(crate) fn code_undefined(meta: &CallMeta) -> SandboxError {
    SandboxError {
        kind: SandboxErrorKind::CodeUndefined,
        message: "Code is undefined".to_string(),
        meta: meta.clone(),
        snippet: None,
        cause: None,
    }
}

/// Parse failure: the first collected diagnostic is the surfaced message;
/// the trimmed source rides along on the next line.
pub(crate) fn from_syntax(errors: &SyntaxErrors, code: &str, meta: &CallMeta) -> SandboxError {
    let first = errors.first().cloned();
    let message = first
        .as_ref()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| "invalid expression".to_string());
    SandboxError {
        kind: SandboxErrorKind::Syntax,
        message,
        meta: meta.clone(),
        snippet: Some(code.trim().to_string()),
        cause: first.map(SandboxCause::Syntax),
    }
}

/// Runtime failure. Unregistered `$.workflow.<name>` calls are recognized
/// by their callee path and reported under their own kind.
pub(crate) fn from_runtime(error: EvalError, meta: &CallMeta) -> SandboxError {
    let kind = match &error {
        EvalError::NotAFunction { callee } if callee.starts_with("$.workflow.") => {
            SandboxErrorKind::GlobalFunctionNotFound
        }
        _ => SandboxErrorKind::Runtime,
    };
    SandboxError {
        kind,
        message: error.to_string(),
        meta: meta.clone(),
        snippet: None,
        cause: Some(SandboxCause::Runtime(error)),
    }
}

/// Template source failure during `init()`.
pub(crate) fn init_failed(message: String) -> SandboxError {
    SandboxError {
        kind: SandboxErrorKind::Runtime,
        message,
        meta: CallMeta::default(),
        snippet: None,
        cause: None,
    }
}
