//! Runtime error types for the rulescript evaluator.
//!
//! Messages follow the JS wording authors already know from browser
//! consoles ("x is not defined", "f is not a function", ...), because the
//! sandbox surfaces them verbatim inside its uniform error shape.

use thiserror::Error;

/// Evaluation error — anything parsed code can raise while running.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Unknown identifier.
    #[error("{0} is not defined")]
    UndefinedVariable(String),

    /// Call target is not callable. The callee is rendered as a source
    /// path (`$.workflow.testFunc`) when the call site is one.
    #[error("{callee} is not a function")]
    NotAFunction { callee: String },

    /// Member read on `null`/`undefined`.
    #[error("Cannot read properties of {container} (reading '{property}')")]
    PropertyOfNil {
        container: &'static str,
        property: String,
    },

    /// Member write on `null`/`undefined`.
    #[error("Cannot set properties of {container} (setting '{property}')")]
    SetPropertyOfNil {
        container: &'static str,
        property: String,
    },

    /// `await` reached under synchronous evaluation.
    #[error("await is only valid in async evaluation")]
    AwaitInSyncEval,

    /// An async helper global was called under synchronous evaluation.
    #[error("async helper '{0}' can only be called in async evaluation")]
    AsyncHelperInSyncEval(String),

    /// An `async` arrow function was invoked under synchronous evaluation.
    #[error("async function requires async evaluation")]
    AsyncFunctionInSyncEval,

    /// A host helper failed; the message is surfaced as thrown.
    #[error("{0}")]
    Helper(String),
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_use_js_wording() {
        assert_eq!(
            EvalError::UndefinedVariable("foo".into()).to_string(),
            "foo is not defined"
        );
        assert_eq!(
            EvalError::NotAFunction {
                callee: "$.workflow.testFunc".into()
            }
            .to_string(),
            "$.workflow.testFunc is not a function"
        );
        assert_eq!(
            EvalError::PropertyOfNil {
                container: "undefined",
                property: "workflow".into()
            }
            .to_string(),
            "Cannot read properties of undefined (reading 'workflow')"
        );
    }
}
