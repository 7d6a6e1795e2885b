//! rulescript tree-walking evaluator.
//!
//! Executes parsed expressions directly from the AST against a scoped
//! [`Environment`]. Evaluation comes in two modes: synchronous (the
//! default; `await` is an error) and asynchronous (every arrow body is
//! treated as async and host-supplied async helpers are awaited at their
//! call sites).

pub mod builtins;
mod env;
mod error;
mod evaluator;
mod value;

pub use env::Environment;
pub use error::{EvalError, EvalResult};
pub use evaluator::Evaluator;
pub use value::{
    display_string, BoxFuture, Function, NativeAsyncFunction, NativeFunction, Value,
};
