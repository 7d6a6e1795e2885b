//! # rulescript-sandbox
//!
//! Isolated evaluation of admin-authored, JavaScript-like business-rule
//! snippets: default-value formulas, visibility predicates, validation
//! checks, and per-workflow-template helper functions.
//!
//! Snippets run in an embedded interpreter (lexer → parser → tree-walking
//! evaluator) against a per-call [`Environment`] built from built-in
//! helpers, caller-supplied globals, and — when a template id is given —
//! the registry's `$.workflow` namespace. Executed code can never reach
//! the host process's globals: there is no ambient binding set to leak.
//!
//! ## Isolation model
//!
//! - **Fresh context per call**: no state survives an evaluation; the
//!   `global` identifier resolves to the call's own (usually empty) object
//! - **No ambient capabilities**: only what the caller binds is visible
//! - **Uniform failures**: every parse/runtime error surfaces as one
//!   [`SandboxError`] shape with call-site attribution
//!
//! This is ergonomic isolation, not a hardened multi-tenant boundary:
//! pre-bound helper values remain reachable and mutable by design.

pub mod context;
pub mod error;
pub mod prepare;
pub mod registry;

pub use error::{SandboxCause, SandboxError, SandboxErrorKind};
pub use registry::{
    GlobalFunctionEntry, GlobalFunctionRegistry, TemplateId, TemplateRecord,
};
pub use rulescript_eval::{
    BoxFuture, Environment, Function, NativeAsyncFunction, NativeFunction, Value,
};

use rulescript_eval::Evaluator;
use rulescript_parser::parse_snippet;
use rulescript_types::ast::Expr;
use rulescript_types::Source;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────
// External collaborators
// ─────────────────────────────────────────────────────────────────────

/// Failure loading workflow-template records.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TemplateSourceError(pub String);

/// Supplies workflow-template records to [`Sandbox::init`].
///
/// Implementations own the storage details (database, cache, fixture
/// file); the sandbox only ever sees the loaded records.
#[async_trait::async_trait]
pub trait TemplateSource: Send + Sync {
    /// Load every workflow-template record.
    async fn load(&self) -> Result<Vec<TemplateRecord>, TemplateSourceError>;
}

/// A fixed in-memory template source, for tests and embedding.
pub struct InMemoryTemplates {
    records: Vec<TemplateRecord>,
}

impl InMemoryTemplates {
    pub fn new(records: Vec<TemplateRecord>) -> Self {
        Self { records }
    }
}

#[async_trait::async_trait]
impl TemplateSource for InMemoryTemplates {
    async fn load(&self) -> Result<Vec<TemplateRecord>, TemplateSourceError> {
        Ok(self.records.clone())
    }
}

/// Receives non-fatal diagnostics (skipped registry entries and the like).
/// Injected rather than ambient so hosts decide where diagnostics go.
pub trait DiagnosticLogger: Send + Sync {
    fn warn(&self, message: &str);
}

/// The default logger: forwards to [`tracing`].
pub struct TracingLogger;

impl DiagnosticLogger for TracingLogger {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "rulescript", "{message}");
    }
}

// ─────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────

/// Call-site attribution carried into error messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallMeta {
    /// The business function being evaluated (`" in <fn>"`).
    pub fn_name: Option<String>,
    /// Who asked for it (`" called by <caller>"`).
    pub caller: Option<String>,
}

/// Per-call evaluation options. All fields default to off/empty.
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// Returned when the source is missing or normalizes to nothing.
    pub default_value: Value,
    /// When set, non-arrow-shaped source is returned verbatim as a string
    /// instead of being evaluated.
    pub check_arrow: bool,
    /// When set, a missing source is an error instead of `default_value`.
    pub throw_on_undefined: bool,
    /// Caller-supplied bindings merged over the builtins. A key literally
    /// named `"global"` replaces the `global` namespace object wholesale.
    pub global: BTreeMap<String, Value>,
    /// Call-site attribution for error messages.
    pub meta: CallMeta,
    /// Exposes the template's registered helpers as `$.workflow.<name>`.
    pub workflow_template_id: Option<TemplateId>,
}

// ─────────────────────────────────────────────────────────────────────
// The engine
// ─────────────────────────────────────────────────────────────────────

/// The evaluation engine. Construct once with its collaborators injected,
/// `init()` to populate the helper registry, then share freely: every
/// evaluation call builds its own context and touches no engine state
/// beyond registry reads.
pub struct Sandbox {
    templates: Arc<dyn TemplateSource>,
    logger: Arc<dyn DiagnosticLogger>,
    registry: GlobalFunctionRegistry,
}

/// What staging decided to do with a snippet.
enum Staged {
    /// Short-circuit: missing/empty source or check-arrow passthrough.
    Done(Value),
    /// Parse succeeded; execute.
    Run {
        expr: Expr,
        is_arrow_shaped: bool,
    },
}

impl Sandbox {
    /// Create an engine with the default tracing-backed logger.
    pub fn new(templates: Arc<dyn TemplateSource>) -> Self {
        Self::with_logger(templates, Arc::new(TracingLogger))
    }

    /// Create an engine with an explicit diagnostics logger.
    pub fn with_logger(
        templates: Arc<dyn TemplateSource>,
        logger: Arc<dyn DiagnosticLogger>,
    ) -> Self {
        Self {
            templates,
            logger,
            registry: GlobalFunctionRegistry::new(),
        }
    }

    /// (Re)populate the global-function registry from template storage.
    ///
    /// Single-writer: callers serialize `init()` themselves. Malformed
    /// entries are skipped and logged; only a storage failure is an error.
    pub async fn init(&self) -> Result<(), SandboxError> {
        let records = self
            .templates
            .load()
            .await
            .map_err(|e| error::init_failed(e.to_string()))?;
        self.registry.populate(&records, self.logger.as_ref());
        Ok(())
    }

    /// The helper-function registry (read-only access).
    pub fn registry(&self) -> &GlobalFunctionRegistry {
        &self.registry
    }

    /// Evaluate a snippet with no arguments.
    pub fn eval(
        &self,
        source: Option<&str>,
        options: &EvalOptions,
    ) -> Result<Value, SandboxError> {
        self.eval_with_args(source, &[], options)
    }

    /// Evaluate a snippet, applying arrow-shaped results to `args`.
    ///
    /// An arrow-shaped snippet evaluates to a callable, which is applied
    /// when args were passed or it declares no parameters — and returned
    /// as a value when it has parameters and no args were given.
    pub fn eval_with_args(
        &self,
        source: Option<&str>,
        args: &[Value],
        options: &EvalOptions,
    ) -> Result<Value, SandboxError> {
        let (expr, is_arrow_shaped) = match self.stage(source, options)? {
            Staged::Done(value) => return Ok(value),
            Staged::Run {
                expr,
                is_arrow_shaped,
            } => (expr, is_arrow_shaped),
        };

        let env = context::build_context(options, &self.registry);
        let mut evaluator = Evaluator::new(env);
        let value = evaluator
            .eval_expr(&expr)
            .map_err(|e| error::from_runtime(e, &options.meta))?;

        if !is_arrow_shaped {
            return Ok(value);
        }
        match value {
            Value::Function(function) if args.is_empty() && function.arity() > 0 => {
                Ok(Value::Function(function))
            }
            Value::Function(function) => function
                .call(args)
                .map_err(|e| error::from_runtime(e, &options.meta)),
            other => Ok(other),
        }
    }

    /// Async form of [`eval`](Self::eval).
    pub async fn eval_async(
        &self,
        source: Option<&str>,
        options: &EvalOptions,
    ) -> Result<Value, SandboxError> {
        self.eval_with_args_async(source, &[], options).await
    }

    /// Async form of [`eval_with_args`](Self::eval_with_args): `await` is
    /// valid inside bodies, async helper globals are awaited at their call
    /// sites, and arrow bodies run as async whether or not the author
    /// wrote `async`.
    pub async fn eval_with_args_async(
        &self,
        source: Option<&str>,
        args: &[Value],
        options: &EvalOptions,
    ) -> Result<Value, SandboxError> {
        let (expr, is_arrow_shaped) = match self.stage(source, options)? {
            Staged::Done(value) => return Ok(value),
            Staged::Run {
                expr,
                is_arrow_shaped,
            } => (expr, is_arrow_shaped),
        };

        let env = context::build_context(options, &self.registry);
        let mut evaluator = Evaluator::new(env);
        let value = evaluator
            .eval_expr_async(&expr)
            .await
            .map_err(|e| error::from_runtime(e, &options.meta))?;

        if !is_arrow_shaped {
            return Ok(value);
        }
        match value {
            Value::Function(function) if args.is_empty() && function.arity() > 0 => {
                Ok(Value::Function(function))
            }
            Value::Function(function) => function
                .call_async(args)
                .await
                .map_err(|e| error::from_runtime(e, &options.meta)),
            other => Ok(other),
        }
    }

    /// Steps 1–3 of the evaluation algorithm: missing-source policy,
    /// normalization, empty short-circuit, check-arrow passthrough, parse.
    fn stage(
        &self,
        source: Option<&str>,
        options: &EvalOptions,
    ) -> Result<Staged, SandboxError> {
        let Some(source) = source else {
            if options.throw_on_undefined {
                return Err(error::code_undefined(&options.meta));
            }
            return Ok(Staged::Done(options.default_value.clone()));
        };

        let prepared = prepare::normalize(source);
        if prepared.code.is_empty() {
            return Ok(Staged::Done(options.default_value.clone()));
        }
        if options.check_arrow && !prepared.is_arrow_shaped {
            return Ok(Staged::Done(Value::Str(prepared.code)));
        }

        let src = Source::new(prepared.code.as_str());
        let parsed = parse_snippet(&src);
        match parsed.expr {
            Some(expr) => Ok(Staged::Run {
                expr,
                is_arrow_shaped: prepared.is_arrow_shaped,
            }),
            None => Err(error::from_syntax(
                &parsed.errors,
                &prepared.code,
                &options.meta,
            )),
        }
    }
}
