//! Runtime value types.
//!
//! [`Value`] is the owned runtime model executed code computes over.
//! Function values are cheap to clone: the body AST and native callables
//! are behind `Arc`s, the captured environment is value-semantic (so a
//! closure can never leak writes back into its defining context).

use crate::env::Environment;
use crate::error::EvalResult;
use rulescript_types::ast::Expr;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future type used by async helpers and the async evaluator.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// An arrow function authored in a snippet.
    Function(Function),
    /// A host-supplied synchronous helper.
    Native(NativeFunction),
    /// A host-supplied asynchronous helper — callable only under async
    /// evaluation.
    NativeAsync(NativeAsyncFunction),
}

impl Value {
    /// JS truthiness: `false`, `0`, `NaN`, `""`, `null`, `undefined` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// `null` or `undefined` (the `??` test).
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// The `typeof` name for this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            // typeof null is "object" — the historical JS quirk, kept so
            // authored rules behave as written elsewhere
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) | Value::Native(_) | Value::NativeAsync(_) => "function",
        }
    }

    /// Numeric coercion for arithmetic and comparisons.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(true) => 1.0,
            Value::Bool(false) | Value::Null => 0.0,
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    /// Build an object value from key/value pairs.
    pub fn object(entries: impl IntoIterator<Item = (String, Value)>) -> Value {
        Value::Object(entries.into_iter().collect())
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

impl Value {
    /// Convert to a JSON value. Function values (which have no JSON
    /// counterpart) become `null`; non-finite numbers likewise.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Function(_) | Value::Native(_) | Value::NativeAsync(_) => {
                serde_json::Value::Null
            }
        }
    }
}

/// Render a value the way JS string coercion does (template literals,
/// string concatenation).
pub fn display_string(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::Str(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Function(_) | Value::Native(_) | Value::NativeAsync(_) => "[function]".to_string(),
    }
}

/// Format a number without a trailing `.0` for integral values, matching
/// JS number-to-string behavior for the common cases.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────
// Function values
// ─────────────────────────────────────────────────────────────────────

/// An arrow function value: parameter names, body AST, and the captured
/// defining environment.
#[derive(Debug, Clone)]
pub struct Function {
    pub(crate) params: Vec<String>,
    pub(crate) body: Arc<Expr>,
    pub(crate) captured: Environment,
    pub(crate) is_async: bool,
}

impl Function {
    /// Create a function value closing over `captured`.
    pub fn new(params: Vec<String>, body: Arc<Expr>, captured: Environment, is_async: bool) -> Self {
        Self {
            params,
            body,
            captured,
            is_async,
        }
    }

    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether the author wrote `async`.
    pub fn is_async(&self) -> bool {
        self.is_async
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.body, &other.body) && self.params == other.params
    }
}

type NativeFn = dyn Fn(Vec<Value>) -> EvalResult<Value> + Send + Sync;
type NativeAsyncFn =
    dyn Fn(Vec<Value>) -> BoxFuture<'static, EvalResult<Value>> + Send + Sync;

/// A host-supplied synchronous helper callable from executed code.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    func: Arc<NativeFn>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(Vec<Value>) -> EvalResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn call(&self, args: Vec<Value>) -> EvalResult<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

/// A host-supplied asynchronous helper. Calling one under synchronous
/// evaluation is a runtime error.
#[derive(Clone)]
pub struct NativeAsyncFunction {
    pub name: String,
    func: Arc<NativeAsyncFn>,
}

impl NativeAsyncFunction {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(Vec<Value>) -> BoxFuture<'static, EvalResult<Value>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn call(&self, args: Vec<Value>) -> BoxFuture<'static, EvalResult<Value>> {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeAsyncFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeAsyncFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for NativeAsyncFunction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Number(1.0).is_truthy());
        assert!(Value::Str("x".into()).is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
        assert!(Value::Object(BTreeMap::new()).is_truthy());
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(3.14), "3.14");
        assert_eq!(format_number(-0.5), "-0.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_display_string() {
        assert_eq!(display_string(&Value::Undefined), "undefined");
        assert_eq!(display_string(&Value::Str("hi".into())), "hi");
        assert_eq!(
            display_string(&Value::Array(vec![
                Value::Number(1.0),
                Value::Number(2.0)
            ])),
            "1,2"
        );
        assert_eq!(
            display_string(&Value::Object(BTreeMap::new())),
            "[object Object]"
        );
    }

    #[test]
    fn test_to_number_coercion() {
        assert_eq!(Value::Str(" 6 ".into()).to_number(), 6.0);
        assert_eq!(Value::Str("".into()).to_number(), 0.0);
        assert!(Value::Str("abc".into()).to_number().is_nan());
        assert_eq!(Value::Bool(true).to_number(), 1.0);
        assert_eq!(Value::Null.to_number(), 0.0);
        assert!(Value::Undefined.to_number().is_nan());
    }

    #[test]
    fn test_json_round_trip() {
        let json: serde_json::Value =
            serde_json::json!({"a": 1, "b": [true, null], "c": "s"});
        let value = Value::from(json.clone());
        assert_eq!(value.to_json(), json);
    }
}
