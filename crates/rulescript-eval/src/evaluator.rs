//! Core expression evaluator — walks AST nodes and produces Values.
//!
//! Two walkers share one set of operator/access helpers:
//! - [`Evaluator::eval_expr`] — synchronous; `await` and async helpers are
//!   runtime errors.
//! - [`Evaluator::eval_expr_async`] — asynchronous; every arrow body is
//!   effectively async, async helper results are awaited at their call
//!   sites, and `await` on an already-settled value is the identity.

use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use crate::value::{display_string, BoxFuture, Function, Value};
use rulescript_types::ast::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The core evaluator — owns the per-call environment.
pub struct Evaluator {
    /// Variable environment (scoped).
    pub env: Environment,
}

impl Evaluator {
    /// Create a new evaluator over the given environment.
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Synchronous evaluation
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression to a Value.
    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::NumberLit(n) => Ok(Value::Number(*n)),
            ExprKind::StringLit(s) => Ok(Value::Str(s.clone())),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::NullLit => Ok(Value::Null),
            ExprKind::UndefinedLit => Ok(Value::Undefined),

            ExprKind::TemplateLit(parts) => {
                let mut result = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Literal(s) => result.push_str(s),
                        TemplatePart::Expr(e) => {
                            let v = self.eval_expr(e)?;
                            result.push_str(&display_string(&v));
                        }
                    }
                }
                Ok(Value::Str(result))
            }

            ExprKind::ArrayLit(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_expr(element)?);
                }
                Ok(Value::Array(values))
            }

            ExprKind::ObjectLit(entries) => {
                let mut map = BTreeMap::new();
                for entry in entries {
                    let value = self.eval_expr(&entry.value)?;
                    map.insert(entry.key.clone(), value);
                }
                Ok(Value::Object(map))
            }

            ExprKind::Identifier(name) => self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),

            ExprKind::Member { object, property } => {
                let obj = self.eval_expr(object)?;
                get_property(&obj, &property.name)
            }

            ExprKind::Index { object, index } => {
                let obj = self.eval_expr(object)?;
                let key = self.eval_expr(index)?;
                get_index(&obj, &key)
            }

            ExprKind::Call { callee, args } => {
                let callee_path = callee_display(callee);
                let f = self.eval_expr(callee)?;
                let mut argv = Vec::with_capacity(args.len());
                for arg in args {
                    argv.push(self.eval_expr(arg)?);
                }
                call_value(&f, argv, &callee_path)
            }

            ExprKind::Unary { op, operand } => {
                let v = self.eval_expr(operand)?;
                Ok(apply_unary(*op, &v))
            }

            ExprKind::Binary { left, op, right } => {
                let lv = self.eval_expr(left)?;
                let rv = self.eval_expr(right)?;
                Ok(apply_binary(*op, &lv, &rv))
            }

            ExprKind::Logical { left, op, right } => {
                let lv = self.eval_expr(left)?;
                match op {
                    LogicalOp::And if !lv.is_truthy() => Ok(lv),
                    LogicalOp::Or if lv.is_truthy() => Ok(lv),
                    LogicalOp::Nullish if !lv.is_nullish() => Ok(lv),
                    _ => self.eval_expr(right),
                }
            }

            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expr(test)?.is_truthy() {
                    self.eval_expr(consequent)
                } else {
                    self.eval_expr(alternate)
                }
            }

            ExprKind::Assign { target, value } => {
                let v = self.eval_expr(value)?;
                self.assign(target, v.clone())?;
                Ok(v)
            }

            ExprKind::Arrow(arrow) => Ok(Value::Function(Function::new(
                arrow.params.iter().map(|p| p.name.clone()).collect(),
                Arc::new((*arrow.body).clone()),
                self.env.clone(),
                arrow.is_async,
            ))),

            ExprKind::Await(_) => Err(EvalError::AwaitInSyncEval),

            ExprKind::Paren(inner) => self.eval_expr(inner),
        }
    }

    /// Resolve an assignment target (`global.flag = ...`) and write the
    /// value through to the environment binding it is rooted in.
    fn assign(&mut self, target: &Expr, value: Value) -> EvalResult<()> {
        let mut keys: Vec<PathKey> = Vec::new();
        let mut cur = target;
        let root = loop {
            match &cur.kind {
                ExprKind::Member { object, property } => {
                    keys.push(PathKey::Prop(property.name.clone()));
                    cur = object.as_ref();
                }
                ExprKind::Index { object, index } => {
                    let key = self.eval_expr(index)?;
                    keys.push(PathKey::Value(key));
                    cur = object.as_ref();
                }
                ExprKind::Paren(inner) => cur = inner.as_ref(),
                ExprKind::Identifier(name) => break name.clone(),
                _ => {
                    // Target rooted in a temporary (e.g. `f().x = 1`):
                    // evaluate for effect; the write has nothing durable
                    // to land on.
                    self.eval_expr(cur)?;
                    return Ok(());
                }
            }
        };
        keys.reverse();

        let Some(slot) = self.env.get_mut(&root) else {
            return Err(EvalError::UndefinedVariable(root));
        };
        set_path(slot, &keys, value)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Asynchronous evaluation
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression to a Value, awaiting async helper calls and
    /// `await` points. Recursion is boxed (expression trees are arbitrarily
    /// deep).
    pub fn eval_expr_async<'a>(&'a mut self, expr: &'a Expr) -> BoxFuture<'a, EvalResult<Value>> {
        Box::pin(async move {
            match &expr.kind {
                ExprKind::NumberLit(n) => Ok(Value::Number(*n)),
                ExprKind::StringLit(s) => Ok(Value::Str(s.clone())),
                ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
                ExprKind::NullLit => Ok(Value::Null),
                ExprKind::UndefinedLit => Ok(Value::Undefined),

                ExprKind::TemplateLit(parts) => {
                    let mut result = String::new();
                    for part in parts {
                        match part {
                            TemplatePart::Literal(s) => result.push_str(s),
                            TemplatePart::Expr(e) => {
                                let v = self.eval_expr_async(e).await?;
                                result.push_str(&display_string(&v));
                            }
                        }
                    }
                    Ok(Value::Str(result))
                }

                ExprKind::ArrayLit(elements) => {
                    let mut values = Vec::with_capacity(elements.len());
                    for element in elements {
                        values.push(self.eval_expr_async(element).await?);
                    }
                    Ok(Value::Array(values))
                }

                ExprKind::ObjectLit(entries) => {
                    let mut map = BTreeMap::new();
                    for entry in entries {
                        let value = self.eval_expr_async(&entry.value).await?;
                        map.insert(entry.key.clone(), value);
                    }
                    Ok(Value::Object(map))
                }

                ExprKind::Identifier(name) => self
                    .env
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),

                ExprKind::Member { object, property } => {
                    let obj = self.eval_expr_async(object).await?;
                    get_property(&obj, &property.name)
                }

                ExprKind::Index { object, index } => {
                    let obj = self.eval_expr_async(object).await?;
                    let key = self.eval_expr_async(index).await?;
                    get_index(&obj, &key)
                }

                ExprKind::Call { callee, args } => {
                    let callee_path = callee_display(callee);
                    let f = self.eval_expr_async(callee).await?;
                    let mut argv = Vec::with_capacity(args.len());
                    for arg in args {
                        argv.push(self.eval_expr_async(arg).await?);
                    }
                    call_value_async(&f, argv, &callee_path).await
                }

                ExprKind::Unary { op, operand } => {
                    let v = self.eval_expr_async(operand).await?;
                    Ok(apply_unary(*op, &v))
                }

                ExprKind::Binary { left, op, right } => {
                    let lv = self.eval_expr_async(left).await?;
                    let rv = self.eval_expr_async(right).await?;
                    Ok(apply_binary(*op, &lv, &rv))
                }

                ExprKind::Logical { left, op, right } => {
                    let lv = self.eval_expr_async(left).await?;
                    match op {
                        LogicalOp::And if !lv.is_truthy() => Ok(lv),
                        LogicalOp::Or if lv.is_truthy() => Ok(lv),
                        LogicalOp::Nullish if !lv.is_nullish() => Ok(lv),
                        _ => self.eval_expr_async(right).await,
                    }
                }

                ExprKind::Conditional {
                    test,
                    consequent,
                    alternate,
                } => {
                    if self.eval_expr_async(test).await?.is_truthy() {
                        self.eval_expr_async(consequent).await
                    } else {
                        self.eval_expr_async(alternate).await
                    }
                }

                ExprKind::Assign { target, value } => {
                    let v = self.eval_expr_async(value).await?;
                    self.assign_async(target, v.clone()).await?;
                    Ok(v)
                }

                ExprKind::Arrow(arrow) => Ok(Value::Function(Function::new(
                    arrow.params.iter().map(|p| p.name.clone()).collect(),
                    Arc::new((*arrow.body).clone()),
                    self.env.clone(),
                    arrow.is_async,
                ))),

                // Helper calls settle before their value is seen, so await
                // here is the identity on the operand's value
                ExprKind::Await(inner) => self.eval_expr_async(inner).await,

                ExprKind::Paren(inner) => self.eval_expr_async(inner).await,
            }
        })
    }

    async fn assign_async(&mut self, target: &Expr, value: Value) -> EvalResult<()> {
        let mut keys: Vec<PathKey> = Vec::new();
        let mut cur = target;
        let root = loop {
            match &cur.kind {
                ExprKind::Member { object, property } => {
                    keys.push(PathKey::Prop(property.name.clone()));
                    cur = object.as_ref();
                }
                ExprKind::Index { object, index } => {
                    let key = self.eval_expr_async(index).await?;
                    keys.push(PathKey::Value(key));
                    cur = object.as_ref();
                }
                ExprKind::Paren(inner) => cur = inner.as_ref(),
                ExprKind::Identifier(name) => break name.clone(),
                _ => {
                    self.eval_expr_async(cur).await?;
                    return Ok(());
                }
            }
        };
        keys.reverse();

        let Some(slot) = self.env.get_mut(&root) else {
            return Err(EvalError::UndefinedVariable(root));
        };
        set_path(slot, &keys, value)
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Function invocation
// ══════════════════════════════════════════════════════════════════════════

impl Function {
    /// Call this function synchronously. `async` functions refuse — their
    /// bodies may contain suspension points the sync walker cannot honor.
    pub fn call(&self, args: &[Value]) -> EvalResult<Value> {
        if self.is_async {
            return Err(EvalError::AsyncFunctionInSyncEval);
        }
        let mut evaluator = Evaluator::new(self.call_env(args));
        evaluator.eval_expr(self.body.as_ref())
    }

    /// Call this function under async evaluation. Bodies are treated as
    /// async whether or not the author wrote `async` — no double wrapping
    /// when they did.
    pub fn call_async(&self, args: &[Value]) -> BoxFuture<'static, EvalResult<Value>> {
        let env = self.call_env(args);
        let body = Arc::clone(&self.body);
        Box::pin(async move {
            let mut evaluator = Evaluator::new(env);
            evaluator.eval_expr_async(body.as_ref()).await
        })
    }

    /// Fresh call environment: the captured scope chain plus a scope
    /// binding parameters positionally (missing args are `undefined`,
    /// extras are dropped).
    fn call_env(&self, args: &[Value]) -> Environment {
        let mut env = self.captured.clone();
        env.push_scope();
        for (i, param) in self.params.iter().enumerate() {
            env.define(param, args.get(i).cloned().unwrap_or(Value::Undefined));
        }
        env
    }
}

fn call_value(f: &Value, args: Vec<Value>, callee_path: &str) -> EvalResult<Value> {
    match f {
        Value::Function(func) => func.call(&args),
        Value::Native(native) => native.call(args),
        Value::NativeAsync(native) => {
            Err(EvalError::AsyncHelperInSyncEval(native.name.clone()))
        }
        _ => Err(EvalError::NotAFunction {
            callee: callee_path.to_string(),
        }),
    }
}

async fn call_value_async(f: &Value, args: Vec<Value>, callee_path: &str) -> EvalResult<Value> {
    match f {
        Value::Function(func) => func.call_async(&args).await,
        Value::Native(native) => native.call(args),
        Value::NativeAsync(native) => native.call(args).await,
        _ => Err(EvalError::NotAFunction {
            callee: callee_path.to_string(),
        }),
    }
}

/// Render a call's callee for error messages: a source path when the
/// callee is one, a generic placeholder otherwise.
fn callee_display(callee: &Expr) -> String {
    callee
        .display_path()
        .unwrap_or_else(|| "expression".to_string())
}

// ══════════════════════════════════════════════════════════════════════════
// Property & index access
// ══════════════════════════════════════════════════════════════════════════

fn nil_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        _ => "undefined",
    }
}

fn get_property(object: &Value, property: &str) -> EvalResult<Value> {
    match object {
        Value::Object(map) => Ok(map.get(property).cloned().unwrap_or(Value::Undefined)),
        Value::Array(items) => {
            if property == "length" {
                Ok(Value::Number(items.len() as f64))
            } else if let Ok(i) = property.parse::<usize>() {
                Ok(items.get(i).cloned().unwrap_or(Value::Undefined))
            } else {
                Ok(Value::Undefined)
            }
        }
        Value::Str(s) => {
            if property == "length" {
                Ok(Value::Number(s.chars().count() as f64))
            } else {
                Ok(Value::Undefined)
            }
        }
        Value::Undefined | Value::Null => Err(EvalError::PropertyOfNil {
            container: nil_name(object),
            property: property.to_string(),
        }),
        _ => Ok(Value::Undefined),
    }
}

fn get_index(object: &Value, key: &Value) -> EvalResult<Value> {
    match object {
        Value::Array(items) => {
            let n = key.to_number();
            if n.fract() == 0.0 && n >= 0.0 && (n as usize) < items.len() {
                Ok(items[n as usize].clone())
            } else {
                Ok(Value::Undefined)
            }
        }
        Value::Str(s) => {
            let n = key.to_number();
            if n.fract() == 0.0 && n >= 0.0 {
                Ok(s.chars()
                    .nth(n as usize)
                    .map(|c| Value::Str(c.to_string()))
                    .unwrap_or(Value::Undefined))
            } else {
                Ok(Value::Undefined)
            }
        }
        _ => get_property(object, &display_string(key)),
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Operators
// ══════════════════════════════════════════════════════════════════════════

fn apply_unary(op: UnaryOp, v: &Value) -> Value {
    match op {
        UnaryOp::Not => Value::Bool(!v.is_truthy()),
        UnaryOp::Neg => Value::Number(-v.to_number()),
        UnaryOp::Plus => Value::Number(v.to_number()),
        UnaryOp::TypeOf => Value::Str(v.type_name().to_string()),
    }
}

fn apply_binary(op: BinOp, left: &Value, right: &Value) -> Value {
    match op {
        BinOp::Add => {
            // JS `+`: string concatenation wins when either side is
            // string-like; otherwise numeric addition
            let stringish = |v: &Value| {
                matches!(
                    v,
                    Value::Str(_)
                        | Value::Array(_)
                        | Value::Object(_)
                        | Value::Function(_)
                        | Value::Native(_)
                        | Value::NativeAsync(_)
                )
            };
            if stringish(left) || stringish(right) {
                Value::Str(format!("{}{}", display_string(left), display_string(right)))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinOp::Mul => Value::Number(left.to_number() * right.to_number()),
        // IEEE 754 gives the JS answers for zero divisors:
        // 1/0 = Infinity, 0/0 = NaN, 1%0 = NaN
        BinOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinOp::Mod => Value::Number(left.to_number() % right.to_number()),
        BinOp::Eq => Value::Bool(left == right),
        BinOp::NotEq => Value::Bool(left != right),
        BinOp::Less => compare(left, right, |o| o == std::cmp::Ordering::Less),
        BinOp::Greater => compare(left, right, |o| o == std::cmp::Ordering::Greater),
        BinOp::LessEq => compare(left, right, |o| o != std::cmp::Ordering::Greater),
        BinOp::GreaterEq => compare(left, right, |o| o != std::cmp::Ordering::Less),
    }
}

/// Relational comparison: lexicographic when both operands are strings,
/// numeric otherwise. Comparisons involving NaN are false.
fn compare(left: &Value, right: &Value, test: impl Fn(std::cmp::Ordering) -> bool) -> Value {
    let ordering = match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    };
    Value::Bool(ordering.is_some_and(test))
}

// ══════════════════════════════════════════════════════════════════════════
// Assignment paths
// ══════════════════════════════════════════════════════════════════════════

/// One resolved segment of an assignment path.
enum PathKey {
    /// `.name`
    Prop(String),
    /// `[expr]`, already evaluated
    Value(Value),
}

impl PathKey {
    fn display(&self) -> String {
        match self {
            PathKey::Prop(name) => name.clone(),
            PathKey::Value(v) => display_string(v),
        }
    }

    fn as_index(&self) -> Option<usize> {
        let n = match self {
            PathKey::Prop(name) => name.parse::<f64>().ok()?,
            PathKey::Value(v) => v.to_number(),
        };
        (n.fract() == 0.0 && n >= 0.0).then_some(n as usize)
    }
}

fn set_path(place: &mut Value, keys: &[PathKey], value: Value) -> EvalResult<()> {
    let Some((first, rest)) = keys.split_first() else {
        // A bare-identifier target never parses, so an empty path can't
        // reach the evaluator
        return Ok(());
    };
    if rest.is_empty() {
        return set_entry(place, first, value);
    }
    match get_entry_mut(place, first)? {
        Some(next) => set_path(next, rest, value),
        None => Err(EvalError::SetPropertyOfNil {
            container: "undefined",
            property: rest[0].display(),
        }),
    }
}

fn set_entry(place: &mut Value, key: &PathKey, value: Value) -> EvalResult<()> {
    match place {
        Value::Object(map) => {
            map.insert(key.display(), value);
            Ok(())
        }
        Value::Array(items) => {
            if let Some(i) = key.as_index() {
                if i >= items.len() {
                    items.resize(i + 1, Value::Undefined);
                }
                items[i] = value;
            }
            Ok(())
        }
        Value::Undefined | Value::Null => Err(EvalError::SetPropertyOfNil {
            container: nil_name(place),
            property: key.display(),
        }),
        // Writes on primitives are silently ignored, as in non-strict JS
        _ => Ok(()),
    }
}

fn get_entry_mut<'v>(place: &'v mut Value, key: &PathKey) -> EvalResult<Option<&'v mut Value>> {
    match place {
        Value::Object(map) => Ok(map.get_mut(&key.display())),
        Value::Array(items) => Ok(key.as_index().and_then(|i| items.get_mut(i))),
        Value::Undefined | Value::Null => Err(EvalError::PropertyOfNil {
            container: nil_name(place),
            property: key.display(),
        }),
        _ => Ok(None),
    }
}
