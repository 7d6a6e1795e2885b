//! Integration tests for the rulescript evaluator.
//!
//! Covers: literals, JS operator semantics (concatenation, coercion,
//! short-circuit operand values), member/index access, arrow functions and
//! closures, environment isolation, builtins, and the async walker.

use rulescript_eval::builtins::builtin_bindings;
use rulescript_eval::{
    Environment, EvalError, Evaluator, NativeAsyncFunction, NativeFunction, Value,
};
use rulescript_parser::parse_snippet;
use rulescript_types::ast::Expr;
use rulescript_types::Source;
use std::collections::BTreeMap;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Parse a snippet into an expression (panics on parse errors).
fn parse(source: &str) -> Expr {
    let src = Source::new(source);
    let result = parse_snippet(&src);
    if result.errors.has_errors() {
        panic!(
            "parse errors:\n{}",
            result
                .errors
                .errors
                .iter()
                .map(|e| format!("  [{}] {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }
    result.expr.expect("no expression after successful parse")
}

/// Evaluate a snippet against the builtin bindings.
fn eval(source: &str) -> Result<Value, EvalError> {
    let env = Environment::with_bindings(builtin_bindings());
    Evaluator::new(env).eval_expr(&parse(source))
}

/// Evaluate with extra bindings layered over the builtins.
fn eval_with(source: &str, extra: BTreeMap<String, Value>) -> Result<Value, EvalError> {
    let mut bindings = builtin_bindings();
    bindings.extend(extra);
    let env = Environment::with_bindings(bindings);
    Evaluator::new(env).eval_expr(&parse(source))
}

/// Evaluate a snippet asynchronously with extra bindings.
async fn eval_async_with(
    source: &str,
    extra: BTreeMap<String, Value>,
) -> Result<Value, EvalError> {
    let mut bindings = builtin_bindings();
    bindings.extend(extra);
    let env = Environment::with_bindings(bindings);
    let expr = parse(source);
    Evaluator::new(env).eval_expr_async(&expr).await
}

fn num(n: f64) -> Value {
    Value::Number(n)
}

fn str_val(s: &str) -> Value {
    Value::Str(s.into())
}

// ══════════════════════════════════════════════════════════════════════════════
// Literals & operators
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn literal_arithmetic() {
    assert_eq!(eval("1 + 1").unwrap(), num(2.0));
    assert_eq!(eval("2 * 3 + 4").unwrap(), num(10.0));
    assert_eq!(eval("10 % 3").unwrap(), num(1.0));
    assert_eq!(eval("-5 + 1").unwrap(), num(-4.0));
}

#[test]
fn string_literal_value() {
    assert_eq!(eval("\"quoted text\"").unwrap(), str_val("quoted text"));
    assert_eq!(eval("'single'").unwrap(), str_val("single"));
}

#[test]
fn string_concatenation() {
    assert_eq!(eval("'a' + 'b'").unwrap(), str_val("ab"));
    assert_eq!(eval("'n = ' + 42").unwrap(), str_val("n = 42"));
    assert_eq!(eval("1 + '2'").unwrap(), str_val("12"));
}

#[test]
fn numeric_coercion() {
    assert_eq!(eval("'6' / '2'").unwrap(), num(3.0));
    assert_eq!(eval("true + 1").unwrap(), num(2.0));
}

#[test]
fn division_follows_ieee() {
    assert_eq!(eval("1 / 0").unwrap(), num(f64::INFINITY));
    match eval("0 / 0").unwrap() {
        Value::Number(n) => assert!(n.is_nan()),
        other => panic!("expected NaN, got {other:?}"),
    }
}

#[test]
fn equality_is_strict() {
    assert_eq!(eval("1 === 1").unwrap(), Value::Bool(true));
    assert_eq!(eval("1 == '1'").unwrap(), Value::Bool(false));
    assert_eq!(eval("null == undefined").unwrap(), Value::Bool(false));
    assert_eq!(eval("'a' != 'b'").unwrap(), Value::Bool(true));
}

#[test]
fn comparisons() {
    assert_eq!(eval("2 > 1").unwrap(), Value::Bool(true));
    assert_eq!(eval("'abc' < 'abd'").unwrap(), Value::Bool(true));
    assert_eq!(eval("1 <= 1").unwrap(), Value::Bool(true));
}

#[test]
fn logical_operators_return_operands() {
    assert_eq!(eval("0 || 'fallback'").unwrap(), str_val("fallback"));
    assert_eq!(eval("'first' && 'second'").unwrap(), str_val("second"));
    assert_eq!(eval("null ?? 'default'").unwrap(), str_val("default"));
    assert_eq!(eval("0 ?? 'default'").unwrap(), num(0.0));
}

#[test]
fn conditional_expression() {
    assert_eq!(eval("2 > 1 ? 'yes' : 'no'").unwrap(), str_val("yes"));
    assert_eq!(eval("false ? 1 : 2").unwrap(), num(2.0));
}

#[test]
fn typeof_operator() {
    assert_eq!(eval("typeof 1").unwrap(), str_val("number"));
    assert_eq!(eval("typeof 'x'").unwrap(), str_val("string"));
    assert_eq!(eval("typeof undefined").unwrap(), str_val("undefined"));
    assert_eq!(eval("typeof null").unwrap(), str_val("object"));
    assert_eq!(eval("typeof ((a) => a)").unwrap(), str_val("function"));
}

#[test]
fn template_literals() {
    assert_eq!(eval("`2 + 2 = ${2 + 2}`").unwrap(), str_val("2 + 2 = 4"));
    assert_eq!(eval("`${'a'}${'b'}`").unwrap(), str_val("ab"));
}

// ══════════════════════════════════════════════════════════════════════════════
// Member & index access
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn member_access_on_literals() {
    assert_eq!(eval("{ a: 1 }.a").unwrap(), num(1.0));
    assert_eq!(eval("{ a: { b: 2 } }.a.b").unwrap(), num(2.0));
    assert_eq!(eval("{ a: 1 }.missing").unwrap(), Value::Undefined);
}

#[test]
fn index_access() {
    assert_eq!(eval("[10, 20, 30][1]").unwrap(), num(20.0));
    assert_eq!(eval("[10][5]").unwrap(), Value::Undefined);
    assert_eq!(eval("{ 'k v': 1 }['k v']").unwrap(), num(1.0));
    assert_eq!(eval("'abc'[1]").unwrap(), str_val("b"));
}

#[test]
fn length_properties() {
    assert_eq!(eval("[1, 2, 3].length").unwrap(), num(3.0));
    assert_eq!(eval("'hello'.length").unwrap(), num(5.0));
}

#[test]
fn member_access_on_nil_throws() {
    let err = eval("undefined.workflow").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot read properties of undefined (reading 'workflow')"
    );
    assert!(eval("null.x").is_err());
}

#[test]
fn unknown_identifier_throws() {
    let err = eval("nope").unwrap_err();
    assert_eq!(err, EvalError::UndefinedVariable("nope".into()));
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions & closures
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn arrow_evaluates_to_callable() {
    let result = eval("(a, b) => a + b").unwrap();
    match result {
        Value::Function(f) => {
            assert_eq!(f.arity(), 2);
            assert_eq!(f.call(&[num(1.0), num(2.0)]).unwrap(), num(3.0));
        }
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn missing_args_are_undefined() {
    let result = eval("(a) => a").unwrap();
    match result {
        Value::Function(f) => assert_eq!(f.call(&[]).unwrap(), Value::Undefined),
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn closures_capture_definition_env() {
    let result = eval_with(
        "(x) => base + x",
        BTreeMap::from([("base".to_string(), num(10.0))]),
    )
    .unwrap();
    match result {
        Value::Function(f) => assert_eq!(f.call(&[num(5.0)]).unwrap(), num(15.0)),
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn immediately_invoked_arrow() {
    assert_eq!(eval("((a, b) => a * b)(3, 4)").unwrap(), num(12.0));
}

#[test]
fn calling_a_non_function_names_the_callee() {
    let err = eval_with(
        "obj.missing()",
        BTreeMap::from([("obj".to_string(), Value::Object(BTreeMap::new()))]),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "obj.missing is not a function");
}

#[test]
fn native_helpers_are_callable() {
    let double = NativeFunction::new("double", |args| {
        Ok(Value::Number(
            args.first().map(|v| v.to_number()).unwrap_or(f64::NAN) * 2.0,
        ))
    });
    let result = eval_with(
        "double(21)",
        BTreeMap::from([("double".to_string(), Value::Native(double))]),
    )
    .unwrap();
    assert_eq!(result, num(42.0));
}

#[test]
fn async_function_refuses_sync_call() {
    let result = eval("async (a) => a").unwrap();
    match result {
        Value::Function(f) => {
            assert!(f.is_async());
            assert_eq!(f.call(&[num(1.0)]).unwrap_err(), EvalError::AsyncFunctionInSyncEval);
        }
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn await_in_sync_eval_throws() {
    let result = eval("((a) => await a)(1)");
    assert_eq!(result.unwrap_err(), EvalError::AwaitInSyncEval);
}

// ══════════════════════════════════════════════════════════════════════════════
// Assignment
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn member_assignment_writes_through() {
    let mut bindings = builtin_bindings();
    bindings.insert("global".to_string(), Value::Object(BTreeMap::new()));
    let env = Environment::with_bindings(bindings);
    let mut evaluator = Evaluator::new(env);

    let result = evaluator.eval_expr(&parse("global.test = 'x'")).unwrap();
    assert_eq!(result, str_val("x"));

    let readback = evaluator.eval_expr(&parse("global.test")).unwrap();
    assert_eq!(readback, str_val("x"));
}

#[test]
fn assignment_to_nested_missing_property_throws() {
    let mut bindings = builtin_bindings();
    bindings.insert("global".to_string(), Value::Object(BTreeMap::new()));
    let env = Environment::with_bindings(bindings);
    let err = Evaluator::new(env)
        .eval_expr(&parse("global.a.b = 1"))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot set properties of undefined (setting 'b')"
    );
}

#[test]
fn assignment_to_unknown_root_throws() {
    assert!(matches!(
        eval("nothing.x = 1").unwrap_err(),
        EvalError::UndefinedVariable(_)
    ));
}

// ══════════════════════════════════════════════════════════════════════════════
// Builtins
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn md5_builtin() {
    assert_eq!(
        eval("getMd5Hash(\"test\")").unwrap(),
        str_val("098f6bcd4621d373cade4e832627b4f6")
    );
}

#[test]
fn object_keys_builtin() {
    assert_eq!(
        eval("Object.keys({ b: 1, a: 2 })").unwrap(),
        Value::Array(vec![str_val("a"), str_val("b")])
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Async evaluation
// ══════════════════════════════════════════════════════════════════════════════

fn async_increment() -> Value {
    Value::NativeAsync(NativeAsyncFunction::new("test", |args| {
        Box::pin(async move {
            let n = args.first().map(|v| v.to_number()).unwrap_or(f64::NAN);
            Ok(Value::Number(n + 1.0))
        })
    }))
}

#[tokio::test]
async fn async_helper_is_awaited_at_call_site() {
    let result = eval_async_with(
        "((a) => test(a))(42)",
        BTreeMap::from([("test".to_string(), async_increment())]),
    )
    .await
    .unwrap();
    assert_eq!(result, num(43.0));
}

#[tokio::test]
async fn explicit_await_is_identity_on_settled_values() {
    let result = eval_async_with(
        "((a) => await test(a))(42)",
        BTreeMap::from([("test".to_string(), async_increment())]),
    )
    .await
    .unwrap();
    assert_eq!(result, num(43.0));
}

#[tokio::test]
async fn async_arrow_callable_under_async_eval() {
    let expr = parse("async (a, b) => a + b");
    let env = Environment::with_bindings(builtin_bindings());
    let f = match Evaluator::new(env).eval_expr(&expr).unwrap() {
        Value::Function(f) => f,
        other => panic!("expected function, got {other:?}"),
    };
    assert_eq!(
        f.call_async(&[num(1.0), num(2.0)]).await.unwrap(),
        num(3.0)
    );
}

#[tokio::test]
async fn sync_results_match_under_async_eval() {
    assert_eq!(
        eval_async_with("1 + 1", BTreeMap::new()).await.unwrap(),
        num(2.0)
    );
    assert_eq!(
        eval_async_with("`v-${1 + 2}`", BTreeMap::new()).await.unwrap(),
        str_val("v-3")
    );
}

#[test]
fn async_helper_in_sync_eval_throws() {
    let err = eval_with(
        "test(1)",
        BTreeMap::from([("test".to_string(), async_increment())]),
    )
    .unwrap_err();
    assert_eq!(
        err,
        EvalError::AsyncHelperInSyncEval("test".into())
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Purity
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn repeated_evaluation_is_pure() {
    let expr = parse("getMd5Hash('x') + [1, 2].length");
    let first = {
        let env = Environment::with_bindings(builtin_bindings());
        Evaluator::new(env).eval_expr(&expr).unwrap()
    };
    for _ in 0..10 {
        let env = Environment::with_bindings(builtin_bindings());
        let result = Evaluator::new(env).eval_expr(&expr).unwrap();
        assert_eq!(result, first);
    }
}

#[test]
fn function_values_compare_by_identity() {
    let f1 = eval("(a) => a").unwrap();
    let f2 = eval("(a) => a").unwrap();
    // Distinct evaluations produce distinct function identities
    assert_ne!(f1, f2);
    assert_eq!(f1, f1.clone());
}
