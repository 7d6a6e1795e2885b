//! Built-in helper bindings available to every evaluation.
//!
//! The set is deliberately tiny: a content-hashing helper the platform's
//! rule corpus leans on, and an `Object` namespace for key reflection.
//! Everything else reaches executed code through caller-supplied globals.

use crate::error::{EvalError, EvalResult};
use crate::value::{display_string, NativeFunction, Value};
use md5::{Digest, Md5};
use std::collections::BTreeMap;

/// The fixed built-in bindings merged into every isolation context.
pub fn builtin_bindings() -> BTreeMap<String, Value> {
    let mut bindings = BTreeMap::new();
    bindings.insert(
        "getMd5Hash".to_string(),
        Value::Native(NativeFunction::new("getMd5Hash", get_md5_hash)),
    );
    bindings.insert(
        "Object".to_string(),
        Value::object([(
            "keys".to_string(),
            Value::Native(NativeFunction::new("Object.keys", object_keys)),
        )]),
    );
    bindings
}

/// `getMd5Hash(text)` — lowercase hex MD5 digest of the argument's string
/// form.
fn get_md5_hash(args: Vec<Value>) -> EvalResult<Value> {
    let text = args
        .first()
        .map(display_string)
        .unwrap_or_else(|| "undefined".to_string());
    Ok(Value::Str(format!("{:x}", Md5::digest(text.as_bytes()))))
}

/// `Object.keys(value)` — property names of an object, index strings of an
/// array. Primitives yield `[]`; `null`/`undefined` throw, as in JS.
fn object_keys(args: Vec<Value>) -> EvalResult<Value> {
    match args.first() {
        None | Some(Value::Undefined) | Some(Value::Null) => Err(EvalError::Helper(
            "Cannot convert undefined or null to object".to_string(),
        )),
        Some(Value::Object(map)) => Ok(Value::Array(
            map.keys().map(|k| Value::Str(k.clone())).collect(),
        )),
        Some(Value::Array(items)) => Ok(Value::Array(
            (0..items.len())
                .map(|i| Value::Str(i.to_string()))
                .collect(),
        )),
        Some(_) => Ok(Value::Array(Vec::new())),
    }
}
