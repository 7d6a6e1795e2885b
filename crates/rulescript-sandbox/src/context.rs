//! Isolation context builder.
//!
//! Assembles the per-call binding environment executed code sees in place
//! of any ambient host globals: built-in helpers, caller overrides, and —
//! when a template id is given — the registry's `$.workflow` namespace.
//! Each call gets a fresh environment; nothing survives the call.

use crate::registry::GlobalFunctionRegistry;
use crate::EvalOptions;
use rulescript_eval::builtins::builtin_bindings;
use rulescript_eval::{Environment, Value};
use std::collections::BTreeMap;

/// Build the root environment for one evaluation call.
///
/// Layering, later wins:
/// 1. built-in helpers (`getMd5Hash`, `Object`);
/// 2. the `global` identifier — an empty object, unless the caller's
///    overrides carry a key literally named `"global"`, which replaces the
///    namespace wholesale;
/// 3. every other caller override;
/// 4. `$` with the template's `workflow` namespace, iff
///    `workflow_template_id` is set.
pub fn build_context(options: &EvalOptions, registry: &GlobalFunctionRegistry) -> Environment {
    let mut bindings = builtin_bindings();

    let global_object = options
        .global
        .get("global")
        .cloned()
        .unwrap_or_else(|| Value::Object(BTreeMap::new()));
    bindings.insert("global".to_string(), global_object);

    for (name, value) in &options.global {
        if name != "global" {
            bindings.insert(name.clone(), value.clone());
        }
    }

    if let Some(template_id) = options.workflow_template_id {
        bindings.insert(
            "$".to_string(),
            Value::object([(
                "workflow".to_string(),
                Value::Object(registry.namespace(template_id)),
            )]),
        );
    }

    Environment::with_bindings(bindings)
}
