//! The per-workflow-template registry of named helper functions.
//!
//! Populated once per [`populate`](GlobalFunctionRegistry::populate) from
//! external workflow-template records; read concurrently and lock-briefly
//! by every evaluation that sets `workflow_template_id`. Malformed entries
//! are skipped and reported to the diagnostics logger — one bad template
//! definition must never block evaluation for the others.

use crate::prepare;
use crate::DiagnosticLogger;
use rulescript_eval::builtins::builtin_bindings;
use rulescript_eval::{Environment, Evaluator, Function, Value};
use rulescript_parser::parse_snippet;
use rulescript_types::Source;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

/// Identifier of a workflow template.
pub type TemplateId = i64;

/// One workflow-template record as supplied by template storage.
///
/// `data` is the template's free-form document; the registry only looks at
/// its `globalFunctions` key (a `name → source` map when well-formed).
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateRecord {
    pub id: TemplateId,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// A compiled helper-function entry.
#[derive(Debug, Clone)]
pub struct GlobalFunctionEntry {
    /// The authored source, kept for diagnostics.
    pub source: String,
    /// The compiled function, closed over the built-in helpers.
    pub function: Function,
}

/// Registry of `(template id, name) → compiled function`.
///
/// `populate` is a single-writer bulk swap; reads after population are
/// concurrent. Re-populating replaces the whole map — there is no
/// per-entry invalidation.
pub struct GlobalFunctionRegistry {
    entries: RwLock<HashMap<TemplateId, BTreeMap<String, GlobalFunctionEntry>>>,
}

impl GlobalFunctionRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Scan template records and (re)build the registry.
    ///
    /// Skipped (logged, never fatal): a `globalFunctions` value that is not
    /// an object, entries whose value is not a string, and entries whose
    /// source fails to compile to a function.
    pub fn populate(&self, records: &[TemplateRecord], logger: &dyn DiagnosticLogger) {
        let mut map: HashMap<TemplateId, BTreeMap<String, GlobalFunctionEntry>> = HashMap::new();

        for record in records {
            let Some(functions) = record.data.get("globalFunctions") else {
                continue;
            };
            let Some(functions) = functions.as_object() else {
                logger.warn(&format!(
                    "skipping globalFunctions for template {}: expected an object, got {}",
                    record.id,
                    json_type_name(functions)
                ));
                continue;
            };

            let compiled = map.entry(record.id).or_default();
            for (name, source) in functions {
                let Some(source) = source.as_str() else {
                    logger.warn(&format!(
                        "skipping global function '{}' for template {}: source is not a string",
                        name, record.id
                    ));
                    continue;
                };
                match compile_function(source) {
                    Ok(function) => {
                        compiled.insert(
                            name.clone(),
                            GlobalFunctionEntry {
                                source: source.to_string(),
                                function,
                            },
                        );
                    }
                    Err(reason) => logger.warn(&format!(
                        "skipping global function '{}' for template {}: {}",
                        name, record.id, reason
                    )),
                }
            }
        }

        *self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner) = map;
    }

    /// Look up one compiled function.
    pub fn lookup(&self, template_id: TemplateId, name: &str) -> Option<Function> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&template_id)
            .and_then(|functions| functions.get(name))
            .map(|entry| entry.function.clone())
    }

    /// All registered functions for a template as context bindings —
    /// the `$.workflow` namespace. Unknown templates yield an empty map.
    pub fn namespace(&self, template_id: TemplateId) -> BTreeMap<String, Value> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&template_id)
            .map(|functions| {
                functions
                    .iter()
                    .map(|(name, entry)| (name.clone(), Value::Function(entry.function.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total number of registered functions, across all templates.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for GlobalFunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile one helper-function source: normalize, require arrow shape,
/// parse, and evaluate to a function value closed over the builtins.
fn compile_function(source: &str) -> Result<Function, String> {
    let prepared = prepare::normalize(source);
    if !prepared.is_arrow_shaped {
        return Err("not an arrow function".to_string());
    }

    let src = Source::new(prepared.code.as_str());
    let parsed = parse_snippet(&src);
    let Some(expr) = parsed.expr else {
        return Err(parsed
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "failed to parse".to_string()));
    };

    let env = Environment::with_bindings(builtin_bindings());
    match Evaluator::new(env).eval_expr(&expr) {
        Ok(Value::Function(function)) => Ok(function),
        Ok(other) => Err(format!(
            "does not evaluate to a function (got {})",
            other.type_name()
        )),
        Err(error) => Err(error.to_string()),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
