use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

/// Fallback for a field that is missing or implausible.
#[derive(Clone)]
pub enum Fallback {
    /// A literal replacement value.
    Value(Value),
    /// A generator invoked lazily, e.g. to synthesize plausible examples.
    Generator(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl Fallback {
    fn produce(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Generator(f) => f(),
        }
    }
}

impl std::fmt::Debug for Fallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

struct FieldRule {
    name: String,
    predicate: Predicate,
    fallback: Fallback,
}

/// Minimum shape contract for a stage's output object.
///
/// An ordered list of `(field, plausibility predicate, fallback)` rules.
/// LLM output is not reliably schema-conformant; conforming an object
/// guarantees downstream stages always receive a usable shape instead of
/// nulls or non-answers. Fields not named in the schema pass through
/// unchanged.
#[derive(Default)]
pub struct FieldSchema {
    rules: Vec<FieldRule>,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule with a literal fallback value.
    pub fn field(
        self,
        name: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
        fallback: Value,
    ) -> Self {
        self.rule(name, predicate, Fallback::Value(fallback))
    }

    /// Add a rule whose fallback is generated lazily.
    pub fn field_with(
        self,
        name: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
        generator: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.rule(name, predicate, Fallback::Generator(Arc::new(generator)))
    }

    fn rule(
        mut self,
        name: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
        fallback: Fallback,
    ) -> Self {
        self.rules.push(FieldRule {
            name: name.into(),
            predicate: Arc::new(predicate),
            fallback,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Repair an object in place so it satisfies the schema.
    ///
    /// Total: always returns a value with every schema field present and
    /// plausible. Returns `true` alongside if any field was repaired —
    /// the caller surfaces that as a degraded (not silent) success.
    /// Idempotent: conforming an already-valid object changes nothing.
    ///
    /// Non-object input is replaced by an object built entirely from
    /// fallbacks.
    pub fn conform(&self, value: Value) -> (Value, bool) {
        let mut obj = match value {
            Value::Object(map) => map,
            other => {
                debug!(got = %value_kind(&other), "schema expected object, rebuilding from fallbacks");
                serde_json::Map::new()
            }
        };

        let mut repaired = false;
        for rule in &self.rules {
            let plausible = obj.get(&rule.name).is_some_and(|v| (rule.predicate)(v));
            if !plausible {
                debug!(field = %rule.name, "field missing or implausible, substituting fallback");
                obj.insert(rule.name.clone(), rule.fallback.produce());
                repaired = true;
            }
        }
        (Value::Object(obj), repaired)
    }
}

impl std::fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| &r.name))
            .finish()
    }
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// True for the non-answer strings models emit instead of data.
pub fn is_non_answer(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "" | "n/a" | "na" | "none" | "null" | "unknown" | "insufficient data"
    )
}

/// Plausibility predicates for common field shapes.
pub mod plausible {
    use serde_json::Value;

    use super::is_non_answer;

    /// A string that actually says something.
    pub fn non_empty_string(v: &Value) -> bool {
        v.as_str().is_some_and(|s| !is_non_answer(s))
    }

    /// A number within an inclusive range.
    pub fn number_in_range(min: f64, max: f64) -> impl Fn(&Value) -> bool {
        move |v| v.as_f64().is_some_and(|n| n >= min && n <= max)
    }

    /// Any array, including an empty one.
    pub fn array(v: &Value) -> bool {
        v.is_array()
    }

    /// An array with at least one element.
    pub fn non_empty_array(v: &Value) -> bool {
        v.as_array().is_some_and(|a| !a.is_empty())
    }

    /// Present and non-null.
    pub fn present(v: &Value) -> bool {
        !v.is_null()
    }
}
