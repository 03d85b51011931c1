use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::warn;

use ideaflow_core::context::SharedContext;
use ideaflow_core::error::{InvokeError, StageError};

use crate::extract::extract;
use crate::validate::FieldSchema;

/// The projection of the shared context a stage's collaborator sees.
pub type StageInput = HashMap<String, Value>;

/// What a stage's collaborator hands back.
#[derive(Debug, Clone)]
pub enum StageOutput {
    /// Untrusted free text — goes through JSON extraction.
    Text(String),
    /// Already-structured data from a pure computation; skips extraction.
    Structured(Value),
}

/// A stage's contribution to the shared context.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    /// The context key this stage writes.
    pub key: String,
    pub value: Value,
    /// Whether fallback content was substituted for unparsable or
    /// implausible output.
    pub degraded: bool,
}

type InvokeFn =
    Arc<dyn Fn(StageInput) -> BoxFuture<'static, Result<StageOutput, InvokeError>> + Send + Sync>;

/// A named unit of work in the workflow graph.
///
/// Declares the context keys it reads, the single key it writes, the
/// collaborator function that does the work, and an optional minimum
/// shape for the output. Immutable once the graph is built.
#[derive(Clone)]
pub struct StageSpec {
    name: String,
    reads: Vec<String>,
    writes: String,
    invoke: InvokeFn,
    schema: Option<Arc<FieldSchema>>,
    timeout: Option<Duration>,
}

impl StageSpec {
    /// Create a stage with minimal configuration.
    pub fn new<F, Fut>(name: impl Into<String>, writes: impl Into<String>, invoke: F) -> Self
    where
        F: Fn(StageInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StageOutput, InvokeError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            reads: vec![],
            writes: writes.into(),
            invoke: Arc::new(move |input| Box::pin(invoke(input))),
            schema: None,
            timeout: None,
        }
    }

    /// Set the context keys this stage reads.
    pub fn with_reads(mut self, keys: Vec<String>) -> Self {
        self.reads = keys;
        self
    }

    /// Set the minimum output shape.
    pub fn with_schema(mut self, schema: FieldSchema) -> Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    /// Set a per-stage invocation deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reads(&self) -> &[String] {
        &self.reads
    }

    pub fn writes(&self) -> &str {
        &self.writes
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Project this stage's `reads` keys out of the context.
    ///
    /// Build-time graph validation should make a miss impossible; this is
    /// the defensive check for unvalidated seeds.
    pub fn project(&self, context: &SharedContext) -> Result<StageInput, StageError> {
        let mut input = StageInput::with_capacity(self.reads.len());
        for key in &self.reads {
            match context.get(key) {
                Some(value) => {
                    input.insert(key.clone(), value.clone());
                }
                None => {
                    return Err(StageError::MissingInput {
                        stage: self.name.clone(),
                        key: key.clone(),
                    });
                }
            }
        }
        Ok(input)
    }

    /// Invoke the collaborator and coerce its output.
    ///
    /// Unparsable text becomes an empty object and marks the outcome
    /// degraded — the pipeline keeps moving with fallback data, and the
    /// substitution is recorded rather than silent.
    pub async fn run_with_input(&self, input: StageInput) -> Result<StageOutcome, StageError> {
        let raw = (self.invoke)(input).await.map_err(|e| match e {
            InvokeError::Timeout => StageError::InvocationFailed {
                stage: self.name.clone(),
                detail: "collaborator request timed out".into(),
            },
            InvokeError::Request(detail) => StageError::InvocationFailed {
                stage: self.name.clone(),
                detail,
            },
        })?;

        let (mut value, mut degraded) = match raw {
            StageOutput::Structured(value) => (value, false),
            StageOutput::Text(text) => match extract(&text) {
                Ok(value) => (value, false),
                Err(_) => {
                    warn!(
                        stage = %self.name,
                        "no parsable JSON in output, continuing with empty object"
                    );
                    (Value::Object(serde_json::Map::new()), true)
                }
            },
        };

        if let Some(schema) = &self.schema {
            let (conformed, repaired) = schema.conform(value);
            value = conformed;
            degraded |= repaired;
        }

        Ok(StageOutcome {
            key: self.writes.clone(),
            value,
            degraded,
        })
    }

    /// Project and run in one step.
    pub async fn run(&self, context: &SharedContext) -> Result<StageOutcome, StageError> {
        let input = self.project(context)?;
        self.run_with_input(input).await
    }
}

impl std::fmt::Debug for StageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageSpec")
            .field("name", &self.name)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .field("schema", &self.schema)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::plausible;
    use serde_json::json;

    fn echo_stage() -> StageSpec {
        StageSpec::new("echo", "result", |input: StageInput| async move {
            let idea = input.get("idea").cloned().unwrap_or(Value::Null);
            Ok(StageOutput::Structured(json!({"echo": idea})))
        })
        .with_reads(vec!["idea".into()])
    }

    #[tokio::test]
    async fn test_run_structured() {
        let ctx = SharedContext::seeded("idea", json!("AI tutor"));
        let outcome = echo_stage().run(&ctx).await.unwrap();
        assert_eq!(outcome.key, "result");
        assert_eq!(outcome.value["echo"], json!("AI tutor"));
        assert!(!outcome.degraded);
    }

    #[tokio::test]
    async fn test_missing_input() {
        let ctx = SharedContext::new();
        let err = echo_stage().run(&ctx).await.unwrap_err();
        match err {
            StageError::MissingInput { stage, key } => {
                assert_eq!(stage, "echo");
                assert_eq!(key, "idea");
            }
            other => panic!("expected MissingInput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invocation_failure_wrapped() {
        let stage = StageSpec::new("flaky", "out", |_| async {
            Err(InvokeError::Request("503 service unavailable".into()))
        });
        let err = stage.run(&SharedContext::new()).await.unwrap_err();
        match err {
            StageError::InvocationFailed { stage, detail } => {
                assert_eq!(stage, "flaky");
                assert!(detail.contains("503"));
            }
            other => panic!("expected InvocationFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_text_output_extracted() {
        let stage = StageSpec::new("parse", "parsed", |_| async {
            Ok(StageOutput::Text(
                "Here it is:\n```json\n{\"domain\": \"edtech\"}\n```".into(),
            ))
        });
        let outcome = stage.run(&SharedContext::new()).await.unwrap();
        assert_eq!(outcome.value["domain"], json!("edtech"));
        assert!(!outcome.degraded);
    }

    #[tokio::test]
    async fn test_garbage_output_degrades_with_fallbacks() {
        let stage = StageSpec::new("parse", "parsed", |_| async {
            Ok(StageOutput::Text(
                "Sure, here's the analysis: {domain: tech".into(),
            ))
        })
        .with_schema(
            FieldSchema::new().field("domain", plausible::non_empty_string, json!("unknown")),
        );

        let outcome = stage.run(&SharedContext::new()).await.unwrap();
        assert!(outcome.degraded);
        assert_eq!(outcome.value["domain"], json!("unknown"));
    }

    #[tokio::test]
    async fn test_plausible_output_not_degraded_by_schema() {
        let stage = StageSpec::new("parse", "parsed", |_| async {
            Ok(StageOutput::Text(r#"{"domain": "fintech"}"#.into()))
        })
        .with_schema(
            FieldSchema::new().field("domain", plausible::non_empty_string, json!("unknown")),
        );

        let outcome = stage.run(&SharedContext::new()).await.unwrap();
        assert!(!outcome.degraded);
        assert_eq!(outcome.value["domain"], json!("fintech"));
    }
}
