use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use ideaflow_core::config::ExecutorConfig;
use ideaflow_core::context::SharedContext;
use ideaflow_core::error::GraphError;
use ideaflow_core::traits::{SnippetRetriever, TextGenerator};
use ideaflow_workflow::{ExecutionResult, WorkflowExecutor, WorkflowGraph};

use crate::stages::marketability_graph;

/// The context key front ends seed with the raw idea text.
pub const SEED_KEY: &str = "startup_idea";

/// The evaluation facade front ends call.
///
/// Built once at startup (graph validation happens here, so a
/// mis-wired pipeline fails before serving anything) and reused across
/// runs; each `evaluate` call owns its own context.
pub struct Evaluator {
    executor: WorkflowExecutor,
}

impl Evaluator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        retriever: Arc<dyn SnippetRetriever>,
    ) -> Result<Self, GraphError> {
        let graph = marketability_graph(generator, retriever)?;
        Ok(Self {
            executor: WorkflowExecutor::new(graph),
        })
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.executor = self.executor.with_config(config);
        self
    }

    pub fn graph(&self) -> &WorkflowGraph {
        self.executor.graph()
    }

    /// Evaluate a raw startup idea.
    ///
    /// Never fails: stage-level trouble comes back as a `Partial` result
    /// with per-stage detail, not an error.
    pub async fn evaluate(&self, raw_idea: &str) -> ExecutionResult {
        info!(idea_len = raw_idea.len(), "evaluating startup idea");
        self.executor
            .execute(SharedContext::seeded(SEED_KEY, Value::String(raw_idea.into())))
            .await
    }

    /// Evaluate with caller-side cancellation.
    pub async fn evaluate_with_cancel(
        &self,
        raw_idea: &str,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        self.executor
            .execute_with_cancel(
                SharedContext::seeded(SEED_KEY, Value::String(raw_idea.into())),
                cancel,
            )
            .await
    }
}
