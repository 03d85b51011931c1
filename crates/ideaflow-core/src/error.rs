use thiserror::Error;

/// Extraction failures. Recoverable: callers substitute degraded output
/// instead of propagating these up the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no parsable JSON object in text")]
    Unparseable,
}

/// Failures at the collaborator boundary (LLM call, retrieval call).
#[derive(Debug, Clone, Error)]
pub enum InvokeError {
    #[error("collaborator request failed: {0}")]
    Request(String),

    #[error("collaborator request timed out")]
    Timeout,
}

/// Stage-local failures. Recoverable at the graph level: the executor
/// records them and skips dependents rather than aborting the run.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("stage '{stage}' missing required input key '{key}'")]
    MissingInput { stage: String, key: String },

    #[error("stage '{stage}' invocation failed: {detail}")]
    InvocationFailed { stage: String, detail: String },

    #[error("stage '{stage}' timed out after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    #[error("stage '{stage}' output key '{key}' already written")]
    DuplicateOutput { stage: String, key: String },
}

/// Graph construction failures. Fatal: a graph that fails validation is
/// never built, so none of these can surface during a run.
#[derive(Debug, Clone, Error)]
pub enum GraphError {
    #[error("workflow graph has no stages")]
    Empty,

    #[error("duplicate stage name '{0}'")]
    DuplicateStage(String),

    #[error("edge references unknown stage '{0}'")]
    UnknownStage(String),

    #[error("output key '{key}' is produced by more than one stage or collides with a seed key")]
    ConflictingOutput { key: String },

    #[error("workflow graph has a cycle through: {0}")]
    CycleDetected(String),

    #[error("stage '{stage}' reads key '{key}' that no ancestor produces and no seed provides")]
    UnsatisfiedDependency { stage: String, key: String },
}
