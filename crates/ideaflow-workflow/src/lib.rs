//! Workflow Orchestration Engine — DAG-based multi-stage analysis runs.
//!
//! A workflow is a directed acyclic graph of `StageSpec`s connected by
//! `Edge`s. Each stage invokes an external collaborator (LLM call,
//! retrieval call, or pure computation), coerces whatever text comes back
//! into a validated JSON object, and writes exactly one key into a shared
//! context.
//!
//! The `WorkflowExecutor` walks the graph in dependency order, running
//! independent stages concurrently, and applies the failure policy:
//! unparsable output degrades (with schema fallbacks substituted), hard
//! stage failures skip dependents, and the run always returns a result.

pub mod executor;
pub mod extract;
pub mod graph;
pub mod result;
pub mod stage;
pub mod validate;

pub use executor::WorkflowExecutor;
pub use extract::extract;
pub use graph::{Edge, WorkflowGraph};
pub use result::{ExecutionResult, StageReport};
pub use stage::{StageInput, StageOutcome, StageOutput, StageSpec};
pub use validate::{is_non_answer, plausible, Fallback, FieldSchema};
