use futures::future::BoxFuture;

use crate::error::InvokeError;

/// Text generation collaborator — the LLM call behind a stage.
///
/// The orchestrator treats everything this returns as untrusted text that
/// must go through extraction and validation before downstream stages see
/// it. Implementations own their transport, timeouts, and retry policy.
pub trait TextGenerator: Send + Sync + 'static {
    /// Generate a completion for the given prompt.
    fn generate(&self, prompt: &str) -> BoxFuture<'_, Result<String, InvokeError>>;
}

/// Retrieval collaborator — vector store or web search.
///
/// Returns an empty list when nothing matches or no credentials are
/// configured; never an error. Empty results are valid input to
/// downstream prompts.
pub trait SnippetRetriever: Send + Sync + 'static {
    fn search(&self, query: &str) -> BoxFuture<'_, Vec<String>>;
}
