use std::future::Future;

use futures::future::BoxFuture;

use ideaflow_core::error::InvokeError;
use ideaflow_core::traits::TextGenerator;

/// Adapt a closure into a `TextGenerator`.
///
/// Useful for wiring real clients without a newtype, and for pure
/// computations that want to live behind the same seam as an LLM call.
pub struct FnGenerator<F> {
    f: F,
}

impl<F, Fut> FnGenerator<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, InvokeError>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> TextGenerator for FnGenerator<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, InvokeError>> + Send + 'static,
{
    fn generate(&self, prompt: &str) -> BoxFuture<'_, Result<String, InvokeError>> {
        Box::pin((self.f)(prompt.to_string()))
    }
}

/// A generator that answers from a fixed script, keyed by prompt
/// substring. First matching rule wins; unmatched prompts get an error.
///
/// This is the offline/test stand-in for a model call.
pub struct ScriptedGenerator {
    rules: Vec<(String, Result<String, InvokeError>)>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Respond with `response` to any prompt containing `marker`.
    pub fn on(mut self, marker: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((marker.into(), Ok(response.into())));
        self
    }

    /// Fail any prompt containing `marker`.
    pub fn fail_on(mut self, marker: impl Into<String>, error: InvokeError) -> Self {
        self.rules.push((marker.into(), Err(error)));
        self
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, prompt: &str) -> BoxFuture<'_, Result<String, InvokeError>> {
        let result = self
            .rules
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| {
                Err(InvokeError::Request(format!(
                    "no scripted response for prompt: {}",
                    prompt.chars().take(80).collect::<String>()
                )))
            });
        Box::pin(async move { result })
    }
}
