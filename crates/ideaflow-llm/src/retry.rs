use std::time::Duration;

use futures::future::BoxFuture;
use tracing::warn;

use ideaflow_core::config::RetryConfig;
use ideaflow_core::error::InvokeError;
use ideaflow_core::traits::TextGenerator;

/// A generator that retries transient failures with backoff.
///
/// The executor never retries a failed stage; callers that want retry
/// inject it here, at the collaborator boundary.
pub struct RetryingGenerator {
    inner: Box<dyn TextGenerator>,
    config: RetryConfig,
}

impl RetryingGenerator {
    pub fn new(inner: Box<dyn TextGenerator>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

fn is_retryable(e: &InvokeError) -> bool {
    match e {
        InvokeError::Timeout => true,
        InvokeError::Request(msg) => {
            msg.contains("429")
                || msg.contains("500")
                || msg.contains("502")
                || msg.contains("503")
                || msg.contains("timeout")
                || msg.contains("connection")
                || msg.contains("rate limit")
        }
    }
}

fn calculate_backoff(attempt: u32, config: &RetryConfig) -> Duration {
    let ms = (config.initial_backoff_ms * 2u64.pow(attempt)).min(config.max_backoff_ms);
    // Add jitter: 0.8x to 1.2x
    let jitter = 0.8 + rand::random::<f64>() * 0.4;
    Duration::from_millis((ms as f64 * jitter) as u64)
}

impl TextGenerator for RetryingGenerator {
    fn generate(&self, prompt: &str) -> BoxFuture<'_, Result<String, InvokeError>> {
        let prompt = prompt.to_string();
        Box::pin(async move {
            let max_retries = self.config.max_retries;
            let mut last_err = None;

            for attempt in 0..=max_retries {
                match self.inner.generate(&prompt).await {
                    Ok(text) => return Ok(text),
                    Err(e) => {
                        if is_retryable(&e) && attempt < max_retries {
                            let backoff = calculate_backoff(attempt, &self.config);
                            warn!(
                                attempt = attempt + 1,
                                max_retries,
                                backoff_ms = backoff.as_millis() as u64,
                                error = %e,
                                "Retrying generation request"
                            );
                            tokio::time::sleep(backoff).await;
                            last_err = Some(e);
                            continue;
                        }
                        return Err(e);
                    }
                }
            }

            Err(last_err.unwrap_or_else(|| InvokeError::Request("retries exhausted".into())))
        })
    }
}
