use futures::future::BoxFuture;

use ideaflow_core::traits::SnippetRetriever;

/// Default number of snippets a search returns.
const DEFAULT_TOP_K: usize = 5;

/// A retriever for credential-less operation: every search comes back
/// empty, which downstream prompts must treat as valid input.
pub struct NullRetriever;

impl SnippetRetriever for NullRetriever {
    fn search(&self, _query: &str) -> BoxFuture<'_, Vec<String>> {
        Box::pin(async { Vec::new() })
    }
}

/// An in-memory retriever over a fixed snippet corpus.
///
/// Matching is keyword overlap, not similarity search; good enough for
/// tests and small bundled datasets.
pub struct StaticRetriever {
    snippets: Vec<String>,
    top_k: usize,
}

impl StaticRetriever {
    pub fn new(snippets: Vec<String>) -> Self {
        Self {
            snippets,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

impl SnippetRetriever for StaticRetriever {
    fn search(&self, query: &str) -> BoxFuture<'_, Vec<String>> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .filter(|t| t.len() > 2)
            .collect();

        let mut scored: Vec<(usize, &String)> = self
            .snippets
            .iter()
            .map(|s| {
                let lower = s.to_lowercase();
                let hits = terms.iter().filter(|t| lower.contains(t.as_str())).count();
                (hits, s)
            })
            .filter(|(hits, _)| *hits > 0)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        let results: Vec<String> = scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, s)| s.clone())
            .collect();
        Box::pin(async move { results })
    }
}
