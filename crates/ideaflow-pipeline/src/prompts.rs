//! Prompt builders for the analysis stages.
//!
//! Plain string assembly from context values. Every prompt asks for a
//! JSON object; the workflow layer copes when the model ignores that.

use serde_json::Value;

pub fn idea_parsing(idea: &str) -> String {
    format!(
        "You are an idea parsing agent. Extract the key components of the startup idea below.\n\
         Return a JSON object with keys: theme, domain, value_proposition, target_audience.\n\n\
         Startup idea: {idea}"
    )
}

pub fn market_signal(parsed: &Value, snippets: &[String]) -> String {
    format!(
        "Analyze market demand for this startup idea.\n\
         Parsed idea: {parsed}\n\
         Market snippets:\n{}\n\
         Return a JSON object with keys: trend_score (0-100), funding_activity, \
         search_volume, related_startups (array of names).",
        bulleted(snippets)
    )
}

pub fn comparison(parsed: &Value, snippets: &[String]) -> String {
    format!(
        "Analyze the competitive landscape for this startup idea.\n\
         Parsed idea: {parsed}\n\
         Known competitors:\n{}\n\
         Return a JSON object with keys: direct_competitors (array of \
         {{name, description}}), benchmark_score (1-100), competitive_intensity, \
         market_gaps (array).",
        bulleted(snippets)
    )
}

pub fn novelty(signals: &Value, benchmark: &Value) -> String {
    format!(
        "Score innovation and novelty for the startup idea given this context.\n\
         Market signals: {signals}\n\
         Benchmark: {benchmark}\n\
         Return a JSON object with keys: novelty_score (0-100), \
         differentiation_factors (array), innovation_level."
    )
}

pub fn report(parsed: &Value, signals: &Value, benchmark: &Value, novelty: &Value) -> String {
    format!(
        "Generate a startup viability report from the analysis below.\n\
         Parsed idea: {parsed}\n\
         Market signals: {signals}\n\
         Benchmark: {benchmark}\n\
         Novelty: {novelty}\n\
         Return a JSON object with keys: marketability_index (0-100), opportunity, \
         timing, risk, recommendation."
    )
}

fn bulleted(snippets: &[String]) -> String {
    if snippets.is_empty() {
        return "- (no retrieval results)".to_string();
    }
    snippets
        .iter()
        .map(|s| format!("- {s}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_idea_parsing_includes_idea() {
        let prompt = idea_parsing("AI tutor for rural India");
        assert!(prompt.contains("AI tutor for rural India"));
        assert!(prompt.contains("target_audience"));
    }

    #[test]
    fn test_snippets_bulleted() {
        let prompt = market_signal(&json!({"domain": "edtech"}), &["one".into(), "two".into()]);
        assert!(prompt.contains("- one\n- two"));
    }

    #[test]
    fn test_empty_snippets_placeholder() {
        let prompt = comparison(&json!({}), &[]);
        assert!(prompt.contains("no retrieval results"));
    }
}
