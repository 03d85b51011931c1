//! Wiring of the five analysis stages into a workflow graph.

use std::sync::Arc;

use serde_json::Value;

use ideaflow_core::error::GraphError;
use ideaflow_core::traits::{SnippetRetriever, TextGenerator};
use ideaflow_workflow::{Edge, StageInput, StageOutput, StageSpec, WorkflowGraph};

use crate::evaluator::SEED_KEY;
use crate::{prompts, schemas};

/// Build the marketability evaluation graph.
///
/// ```text
/// idea_parser ──┬── market_signal ──┬── novelty ── report
///               └── comparison ─────┘
/// ```
///
/// `market_signal` and `comparison` run concurrently; `novelty` waits for
/// both; `report` is the terminal stage deciding the run status.
pub fn marketability_graph(
    generator: Arc<dyn TextGenerator>,
    retriever: Arc<dyn SnippetRetriever>,
) -> Result<WorkflowGraph, GraphError> {
    let parse = {
        let generator = generator.clone();
        StageSpec::new("idea_parser", "parsed_idea", move |input: StageInput| {
            let generator = generator.clone();
            async move {
                let idea = input
                    .get(SEED_KEY)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let text = generator.generate(&prompts::idea_parsing(&idea)).await?;
                Ok(StageOutput::Text(text))
            }
        })
        .with_reads(vec![SEED_KEY.into()])
        .with_schema(schemas::parsed_idea())
    };

    let market_signal = {
        let generator = generator.clone();
        let retriever = retriever.clone();
        StageSpec::new("market_signal", "market_signals", move |input: StageInput| {
            let generator = generator.clone();
            let retriever = retriever.clone();
            async move {
                let parsed = input.get("parsed_idea").cloned().unwrap_or(Value::Null);
                let snippets = retriever.search(&trend_query(&parsed)).await;
                let text = generator
                    .generate(&prompts::market_signal(&parsed, &snippets))
                    .await?;
                Ok(StageOutput::Text(text))
            }
        })
        .with_reads(vec!["parsed_idea".into()])
        .with_schema(schemas::market_signals())
    };

    let comparison = {
        let generator = generator.clone();
        let retriever = retriever.clone();
        StageSpec::new("comparison", "benchmark", move |input: StageInput| {
            let generator = generator.clone();
            let retriever = retriever.clone();
            async move {
                let parsed = input.get("parsed_idea").cloned().unwrap_or(Value::Null);
                let snippets = retriever.search(&competitor_query(&parsed)).await;
                let text = generator
                    .generate(&prompts::comparison(&parsed, &snippets))
                    .await?;
                Ok(StageOutput::Text(text))
            }
        })
        .with_reads(vec!["parsed_idea".into()])
        .with_schema(schemas::benchmark())
    };

    let novelty = {
        let generator = generator.clone();
        StageSpec::new("novelty", "novelty", move |input: StageInput| {
            let generator = generator.clone();
            async move {
                let signals = input.get("market_signals").cloned().unwrap_or(Value::Null);
                let benchmark = input.get("benchmark").cloned().unwrap_or(Value::Null);
                let text = generator
                    .generate(&prompts::novelty(&signals, &benchmark))
                    .await?;
                Ok(StageOutput::Text(text))
            }
        })
        .with_reads(vec!["market_signals".into(), "benchmark".into()])
        .with_schema(schemas::novelty())
    };

    let report = {
        let generator = generator.clone();
        StageSpec::new("report", "report", move |input: StageInput| {
            let generator = generator.clone();
            async move {
                let get = |key: &str| input.get(key).cloned().unwrap_or(Value::Null);
                let text = generator
                    .generate(&prompts::report(
                        &get("parsed_idea"),
                        &get("market_signals"),
                        &get("benchmark"),
                        &get("novelty"),
                    ))
                    .await?;
                Ok(StageOutput::Text(text))
            }
        })
        .with_reads(vec![
            "parsed_idea".into(),
            "market_signals".into(),
            "benchmark".into(),
            "novelty".into(),
        ])
        .with_schema(schemas::report())
    };

    WorkflowGraph::build(
        vec![parse, market_signal, comparison, novelty, report],
        vec![
            Edge::new("idea_parser", "market_signal"),
            Edge::new("idea_parser", "comparison"),
            Edge::new("market_signal", "novelty"),
            Edge::new("comparison", "novelty"),
            Edge::new("novelty", "report"),
        ],
        &[SEED_KEY],
    )
}

fn trend_query(parsed: &Value) -> String {
    format!(
        "{} {} market trends funding",
        field(parsed, "theme"),
        field(parsed, "domain")
    )
}

fn competitor_query(parsed: &Value) -> String {
    format!(
        "{} {} competitors startups",
        field(parsed, "theme"),
        field(parsed, "domain")
    )
}

fn field<'a>(parsed: &'a Value, key: &str) -> &'a str {
    parsed.get(key).and_then(Value::as_str).unwrap_or("startup")
}
