//! Startup-idea marketability evaluation pipeline.
//!
//! One concrete instantiation of the generic workflow graph: five
//! LLM-backed analysis stages (idea parsing, market signals, competitive
//! benchmarking, novelty scoring, final report) wired as a DAG with
//! fan-out after parsing and fan-in before scoring. Front ends call
//! `Evaluator::evaluate` and get a structured result whether or not the
//! model cooperated.

pub mod evaluator;
pub mod prompts;
pub mod schemas;
pub mod stages;

pub use evaluator::{Evaluator, SEED_KEY};
pub use stages::marketability_graph;
