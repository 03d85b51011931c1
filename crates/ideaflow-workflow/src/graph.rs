use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use ideaflow_core::error::GraphError;

use crate::stage::StageSpec;

/// A dependency edge: `to` reads a key produced by `from`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// A validated directed acyclic graph of stages.
///
/// All structural validation happens once at build time; a constructed
/// graph is immutable and safe to share across concurrent runs. The
/// topological order is deterministic: ties between simultaneously-ready
/// stages break by declaration order, so runs are reproducible.
pub struct WorkflowGraph {
    stages: Vec<StageSpec>,
    index: HashMap<String, usize>,
    preds: Vec<Vec<usize>>,
    succs: Vec<Vec<usize>>,
    topo: Vec<usize>,
    seed_keys: Vec<String>,
}

impl WorkflowGraph {
    /// Build and validate a graph.
    ///
    /// Fails fast on duplicate stage names, edges naming unknown stages,
    /// output-key collisions, cycles, and `reads` keys that neither the
    /// seed nor any ancestor produces. Anything that passes here cannot
    /// produce a structural error at run time.
    pub fn build(
        stages: Vec<StageSpec>,
        edges: Vec<Edge>,
        seed_keys: &[&str],
    ) -> Result<Self, GraphError> {
        if stages.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut index = HashMap::with_capacity(stages.len());
        for (i, stage) in stages.iter().enumerate() {
            if index.insert(stage.name().to_string(), i).is_some() {
                return Err(GraphError::DuplicateStage(stage.name().to_string()));
            }
        }

        // Output keys must be unique across stages and disjoint from the
        // seed; this is what makes the write-once context invariant hold
        // for every schedule.
        let mut produced: HashSet<&str> = seed_keys.iter().copied().collect();
        for stage in &stages {
            if !produced.insert(stage.writes()) {
                return Err(GraphError::ConflictingOutput {
                    key: stage.writes().to_string(),
                });
            }
        }

        let mut preds = vec![Vec::new(); stages.len()];
        let mut succs = vec![Vec::new(); stages.len()];
        for edge in &edges {
            let from = *index
                .get(&edge.from)
                .ok_or_else(|| GraphError::UnknownStage(edge.from.clone()))?;
            let to = *index
                .get(&edge.to)
                .ok_or_else(|| GraphError::UnknownStage(edge.to.clone()))?;
            preds[to].push(from);
            succs[from].push(to);
        }

        let topo = topo_sort(&stages, &preds)?;
        check_reads_satisfied(&stages, &preds, &topo, seed_keys)?;

        Ok(Self {
            stages,
            index,
            preds,
            succs,
            topo,
            seed_keys: seed_keys.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage(&self, name: &str) -> Option<&StageSpec> {
        self.index.get(name).map(|&i| &self.stages[i])
    }

    /// Stage names in deterministic topological order.
    pub fn topo_order(&self) -> Vec<&str> {
        self.topo.iter().map(|&i| self.stages[i].name()).collect()
    }

    /// Stages with no incoming edges.
    pub fn entries(&self) -> Vec<&str> {
        self.names_where(|i| self.preds[i].is_empty())
    }

    /// Stages with no outgoing edges; their completion decides the run
    /// status.
    pub fn terminals(&self) -> Vec<&str> {
        self.names_where(|i| self.succs[i].is_empty())
    }

    pub fn seed_keys(&self) -> &[String] {
        &self.seed_keys
    }

    fn names_where(&self, pred: impl Fn(usize) -> bool) -> Vec<&str> {
        self.topo
            .iter()
            .copied()
            .filter(|&i| pred(i))
            .map(|i| self.stages[i].name())
            .collect()
    }

    pub(crate) fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    pub(crate) fn topo(&self) -> &[usize] {
        &self.topo
    }

    pub(crate) fn preds(&self) -> &[Vec<usize>] {
        &self.preds
    }

    pub(crate) fn is_terminal(&self, i: usize) -> bool {
        self.succs[i].is_empty()
    }
}

impl std::fmt::Debug for WorkflowGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("stages", &self.topo_order())
            .field("seed_keys", &self.seed_keys)
            .finish_non_exhaustive()
    }
}

/// Kahn's algorithm with declaration-order tie-breaking.
fn topo_sort(stages: &[StageSpec], preds: &[Vec<usize>]) -> Result<Vec<usize>, GraphError> {
    let n = stages.len();
    let mut remaining: Vec<usize> = preds.iter().map(|p| p.len()).collect();
    let mut emitted = vec![false; n];
    let mut order = Vec::with_capacity(n);

    while order.len() < n {
        // Lowest declaration index among ready stages keeps the order
        // reproducible regardless of edge declaration order.
        let next = (0..n).find(|&i| !emitted[i] && remaining[i] == 0);
        let Some(next) = next else {
            let stuck: Vec<&str> = (0..n)
                .filter(|&i| !emitted[i])
                .map(|i| stages[i].name())
                .collect();
            return Err(GraphError::CycleDetected(stuck.join(" -> ")));
        };
        emitted[next] = true;
        order.push(next);
        for (i, p) in preds.iter().enumerate() {
            if !emitted[i] {
                remaining[i] -= p.iter().filter(|&&x| x == next).count();
            }
        }
    }
    Ok(order)
}

/// Every `reads` key must be seeded or written by a transitive ancestor.
fn check_reads_satisfied(
    stages: &[StageSpec],
    preds: &[Vec<usize>],
    topo: &[usize],
    seed_keys: &[&str],
) -> Result<(), GraphError> {
    let seed: HashSet<&str> = seed_keys.iter().copied().collect();
    // Keys producible at each stage, built up in topological order.
    let mut available: Vec<HashSet<String>> = vec![HashSet::new(); stages.len()];

    for &i in topo {
        let mut keys = HashSet::new();
        for &p in &preds[i] {
            keys.extend(available[p].iter().cloned());
            keys.insert(stages[p].writes().to_string());
        }
        for key in stages[i].reads() {
            if !seed.contains(key.as_str()) && !keys.contains(key) {
                return Err(GraphError::UnsatisfiedDependency {
                    stage: stages[i].name().to_string(),
                    key: key.clone(),
                });
            }
        }
        available[i] = keys;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{StageInput, StageOutput};
    use serde_json::json;

    fn stage(name: &str, reads: &[&str], writes: &str) -> StageSpec {
        StageSpec::new(name, writes, |_: StageInput| async {
            Ok(StageOutput::Structured(json!({})))
        })
        .with_reads(reads.iter().map(|s| s.to_string()).collect())
    }

    fn linear_stages() -> Vec<StageSpec> {
        vec![
            stage("parse", &["startup_idea"], "parsed_idea"),
            stage("signals", &["parsed_idea"], "market_signals"),
            stage("score", &["market_signals"], "score"),
        ]
    }

    fn linear_edges() -> Vec<Edge> {
        vec![Edge::new("parse", "signals"), Edge::new("signals", "score")]
    }

    #[test]
    fn test_build_linear() {
        let graph =
            WorkflowGraph::build(linear_stages(), linear_edges(), &["startup_idea"]).unwrap();
        assert_eq!(graph.topo_order(), vec!["parse", "signals", "score"]);
        assert_eq!(graph.entries(), vec!["parse"]);
        assert_eq!(graph.terminals(), vec!["score"]);
    }

    #[test]
    fn test_deterministic_order_on_fan_out() {
        // b and c are both ready after a; declaration order breaks the tie.
        let stages = vec![
            stage("a", &[], "ka"),
            stage("b", &["ka"], "kb"),
            stage("c", &["ka"], "kc"),
            stage("d", &["kb", "kc"], "kd"),
        ];
        let edges = vec![
            Edge::new("a", "c"),
            Edge::new("a", "b"),
            Edge::new("b", "d"),
            Edge::new("c", "d"),
        ];
        let graph = WorkflowGraph::build(stages, edges, &[]).unwrap();
        assert_eq!(graph.topo_order(), vec!["a", "b", "c", "d"]);
        assert_eq!(graph.terminals(), vec!["d"]);
    }

    #[test]
    fn test_cycle_detected() {
        let stages = vec![stage("a", &[], "ka"), stage("b", &["ka"], "kb")];
        let edges = vec![Edge::new("a", "b"), Edge::new("b", "a")];
        let err = WorkflowGraph::build(stages, edges, &[]).unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected(_)));
    }

    #[test]
    fn test_self_edge_is_a_cycle() {
        let stages = vec![stage("a", &[], "ka")];
        let edges = vec![Edge::new("a", "a")];
        let err = WorkflowGraph::build(stages, edges, &[]).unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected(_)));
    }

    #[test]
    fn test_duplicate_stage_name() {
        let stages = vec![stage("a", &[], "k1"), stage("a", &[], "k2")];
        let err = WorkflowGraph::build(stages, vec![], &[]).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateStage(name) if name == "a"));
    }

    #[test]
    fn test_unknown_stage_in_edge() {
        let stages = vec![stage("a", &[], "ka")];
        let edges = vec![Edge::new("a", "ghost")];
        let err = WorkflowGraph::build(stages, edges, &[]).unwrap_err();
        assert!(matches!(err, GraphError::UnknownStage(name) if name == "ghost"));
    }

    #[test]
    fn test_conflicting_output_key() {
        let stages = vec![stage("a", &[], "same"), stage("b", &[], "same")];
        let err = WorkflowGraph::build(stages, vec![], &[]).unwrap_err();
        assert!(matches!(err, GraphError::ConflictingOutput { key } if key == "same"));
    }

    #[test]
    fn test_output_key_colliding_with_seed() {
        let stages = vec![stage("a", &[], "startup_idea")];
        let err = WorkflowGraph::build(stages, vec![], &["startup_idea"]).unwrap_err();
        assert!(matches!(err, GraphError::ConflictingOutput { .. }));
    }

    #[test]
    fn test_unsatisfied_dependency() {
        // "signals" reads a key nobody produces.
        let stages = vec![
            stage("parse", &["startup_idea"], "parsed_idea"),
            stage("signals", &["benchmarks"], "market_signals"),
        ];
        let edges = vec![Edge::new("parse", "signals")];
        let err = WorkflowGraph::build(stages, edges, &["startup_idea"]).unwrap_err();
        match err {
            GraphError::UnsatisfiedDependency { stage, key } => {
                assert_eq!(stage, "signals");
                assert_eq!(key, "benchmarks");
            }
            other => panic!("expected UnsatisfiedDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_transitive_ancestor_satisfies_read() {
        // "score" reads parsed_idea produced two hops upstream.
        let stages = vec![
            stage("parse", &["startup_idea"], "parsed_idea"),
            stage("signals", &["parsed_idea"], "market_signals"),
            stage("score", &["parsed_idea", "market_signals"], "score"),
        ];
        let graph = WorkflowGraph::build(stages, linear_edges(), &["startup_idea"]);
        assert!(graph.is_ok());
    }

    #[test]
    fn test_sibling_output_not_readable() {
        // b and c are siblings; c must not read b's output without an edge.
        let stages = vec![
            stage("a", &[], "ka"),
            stage("b", &["ka"], "kb"),
            stage("c", &["kb"], "kc"),
        ];
        let edges = vec![Edge::new("a", "b"), Edge::new("a", "c")];
        let err = WorkflowGraph::build(stages, edges, &[]).unwrap_err();
        assert!(matches!(err, GraphError::UnsatisfiedDependency { .. }));
    }

    #[test]
    fn test_empty_graph_rejected() {
        let err = WorkflowGraph::build(vec![], vec![], &[]).unwrap_err();
        assert!(matches!(err, GraphError::Empty));
    }
}
