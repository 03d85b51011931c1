use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ideaflow_core::config::ExecutorConfig;
use ideaflow_core::context::SharedContext;
use ideaflow_core::error::StageError;
use ideaflow_core::status::{RunStatus, StageStatus};

use crate::graph::WorkflowGraph;
use crate::result::{ExecutionResult, StageReport};
use crate::stage::StageOutcome;

/// Executes a workflow graph.
///
/// Walks the graph in dependency order, dispatching every ready stage
/// onto its own task so independent stages overlap. Stage-local failures
/// never abort the run: a failed stage skips its dependents and the run
/// comes back `Partial` with per-stage detail. The executor itself never
/// retries; injected collaborators own that policy.
pub struct WorkflowExecutor {
    graph: Arc<WorkflowGraph>,
    config: ExecutorConfig,
}

type StageTaskResult = (usize, u64, Result<StageOutcome, StageError>);

impl WorkflowExecutor {
    pub fn new(graph: WorkflowGraph) -> Self {
        Self {
            graph: Arc::new(graph),
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    /// Run the workflow to completion.
    pub async fn execute(&self, seed: SharedContext) -> ExecutionResult {
        self.execute_with_cancel(seed, CancellationToken::new())
            .await
    }

    /// Run the workflow, stopping early when `cancel` fires.
    ///
    /// On cancellation, in-flight stages are abandoned best-effort and
    /// everything not yet terminal reports `Skipped`; outputs of stages
    /// that already completed stay in the returned partial context.
    pub async fn execute_with_cancel(
        &self,
        seed: SharedContext,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let start = Instant::now();
        let n = self.graph.len();

        let mut status = vec![StageStatus::Pending; n];
        let mut errors: Vec<Option<String>> = vec![None; n];
        let mut elapsed = vec![0u64; n];
        let mut context = seed;
        let mut tasks: JoinSet<StageTaskResult> = JoinSet::new();

        info!(run_id = %run_id, stages = n, "starting workflow run");

        loop {
            self.settle_and_dispatch(&mut status, &mut errors, &context, &mut tasks);

            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(run_id = %run_id, "run cancelled, abandoning in-flight stages");
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    break;
                }
                joined = tasks.join_next() => {
                    // Stage futures catch their own panics, so a join
                    // error can only mean an aborted task.
                    let Some(Ok((idx, ms, result))) = joined else {
                        continue;
                    };
                    elapsed[idx] = ms;
                    self.record(idx, result, &mut status, &mut errors, &mut context);
                }
            }
        }

        // Whatever never reached a terminal state (cancellation, or an
        // unexpected scheduling dead end) reports as skipped.
        for s in status.iter_mut() {
            if !s.is_terminal() {
                *s = StageStatus::Skipped;
            }
        }

        let all_terminals_ok = (0..n)
            .filter(|&i| self.graph.is_terminal(i))
            .all(|i| status[i].is_ok());
        let run_status = if all_terminals_ok {
            RunStatus::Succeeded
        } else {
            RunStatus::Partial
        };

        let stages = self
            .graph
            .topo()
            .iter()
            .map(|&i| StageReport {
                name: self.graph.stages()[i].name().to_string(),
                output_key: self.graph.stages()[i].writes().to_string(),
                status: status[i],
                error: errors[i].take(),
                elapsed_ms: elapsed[i],
            })
            .collect();

        let total_elapsed_ms = start.elapsed().as_millis() as u64;
        info!(run_id = %run_id, status = %run_status, total_elapsed_ms, "workflow run finished");

        ExecutionResult {
            run_id,
            started_at,
            status: run_status,
            stages,
            context,
            total_elapsed_ms,
        }
    }

    /// Propagate skips and dispatch every stage that became ready.
    ///
    /// Runs to a fixpoint: skipping one stage may decide its dependents
    /// in the same pass.
    fn settle_and_dispatch(
        &self,
        status: &mut [StageStatus],
        errors: &mut [Option<String>],
        context: &SharedContext,
        tasks: &mut JoinSet<StageTaskResult>,
    ) {
        let mut changed = true;
        while changed {
            changed = false;
            for i in 0..self.graph.len() {
                if status[i] != StageStatus::Pending {
                    continue;
                }
                let spec = &self.graph.stages()[i];
                let preds = &self.graph.preds()[i];

                if preds
                    .iter()
                    .any(|&p| matches!(status[p], StageStatus::Failed | StageStatus::Skipped))
                {
                    debug!(stage = %spec.name(), "upstream failure, skipping");
                    status[i] = StageStatus::Skipped;
                    changed = true;
                    continue;
                }

                if !preds.iter().all(|&p| status[p].is_ok()) {
                    continue;
                }

                status[i] = StageStatus::Ready;
                match spec.project(context) {
                    Ok(input) => {
                        debug!(stage = %spec.name(), "dispatching stage");
                        status[i] = StageStatus::Running;
                        let graph = self.graph.clone();
                        let timeout = spec.timeout().or_else(|| {
                            self.config
                                .default_stage_timeout_ms
                                .map(Duration::from_millis)
                        });
                        tasks.spawn(async move {
                            let spec = &graph.stages()[i];
                            let stage_start = Instant::now();
                            let run = async {
                                match timeout {
                                    Some(deadline) => {
                                        match tokio::time::timeout(
                                            deadline,
                                            spec.run_with_input(input),
                                        )
                                        .await
                                        {
                                            Ok(result) => result,
                                            Err(_) => Err(StageError::Timeout {
                                                stage: spec.name().to_string(),
                                                timeout_ms: deadline.as_millis() as u64,
                                            }),
                                        }
                                    }
                                    None => spec.run_with_input(input).await,
                                }
                            };
                            let result = AssertUnwindSafe(run)
                                .catch_unwind()
                                .await
                                .unwrap_or_else(|_| {
                                    Err(StageError::InvocationFailed {
                                        stage: spec.name().to_string(),
                                        detail: "stage task panicked".into(),
                                    })
                                });
                            (i, stage_start.elapsed().as_millis() as u64, result)
                        });
                    }
                    Err(e) => {
                        // Unvalidated seed: the graph promised this key
                        // but the caller never provided it.
                        warn!(stage = %spec.name(), error = %e, "stage input projection failed");
                        errors[i] = Some(e.to_string());
                        status[i] = StageStatus::Failed;
                    }
                }
                changed = true;
            }
        }
    }

    fn record(
        &self,
        idx: usize,
        result: Result<StageOutcome, StageError>,
        status: &mut [StageStatus],
        errors: &mut [Option<String>],
        context: &mut SharedContext,
    ) {
        let spec = &self.graph.stages()[idx];
        match result {
            Ok(outcome) => {
                let degraded = outcome.degraded;
                if context.insert(outcome.key.clone(), outcome.value) {
                    if degraded {
                        warn!(stage = %spec.name(), "stage completed with fallback content");
                        status[idx] = StageStatus::SucceededDegraded;
                    } else {
                        info!(stage = %spec.name(), "stage completed");
                        status[idx] = StageStatus::Succeeded;
                    }
                } else {
                    let err = StageError::DuplicateOutput {
                        stage: spec.name().to_string(),
                        key: outcome.key,
                    };
                    warn!(stage = %spec.name(), error = %err, "stage output rejected");
                    errors[idx] = Some(err.to_string());
                    status[idx] = StageStatus::Failed;
                }
            }
            Err(e) => {
                warn!(stage = %spec.name(), error = %e, "stage failed");
                errors[idx] = Some(e.to_string());
                status[idx] = StageStatus::Failed;
            }
        }
    }
}
