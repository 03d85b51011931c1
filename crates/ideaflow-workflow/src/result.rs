use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use ideaflow_core::context::SharedContext;
use ideaflow_core::status::{RunStatus, StageStatus};

/// Outcome of a single stage within a run.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub name: String,
    /// The context key this stage writes (absent from the final context
    /// when the stage failed or was skipped).
    pub output_key: String,
    pub status: StageStatus,
    /// Error detail for failed stages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Result of executing a workflow.
///
/// Stage reports are listed in topological order regardless of actual
/// completion order, so assertions and diffs are deterministic. The
/// executor never fails outright: a run with failed stages comes back as
/// `Partial` with per-stage detail.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    pub stages: Vec<StageReport>,
    /// Everything produced by the run, including the seed.
    pub context: SharedContext,
    pub total_elapsed_ms: u64,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// JSON projection for front ends:
    /// `{ "success", "stages": {name: {status, data}}, "data" }`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut stages = serde_json::Map::new();
        for report in &self.stages {
            let mut entry = serde_json::Map::new();
            entry.insert("status".into(), json!(report.status));
            if let Some(data) = self.context.get(&report.output_key) {
                entry.insert("data".into(), data.clone());
            }
            if let Some(error) = &report.error {
                entry.insert("error".into(), json!(error));
            }
            stages.insert(report.name.clone(), entry.into());
        }

        json!({
            "success": self.succeeded(),
            "run_id": self.run_id,
            "stages": stages,
            "data": self.context.data(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(name: &str, key: &str, status: StageStatus, error: Option<&str>) -> StageReport {
        StageReport {
            name: name.into(),
            output_key: key.into(),
            status,
            error: error.map(String::from),
            elapsed_ms: 5,
        }
    }

    #[test]
    fn test_json_projection() {
        let mut context = SharedContext::seeded("startup_idea", json!("AI tutor"));
        assert!(context.insert("parsed_idea", json!({"domain": "edtech"})));

        let result = ExecutionResult {
            run_id: "run-1".into(),
            started_at: Utc::now(),
            status: RunStatus::Partial,
            stages: vec![
                report("parse", "parsed_idea", StageStatus::Succeeded, None),
                report(
                    "signals",
                    "market_signals",
                    StageStatus::Failed,
                    Some("stage 'signals' timed out after 100ms"),
                ),
            ],
            context,
            total_elapsed_ms: 12,
        };

        let value = result.to_json();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["stages"]["parse"]["status"], json!("succeeded"));
        assert_eq!(
            value["stages"]["parse"]["data"]["domain"],
            json!("edtech")
        );
        assert_eq!(value["stages"]["signals"]["status"], json!("failed"));
        // Failed stage produced nothing: no data key at all.
        assert!(value["stages"]["signals"].get("data").is_none());
        assert_eq!(value["data"]["startup_idea"], json!("AI tutor"));
    }

    #[test]
    fn test_stage_lookup() {
        let result = ExecutionResult {
            run_id: "run-2".into(),
            started_at: Utc::now(),
            status: RunStatus::Succeeded,
            stages: vec![report("parse", "parsed_idea", StageStatus::Succeeded, None)],
            context: SharedContext::new(),
            total_elapsed_ms: 1,
        };
        assert!(result.stage("parse").is_some());
        assert!(result.stage("ghost").is_none());
        assert!(result.succeeded());
    }
}
