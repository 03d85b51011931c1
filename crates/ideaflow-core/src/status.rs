use serde::{Deserialize, Serialize};

/// Lifecycle of a stage within a single run.
///
/// `Pending → Ready → Running` then one of the terminal states. A stage
/// whose dependency failed or was skipped goes straight to `Skipped`
/// without ever being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Ready,
    Running,
    Succeeded,
    /// Completed without a hard invocation error, but the output could not
    /// be fully parsed or validated and fallback content was substituted.
    SucceededDegraded,
    Failed,
    Skipped,
}

impl StageStatus {
    /// Whether the stage reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::SucceededDegraded | Self::Failed | Self::Skipped
        )
    }

    /// Whether the stage completed with usable output.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Succeeded | Self::SucceededDegraded)
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::SucceededDegraded => "succeeded_degraded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

/// Overall outcome of a run: `Succeeded` only when every terminal stage
/// completed with usable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Partial,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Partial => write!(f, "partial"),
        }
    }
}
