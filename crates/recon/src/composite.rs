//! Multi-step runs: several single-domain configs judged as one job.

use serde::Serialize;

use crate::model::{ReconReport, ReconResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Every row accepted.
    Pass,
    /// Medium-severity flags or rows kept out of evaluation.
    Warn,
    /// High-severity flags.
    Fail,
    /// The step could not run (bad config, unreadable file, fatal reference table).
    Error,
}

impl StepStatus {
    pub fn from_report(report: &ReconReport) -> Self {
        let s = &report.summary;
        if s.flagged_high > 0 {
            Self::Fail
        } else if s.is_clean() {
            Self::Pass
        } else {
            Self::Warn
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Warn => write!(f, "warn"),
            Self::Fail => write!(f, "fail"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub name: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ReconResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeVerdict {
    Pass,
    Warn,
    Fail,
}

impl CompositeVerdict {
    /// Worst status across steps. An errored step fails the job.
    pub fn from_steps(steps: &[StepResult]) -> Self {
        if steps
            .iter()
            .any(|s| matches!(s.status, StepStatus::Fail | StepStatus::Error))
        {
            Self::Fail
        } else if steps.iter().any(|s| s.status == StepStatus::Warn) {
            Self::Warn
        } else {
            Self::Pass
        }
    }

    /// Process exit code for this verdict: 0 pass, 1 fail, 60 warn.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Pass => 0,
            Self::Fail => 1,
            Self::Warn => 60,
        }
    }
}

impl std::fmt::Display for CompositeVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Warn => write!(f, "warn"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompositeResult {
    pub name: String,
    pub engine_version: String,
    pub run_at: String,
    pub verdict: CompositeVerdict,
    pub exit_code: u8,
    pub steps: Vec<StepResult>,
}
