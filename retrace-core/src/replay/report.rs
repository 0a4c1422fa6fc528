//! Replay run reports

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::RunMode;
use crate::error::RetraceError;

/// What happened to one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Executed,
    /// Unknown kind, logged and passed over
    Skipped,
    Failed,
}

/// One replayed record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// 1-based step number, matching the screenshot name
    pub step: usize,
    pub kind: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
}

impl StepReport {
    pub fn executed(step: usize, kind: impl Into<String>) -> Self {
        Self {
            step,
            kind: kind.into(),
            status: StepStatus::Executed,
            error_code: None,
            error: None,
            screenshot: None,
        }
    }

    pub fn from_error(step: usize, kind: impl Into<String>, err: &RetraceError) -> Self {
        let status = match err {
            RetraceError::UnknownActionKind { .. } => StepStatus::Skipped,
            _ => StepStatus::Failed,
        };
        Self {
            step,
            kind: kind.into(),
            status,
            error_code: Some(err.error_code().to_string()),
            error: Some(err.to_string()),
            screenshot: None,
        }
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayOutcome {
    /// Every record was processed
    Done,
    /// The run stopped early
    Failed,
}

/// Result of one replay run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub run_id: String,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepReport>,
    pub outcome: ReplayOutcome,
    /// Records in the input, including any not reached
    pub total_records: usize,
}

impl ReplayReport {
    /// Reached the end with no failed step
    pub fn success(&self) -> bool {
        self.outcome == ReplayOutcome::Done && self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.status == StepStatus::Failed)
    }

    /// Kinds of the executed steps, in order
    pub fn executed_kinds(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Executed)
            .map(|s| s.kind.as_str())
            .collect()
    }

    pub fn screenshots(&self) -> Vec<&PathBuf> {
        self.steps.iter().filter_map(|s| s.screenshot.as_ref()).collect()
    }

    /// Digest of the step sequence (kind, status, error code)
    ///
    /// Two runs of the same artifact against equivalent pages have the same
    /// fingerprint regardless of timing or output location.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for step in &self.steps {
            hasher.update(step.step.to_le_bytes());
            hasher.update(step.kind.as_bytes());
            hasher.update([step.status as u8]);
            hasher.update(step.error_code.as_deref().unwrap_or("").as_bytes());
            hasher.update([0u8]);
        }
        hasher.update([self.outcome as u8]);
        hex::encode(hasher.finalize())
    }

    /// First step at which two runs diverge, or `None` when equivalent
    pub fn divergence(&self, other: &ReplayReport) -> Option<usize> {
        let common = self
            .steps
            .iter()
            .zip(&other.steps)
            .take_while(|(a, b)| {
                a.kind == b.kind && a.status == b.status && a.error_code == b.error_code
            })
            .count();

        let same_length = common == self.steps.len() && common == other.steps.len();
        if same_length && self.outcome == other.outcome {
            None
        } else {
            Some(common + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(steps: Vec<StepReport>, outcome: ReplayOutcome) -> ReplayReport {
        let now = Utc::now();
        ReplayReport {
            run_id: "r".to_string(),
            mode: RunMode::Current,
            started_at: now,
            finished_at: now,
            total_records: steps.len(),
            steps,
            outcome,
        }
    }

    #[test]
    fn test_success_and_failures() {
        let err = RetraceError::LocatorNotFound {
            locator: "#gone".to_string(),
        };
        let r = report(
            vec![StepReport::executed(1, "navigate"), StepReport::from_error(2, "click", &err)],
            ReplayOutcome::Done,
        );

        assert!(!r.success());
        assert_eq!(r.failures().count(), 1);
        assert_eq!(r.executed_kinds(), vec!["navigate"]);
    }

    #[test]
    fn test_unknown_kind_is_skipped() {
        let err = RetraceError::UnknownActionKind {
            kind: "hover".to_string(),
        };
        let step = StepReport::from_error(1, "hover", &err);
        assert_eq!(step.status, StepStatus::Skipped);

        let r = report(vec![step], ReplayOutcome::Done);
        assert!(r.success());
    }

    #[test]
    fn test_fingerprint_ignores_timing_and_paths() {
        let mut a = StepReport::executed(1, "click");
        a.screenshot = Some(PathBuf::from("/a/step-1.png"));
        let mut b = StepReport::executed(1, "click");
        b.screenshot = Some(PathBuf::from("/b/step-1.png"));

        let first = report(vec![a], ReplayOutcome::Done);
        let second = report(vec![b], ReplayOutcome::Done);
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.fingerprint().len(), 64);
        assert_eq!(first.divergence(&second), None);
    }

    #[test]
    fn test_divergence_point() {
        let first = report(
            vec![StepReport::executed(1, "navigate"), StepReport::executed(2, "click")],
            ReplayOutcome::Done,
        );
        let second = report(
            vec![StepReport::executed(1, "navigate"), StepReport::executed(2, "scroll")],
            ReplayOutcome::Done,
        );
        assert_eq!(first.divergence(&second), Some(2));
        assert_ne!(first.fingerprint(), second.fingerprint());
    }
}
