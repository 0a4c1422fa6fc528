//! Baseline / current screenshot comparison
//!
//! Pixel diffing is an external collaborator behind [`ImageDiffer`]: two
//! images in, a diff image and a mismatch percentage out. This module pairs
//! the screenshots of a baseline run with those of a current run by step
//! number and feeds each complete pair to the differ.
//!
//! ```text
//! <root>/baseline/step-1.png ─┐
//!                             ├─► ImageDiffer ─► DiffOutcome
//! <root>/current/step-1.png  ─┘
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{RetraceError, Result};
use crate::replay::screenshot::parse_step;
use crate::replay::RunMode;

/// Result of diffing two images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffOutcome {
    /// `data:image/png;base64,...`; empty when the differ renders no image
    pub diff_image_data_url: String,
    pub mismatch_percentage: f64,
}

/// Pixel comparison collaborator
pub trait ImageDiffer: Send + Sync {
    fn diff(&self, baseline: &[u8], current: &[u8]) -> Result<DiffOutcome>;

    fn name(&self) -> &'static str;
}

/// Byte-identity comparison: 0% when the files are identical, 100% otherwise
///
/// Renders no diff image. Useful as a fast gate before a real pixel differ.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactDiffer;

impl ImageDiffer for ExactDiffer {
    fn diff(&self, baseline: &[u8], current: &[u8]) -> Result<DiffOutcome> {
        let same = Sha256::digest(baseline) == Sha256::digest(current);
        Ok(DiffOutcome {
            diff_image_data_url: String::new(),
            mismatch_percentage: if same { 0.0 } else { 100.0 },
        })
    }

    fn name(&self) -> &'static str {
        "exact"
    }
}

/// The screenshots of one step across both runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPair {
    pub step: usize,
    pub baseline: Option<PathBuf>,
    pub current: Option<PathBuf>,
}

impl StepPair {
    pub fn is_complete(&self) -> bool {
        self.baseline.is_some() && self.current.is_some()
    }

    /// The side that has no screenshot for this step
    pub fn missing(&self) -> Option<RunMode> {
        match (&self.baseline, &self.current) {
            (None, _) => Some(RunMode::Baseline),
            (_, None) => Some(RunMode::Current),
            _ => None,
        }
    }
}

/// Collect `step-<n>.png` from both partitions under `root`, ordered by step
pub fn pair_runs(root: impl AsRef<Path>) -> Result<Vec<StepPair>> {
    let root = root.as_ref();
    let mut pairs: BTreeMap<usize, StepPair> = BTreeMap::new();

    for mode in [RunMode::Baseline, RunMode::Current] {
        for (step, path) in list_steps(&root.join(mode.dir_name()))? {
            let pair = pairs.entry(step).or_insert_with(|| StepPair {
                step,
                baseline: None,
                current: None,
            });
            match mode {
                RunMode::Baseline => pair.baseline = Some(path),
                RunMode::Current => pair.current = Some(path),
            }
        }
    }

    Ok(pairs.into_values().collect())
}

fn list_steps(dir: &Path) -> Result<Vec<(usize, PathBuf)>> {
    let pattern = format!(
        "{}/step-*.png",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let paths = glob::glob(&pattern).map_err(|e| RetraceError::InternalError {
        reason: format!("bad screenshot pattern: {}", e),
    })?;

    let mut steps = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                let step = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(parse_step);
                if let Some(step) = step {
                    steps.push((step, path));
                }
            }
            Err(e) => warn!(error = %e, "Unreadable screenshot entry"),
        }
    }
    Ok(steps)
}

/// Comparison of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepComparison {
    pub step: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<DiffOutcome>,
    /// Set when one side has no screenshot for this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<RunMode>,
}

/// Comparison of a baseline run against a current run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub steps: Vec<StepComparison>,
}

impl ComparisonReport {
    /// Steps whose mismatch exceeds `threshold` percent
    pub fn mismatched(&self, threshold: f64) -> Vec<usize> {
        self.steps
            .iter()
            .filter(|s| s.outcome.as_ref().is_some_and(|o| o.mismatch_percentage > threshold))
            .map(|s| s.step)
            .collect()
    }

    /// Steps present in only one run
    pub fn incomplete(&self) -> Vec<usize> {
        self.steps.iter().filter(|s| s.missing.is_some()).map(|s| s.step).collect()
    }
}

/// Pair both runs under `root` and diff every complete pair
pub fn compare_runs(root: impl AsRef<Path>, differ: &dyn ImageDiffer) -> Result<ComparisonReport> {
    let mut report = ComparisonReport::default();

    for pair in pair_runs(root)? {
        let comparison = match (&pair.baseline, &pair.current) {
            (Some(baseline), Some(current)) => {
                let outcome = differ.diff(&std::fs::read(baseline)?, &std::fs::read(current)?)?;
                debug!(
                    step = pair.step,
                    mismatch = outcome.mismatch_percentage,
                    differ = differ.name(),
                    "Compared step"
                );
                StepComparison {
                    step: pair.step,
                    outcome: Some(outcome),
                    missing: None,
                }
            }
            _ => StepComparison {
                step: pair.step,
                outcome: None,
                missing: pair.missing(),
            },
        };
        report.steps.push(comparison);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, mode: RunMode, step: usize, bytes: &[u8]) {
        let dir = root.join(mode.dir_name());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("step-{}.png", step)), bytes).unwrap();
    }

    #[test]
    fn test_pairing_by_step() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), RunMode::Baseline, 1, b"a");
        write(dir.path(), RunMode::Baseline, 2, b"b");
        write(dir.path(), RunMode::Baseline, 10, b"c");
        write(dir.path(), RunMode::Current, 1, b"a");
        write(dir.path(), RunMode::Current, 2, b"x");
        std::fs::write(dir.path().join("current/notes.txt"), "ignored").unwrap();

        let pairs = pair_runs(dir.path()).unwrap();
        let steps: Vec<_> = pairs.iter().map(|p| p.step).collect();
        assert_eq!(steps, vec![1, 2, 10]);
        assert!(pairs[0].is_complete());
        assert_eq!(pairs[2].missing(), Some(RunMode::Current));
    }

    #[test]
    fn test_compare_runs_with_exact_differ() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), RunMode::Baseline, 1, b"same");
        write(dir.path(), RunMode::Current, 1, b"same");
        write(dir.path(), RunMode::Baseline, 2, b"before");
        write(dir.path(), RunMode::Current, 2, b"after");
        write(dir.path(), RunMode::Current, 3, b"new");

        let report = compare_runs(dir.path(), &ExactDiffer).unwrap();

        assert_eq!(report.mismatched(0.0), vec![2]);
        assert_eq!(report.incomplete(), vec![3]);
        assert_eq!(report.steps[2].missing, Some(RunMode::Baseline));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(pair_runs(dir.path().join("nowhere")).unwrap().is_empty());
    }

    #[test]
    fn test_outcome_wire_shape() {
        let outcome = DiffOutcome {
            diff_image_data_url: "data:image/png;base64,AAAA".to_string(),
            mismatch_percentage: 1.5,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["diffImageDataUrl"], "data:image/png;base64,AAAA");
        assert_eq!(json["mismatchPercentage"], 1.5);
    }
}
