//! Command implementations

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use retrace_core::capture::{load_entries, ActionRecord, ArtifactEntry};
use retrace_core::config::{ReplayConfig, RetraceConfig, Strictness};
use retrace_core::diff::{compare_runs, ComparisonReport, ExactDiffer};
use retrace_core::error::{Result, RetraceError};
use retrace_core::replay::{
    DriverConnector, ReplayEngine, ReplayReport, RunMode, SessionProvider, StaticEndpoint,
    WebDriverConnector,
};

use crate::args::{CompareArgs, ReplayArgs};

// ============================================================================
// replay
// ============================================================================

/// Effective configuration for a replay: file, then environment, then flags
pub fn replay_config<F>(args: &ReplayArgs, lookup: F) -> Result<RetraceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match &args.config {
        Some(path) => RetraceConfig::load(path)?,
        None => RetraceConfig::default(),
    };
    let mut config = config.apply_env_from(lookup)?;

    if args.baseline {
        config.replay.run_mode = RunMode::Baseline;
    }
    if let Some(output) = &args.output {
        config.replay.output_root = output.clone();
    }
    if args.strict {
        config.replay.strictness = Strictness::Abort;
    }
    if let Some(browser) = &args.browser {
        config.replay.browser_name = browser.clone();
    }
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = Some(endpoint.clone());
    }

    config.validate()?;
    Ok(config)
}

/// `retrace replay` against the configured WebDriver endpoint
pub async fn replay(args: &ReplayArgs) -> Result<ReplayReport> {
    let config = replay_config(args, |key| std::env::var(key).ok())?;
    let endpoint = config
        .endpoint
        .as_deref()
        .ok_or_else(|| RetraceError::InvalidConfig {
            reason: "no WebDriver endpoint; pass --endpoint or set RETRACE_ENDPOINT".to_string(),
        })?;
    let provider = StaticEndpoint::parse(endpoint)?;

    run_replay(&config.replay, &args.events, &provider, &WebDriverConnector::new()).await
}

/// Load the artifact at `events` and replay it
pub async fn run_replay(
    config: &ReplayConfig,
    events: &Path,
    provider: &dyn SessionProvider,
    connector: &dyn DriverConnector,
) -> Result<ReplayReport> {
    let entries = load_entries(events)?;
    info!(
        events = %events.display(),
        records = entries.len(),
        mode = %config.run_mode,
        "Loaded artifact"
    );
    ReplayEngine::new(config.clone())
        .run(provider, connector, &entries)
        .await
}

// ============================================================================
// inspect
// ============================================================================

/// Overview of an artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub records: usize,
    /// Record count per kind, unknown kinds included
    pub kinds: BTreeMap<String, usize>,
    pub unsupported: usize,
    /// Navigation targets in first-visit order
    pub urls: Vec<String>,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
}

impl fmt::Display for ArtifactSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} record(s)", self.records)?;
        for (kind, count) in &self.kinds {
            writeln!(f, "  {:<10} {}", kind, count)?;
        }
        if self.unsupported > 0 {
            writeln!(f, "  ({} unsupported, skipped on replay)", self.unsupported)?;
        }
        if let (Some(first), Some(last)) = (self.first_timestamp, self.last_timestamp) {
            writeln!(f, "span: {} ms", last - first)?;
        }
        for url in &self.urls {
            writeln!(f, "  → {}", url)?;
        }
        Ok(())
    }
}

pub fn summarize(entries: &[ArtifactEntry]) -> ArtifactSummary {
    let mut summary = ArtifactSummary {
        records: entries.len(),
        ..Default::default()
    };

    for entry in entries {
        *summary.kinds.entry(entry.kind_name().to_string()).or_insert(0) += 1;

        let Some(record) = entry.as_action() else {
            summary.unsupported += 1;
            continue;
        };
        let ts = record.timestamp();
        summary.first_timestamp = Some(summary.first_timestamp.map_or(ts, |t| t.min(ts)));
        summary.last_timestamp = Some(summary.last_timestamp.map_or(ts, |t| t.max(ts)));

        if let ActionRecord::Navigate { url, .. } = record {
            if !summary.urls.contains(url) {
                summary.urls.push(url.clone());
            }
        }
    }
    summary
}

/// `retrace inspect FILE`
pub fn inspect(path: impl AsRef<Path>) -> Result<ArtifactSummary> {
    Ok(summarize(&load_entries(path)?))
}

// ============================================================================
// compare
// ============================================================================

/// `retrace compare ROOT` with byte-exact comparison
pub fn compare(args: &CompareArgs) -> Result<ComparisonReport> {
    let report = compare_runs(&args.root, &ExactDiffer)?;
    info!(
        root = %args.root.display(),
        steps = report.steps.len(),
        mismatched = report.mismatched(args.threshold).len(),
        incomplete = report.incomplete().len(),
        "Compared runs"
    );
    Ok(report)
}
