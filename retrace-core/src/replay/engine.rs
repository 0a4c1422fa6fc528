//! Replay engine
//!
//! Drives one run: acquire a session, execute every record in order,
//! screenshot after each, release the session. Per record the context moves
//! `Idle → Executing → Captured → Idle`, ending in `Done` or `Failed`.
//!
//! Failure policy:
//! - endpoint acquisition or connection failure: the run fails before any step
//! - unknown record kind: logged, skipped, screenshot still taken
//! - recoverable step error (e.g. `LocatorNotFound`): recorded; the run
//!   continues under [`Strictness::Continue`] and stops under
//!   [`Strictness::Abort`]
//! - any other step error: the run stops as `Failed`
//!
//! The session is released on every path once it was opened.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::driver::{scroll_script, BrowserDriver, DriverConnector, ElementRef};
use super::endpoint::SessionProvider;
use super::report::{ReplayOutcome, ReplayReport, StepReport};
use super::screenshot::ScreenshotStore;
use crate::capture::{ActionRecord, ArtifactEntry};
use crate::config::{ReplayConfig, Strictness};
use crate::error::{RetraceError, Result};
use crate::timing::{Delay, TokioDelay};

/// Where a run is in its per-record cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Idle,
    Executing(usize),
    Captured(usize),
    Done,
    Failed,
}

/// Per-run state
#[derive(Debug)]
pub struct ReplayContext {
    step: usize,
    state: StepState,
    store: ScreenshotStore,
    steps: Vec<StepReport>,
}

impl ReplayContext {
    fn new(store: ScreenshotStore) -> Self {
        Self {
            step: 0,
            state: StepState::Idle,
            store,
            steps: Vec::new(),
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    fn begin(&mut self) -> usize {
        self.step += 1;
        self.state = StepState::Executing(self.step);
        self.step
    }
}

/// Sequential replay of action records
pub struct ReplayEngine {
    config: ReplayConfig,
    delay: Arc<dyn Delay>,
}

impl ReplayEngine {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            delay: Arc::new(TokioDelay::new()),
        }
    }

    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Replay `entries` on a freshly acquired session
    pub async fn run(
        &self,
        provider: &dyn SessionProvider,
        connector: &dyn DriverConnector,
        entries: &[ArtifactEntry],
    ) -> Result<ReplayReport> {
        if entries.is_empty() {
            return Err(RetraceError::InvalidArtifact {
                reason: "artifact contains no records".to_string(),
            });
        }

        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        let store = ScreenshotStore::new(&self.config.output_root, self.config.run_mode);
        store.prepare()?;

        let endpoint = provider
            .acquire_session_endpoint()
            .await
            .and_then(|endpoint| endpoint.ensure_usable(Utc::now()).map(|()| endpoint))
            .map_err(as_unavailable)?;

        let driver = connector
            .connect(&endpoint, &self.config)
            .await
            .map_err(as_unavailable)?;

        info!(
            run_id = %run_id,
            mode = %self.config.run_mode,
            records = entries.len(),
            driver = driver.name(),
            provider = provider.name(),
            "Replay started"
        );

        let mut ctx = ReplayContext::new(store);
        self.drive(driver.as_ref(), &mut ctx, entries).await;

        if let Err(err) = driver.quit().await {
            warn!(error = %err, "Failed to release remote session");
        } else {
            debug!("Remote session released");
        }

        let outcome = match ctx.state {
            StepState::Failed => ReplayOutcome::Failed,
            _ => ReplayOutcome::Done,
        };
        info!(run_id = %run_id, steps = ctx.steps.len(), outcome = ?outcome, "Replay finished");

        Ok(ReplayReport {
            run_id,
            mode: self.config.run_mode,
            started_at,
            finished_at: Utc::now(),
            steps: ctx.steps,
            outcome,
            total_records: entries.len(),
        })
    }

    async fn drive(
        &self,
        driver: &dyn BrowserDriver,
        ctx: &mut ReplayContext,
        entries: &[ArtifactEntry],
    ) {
        for (index, entry) in entries.iter().enumerate() {
            if index > 0 {
                self.delay.pause(self.config.settle_delay_duration()).await;
            }

            let step = ctx.begin();
            debug!(step, kind = entry.kind_name(), "Executing step");

            let result = execute(driver, entry).await;
            let mut report = match &result {
                Ok(()) => StepReport::executed(step, entry.kind_name()),
                Err(err) => {
                    warn!(
                        step,
                        kind = entry.kind_name(),
                        error = %err,
                        code = err.error_code(),
                        "Step did not execute"
                    );
                    StepReport::from_error(step, entry.kind_name(), err)
                }
            };

            report.screenshot = capture(driver, &ctx.store, step).await;
            ctx.state = StepState::Captured(step);
            ctx.steps.push(report);

            if let Err(err) = result {
                if self.should_stop(&err) {
                    ctx.state = StepState::Failed;
                    return;
                }
            }
            ctx.state = StepState::Idle;
        }
        ctx.state = StepState::Done;
    }

    fn should_stop(&self, err: &RetraceError) -> bool {
        match err {
            RetraceError::UnknownActionKind { .. } => false,
            _ if !err.is_recoverable() => true,
            _ => self.config.strictness == Strictness::Abort,
        }
    }
}

async fn execute(driver: &dyn BrowserDriver, entry: &ArtifactEntry) -> Result<()> {
    let record = match entry {
        ArtifactEntry::Action(record) => record,
        ArtifactEntry::Unsupported { kind, .. } => {
            return Err(RetraceError::UnknownActionKind { kind: kind.clone() });
        }
    };

    match record {
        ActionRecord::Navigate { url, .. } => driver.navigate(url).await,
        ActionRecord::Scroll { coordinates, .. } => {
            driver
                .execute_script(&scroll_script(*coordinates), Vec::new())
                .await?;
            Ok(())
        }
        ActionRecord::Click { locator, .. } => {
            let element = resolve(driver, locator).await?;
            driver.click(&element).await
        }
        ActionRecord::Input { locator, value, .. } => {
            let element = resolve(driver, locator).await?;
            driver.clear(&element).await?;
            driver.send_keys(&element, value).await
        }
    }
}

/// First match in document order
async fn resolve(driver: &dyn BrowserDriver, locator: &str) -> Result<ElementRef> {
    driver
        .find_elements(locator)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| RetraceError::LocatorNotFound {
            locator: locator.to_string(),
        })
}

async fn capture(
    driver: &dyn BrowserDriver,
    store: &ScreenshotStore,
    step: usize,
) -> Option<std::path::PathBuf> {
    let saved = match driver.screenshot().await {
        Ok(png) => store.save(step, &png),
        Err(err) => Err(err),
    };
    match saved {
        Ok(path) => Some(path),
        Err(err) => {
            warn!(step, error = %err, "Screenshot not captured");
            None
        }
    }
}

fn as_unavailable(err: RetraceError) -> RetraceError {
    match err {
        RetraceError::SessionUnavailable { .. } => err,
        other => RetraceError::SessionUnavailable {
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Coordinates;
    use crate::replay::mock::{DriverCall, MockConnector, MockDriver, UnavailableProvider};
    use crate::replay::{RunMode, StaticEndpoint, StepStatus};
    use crate::timing::MockDelay;

    fn engine(root: &std::path::Path, strictness: Strictness) -> (ReplayEngine, Arc<MockDelay>) {
        let delay = Arc::new(MockDelay::new());
        let config = ReplayConfig::new()
            .output_root(root)
            .run_mode(RunMode::Current)
            .strictness(strictness);
        (ReplayEngine::new(config).with_delay(delay.clone()), delay)
    }

    fn provider() -> StaticEndpoint {
        StaticEndpoint::parse("http://grid.test/wd/hub").unwrap()
    }

    #[tokio::test]
    async fn test_settle_delay_between_steps_only() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, delay) = engine(dir.path(), Strictness::Continue);
        let driver = MockDriver::new();
        let entries: Vec<ArtifactEntry> = vec![
            ActionRecord::navigate("https://a.test/", "A", 1).into(),
            ActionRecord::scroll(Coordinates::new(0, 300), 2).into(),
            ActionRecord::scroll(Coordinates::new(0, 600), 3).into(),
        ];

        let report = engine
            .run(&provider(), &MockConnector::new(driver.clone()), &entries)
            .await
            .unwrap();

        assert!(report.success());
        assert_eq!(delay.count(), 2);
        assert_eq!(delay.pauses()[0], std::time::Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_abort_stops_after_failed_step() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _) = engine(dir.path(), Strictness::Abort);
        let driver = MockDriver::new();
        let entries: Vec<ArtifactEntry> = vec![
            ActionRecord::click("#missing", Coordinates::origin(), 1).into(),
            ActionRecord::navigate("https://a.test/", "A", 2).into(),
        ];

        let report = engine
            .run(&provider(), &MockConnector::new(driver.clone()), &entries)
            .await
            .unwrap();

        assert_eq!(report.outcome, ReplayOutcome::Failed);
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.steps[0].error_code.as_deref(), Some("LOCATOR_NOT_FOUND"));
        assert!(report.steps[0].screenshot.is_some());
        assert_eq!(driver.quit_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_stops_even_when_continuing() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _) = engine(dir.path(), Strictness::Continue);
        let driver = MockDriver::new().fail_on("navigate", || RetraceError::TransportError {
            message: "connection reset".to_string(),
        });
        let entries: Vec<ArtifactEntry> = vec![
            ActionRecord::navigate("https://a.test/", "A", 1).into(),
            ActionRecord::scroll(Coordinates::new(0, 90), 2).into(),
        ];

        let report = engine
            .run(&provider(), &MockConnector::new(driver.clone()), &entries)
            .await
            .unwrap();

        assert_eq!(report.outcome, ReplayOutcome::Failed);
        assert_eq!(report.steps.len(), 1);
        assert_eq!(driver.quit_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_session_runs_no_step() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _) = engine(dir.path(), Strictness::Continue);
        let driver = MockDriver::new();
        let entries: Vec<ArtifactEntry> =
            vec![ActionRecord::navigate("https://a.test/", "A", 1).into()];
        let provider = UnavailableProvider::new("no devices");

        let err = engine
            .run(&provider, &MockConnector::new(driver.clone()), &entries)
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "SESSION_UNAVAILABLE");
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_connect_failure_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _) = engine(dir.path(), Strictness::Continue);
        let entries: Vec<ArtifactEntry> =
            vec![ActionRecord::navigate("https://a.test/", "A", 1).into()];

        let err = engine
            .run(&provider(), &MockConnector::refusing("quota exceeded"), &entries)
            .await
            .unwrap_err();

        assert!(matches!(err, RetraceError::SessionUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_empty_entries_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _) = engine(dir.path(), Strictness::Continue);
        let driver = MockDriver::new();

        let err = engine
            .run(&provider(), &MockConnector::new(driver.clone()), &[])
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARTIFACT");
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_kind_skipped_under_abort() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _) = engine(dir.path(), Strictness::Abort);
        let driver = MockDriver::new();
        let entries = vec![
            ArtifactEntry::Unsupported {
                kind: "hover".to_string(),
                raw: serde_json::json!({"action": "hover"}),
            },
            ActionRecord::navigate("https://a.test/", "A", 2).into(),
        ];

        let report = engine
            .run(&provider(), &MockConnector::new(driver.clone()), &entries)
            .await
            .unwrap();

        assert_eq!(report.outcome, ReplayOutcome::Done);
        assert_eq!(report.steps[0].status, StepStatus::Skipped);
        assert_eq!(
            driver.calls().iter().filter(|c| matches!(c, DriverCall::Screenshot)).count(),
            2
        );
    }
}
