//! End-to-end replay tests against the recording mock driver

use std::path::Path;
use std::sync::Arc;

use retrace_core::capture::{
    parse_entries, ActionRecord, ArtifactEntry, CaptureSession, Coordinates, Element, PageSnapshot,
    RawEvent,
};
use retrace_core::config::CaptureConfig;
use retrace_core::storage::InMemoryEventLog;
use retrace_core::timing::MockClock;
use retrace_core::config::{ReplayConfig, Strictness};
use retrace_core::diff::{compare_runs, ExactDiffer};
use retrace_core::replay::mock::{DriverCall, MockConnector, MockDriver, UnavailableProvider};
use retrace_core::replay::{ReplayEngine, ReplayOutcome, RunMode, StaticEndpoint, StepStatus};
use retrace_core::timing::MockDelay;

fn sample_entries() -> Vec<ArtifactEntry> {
    vec![
        ActionRecord::navigate("https://shop.test/", "Shop", 1).into(),
        ActionRecord::click("#go", Coordinates::new(10, 10), 2)
            .with_element_text("Go")
            .into(),
        ActionRecord::input("#q", "hi", 3).into(),
        ActionRecord::scroll(Coordinates::new(0, 500), 4).into(),
    ]
}

fn engine(root: &Path, mode: RunMode, strictness: Strictness) -> ReplayEngine {
    let config = ReplayConfig::new()
        .output_root(root)
        .run_mode(mode)
        .strictness(strictness);
    ReplayEngine::new(config).with_delay(Arc::new(MockDelay::new()))
}

fn provider() -> StaticEndpoint {
    StaticEndpoint::parse("http://grid.test/wd/hub").unwrap()
}

fn ready_driver() -> MockDriver {
    MockDriver::new().with_elements("#go", 1).with_elements("#q", 1)
}

fn step_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn four_records_four_screenshots_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let driver = ready_driver();
    let connector = MockConnector::new(driver.clone());

    let report = engine(dir.path(), RunMode::Current, Strictness::Continue)
        .run(&provider(), &connector, &sample_entries())
        .await
        .unwrap();

    assert!(report.success());
    assert_eq!(report.executed_kinds(), vec!["navigate", "click", "input", "scroll"]);
    assert_eq!(
        step_files(&dir.path().join("current")),
        vec!["step-1.png", "step-2.png", "step-3.png", "step-4.png"]
    );
    assert_eq!(
        driver.actions(),
        vec![
            DriverCall::Navigate("https://shop.test/".to_string()),
            DriverCall::Click("#go[0]".to_string()),
            DriverCall::Clear("#q[0]".to_string()),
            DriverCall::SendKeys("#q[0]".to_string(), "hi".to_string()),
            DriverCall::ExecuteScript("window.scrollTo(0, 500);".to_string()),
            DriverCall::Quit,
        ]
    );
    assert_eq!(driver.count("screenshot"), 4);
    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn replay_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let entries = sample_entries();

    let first_driver = ready_driver();
    let first = engine(dir.path(), RunMode::Current, Strictness::Continue)
        .run(&provider(), &MockConnector::new(first_driver.clone()), &entries)
        .await
        .unwrap();
    let first_bytes = std::fs::read(dir.path().join("current/step-4.png")).unwrap();

    let second_driver = ready_driver();
    let second = engine(dir.path(), RunMode::Current, Strictness::Continue)
        .run(&provider(), &MockConnector::new(second_driver.clone()), &entries)
        .await
        .unwrap();
    let second_bytes = std::fs::read(dir.path().join("current/step-4.png")).unwrap();

    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.divergence(&second), None);
    assert_eq!(first_driver.calls(), second_driver.calls());
    assert_eq!(first_bytes, second_bytes);
    assert_eq!(step_files(&dir.path().join("current")).len(), 4);
}

#[tokio::test]
async fn shorter_rerun_leaves_only_its_screenshots() {
    let dir = tempfile::tempdir().unwrap();
    let partition = dir.path().join("current");

    engine(dir.path(), RunMode::Current, Strictness::Continue)
        .run(&provider(), &MockConnector::new(ready_driver()), &sample_entries())
        .await
        .unwrap();
    assert_eq!(step_files(&partition).len(), 4);

    let shorter = sample_entries()[..2].to_vec();
    let report = engine(dir.path(), RunMode::Current, Strictness::Continue)
        .run(&provider(), &MockConnector::new(ready_driver()), &shorter)
        .await
        .unwrap();

    assert!(report.success());
    assert_eq!(step_files(&partition), vec!["step-1.png", "step-2.png"]);
}

#[tokio::test]
async fn class_locator_uses_first_match() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new().with_elements(".card", 3);
    let entries: Vec<ArtifactEntry> =
        vec![ActionRecord::click(".card", Coordinates::origin(), 1).into()];

    engine(dir.path(), RunMode::Current, Strictness::Continue)
        .run(&provider(), &MockConnector::new(driver.clone()), &entries)
        .await
        .unwrap();

    let clicks: Vec<_> = driver
        .calls()
        .into_iter()
        .filter(|c| matches!(c, DriverCall::Click(_)))
        .collect();
    assert_eq!(clicks, vec![DriverCall::Click(".card[0]".to_string())]);
}

#[tokio::test]
async fn missing_locator_continues_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new().with_elements("#q", 1);

    let report = engine(dir.path(), RunMode::Current, Strictness::Continue)
        .run(&provider(), &MockConnector::new(driver.clone()), &sample_entries())
        .await
        .unwrap();

    assert_eq!(report.outcome, ReplayOutcome::Done);
    assert!(!report.success());

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].step, 2);
    assert_eq!(failures[0].error_code.as_deref(), Some("LOCATOR_NOT_FOUND"));
    assert!(failures[0].screenshot.is_some());

    assert_eq!(report.steps.len(), 4);
    assert_eq!(step_files(&dir.path().join("current")).len(), 4);
    assert_eq!(driver.quit_count(), 1);
}

#[tokio::test]
async fn missing_locator_aborts_when_strict() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new().with_elements("#q", 1);

    let report = engine(dir.path(), RunMode::Current, Strictness::Abort)
        .run(&provider(), &MockConnector::new(driver.clone()), &sample_entries())
        .await
        .unwrap();

    assert_eq!(report.outcome, ReplayOutcome::Failed);
    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.total_records, 4);
    assert_eq!(step_files(&dir.path().join("current")), vec!["step-1.png", "step-2.png"]);
    assert_eq!(driver.quit_count(), 1);
}

#[tokio::test]
async fn unavailable_session_fails_before_any_step() {
    let dir = tempfile::tempdir().unwrap();
    let driver = ready_driver();

    let err = engine(dir.path(), RunMode::Baseline, Strictness::Continue)
        .run(
            &UnavailableProvider::new("device farm quota exhausted"),
            &MockConnector::new(driver.clone()),
            &sample_entries(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "SESSION_UNAVAILABLE");
    assert!(driver.calls().is_empty());
    assert!(step_files(&dir.path().join("baseline")).is_empty());
}

#[tokio::test]
async fn unknown_kinds_are_skipped_with_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let entries = parse_entries(
        r##"[
            {"action": "navigate", "url": "https://shop.test/", "pageTitle": "Shop", "timestamp": 1},
            {"action": "hover", "locator": "#menu", "timestamp": 2},
            {"action": "click", "locator": "#go", "coordinates": {"x": 1, "y": 1}, "timestamp": 3}
        ]"##,
    )
    .unwrap();
    let driver = ready_driver();

    let report = engine(dir.path(), RunMode::Current, Strictness::Abort)
        .run(&provider(), &MockConnector::new(driver.clone()), &entries)
        .await
        .unwrap();

    assert_eq!(report.outcome, ReplayOutcome::Done);
    assert_eq!(report.steps[1].status, StepStatus::Skipped);
    assert_eq!(report.steps[1].kind, "hover");
    assert!(report.success());
    assert_eq!(step_files(&dir.path().join("current")).len(), 3);
}

#[tokio::test]
async fn baseline_and_current_runs_compare_clean() {
    let dir = tempfile::tempdir().unwrap();
    let entries = sample_entries();

    for mode in [RunMode::Baseline, RunMode::Current] {
        engine(dir.path(), mode, Strictness::Continue)
            .run(&provider(), &MockConnector::new(ready_driver()), &entries)
            .await
            .unwrap();
    }

    let comparison = compare_runs(dir.path(), &ExactDiffer).unwrap();
    assert_eq!(comparison.steps.len(), 4);
    assert!(comparison.mismatched(0.0).is_empty());
    assert!(comparison.incomplete().is_empty());
}

#[tokio::test]
async fn captured_artifact_replays() {
    let page = PageSnapshot::new("https://shop.test/", "Shop")
        .with_node(1, Element::new("button").with_id("go"))
        .with_node(2, Element::new("input").with_class("search"));

    let log = Arc::new(InMemoryEventLog::new());
    let mut session = CaptureSession::new(log, CaptureConfig::default())
        .with_clock(Arc::new(MockClock::new(0)));
    session.start(&page).unwrap();
    session.handle_raw(&RawEvent::pointer(1, 4, 4, 10), &page).unwrap();
    session.handle_raw(&RawEvent::input(2, "boots", 20), &page).unwrap();
    session.handle_raw(&RawEvent::scroll(0, 400, 30), &page).unwrap();
    let artifact = session.stop(&page).unwrap();

    let entries = parse_entries(&artifact.to_json().unwrap()).unwrap();
    assert_eq!(entries.len(), artifact.len());

    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new().with_elements("#go", 1).with_elements(".search", 1);
    let report = engine(dir.path(), RunMode::Current, Strictness::Abort)
        .run(&provider(), &MockConnector::new(driver.clone()), &entries)
        .await
        .unwrap();

    assert!(report.success());
    assert_eq!(report.screenshots().len(), artifact.len());
    assert_eq!(
        driver.actions(),
        vec![
            DriverCall::Navigate("https://shop.test/".to_string()),
            DriverCall::Click("#go[0]".to_string()),
            DriverCall::Clear(".search[0]".to_string()),
            DriverCall::SendKeys(".search[0]".to_string(), "boots".to_string()),
            DriverCall::ExecuteScript("window.scrollTo(0, 400);".to_string()),
            DriverCall::Navigate("https://shop.test/".to_string()),
            DriverCall::Quit,
        ]
    );
}
