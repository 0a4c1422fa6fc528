//! CLI command tests

use std::time::Duration;

use clap::Parser;
use retrace_cli::{commands, fixture, CaptureFixture, Cli, Command, CompareArgs};
use retrace_core::config::{CaptureConfig, ReplayConfig};
use retrace_core::error::RetraceError;
use retrace_core::replay::mock::{MockConnector, MockDriver};
use retrace_core::replay::{RunMode, StaticEndpoint};

const FIXTURE: &str = r##"{
    "url": "https://shop.test/",
    "title": "Shop",
    "startTime": 1000,
    "nodes": {
        "1": {"tagName": "a", "id": "cart-link", "innerText": "Cart"},
        "2": {"tagName": "input", "className": "search"}
    },
    "events": [
        {"kind": "recorder", "event": {"type": 2, "data": {"id": 1, "x": 20, "y": 30}, "timestamp": 1100}},
        {"kind": "domInput", "event": {"target": {"tagName": "input", "className": "search"}, "value": "boots", "timestamp": 1200}},
        {"kind": "recorder", "event": {"type": 5, "data": {"id": 2, "text": "boots"}, "timestamp": 1201}},
        {"kind": "recorder", "event": {"type": 3, "data": {"x": 0, "y": 20}, "timestamp": 1300}},
        {"kind": "recorder", "event": {"type": 3, "data": {"x": 0, "y": 120}, "timestamp": 1400}},
        {"kind": "pageLoad", "url": "https://shop.test/cart", "title": "Cart"}
    ]
}"##;

fn fixture() -> CaptureFixture {
    serde_json::from_str(FIXTURE).unwrap()
}

#[tokio::test]
async fn record_writes_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let (artifact, path) = fixture::record(&fixture(), dir.path(), &CaptureConfig::default())
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("recorded-events.json"));
    let kinds: Vec<_> = artifact.records.iter().map(|r| r.kind().as_str()).collect();
    assert_eq!(kinds, vec!["navigate", "click", "input", "scroll", "navigate"]);

    let summary = commands::inspect(&path).unwrap();
    assert_eq!(summary.records, 5);
    assert_eq!(summary.urls, vec!["https://shop.test/", "https://shop.test/cart"]);
    assert_eq!(summary.first_timestamp, Some(1000));
}

#[tokio::test]
async fn record_without_interactions_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = fixture();
    fixture.events.clear();

    let err = fixture::record(&fixture, dir.path(), &CaptureConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, RetraceError::EmptyLog));
    assert!(!dir.path().join("recorded-events.json").exists());
}

#[tokio::test]
async fn recorded_artifact_replays() {
    let dir = tempfile::tempdir().unwrap();
    let (_, path) = fixture::record(&fixture(), dir.path(), &CaptureConfig::default())
        .await
        .unwrap();

    let driver = MockDriver::new()
        .with_elements("#cart-link", 1)
        .with_elements(".search", 1);
    let config = ReplayConfig::new()
        .output_root(dir.path().join("screenshots"))
        .run_mode(RunMode::Baseline)
        .settle_delay(Duration::ZERO);

    let report = commands::run_replay(
        &config,
        &path,
        &StaticEndpoint::parse("http://grid.test/wd/hub").unwrap(),
        &MockConnector::new(driver.clone()),
    )
    .await
    .unwrap();

    assert!(report.success());
    assert_eq!(report.screenshots().len(), 5);
    assert!(dir.path().join("screenshots/baseline/step-5.png").exists());

    let compare = commands::compare(&CompareArgs {
        root: dir.path().join("screenshots"),
        threshold: 0.0,
        json: false,
    })
    .unwrap();
    assert_eq!(compare.incomplete(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn parses_replay_flags() {
    let cli = Cli::try_parse_from([
        "retrace",
        "replay",
        "--baseline",
        "--events",
        "run.json",
        "--endpoint",
        "http://grid.test/wd/hub",
        "--strict",
        "-v",
    ])
    .unwrap();

    assert!(cli.verbose);
    let Command::Replay(args) = cli.command else {
        panic!("expected replay");
    };
    assert!(args.baseline);
    assert!(args.strict);
    assert_eq!(args.events.to_str(), Some("run.json"));
    assert_eq!(args.endpoint.as_deref(), Some("http://grid.test/wd/hub"));
}

#[test]
fn parses_record_and_compare() {
    let cli = Cli::try_parse_from(["retrace", "record", "fixture.json", "--out", "out"]).unwrap();
    assert!(matches!(cli.command, Command::Record(ref a) if a.out.to_str() == Some("out")));

    let cli = Cli::try_parse_from(["retrace", "compare"]).unwrap();
    assert!(matches!(
        cli.command,
        Command::Compare(ref a) if a.root.to_str() == Some("screenshots")
    ));

    assert!(Cli::try_parse_from(["retrace", "inspect"]).is_err());
}
