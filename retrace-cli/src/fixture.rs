//! Offline capture from a prerecorded fixture
//!
//! A fixture is what a page agent would have reported during a session:
//!
//! ```json
//! {
//!   "url": "https://shop.test/",
//!   "title": "Shop",
//!   "startTime": 1700000000000,
//!   "nodes": { "1": { "tagName": "button", "id": "buy" } },
//!   "events": [
//!     { "kind": "recorder", "event": { "type": 2, "data": { "id": 1, "x": 5, "y": 9 }, "timestamp": 1700000000100 } }
//!   ]
//! }
//! ```
//!
//! The events are fed through a real [`CaptureController`] backed by a
//! [`FileEventLog`], so the artifact is exactly what a live capture of the
//! same signals would export.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use retrace_core::capture::{Ack, Artifact, CaptureController, Element, HostEvent, PageSnapshot};
use retrace_core::config::CaptureConfig;
use retrace_core::error::{Result, RetraceError};
use retrace_core::storage::FileEventLog;
use retrace_core::timing::FixedClock;

/// Event log key used for offline captures
const LOG_KEY: &str = "capture";

/// Prerecorded host events for one capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureFixture {
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// Wall-clock time at which recording started
    #[serde(default)]
    pub start_time: i64,
    /// Nodes present when recording starts, keyed by mirror id
    #[serde(default)]
    pub nodes: BTreeMap<u64, Element>,
    #[serde(default)]
    pub events: Vec<HostEvent>,
}

impl CaptureFixture {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| RetraceError::InvalidConfig {
            reason: format!("fixture {}: {}", path.display(), e),
        })
    }

    fn page(&self) -> PageSnapshot {
        let mut page = PageSnapshot::new(&self.url, &self.title);
        for (id, element) in &self.nodes {
            page.insert_node(*id, element.clone());
        }
        page
    }
}

/// Capture `fixture` and write the artifact into `out_dir`
///
/// The event log lives in `config.storage_dir`, or `<out_dir>/.retrace`
/// when unset.
pub async fn record(
    fixture: &CaptureFixture,
    out_dir: impl AsRef<Path>,
    config: &CaptureConfig,
) -> Result<(Artifact, PathBuf)> {
    let out_dir = out_dir.as_ref();
    let storage_dir = config
        .storage_dir
        .clone()
        .unwrap_or_else(|| out_dir.join(".retrace"));
    let log = Arc::new(FileEventLog::open(&storage_dir, LOG_KEY)?);
    debug!(log = %log.path().display(), events = fixture.events.len(), "Recording fixture");

    let controller = CaptureController::spawn_with_clock(
        log,
        config.clone(),
        fixture.page(),
        Arc::new(FixedClock::new(fixture.start_time)),
    );

    let ack = controller.start().await?;
    if !ack.success {
        return Err(ack_error(ack));
    }
    for event in &fixture.events {
        controller.dispatch(event.clone()).await?;
    }

    let reply = controller.stop().await?;
    controller.shutdown().await?;
    let artifact = reply.artifact.ok_or_else(|| ack_error(reply.ack))?;

    let path = artifact.write_to(out_dir)?;
    info!(path = %path.display(), records = artifact.len(), "Artifact written");
    Ok((artifact, path))
}

fn ack_error(ack: Ack) -> RetraceError {
    match ack.code.as_deref() {
        Some("EMPTY_LOG") => RetraceError::EmptyLog,
        _ => RetraceError::InternalError {
            reason: ack.message.unwrap_or_else(|| "capture command failed".to_string()),
        },
    }
}
