//! Capture session
//!
//! Owns one recording from start to stop:
//!
//! ```text
//! Uninitialized ──start()/resume()──► Recording ──stop()──► Stopped
//!                                       ▲                       │
//!                                       └───────start()─────────┘
//! ```
//!
//! The session itself is disposable. Whenever the page reloads the capture
//! agent is torn down with it, and a new session object is built with
//! [`CaptureSession::resume`], rehydrating from the event log that outlived
//! the page. Every accepted record is appended to the log before the
//! handler returns, and normalizer state only advances past records the
//! log has accepted.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::action::ActionRecord;
use super::artifact::Artifact;
use super::mirror::PageView;
use super::normalizer::{Normalizer, NormalizerStats};
use super::raw::{DomInputEvent, HistorySignal, RawEvent};
use crate::config::CaptureConfig;
use crate::error::{RetraceError, Result};
use crate::storage::EventLog;
use crate::timing::{Clock, SystemClock};

/// Lifecycle state of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Recording,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Recording => "recording",
            SessionState::Stopped => "stopped",
        })
    }
}

/// One recording, bound to an event log
pub struct CaptureSession {
    id: String,
    state: SessionState,
    log: Arc<dyn EventLog>,
    normalizer: Normalizer,
    clock: Arc<dyn Clock>,
    config: CaptureConfig,
    last_timestamp: Option<i64>,
    rejected: u64,
}

impl CaptureSession {
    pub fn new(log: Arc<dyn EventLog>, config: CaptureConfig) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: SessionState::Uninitialized,
            log,
            normalizer: Normalizer::new(&config),
            clock: Arc::new(SystemClock::new()),
            config,
            last_timestamp: None,
            rejected: 0,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Keep the id of a session that was started before a reload
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    pub fn stats(&self) -> NormalizerStats {
        self.normalizer.stats()
    }

    /// Records rejected at the log boundary (out of order, storage failure)
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Begin a new recording on `page`
    ///
    /// Any stale log content from an earlier session is discarded, and the
    /// current location is recorded as the first navigation.
    pub fn start(&mut self, page: &dyn PageView) -> Result<()> {
        if self.state == SessionState::Recording {
            return Err(self.invalid_state("start"));
        }

        self.log.clear()?;
        if self.state == SessionState::Stopped {
            self.id = Uuid::new_v4().to_string();
        }
        self.normalizer = Normalizer::new(&self.config);
        self.last_timestamp = None;
        self.rejected = 0;
        self.state = SessionState::Recording;

        info!(
            session_id = %self.id,
            url = %page.location(),
            log = self.log.name(),
            "Capture started"
        );

        let timestamp = self.clock.now_millis();
        self.record_location(page, timestamp)?;
        Ok(())
    }

    /// Re-attach to a recording that is already in progress after `page` loaded
    ///
    /// Dedup and ordering state continue from the last persisted record, and
    /// the new location is recorded unless it repeats the last navigation.
    pub fn resume(&mut self, page: &dyn PageView) -> Result<()> {
        if self.state != SessionState::Uninitialized {
            return Err(self.invalid_state("resume"));
        }

        let last = self.log.last()?;
        self.normalizer = Normalizer::new(&self.config);
        self.normalizer.seed(last.as_ref());
        self.last_timestamp = last.as_ref().map(ActionRecord::timestamp);
        self.state = SessionState::Recording;

        debug!(session_id = %self.id, url = %page.location(), "Capture resumed after page load");

        let timestamp = self.synthetic_timestamp();
        self.record_location(page, timestamp)?;
        Ok(())
    }

    /// Normalize and persist a recorder event
    ///
    /// Failures are logged and swallowed; the host keeps running.
    pub fn handle_raw(&mut self, raw: &RawEvent, page: &dyn PageView) -> Option<ActionRecord> {
        if !self.is_recording() {
            return None;
        }
        let record = self.normalizer.propose(raw, page)?;
        self.persist(record)
    }

    /// Normalize and persist a document `input` event
    pub fn handle_dom_input(&mut self, event: &DomInputEvent) -> Option<ActionRecord> {
        if !self.is_recording() {
            return None;
        }
        let record = self.normalizer.propose_dom_input(event)?;
        self.persist(record)
    }

    /// Normalize and persist a history change
    pub fn handle_history(&mut self, signal: &HistorySignal) -> Option<ActionRecord> {
        if !self.is_recording() {
            return None;
        }
        let record = self.normalizer.propose_history(signal)?;
        self.persist(record)
    }

    /// Durably append one canonical record
    pub fn record(&mut self, action: ActionRecord) -> Result<()> {
        if !self.is_recording() {
            return Err(self.invalid_state("record"));
        }

        if let Some(locator) = action.locator() {
            if locator.trim().is_empty() {
                return Err(RetraceError::TargetUnresolvable {
                    reason: format!("{} record with empty locator", action.kind()),
                });
            }
        }

        if let Some(last) = self.last_timestamp {
            if action.timestamp() < last {
                return Err(RetraceError::OutOfOrder {
                    timestamp: action.timestamp(),
                    last,
                });
            }
        }

        self.log.append(&action)?;
        self.normalizer.commit(&action);
        self.last_timestamp = Some(action.timestamp());
        debug!(kind = %action.kind(), timestamp = action.timestamp(), "Recorded action");
        Ok(())
    }

    /// Finish the recording and hand back the artifact
    ///
    /// The current location is captured one last time. When nothing but
    /// navigations were recorded this fails with `EmptyLog` and the session
    /// keeps recording with its log intact.
    pub fn stop(&mut self, page: &dyn PageView) -> Result<Artifact> {
        if !self.is_recording() {
            return Err(self.invalid_state("stop"));
        }

        let timestamp = self.synthetic_timestamp();
        self.record_location(page, timestamp)?;

        let records = self.log.read_all()?;
        if !records.iter().any(ActionRecord::is_interaction) {
            info!(session_id = %self.id, "Stop requested with no recorded interactions");
            return Err(RetraceError::EmptyLog);
        }

        self.log.clear()?;
        self.state = SessionState::Stopped;
        info!(session_id = %self.id, records = records.len(), "Capture stopped");

        Ok(Artifact::new(
            self.id.clone(),
            records,
            self.config.artifact_file_name.clone(),
        ))
    }

    /// Record the page's current location unless it repeats the last navigation
    fn record_location(&mut self, page: &dyn PageView, timestamp: i64) -> Result<()> {
        let (url, title) = (page.location(), page.title());
        match self.normalizer.propose_navigation(&url, &title, timestamp) {
            Some(record) => self.record(record),
            None => Ok(()),
        }
    }

    fn persist(&mut self, record: ActionRecord) -> Option<ActionRecord> {
        match self.record(record.clone()) {
            Ok(()) => Some(record),
            Err(err) => {
                warn!(error = %err, code = err.error_code(), "Rejected action record");
                self.rejected += 1;
                None
            }
        }
    }

    /// Synthetic records never go backwards relative to the log
    fn synthetic_timestamp(&self) -> i64 {
        let now = self.clock.now_millis();
        self.last_timestamp.map_or(now, |last| now.max(last))
    }

    fn invalid_state(&self, operation: &str) -> RetraceError {
        RetraceError::InvalidSessionState {
            operation: operation.to_string(),
            state: self.state.to_string(),
        }
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("log", &self.log.name())
            .field("last_timestamp", &self.last_timestamp)
            .finish()
    }
}
