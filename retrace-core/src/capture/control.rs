//! Capture control surface
//!
//! [`CaptureController`] runs the capture side as a background task fed by
//! a bounded channel. Host events and start/stop commands share the one
//! channel, so a stop issued after a burst of events is only handled once
//! every earlier event has been normalized and persisted.
//!
//! Start and stop are request/response: the caller awaits an [`Ack`]
//! (`{success, message?}`) through a oneshot reply.
//!
//! Page loads tear the capture session down and build a fresh one that
//! resumes from the event log, mirroring how a page-injected agent is
//! re-attached on every navigation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::artifact::Artifact;
use super::locator::Element;
use super::mirror::PageSnapshot;
use super::raw::{DomInputEvent, HistorySignal, RawEvent};
use super::session::{CaptureSession, SessionState};
use crate::config::CaptureConfig;
use crate::error::{RetraceError, Result};
use crate::storage::EventLog;
use crate::timing::{Clock, SystemClock};

/// Something the host page reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HostEvent {
    /// Recorder event
    Recorder { event: RawEvent },
    /// Document `input` listener
    DomInput { event: DomInputEvent },
    /// Hash change / popstate
    History { signal: HistorySignal },
    /// A node was added to the page mirror
    Node { id: u64, element: Element },
    /// A node was removed from the page mirror
    NodeRemoved { id: u64 },
    /// A full page load; the capture agent is re-attached
    PageLoad {
        url: String,
        #[serde(default)]
        title: String,
    },
}

/// Acknowledgment of a control command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            code: None,
        }
    }

    pub fn failed(err: &RetraceError) -> Self {
        let response = err.to_error_response();
        Self {
            success: false,
            message: Some(response.error.message),
            code: Some(response.error.code),
        }
    }
}

/// Reply to a stop command
#[derive(Debug, Clone)]
pub struct StopReply {
    pub ack: Ack,
    pub artifact: Option<Artifact>,
}

enum ControlCommand {
    Start { reply: oneshot::Sender<Ack> },
    Stop { reply: oneshot::Sender<StopReply> },
    State { reply: oneshot::Sender<SessionState> },
    Event(HostEvent),
    Shutdown,
}

/// Handle to the capture task
pub struct CaptureController {
    tx: mpsc::Sender<ControlCommand>,
    handle: JoinHandle<()>,
}

impl CaptureController {
    /// Spawn the capture task on the current tokio runtime
    pub fn spawn(log: Arc<dyn EventLog>, config: CaptureConfig, page: PageSnapshot) -> Self {
        Self::spawn_with_clock(log, config, page, Arc::new(SystemClock::new()))
    }

    pub fn spawn_with_clock(
        log: Arc<dyn EventLog>,
        config: CaptureConfig,
        page: PageSnapshot,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let worker = ControlWorker {
            log,
            config,
            page,
            clock,
            session: None,
        };
        let handle = tokio::spawn(worker.run(rx));
        Self { tx, handle }
    }

    /// `start-recording`
    pub async fn start(&self) -> Result<Ack> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlCommand::Start { reply }).await?;
        rx.await.map_err(|_| RetraceError::ControllerClosed)
    }

    /// `stop-recording`
    pub async fn stop(&self) -> Result<StopReply> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlCommand::Stop { reply }).await?;
        rx.await.map_err(|_| RetraceError::ControllerClosed)
    }

    /// Lifecycle state of the current capture session
    pub async fn state(&self) -> Result<SessionState> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlCommand::State { reply }).await?;
        rx.await.map_err(|_| RetraceError::ControllerClosed)
    }

    /// Queue a host event; waits only when the queue is full
    pub async fn dispatch(&self, event: HostEvent) -> Result<()> {
        self.send(ControlCommand::Event(event)).await
    }

    /// Drain queued work and stop the task
    pub async fn shutdown(self) -> Result<()> {
        self.send(ControlCommand::Shutdown).await?;
        self.handle.await.map_err(|e| RetraceError::InternalError {
            reason: format!("capture task panicked: {}", e),
        })
    }

    async fn send(&self, command: ControlCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| RetraceError::ControllerClosed)
    }
}

struct ControlWorker {
    log: Arc<dyn EventLog>,
    config: CaptureConfig,
    page: PageSnapshot,
    clock: Arc<dyn Clock>,
    session: Option<CaptureSession>,
}

impl ControlWorker {
    async fn run(mut self, mut rx: mpsc::Receiver<ControlCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                ControlCommand::Start { reply } => {
                    let ack = self.start();
                    let _ = reply.send(ack);
                }
                ControlCommand::Stop { reply } => {
                    let outcome = self.stop();
                    let _ = reply.send(outcome);
                }
                ControlCommand::State { reply } => {
                    let state = self
                        .session
                        .as_ref()
                        .map_or(SessionState::Uninitialized, CaptureSession::state);
                    let _ = reply.send(state);
                }
                ControlCommand::Event(event) => self.handle_event(event),
                ControlCommand::Shutdown => break,
            }
        }
        debug!("Capture controller stopped");
    }

    fn start(&mut self) -> Ack {
        let mut session = match self.session.take() {
            Some(session) if session.is_recording() => {
                let err = RetraceError::InvalidSessionState {
                    operation: "start".to_string(),
                    state: session.state().to_string(),
                };
                self.session = Some(session);
                return Ack::failed(&err);
            }
            Some(session) => session,
            None => self.new_session(),
        };

        let ack = match session.start(&self.page) {
            Ok(()) => Ack::ok(),
            Err(err) => {
                warn!(error = %err, "Failed to start capture");
                Ack::failed(&err)
            }
        };
        self.session = Some(session);
        ack
    }

    fn stop(&mut self) -> StopReply {
        let Some(session) = self.session.as_mut() else {
            let err = RetraceError::InvalidSessionState {
                operation: "stop".to_string(),
                state: SessionState::Uninitialized.to_string(),
            };
            return StopReply {
                ack: Ack::failed(&err),
                artifact: None,
            };
        };

        match session.stop(&self.page) {
            Ok(artifact) => StopReply {
                ack: Ack::ok(),
                artifact: Some(artifact),
            },
            Err(err) => {
                info!(error = %err, "Stop did not produce an artifact");
                StopReply {
                    ack: Ack::failed(&err),
                    artifact: None,
                }
            }
        }
    }

    fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Node { id, element } => self.page.insert_node(id, element),
            HostEvent::NodeRemoved { id } => {
                self.page.remove_node(id);
            }
            HostEvent::PageLoad { url, title } => {
                self.page.load(url, title);
                self.reattach();
            }
            HostEvent::Recorder { event } => {
                if let Some(session) = self.session.as_mut() {
                    session.handle_raw(&event, &self.page);
                }
            }
            HostEvent::DomInput { event } => {
                if let Some(session) = self.session.as_mut() {
                    session.handle_dom_input(&event);
                }
            }
            HostEvent::History { signal } => {
                self.page.url = signal.url.clone();
                if !signal.title.is_empty() {
                    self.page.title = signal.title.clone();
                }
                if let Some(session) = self.session.as_mut() {
                    session.handle_history(&signal);
                }
            }
        }
    }

    /// Replace the session of a recording in progress with a resumed one
    fn reattach(&mut self) {
        let Some(previous) = self.session.take() else {
            return;
        };
        if !previous.is_recording() {
            self.session = Some(previous);
            return;
        }

        let mut session = self.new_session().with_id(previous.id());
        drop(previous);
        if let Err(err) = session.resume(&self.page) {
            warn!(error = %err, "Failed to resume capture after page load");
        }
        self.session = Some(session);
    }

    fn new_session(&self) -> CaptureSession {
        CaptureSession::new(self.log.clone(), self.config.clone()).with_clock(self.clock.clone())
    }
}
