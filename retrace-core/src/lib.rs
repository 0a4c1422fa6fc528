//! # Retrace Core - interaction capture and deterministic browser replay
//!
//! Retrace records what a user does on a web page and replays it later
//! against a different, remote browser session:
//!
//! - **Capture**: raw page signals (recorder events, DOM input events,
//!   history changes) are normalized into canonical action records and
//!   appended to a durable event log that survives page reloads
//! - **Artifact**: on stop the log becomes a self-contained JSON document
//! - **Replay**: the records are re-executed one at a time on a remote
//!   WebDriver session, with a screenshot after every step, partitioned into
//!   `baseline` and `current` runs for visual comparison
//!
//! ## Core Principle
//!
//! > Replay reproduces actions, not timing.
//!
//! Two runs of the same artifact execute the same commands in the same
//! order and write the same screenshot names.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use retrace_core::capture::{CaptureSession, Element, PageSnapshot, RawEvent};
//! use retrace_core::config::CaptureConfig;
//! use retrace_core::storage::InMemoryEventLog;
//!
//! let page = PageSnapshot::new("https://shop.test/", "Shop")
//!     .with_node(7, Element::new("button").with_id("buy"));
//!
//! let log = Arc::new(InMemoryEventLog::new());
//! let mut session = CaptureSession::new(log, CaptureConfig::default());
//! session.start(&page).unwrap();
//!
//! let now = chrono::Utc::now().timestamp_millis() + 1_000;
//! let record = session.handle_raw(&RawEvent::pointer(7, 12, 40, now), &page).unwrap();
//! assert_eq!(record.locator(), Some("#buy"));
//!
//! let artifact = session.stop(&page).unwrap();
//! println!("{}", artifact.to_json().unwrap());
//! ```

pub mod capture;
pub mod config;
pub mod diff;
pub mod error;
pub mod replay;
pub mod storage;
pub mod timing;

// Re-export main types
pub use capture::{
    ActionKind, ActionRecord, Artifact, ArtifactEntry, CaptureController, CaptureSession,
    Coordinates, Element, Locator, Normalizer, PageSnapshot, RawEvent, ScrollDebouncer,
};
pub use config::{CaptureConfig, ReplayConfig, RetraceConfig, Strictness};
pub use diff::{compare_runs, pair_runs, DiffOutcome, ImageDiffer};
pub use error::{ErrorCategory, ErrorDetail, ErrorResponse, Result, RetraceError};
pub use replay::{
    BrowserDriver, ReplayEngine, ReplayReport, RunMode, SessionEndpoint, SessionProvider,
};
pub use storage::{EventLog, FileEventLog, InMemoryEventLog};

/// Version of the artifact format
pub const ARTIFACT_VERSION: &str = "1.0";
