//! Interaction capture
//!
//! Raw page signals flow leaf-first through:
//!
//! 1. [`locator`]: element → stable reference string
//! 2. [`debounce`]: is a scroll change worth recording
//! 3. [`normalizer`]: raw events → canonical [`ActionRecord`]s
//! 4. [`session`]: lifecycle, durable append, export on stop
//! 5. [`control`]: async start/stop commands and host event intake
//!
//! The output is an [`Artifact`], the JSON document the replay side reads.

pub mod action;
pub mod artifact;
pub mod control;
pub mod debounce;
pub mod locator;
pub mod mirror;
pub mod normalizer;
pub mod raw;
pub mod session;

pub use action::{ActionKind, ActionRecord, Coordinates};
pub use artifact::{load_entries, parse_entries, Artifact, ArtifactEntry};
pub use control::{Ack, CaptureController, HostEvent, StopReply};
pub use debounce::{ScrollDebouncer, DEFAULT_SCROLL_THRESHOLD};
pub use locator::{locate, Element, Locator, LocatorTier};
pub use mirror::{PageSnapshot, PageView};
pub use normalizer::{Normalizer, NormalizerStats};
pub use raw::{DomInputEvent, HistoryCause, HistorySignal, RawEvent, RawKind};
pub use session::{CaptureSession, SessionState};

/// Default name of the exported artifact
pub const ARTIFACT_FILE_NAME: &str = "recorded-events.json";
