//! Error types for Retrace operations
//!
//! Every failure the capture and replay sides can produce is a variant of
//! [`RetraceError`]. Besides the human-readable message each variant has:
//! - a stable error code (e.g. `LOCATOR_NOT_FOUND`) for scripts and reports
//! - a category for grouping
//! - a recoverability flag that the replay engine uses to decide whether a
//!   run can continue after a failed step
//!
//! # Example
//!
//! ```rust
//! use retrace_core::error::{RetraceError, ErrorCategory};
//!
//! let err = RetraceError::LocatorNotFound { locator: "#submit".to_string() };
//! assert_eq!(err.error_code(), "LOCATOR_NOT_FOUND");
//! assert_eq!(err.category(), ErrorCategory::NotFound);
//! assert!(err.is_recoverable());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Retrace operations
pub type Result<T> = std::result::Result<T, RetraceError>;

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A page element or stored record could not be found
    NotFound,
    /// Input data was malformed
    Validation,
    /// Operation not allowed in the current lifecycle state
    Conflict,
    /// A remote resource could not be obtained
    Unavailable,
    /// Internal error
    Internal,
    /// External service or I/O failure
    External,
}

/// Errors that can occur while capturing or replaying interactions
#[derive(Error, Debug)]
pub enum RetraceError {
    // ═══════════════════════════════════════════════════════════════════════
    // Capture errors (normalizer, event log, capture session)
    // ═══════════════════════════════════════════════════════════════════════

    /// A raw event referenced a node that no longer exists or has no usable locator
    #[error("Target unresolvable: {reason}")]
    TargetUnresolvable { reason: String },

    /// Stop was requested but nothing worth exporting was recorded
    #[error("No recorded events found. Interact with the page before stopping the recording.")]
    EmptyLog,

    /// A record arrived with a timestamp older than the last persisted one
    #[error("Out-of-order action: timestamp {timestamp} precedes last recorded timestamp {last}")]
    OutOfOrder { timestamp: i64, last: i64 },

    /// Lifecycle operation is not valid in the session's current state
    #[error("Cannot {operation} while capture session is {state}")]
    InvalidSessionState { operation: String, state: String },

    /// The capture controller task has shut down
    #[error("Capture controller is no longer running")]
    ControllerClosed,

    // ═══════════════════════════════════════════════════════════════════════
    // Replay errors
    // ═══════════════════════════════════════════════════════════════════════

    /// A stored locator matched zero elements on the replay page
    #[error("Locator not found: '{locator}' matched no elements on the current page")]
    LocatorNotFound { locator: String },

    /// The remote browser session could not be acquired
    #[error("Remote session unavailable: {reason}")]
    SessionUnavailable { reason: String },

    /// An artifact entry carried an action kind this build does not know
    #[error("Unknown action kind: '{kind}'")]
    UnknownActionKind { kind: String },

    /// The remote driver rejected a command
    #[error("Driver command '{command}' failed: {reason}")]
    DriverError { command: String, reason: String },

    /// The connection to the remote driver broke down
    #[error("Transport error: {message}")]
    TransportError { message: String },

    /// An event log artifact could not be parsed
    #[error("Invalid artifact: {reason}")]
    InvalidArtifact { reason: String },

    // ═══════════════════════════════════════════════════════════════════════
    // Infrastructure errors (configuration, serialization, storage, I/O)
    // ═══════════════════════════════════════════════════════════════════════

    /// Configuration value is out of range or unreadable
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// JSON serialization or deserialization failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Event log lock is poisoned (panic occurred while holding lock)
    #[error("Event log lock poisoned. This is a bug; please report it.")]
    StorageLocked,

    /// I/O operation failed
    #[error("IO error: {message}")]
    IoError { message: String },

    /// Internal error that shouldn't happen
    #[error("Internal error: {reason}. This is a bug; please report it.")]
    InternalError { reason: String },
}

impl From<std::io::Error> for RetraceError {
    fn from(err: std::io::Error) -> Self {
        RetraceError::IoError {
            message: err.to_string(),
        }
    }
}

impl RetraceError {
    /// Returns true if the operation that produced this error can be skipped
    /// without leaving the surrounding run unusable
    ///
    /// The replay engine keeps going after a recoverable step failure (unless
    /// configured as strict) and stops after a non-recoverable one.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RetraceError::TargetUnresolvable { .. }
                | RetraceError::OutOfOrder { .. }
                | RetraceError::LocatorNotFound { .. }
                | RetraceError::UnknownActionKind { .. }
                | RetraceError::DriverError { .. }
                | RetraceError::StorageLocked
        )
    }

    /// Returns true if this error must abort a replay run before any step executes
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            RetraceError::SessionUnavailable { .. } | RetraceError::InvalidArtifact { .. }
        )
    }

    /// Returns the error category for grouping
    pub fn category(&self) -> ErrorCategory {
        match self {
            RetraceError::TargetUnresolvable { .. }
            | RetraceError::LocatorNotFound { .. }
            | RetraceError::EmptyLog => ErrorCategory::NotFound,

            RetraceError::OutOfOrder { .. }
            | RetraceError::UnknownActionKind { .. }
            | RetraceError::InvalidArtifact { .. }
            | RetraceError::InvalidConfig { .. } => ErrorCategory::Validation,

            RetraceError::InvalidSessionState { .. } => ErrorCategory::Conflict,

            RetraceError::SessionUnavailable { .. } | RetraceError::ControllerClosed => {
                ErrorCategory::Unavailable
            }

            RetraceError::StorageLocked | RetraceError::InternalError { .. } => {
                ErrorCategory::Internal
            }

            RetraceError::DriverError { .. }
            | RetraceError::TransportError { .. }
            | RetraceError::JsonError(_)
            | RetraceError::IoError { .. } => ErrorCategory::External,
        }
    }

    /// Returns the stable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            RetraceError::TargetUnresolvable { .. } => "TARGET_UNRESOLVABLE",
            RetraceError::EmptyLog => "EMPTY_LOG",
            RetraceError::OutOfOrder { .. } => "OUT_OF_ORDER",
            RetraceError::InvalidSessionState { .. } => "INVALID_SESSION_STATE",
            RetraceError::ControllerClosed => "CONTROLLER_CLOSED",
            RetraceError::LocatorNotFound { .. } => "LOCATOR_NOT_FOUND",
            RetraceError::SessionUnavailable { .. } => "SESSION_UNAVAILABLE",
            RetraceError::UnknownActionKind { .. } => "UNKNOWN_ACTION_KIND",
            RetraceError::DriverError { .. } => "DRIVER_ERROR",
            RetraceError::TransportError { .. } => "TRANSPORT_ERROR",
            RetraceError::InvalidArtifact { .. } => "INVALID_ARTIFACT",
            RetraceError::InvalidConfig { .. } => "INVALID_CONFIG",
            RetraceError::JsonError(_) => "JSON_ERROR",
            RetraceError::StorageLocked => "STORAGE_LOCKED",
            RetraceError::IoError { .. } => "IO_ERROR",
            RetraceError::InternalError { .. } => "INTERNAL_ERROR",
        }
    }

    /// Converts this error to a JSON-serializable response object
    ///
    /// ```json
    /// {
    ///   "error": {
    ///     "code": "EMPTY_LOG",
    ///     "message": "No recorded events found...",
    ///     "category": "not_found",
    ///     "recoverable": false
    ///   }
    /// }
    /// ```
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                category: self.category(),
                recoverable: self.is_recoverable(),
            },
        }
    }
}

/// JSON-serializable error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error detail for JSON responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable error code (e.g., "EMPTY_LOG")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Error category
    pub category: ErrorCategory,
    /// Whether skipping and retrying might succeed
    pub recoverable: bool,
}
