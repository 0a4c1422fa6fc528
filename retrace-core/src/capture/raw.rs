//! Raw capture-side events
//!
//! Three sources feed the normalizer:
//!
//! - [`RawEvent`]: events from the underlying page recorder, in the
//!   recorder's own wire shape (`{"type": <code>, "data": {...}, "timestamp"}`),
//!   with target nodes referenced by mirror id
//! - [`DomInputEvent`]: the direct `input` listener on the document
//! - [`HistorySignal`]: hash changes and popstate from the history API
//!
//! Raw payloads are loosely typed on purpose. Missing fields fall back to
//! defaults instead of failing, so a malformed event can at worst be dropped.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::action::Coordinates;
use super::locator::Element;

/// Category of a recorder event, keyed by the recorder's numeric type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum RawKind {
    /// Pointer interaction (click); code 2
    Pointer,
    /// Scroll delta; code 3
    Scroll,
    /// Navigation / page meta signal; code 4
    Navigation,
    /// Text mutation on an input element; code 5
    InputMutation,
    /// Anything else the recorder emits
    Other(u8),
}

impl RawKind {
    pub fn code(&self) -> u8 {
        match self {
            RawKind::Pointer => 2,
            RawKind::Scroll => 3,
            RawKind::Navigation => 4,
            RawKind::InputMutation => 5,
            RawKind::Other(code) => *code,
        }
    }
}

impl From<u8> for RawKind {
    fn from(code: u8) -> Self {
        match code {
            2 => RawKind::Pointer,
            3 => RawKind::Scroll,
            4 => RawKind::Navigation,
            5 => RawKind::InputMutation,
            other => RawKind::Other(other),
        }
    }
}

impl From<RawKind> for u8 {
    fn from(kind: RawKind) -> Self {
        kind.code()
    }
}

/// Event as emitted by the page recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub kind: RawKind,

    #[serde(default)]
    pub data: Value,

    pub timestamp: i64,
}

impl RawEvent {
    pub fn new(kind: RawKind, data: Value, timestamp: i64) -> Self {
        Self {
            kind,
            data,
            timestamp,
        }
    }

    pub fn pointer(node_id: u64, x: i64, y: i64, timestamp: i64) -> Self {
        Self::new(RawKind::Pointer, json!({"id": node_id, "x": x, "y": y}), timestamp)
    }

    pub fn scroll(x: i64, y: i64, timestamp: i64) -> Self {
        Self::new(RawKind::Scroll, json!({"x": x, "y": y}), timestamp)
    }

    pub fn input(node_id: u64, text: &str, timestamp: i64) -> Self {
        Self::new(RawKind::InputMutation, json!({"id": node_id, "text": text}), timestamp)
    }

    pub fn navigation(href: &str, timestamp: i64) -> Self {
        Self::new(RawKind::Navigation, json!({"href": href}), timestamp)
    }

    /// Mirror id of the target node, if the payload carries one
    pub fn node_id(&self) -> Option<u64> {
        self.data.get("id").and_then(Value::as_u64)
    }

    /// Position from `data.x`/`data.y`, missing values as zero
    pub fn coordinates(&self) -> Coordinates {
        let axis = |name: &str| {
            self.data
                .get(name)
                .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
                .unwrap_or(0)
        };
        Coordinates::clamped(axis("x"), axis("y"))
    }

    /// Text payload of an input mutation, empty when absent
    pub fn text(&self) -> &str {
        self.data.get("text").and_then(Value::as_str).unwrap_or("")
    }

    /// Navigation target, when the recorder supplied one
    pub fn href(&self) -> Option<&str> {
        self.data
            .get("href")
            .and_then(Value::as_str)
            .filter(|href| !href.is_empty())
    }
}

/// An `input` DOM event observed directly on the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomInputEvent {
    /// The event target; `None` when the node was already detached
    #[serde(default)]
    pub target: Option<Element>,
    #[serde(default)]
    pub value: String,
    pub timestamp: i64,
}

/// What triggered a history change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryCause {
    HashChange,
    PopState,
}

/// Browser history change observed without a full page load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySignal {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub cause: HistoryCause,
    pub timestamp: i64,
}
