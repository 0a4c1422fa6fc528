//! Canonical action records
//!
//! These are the only units stored in the event log and the only thing the
//! replay side ever reads. The serialized form is the artifact contract:
//! an object per record with an `action` discriminator and camelCase fields.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Viewport or scroll position in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: u32,
    pub y: u32,
}

impl Coordinates {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Build from raw signed values, clamping negatives to zero
    pub fn clamped(x: i64, y: i64) -> Self {
        Self {
            x: x.clamp(0, u32::MAX as i64) as u32,
            y: y.clamp(0, u32::MAX as i64) as u32,
        }
    }

    /// The origin, where every page starts scrolled
    pub const fn origin() -> Self {
        Self { x: 0, y: 0 }
    }
}

/// One canonical, replay-ready unit of captured user interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ActionRecord {
    Click {
        locator: String,
        #[serde(
            rename = "elementText",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        element_text: Option<String>,
        coordinates: Coordinates,
        timestamp: i64,
    },
    Input {
        locator: String,
        value: String,
        timestamp: i64,
    },
    Scroll {
        coordinates: Coordinates,
        timestamp: i64,
    },
    Navigate {
        url: String,
        #[serde(rename = "pageTitle", default)]
        page_title: String,
        timestamp: i64,
    },
}

impl ActionRecord {
    pub fn click(locator: impl Into<String>, coordinates: Coordinates, timestamp: i64) -> Self {
        ActionRecord::Click {
            locator: locator.into(),
            element_text: None,
            coordinates,
            timestamp,
        }
    }

    pub fn input(locator: impl Into<String>, value: impl Into<String>, timestamp: i64) -> Self {
        ActionRecord::Input {
            locator: locator.into(),
            value: value.into(),
            timestamp,
        }
    }

    pub fn scroll(coordinates: Coordinates, timestamp: i64) -> Self {
        ActionRecord::Scroll {
            coordinates,
            timestamp,
        }
    }

    pub fn navigate(url: impl Into<String>, page_title: impl Into<String>, timestamp: i64) -> Self {
        ActionRecord::Navigate {
            url: url.into(),
            page_title: page_title.into(),
            timestamp,
        }
    }

    /// Attach the visible text of the clicked element
    pub fn with_element_text(mut self, text: impl Into<String>) -> Self {
        if let ActionRecord::Click { element_text, .. } = &mut self {
            *element_text = Some(text.into());
        }
        self
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRecord::Click { .. } => ActionKind::Click,
            ActionRecord::Input { .. } => ActionKind::Input,
            ActionRecord::Scroll { .. } => ActionKind::Scroll,
            ActionRecord::Navigate { .. } => ActionKind::Navigate,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            ActionRecord::Click { timestamp, .. }
            | ActionRecord::Input { timestamp, .. }
            | ActionRecord::Scroll { timestamp, .. }
            | ActionRecord::Navigate { timestamp, .. } => *timestamp,
        }
    }

    /// Locator of the target element, for kinds that have one
    pub fn locator(&self) -> Option<&str> {
        match self {
            ActionRecord::Click { locator, .. } | ActionRecord::Input { locator, .. } => {
                Some(locator)
            }
            _ => None,
        }
    }

    /// Destination URL, for navigations
    pub fn url(&self) -> Option<&str> {
        match self {
            ActionRecord::Navigate { url, .. } => Some(url),
            _ => None,
        }
    }

    /// True for records that reflect something the user did to the page,
    /// as opposed to page-state captures
    pub fn is_interaction(&self) -> bool {
        !matches!(self, ActionRecord::Navigate { .. })
    }
}

/// Discriminator of an [`ActionRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Input,
    Scroll,
    Navigate,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Input => "input",
            ActionKind::Scroll => "scroll",
            ActionKind::Navigate => "navigate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "click" => Some(ActionKind::Click),
            "input" => Some(ActionKind::Input),
            "scroll" => Some(ActionKind::Scroll),
            "navigate" => Some(ActionKind::Navigate),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
