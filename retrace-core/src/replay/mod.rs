//! Deterministic replay
//!
//! Re-executes a recorded action sequence against a freshly acquired remote
//! browser session and captures a screenshot after every step:
//!
//! ```text
//! artifact ──► ReplayEngine::run
//!                 │ acquire endpoint (SessionProvider)
//!                 │ connect           (DriverConnector → BrowserDriver)
//!                 │ for each record:  Idle → Executing → Captured
//!                 │                   screenshots/{baseline|current}/step-N.png
//!                 └ quit              (always, once connected)
//! ```

pub mod driver;
pub mod endpoint;
pub mod engine;
pub mod mock;
pub mod report;
pub mod screenshot;
#[cfg(feature = "webdriver")]
pub mod webdriver;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use driver::{scroll_script, BrowserDriver, DriverConnector, ElementRef};
pub use endpoint::{SessionEndpoint, SessionProvider, StaticEndpoint};
pub use engine::{ReplayContext, ReplayEngine, StepState};
pub use report::{ReplayOutcome, ReplayReport, StepReport, StepStatus};
pub use screenshot::ScreenshotStore;
#[cfg(feature = "webdriver")]
pub use webdriver::{WebDriverConnector, WebDriverSession};

/// Which screenshot partition a run writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Reference screenshots
    Baseline,
    /// Screenshots to compare against the baseline
    #[default]
    Current,
}

impl RunMode {
    pub fn from_baseline_flag(baseline: bool) -> Self {
        if baseline {
            RunMode::Baseline
        } else {
            RunMode::Current
        }
    }

    pub fn dir_name(&self) -> &'static str {
        match self {
            RunMode::Baseline => "baseline",
            RunMode::Current => "current",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}
