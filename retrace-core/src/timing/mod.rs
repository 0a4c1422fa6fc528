//! # Clocks and delays
//!
//! Capture stamps every record with wall-clock milliseconds, and replay
//! pauses between steps so the page can settle. Both go through traits so
//! tests never depend on real time:
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │  CaptureSession      │      │  ReplayEngine        │
//! │  (record timestamps) │      │  (settle delay)      │
//! └──────────┬───────────┘      └──────────┬───────────┘
//!            ▼                             ▼
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │  Clock (trait)       │      │  Delay (trait)       │
//! ├───────────┬──────────┤      ├───────────┬──────────┤
//! │SystemClock│MockClock │      │TokioDelay │MockDelay │
//! └───────────┴──────────┘      └───────────┴──────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use retrace_core::timing::{Clock, backends::MockClock};
//!
//! let clock = MockClock::new(1_000);
//! clock.advance(250);
//! assert_eq!(clock.now_millis(), 1_250);
//! ```

pub mod backends;

use std::time::Duration;

use async_trait::async_trait;

pub use backends::{FixedClock, MockClock, MockDelay, SystemClock, TokioDelay};

/// Source of wall-clock time in milliseconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Asynchronous pause
#[async_trait]
pub trait Delay: Send + Sync {
    async fn pause(&self, duration: Duration);

    /// Backend name (for logging)
    fn name(&self) -> &'static str;
}
