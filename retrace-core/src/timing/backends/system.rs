//! Real-time backends

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::timing::{Clock, Delay};

/// Wall clock backed by the system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock pinned to one instant
///
/// Used when capturing prerecorded events offline, where the events carry
/// their own timestamps and "now" is the start of the recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(i64);

impl FixedClock {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// Delay backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

impl TokioDelay {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Delay for TokioDelay {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    fn name(&self) -> &'static str {
        "tokio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_current() {
        let before = Utc::now().timestamp_millis();
        let now = SystemClock::new().now_millis();
        assert!(now >= before);
    }

    #[test]
    fn test_fixed_clock() {
        assert_eq!(FixedClock::new(42).now_millis(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_delay_advances_time() {
        let start = tokio::time::Instant::now();
        TokioDelay::new().pause(Duration::from_millis(1000)).await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }
}
