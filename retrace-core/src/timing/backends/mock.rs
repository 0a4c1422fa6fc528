//! Mock time backends for testing
//!
//! `MockClock` only moves when told to. `MockDelay` returns immediately and
//! records every requested pause for inspection.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::timing::{Clock, Delay};

/// Manually driven clock
#[derive(Debug, Default)]
pub struct MockClock {
    now: AtomicI64,
}

impl MockClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Delay that records pauses without waiting
#[derive(Debug, Default)]
pub struct MockDelay {
    pauses: RwLock<Vec<Duration>>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pause requested so far, in order
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.read().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.pauses.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn total(&self) -> Duration {
        self.pauses().into_iter().sum()
    }
}

#[async_trait]
impl Delay for MockDelay {
    async fn pause(&self, duration: Duration) {
        if let Ok(mut pauses) = self.pauses.write() {
            pauses.push(duration);
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
