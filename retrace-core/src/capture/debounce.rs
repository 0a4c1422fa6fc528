//! Scroll debouncing
//!
//! Scroll signals fire continuously while the page moves. Only positions that
//! moved vertically by more than the threshold since the last *recorded*
//! position are kept. Horizontal-only scrolling is never recorded.

use super::action::Coordinates;

/// Default vertical distance, in pixels, a scroll must exceed to be recorded
pub const DEFAULT_SCROLL_THRESHOLD: u32 = 50;

/// Per-session scroll filter
#[derive(Debug, Clone)]
pub struct ScrollDebouncer {
    threshold: u32,
    last_recorded: Coordinates,
}

impl ScrollDebouncer {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            last_recorded: Coordinates::origin(),
        }
    }

    /// Returns true and remembers `position` when it is far enough from the
    /// last recorded position; leaves state untouched otherwise
    pub fn should_record(&mut self, position: Coordinates) -> bool {
        let significant = self.is_significant(position);
        if significant {
            self.mark(position);
        }
        significant
    }

    /// Whether `position` would be recorded, without remembering it
    pub fn is_significant(&self, position: Coordinates) -> bool {
        let distance = (i64::from(position.y) - i64::from(self.last_recorded.y)).abs();
        distance > i64::from(self.threshold)
    }

    /// Remember `position` as the last recorded one
    pub fn mark(&mut self, position: Coordinates) {
        self.last_recorded = position;
    }

    pub fn last_recorded(&self) -> Coordinates {
        self.last_recorded
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Forget the last position (a freshly loaded page starts at the origin)
    pub fn reset(&mut self) {
        self.last_recorded = Coordinates::origin();
    }
}

impl Default for ScrollDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_THRESHOLD)
    }
}
