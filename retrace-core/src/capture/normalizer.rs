//! Event normalizer
//!
//! Turns the three raw event sources into canonical [`ActionRecord`]s:
//!
//! ```text
//! RawEvent ─────────┐
//! DomInputEvent ────┼──► classify ──► screen (dedup) ──► ActionRecord
//! HistorySignal ────┘       │
//!                           └── dropped (logged): unresolvable target,
//!                               unknown category, insignificant scroll
//! ```
//!
//! The normalizer never fails outward. Anything it cannot turn into a
//! record is logged and yields `None`.
//!
//! Text input is observed twice (the document `input` listener and the
//! recorder's input mutation), and navigation can be observed twice (the
//! recorder's navigation event and a history signal). Both duplicates are
//! collapsed before a record is proposed:
//!
//! - an `Input` is suppressed when the previous committed input had the same
//!   locator and value and lies within the dedup window
//! - a `Navigate` is suppressed when the previous committed record is a
//!   `Navigate` to the same URL
//!
//! Translation is split in two. The `propose*` methods classify and screen
//! a candidate without touching dedup or scroll state; [`Normalizer::commit`]
//! advances that state once the record is actually stored. A record the log
//! rejects therefore never shadows a later one. The one-step methods
//! (`normalize`, `on_dom_input`, `on_history_change`, `navigate_to`) do both
//! for callers with no log in between.

use tracing::{debug, trace};

use super::action::{ActionRecord, Coordinates};
use super::debounce::ScrollDebouncer;
use super::locator::{Element, Locator};
use super::mirror::PageView;
use super::raw::{DomInputEvent, HistorySignal, RawEvent, RawKind};
use crate::config::CaptureConfig;
use crate::error::{RetraceError, Result};

/// Counters for what the normalizer did with its input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizerStats {
    pub emitted: u64,
    pub unresolvable: u64,
    pub unknown: u64,
    pub debounced: u64,
    pub duplicates: u64,
}

#[derive(Debug, Clone)]
struct LastInput {
    locator: String,
    value: String,
    timestamp: i64,
}

/// Raw event → canonical record translation with per-session state
#[derive(Debug, Clone)]
pub struct Normalizer {
    debouncer: ScrollDebouncer,
    dedup_window_ms: i64,
    last_input: Option<LastInput>,
    last_committed: Option<ActionRecord>,
    stats: NormalizerStats,
}

impl Normalizer {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            debouncer: ScrollDebouncer::new(config.scroll_threshold),
            dedup_window_ms: config.input_dedup_window_ms as i64,
            last_input: None,
            last_committed: None,
            stats: NormalizerStats::default(),
        }
    }

    /// Continue after a page reload: dedup state picks up from the last
    /// persisted record, the scroll position starts over at the origin
    pub fn seed(&mut self, last: Option<&ActionRecord>) {
        self.debouncer.reset();
        self.last_input = match last {
            Some(ActionRecord::Input {
                locator,
                value,
                timestamp,
            }) => Some(LastInput {
                locator: locator.clone(),
                value: value.clone(),
                timestamp: *timestamp,
            }),
            _ => None,
        };
        self.last_committed = last.cloned();
    }

    pub fn stats(&self) -> NormalizerStats {
        self.stats
    }

    /// Translate one recorder event
    pub fn normalize(&mut self, raw: &RawEvent, page: &dyn PageView) -> Option<ActionRecord> {
        let record = self.propose(raw, page)?;
        self.commit(&record);
        Some(record)
    }

    /// Translate a document-level `input` event
    pub fn on_dom_input(&mut self, event: &DomInputEvent) -> Option<ActionRecord> {
        let record = self.propose_dom_input(event)?;
        self.commit(&record);
        Some(record)
    }

    /// Translate a hash change or popstate
    pub fn on_history_change(&mut self, signal: &HistorySignal) -> Option<ActionRecord> {
        let record = self.propose_history(signal)?;
        self.commit(&record);
        Some(record)
    }

    /// Synthesize a navigation (session start, resume and stop)
    pub fn navigate_to(&mut self, url: &str, title: &str, timestamp: i64) -> Option<ActionRecord> {
        let record = self.propose_navigation(url, title, timestamp)?;
        self.commit(&record);
        Some(record)
    }

    /// Candidate record for a recorder event; state is left as it was
    pub fn propose(&mut self, raw: &RawEvent, page: &dyn PageView) -> Option<ActionRecord> {
        match self.classify(raw, page) {
            Ok(Some(candidate)) => self.screen(candidate),
            Ok(None) => None,
            Err(err) => {
                self.note_drop(&err);
                None
            }
        }
    }

    pub fn propose_dom_input(&mut self, event: &DomInputEvent) -> Option<ActionRecord> {
        match locator_for(event.target.as_ref()) {
            Ok(locator) => {
                self.screen(ActionRecord::input(locator, event.value.clone(), event.timestamp))
            }
            Err(err) => {
                self.note_drop(&err);
                None
            }
        }
    }

    pub fn propose_history(&mut self, signal: &HistorySignal) -> Option<ActionRecord> {
        debug!(url = %signal.url, cause = ?signal.cause, "History change");
        self.propose_navigation(&signal.url, &signal.title, signal.timestamp)
    }

    pub fn propose_navigation(
        &mut self,
        url: &str,
        title: &str,
        timestamp: i64,
    ) -> Option<ActionRecord> {
        self.screen(ActionRecord::navigate(url, title, timestamp))
    }

    /// Advance dedup and scroll state past a stored record
    pub fn commit(&mut self, record: &ActionRecord) {
        match record {
            ActionRecord::Input {
                locator,
                value,
                timestamp,
            } => {
                self.last_input = Some(LastInput {
                    locator: locator.clone(),
                    value: value.clone(),
                    timestamp: *timestamp,
                });
            }
            ActionRecord::Scroll { coordinates, .. } => self.debouncer.mark(*coordinates),
            ActionRecord::Navigate { .. } => self.debouncer.reset(),
            ActionRecord::Click { .. } => {}
        }

        self.last_committed = Some(record.clone());
        self.stats.emitted += 1;
    }

    fn classify(&mut self, raw: &RawEvent, page: &dyn PageView) -> Result<Option<ActionRecord>> {
        match raw.kind {
            RawKind::Pointer => {
                let element = resolve(raw, page)?;
                let locator = locator_for(Some(&element))?;
                let text = element.inner_text.clone().unwrap_or_default();
                Ok(Some(
                    ActionRecord::click(locator, raw.coordinates(), raw.timestamp)
                        .with_element_text(text),
                ))
            }
            RawKind::Scroll => {
                let position: Coordinates = raw.coordinates();
                if self.debouncer.is_significant(position) {
                    Ok(Some(ActionRecord::scroll(position, raw.timestamp)))
                } else {
                    trace!(y = position.y, "Scroll below threshold");
                    self.stats.debounced += 1;
                    Ok(None)
                }
            }
            RawKind::InputMutation => {
                let element = resolve(raw, page)?;
                let locator = locator_for(Some(&element))?;
                Ok(Some(ActionRecord::input(locator, raw.text(), raw.timestamp)))
            }
            RawKind::Navigation => {
                let url = raw
                    .href()
                    .map(str::to_string)
                    .unwrap_or_else(|| page.location());
                Ok(Some(ActionRecord::navigate(url, page.title(), raw.timestamp)))
            }
            RawKind::Other(code) => Err(RetraceError::UnknownActionKind {
                kind: format!("raw type {}", code),
            }),
        }
    }

    /// Duplicate suppression shared by every source
    fn screen(&mut self, candidate: ActionRecord) -> Option<ActionRecord> {
        if self.is_duplicate(&candidate) {
            debug!(
                kind = %candidate.kind(),
                timestamp = candidate.timestamp(),
                "Suppressed duplicate"
            );
            self.stats.duplicates += 1;
            return None;
        }
        Some(candidate)
    }

    fn is_duplicate(&self, candidate: &ActionRecord) -> bool {
        match candidate {
            ActionRecord::Input {
                locator,
                value,
                timestamp,
            } => self.last_input.as_ref().is_some_and(|last| {
                last.locator == *locator
                    && last.value == *value
                    && (timestamp - last.timestamp).abs() <= self.dedup_window_ms
            }),
            ActionRecord::Navigate { url, .. } => matches!(
                &self.last_committed,
                Some(ActionRecord::Navigate { url: last, .. }) if last == url
            ),
            _ => false,
        }
    }

    fn note_drop(&mut self, err: &RetraceError) {
        match err {
            RetraceError::UnknownActionKind { .. } => {
                trace!(error = %err, "Ignoring raw event");
                self.stats.unknown += 1;
            }
            _ => {
                debug!(error = %err, "Dropping raw event");
                self.stats.unresolvable += 1;
            }
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&CaptureConfig::default())
    }
}

fn resolve(raw: &RawEvent, page: &dyn PageView) -> Result<Element> {
    let id = raw.node_id().ok_or_else(|| RetraceError::TargetUnresolvable {
        reason: "event carries no target node id".to_string(),
    })?;
    page.resolve_node(id)
        .ok_or_else(|| RetraceError::TargetUnresolvable {
            reason: format!("node {} is not in the page mirror", id),
        })
}

fn locator_for(element: Option<&Element>) -> Result<String> {
    let element = element.ok_or_else(|| RetraceError::TargetUnresolvable {
        reason: "event has no target element".to_string(),
    })?;
    Locator::for_element(element)
        .map(Locator::into_string)
        .ok_or_else(|| RetraceError::TargetUnresolvable {
            reason: format!("element <{}> has no usable id, class or tag", element.tag_name),
        })
}
