//! Recording test doubles for replay
//!
//! `MockDriver` records every command, answers element lookups from a
//! configured selector → match count table, and returns deterministic PNG
//! bytes derived from the page state. Clones share state, so a test keeps
//! one handle while the engine owns another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::driver::{BrowserDriver, DriverConnector, ElementRef};
use super::endpoint::{SessionEndpoint, SessionProvider};
use crate::config::ReplayConfig;
use crate::error::{RetraceError, Result};

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

type FailureFactory = Arc<dyn Fn() -> RetraceError + Send + Sync>;

/// A command the engine sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Navigate(String),
    ExecuteScript(String),
    FindElements(String),
    Click(String),
    Clear(String),
    SendKeys(String, String),
    Screenshot,
    Quit,
}

impl DriverCall {
    pub fn name(&self) -> &'static str {
        match self {
            DriverCall::Navigate(_) => "navigate",
            DriverCall::ExecuteScript(_) => "execute_script",
            DriverCall::FindElements(_) => "find_elements",
            DriverCall::Click(_) => "click",
            DriverCall::Clear(_) => "clear",
            DriverCall::SendKeys(_, _) => "send_keys",
            DriverCall::Screenshot => "screenshot",
            DriverCall::Quit => "quit",
        }
    }
}

#[derive(Default)]
struct MockState {
    calls: RwLock<Vec<DriverCall>>,
    elements: RwLock<HashMap<String, usize>>,
    failures: RwLock<HashMap<&'static str, FailureFactory>>,
    page: RwLock<String>,
}

/// In-memory browser driver
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `selector` match `count` elements
    pub fn with_elements(self, selector: &str, count: usize) -> Self {
        if let Ok(mut elements) = self.state.elements.write() {
            elements.insert(selector.to_string(), count);
        }
        self
    }

    /// Make every `command` (see [`DriverCall::name`]) fail
    pub fn fail_on<F>(self, command: &'static str, make_error: F) -> Self
    where
        F: Fn() -> RetraceError + Send + Sync + 'static,
    {
        if let Ok(mut failures) = self.state.failures.write() {
            failures.insert(command, Arc::new(make_error));
        }
        self
    }

    /// Every command received so far, in order
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// Commands other than screenshots and element lookups
    pub fn actions(&self) -> Vec<DriverCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, DriverCall::Screenshot | DriverCall::FindElements(_)))
            .collect()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls().iter().filter(|c| c.name() == command).count()
    }

    pub fn quit_count(&self) -> usize {
        self.count("quit")
    }

    fn record(&self, call: DriverCall) -> Result<()> {
        let name = call.name();
        if let Ok(mut calls) = self.state.calls.write() {
            calls.push(call);
        }
        let failure = self
            .state
            .failures
            .read()
            .ok()
            .and_then(|f| f.get(name).cloned());
        match failure {
            Some(make_error) => Err(make_error()),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDriver").field("calls", &self.calls().len()).finish()
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(DriverCall::Navigate(url.to_string()))?;
        if let Ok(mut page) = self.state.page.write() {
            *page = url.to_string();
        }
        Ok(())
    }

    async fn execute_script(&self, script: &str, _args: Vec<Value>) -> Result<Value> {
        self.record(DriverCall::ExecuteScript(script.to_string()))?;
        Ok(Value::Null)
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<ElementRef>> {
        self.record(DriverCall::FindElements(selector.to_string()))?;
        let count = self
            .state
            .elements
            .read()
            .ok()
            .and_then(|e| e.get(selector).copied())
            .unwrap_or(0);
        Ok((0..count)
            .map(|i| ElementRef::new(format!("{}[{}]", selector, i)))
            .collect())
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.record(DriverCall::Click(element.id().to_string()))
    }

    async fn clear(&self, element: &ElementRef) -> Result<()> {
        self.record(DriverCall::Clear(element.id().to_string()))
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.record(DriverCall::SendKeys(element.id().to_string(), text.to_string()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.record(DriverCall::Screenshot)?;
        let page = self.state.page.read().map(|p| p.clone()).unwrap_or_default();
        let mut png = PNG_MAGIC.to_vec();
        png.extend_from_slice(page.as_bytes());
        Ok(png)
    }

    async fn quit(&self) -> Result<()> {
        self.record(DriverCall::Quit)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Connector that hands out a shared [`MockDriver`]
#[derive(Debug)]
pub struct MockConnector {
    driver: MockDriver,
    refuse: Option<String>,
    connects: AtomicUsize,
}

impl MockConnector {
    pub fn new(driver: MockDriver) -> Self {
        Self {
            driver,
            refuse: None,
            connects: AtomicUsize::new(0),
        }
    }

    /// Connector whose every connection attempt is rejected
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self {
            driver: MockDriver::new(),
            refuse: Some(reason.into()),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DriverConnector for MockConnector {
    async fn connect(
        &self,
        _endpoint: &SessionEndpoint,
        _config: &ReplayConfig,
    ) -> Result<Box<dyn BrowserDriver>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.refuse {
            return Err(RetraceError::DriverError {
                command: "new_session".to_string(),
                reason: reason.clone(),
            });
        }
        Ok(Box::new(self.driver.clone()))
    }
}

/// Provider that never has a session
#[derive(Debug, Clone)]
pub struct UnavailableProvider {
    reason: String,
}

impl UnavailableProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SessionProvider for UnavailableProvider {
    async fn acquire_session_endpoint(&self) -> Result<SessionEndpoint> {
        Err(RetraceError::SessionUnavailable {
            reason: self.reason.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
