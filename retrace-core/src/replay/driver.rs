//! Remote browser driver seam
//!
//! The engine only talks to [`BrowserDriver`]. The HTTP WebDriver client and
//! the recording mock both implement it.

use async_trait::async_trait;
use serde_json::Value;

use super::endpoint::SessionEndpoint;
use crate::capture::Coordinates;
use crate::config::ReplayConfig;
use crate::error::Result;

/// Opaque handle to an element inside the remote page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// One live remote browser session
///
/// Methods take `&self`; a driver is owned by exactly one replay run and is
/// never used concurrently, but implementations may hold shared clients.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Load `url` and return once the page has loaded
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Run a synchronous script in the page
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// All elements matching a CSS selector, in document order
    async fn find_elements(&self, selector: &str) -> Result<Vec<ElementRef>>;

    async fn click(&self, element: &ElementRef) -> Result<()>;

    async fn clear(&self, element: &ElementRef) -> Result<()>;

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()>;

    /// PNG bytes of the current viewport
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Release the remote session
    async fn quit(&self) -> Result<()>;

    /// Backend name (for logging)
    fn name(&self) -> &'static str;
}

/// Opens a [`BrowserDriver`] on an acquired endpoint
#[async_trait]
pub trait DriverConnector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &SessionEndpoint,
        config: &ReplayConfig,
    ) -> Result<Box<dyn BrowserDriver>>;
}

/// In-page script that restores a scroll position
pub fn scroll_script(coordinates: Coordinates) -> String {
    format!("window.scrollTo({}, {});", coordinates.x, coordinates.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_script() {
        assert_eq!(scroll_script(Coordinates::new(0, 480)), "window.scrollTo(0, 480);");
    }
}
