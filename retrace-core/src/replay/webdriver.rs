//! W3C WebDriver client
//!
//! Speaks the WebDriver HTTP protocol to a remote end (grid, device farm or
//! a local chromedriver). Every response wraps its payload in `value`;
//! failures carry `value.error` and `value.message`.

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::debug;

use super::driver::{BrowserDriver, DriverConnector, ElementRef};
use super::endpoint::SessionEndpoint;
use crate::config::ReplayConfig;
use crate::error::{RetraceError, Result};

/// Web element identifier key from the W3C WebDriver protocol
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
/// Key used by pre-W3C remote ends
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Remote error codes after which no further command on the session can succeed
const SESSION_LOST: [&str; 2] = ["invalid session id", "session not created"];

/// An open WebDriver session
#[derive(Debug, Clone)]
pub struct WebDriverSession {
    client: Client,
    endpoint: SessionEndpoint,
    session_id: String,
}

impl WebDriverSession {
    /// `POST /session` with the configured browser
    pub async fn create(
        client: Client,
        endpoint: SessionEndpoint,
        browser_name: &str,
    ) -> Result<Self> {
        let body = json!({
            "capabilities": {
                "alwaysMatch": { "browserName": browser_name }
            }
        });
        let url = endpoint.join("session")?;
        let response = send(&client, Method::POST, url, Some(body), "new_session").await?;

        let session_id = response
            .get("value")
            .and_then(|v| v.get("sessionId"))
            .or_else(|| response.get("sessionId"))
            .and_then(Value::as_str)
            .ok_or_else(|| RetraceError::DriverError {
                command: "new_session".to_string(),
                reason: "response carries no sessionId".to_string(),
            })?
            .to_string();

        debug!(session_id = %session_id, endpoint = %endpoint.url, "WebDriver session created");
        Ok(Self {
            client,
            endpoint,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        name: &str,
    ) -> Result<Value> {
        let url = self
            .endpoint
            .join(&format!("session/{}/{}", self.session_id, path.trim_start_matches('/')))?;
        let response = send(&self.client, method, url, body, name).await?;
        Ok(response.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn element_command(
        &self,
        element: &ElementRef,
        action: &str,
        body: Value,
        name: &str,
    ) -> Result<()> {
        self.command(
            Method::POST,
            &format!("element/{}/{}", element.id(), action),
            Some(body),
            name,
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.command(Method::POST, "url", Some(json!({ "url": url })), "navigate")
            .await?;
        Ok(())
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.command(
            Method::POST,
            "execute/sync",
            Some(json!({ "script": script, "args": args })),
            "execute_script",
        )
        .await
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<ElementRef>> {
        let value = self
            .command(
                Method::POST,
                "elements",
                Some(json!({ "using": "css selector", "value": selector })),
                "find_elements",
            )
            .await?;

        let items = value.as_array().cloned().unwrap_or_default();
        Ok(items
            .iter()
            .filter_map(|item| {
                item.get(ELEMENT_KEY)
                    .or_else(|| item.get(LEGACY_ELEMENT_KEY))
                    .and_then(Value::as_str)
                    .map(ElementRef::new)
            })
            .collect())
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.element_command(element, "click", json!({}), "click").await
    }

    async fn clear(&self, element: &ElementRef) -> Result<()> {
        self.element_command(element, "clear", json!({}), "clear").await
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.element_command(element, "value", json!({ "text": text }), "send_keys")
            .await
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let value = self.command(Method::GET, "screenshot", None, "screenshot").await?;
        let encoded = value.as_str().ok_or_else(|| RetraceError::DriverError {
            command: "screenshot".to_string(),
            reason: "expected a base64 string".to_string(),
        })?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| RetraceError::DriverError {
                command: "screenshot".to_string(),
                reason: format!("invalid base64: {}", e),
            })
    }

    async fn quit(&self) -> Result<()> {
        let url = self.endpoint.join(&format!("session/{}", self.session_id))?;
        send(&self.client, Method::DELETE, url, None, "delete_session").await?;
        debug!(session_id = %self.session_id, "WebDriver session deleted");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webdriver"
    }
}

/// Opens [`WebDriverSession`]s over HTTP
#[derive(Debug, Clone, Default)]
pub struct WebDriverConnector {
    client: Option<Client>,
}

impl WebDriverConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured HTTP client instead of one built from the config
    pub fn with_client(client: Client) -> Self {
        Self {
            client: Some(client),
        }
    }
}

#[async_trait]
impl DriverConnector for WebDriverConnector {
    async fn connect(
        &self,
        endpoint: &SessionEndpoint,
        config: &ReplayConfig,
    ) -> Result<Box<dyn BrowserDriver>> {
        let client = match &self.client {
            Some(client) => client.clone(),
            None => Client::builder()
                .connect_timeout(config.connection_timeout())
                .timeout(config.request_timeout())
                .build()
                .map_err(|e| RetraceError::TransportError {
                    message: format!("cannot build HTTP client: {}", e),
                })?,
        };
        let session =
            WebDriverSession::create(client, endpoint.clone(), &config.browser_name).await?;
        Ok(Box::new(session))
    }
}

async fn send(
    client: &Client,
    method: Method,
    url: url::Url,
    body: Option<Value>,
    name: &str,
) -> Result<Value> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await.map_err(|e| RetraceError::TransportError {
        message: format!("{}: {}", name, e),
    })?;
    let status = response.status();
    let text = response.text().await.map_err(|e| RetraceError::TransportError {
        message: format!("{}: {}", name, e),
    })?;
    let payload: Value = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).map_err(|e| RetraceError::DriverError {
            command: name.to_string(),
            reason: format!("malformed response ({}): {}", status, e),
        })?
    };

    if !status.is_success() {
        let error = payload
            .pointer("/value/error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let message = payload
            .pointer("/value/message")
            .and_then(Value::as_str)
            .unwrap_or("");
        let reason = format!("{} ({}): {}", error, status.as_u16(), message);
        if SESSION_LOST.contains(&error) {
            return Err(RetraceError::SessionUnavailable {
                reason: format!("{}: {}", name, reason),
            });
        }
        return Err(RetraceError::DriverError {
            command: name.to_string(),
            reason,
        });
    }

    Ok(payload)
}
