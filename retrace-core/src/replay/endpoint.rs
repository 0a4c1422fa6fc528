//! Remote session endpoints
//!
//! Acquiring a session (device farm, grid, local driver) is an external
//! concern. It only has to yield a routable URL, optionally with an expiry
//! after which the URL is no longer accepted.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;

use crate::error::{RetraceError, Result};

/// A routable WebDriver endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEndpoint {
    pub url: Url,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionEndpoint {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            expires_at: None,
        }
    }

    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| RetraceError::SessionUnavailable {
            reason: format!("invalid endpoint URL '{}': {}", url, e),
        })?;
        Ok(Self::new(url))
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Expire `ttl` after now
    pub fn expires_in(self, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now().checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.with_expiry(expires_at)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Fail with `SessionUnavailable` when the endpoint has expired
    pub fn ensure_usable(&self, now: DateTime<Utc>) -> Result<()> {
        if self.is_expired_at(now) {
            return Err(RetraceError::SessionUnavailable {
                reason: format!("endpoint {} expired", self.url),
            });
        }
        Ok(())
    }

    /// Join a path below the endpoint, keeping any base path (`/wd/hub`)
    pub fn join(&self, path: &str) -> Result<Url> {
        let mut base = self.url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| RetraceError::InternalError {
                reason: format!("cannot build URL for '{}': {}", path, e),
            })
    }
}

/// `acquireSessionEndpoint() -> URL`
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn acquire_session_endpoint(&self) -> Result<SessionEndpoint>;

    fn name(&self) -> &'static str;
}

/// Provider that always hands out one configured endpoint
#[derive(Debug, Clone)]
pub struct StaticEndpoint {
    endpoint: SessionEndpoint,
}

impl StaticEndpoint {
    pub fn new(endpoint: SessionEndpoint) -> Self {
        Self { endpoint }
    }

    pub fn parse(url: &str) -> Result<Self> {
        Ok(Self::new(SessionEndpoint::parse(url)?))
    }
}

#[async_trait]
impl SessionProvider for StaticEndpoint {
    async fn acquire_session_endpoint(&self) -> Result<SessionEndpoint> {
        self.endpoint.ensure_usable(Utc::now())?;
        Ok(self.endpoint.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
