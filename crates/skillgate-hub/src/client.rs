//! Skill hub client implementation.

use crate::config::RetryConfig;
use crate::error::{HubError, Result};
use crate::remote::RemoteSkill;
use reqwest::Client as HttpClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// The public hub
pub const DEFAULT_BASE_URL: &str = "https://hub.skillgate.dev";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for fetching skill packages from a hub
#[derive(Clone)]
pub struct HubClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    base_url: Url,
    retry_config: RetryConfig,
}

impl std::fmt::Debug for HubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("retry", &self.inner.retry_config)
            .finish_non_exhaustive()
    }
}

impl HubClient {
    /// Client for the public hub with default settings
    pub fn new() -> Result<Self> {
        HubClientBuilder::new().build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> HubClientBuilder {
        HubClientBuilder::new()
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Fetch one skill package by id.
    ///
    /// Transient failures are retried per the client's [`RetryConfig`].
    pub async fn fetch_skill(&self, id: &str) -> Result<RemoteSkill> {
        let url = self.skill_url(id)?;
        let retry = &self.inner.retry_config;
        let mut attempt = 0;
        loop {
            match self.get_skill(&url, id).await {
                Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                    let wait = retry.backoff_for(attempt);
                    warn!(url = %url, attempt, error = %e, "hub request failed; retrying in {wait:?}");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// `{base}/api/v1/skills/{id}` with the id as a single encoded segment
    fn skill_url(&self, id: &str) -> Result<Url> {
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
            return Err(HubError::InvalidId(id.to_string()));
        }
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| HubError::InvalidUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "v1", "skills", id]);
        Ok(url)
    }

    async fn get_skill(&self, url: &Url, id: &str) -> Result<RemoteSkill> {
        debug!(url = %url, "GET request");
        let response = self
            .inner
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(url, &e))?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(HubError::Json);
        }
        Err(status_error(status.as_u16(), id, body))
    }
}

fn transport_error(url: &Url, err: &reqwest::Error) -> HubError {
    if err.is_timeout() {
        HubError::Timeout {
            url: url.to_string(),
        }
    } else {
        HubError::Http(err.to_string())
    }
}

/// Map a non-success response, preferring an `{"error": "..."}` message
fn status_error(status: u16, id: &str, body: String) -> HubError {
    if status == 404 {
        return HubError::NotFound { id: id.to_string() };
    }
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or(body);
    HubError::Api { status, message }
}

/// Builder for configuring a [`HubClient`]
#[derive(Debug, Clone)]
pub struct HubClientBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: String,
    retry_config: RetryConfig,
}

impl Default for HubClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HubClientBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("skillgate/{}", env!("CARGO_PKG_VERSION")),
            retry_config: RetryConfig::default(),
        }
    }

    /// Set the base URL (useful for testing)
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set retry configuration
    #[must_use]
    pub const fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<HubClient> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| HubError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(HubError::InvalidUrl(self.base_url));
        }

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| HubError::Http(e.to_string()))?;

        Ok(HubClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                retry_config: self.retry_config,
            }),
        })
    }
}
