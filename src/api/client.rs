//! redirect.pizza API client implementation.
//!
//! This module provides the HTTP client for the remote REST API. Each call
//! is a single round trip; nothing is retried here.

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::TOKEN_ENV;
use crate::error::{ApiError, ApiResult, ConfigError, RedirectError, Result};

use super::codec;
use super::types::{RedirectId, RemoteRedirect};

/// Production API base URL.
pub const DEFAULT_BASE_URL: &str = "https://redirect.pizza/api/";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Placeholder reported when an error body cannot be read.
const UNREADABLE_BODY: &str = "<cannot read>";

/// The four remote operations on a single redirect.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedirectApi: Send + Sync {
    /// Creates a redirect. Succeeds only on `201 Created`.
    async fn create(&self, body: Vec<u8>) -> ApiResult<RemoteRedirect>;

    /// Fetches a redirect. Succeeds only on `200 OK`.
    async fn fetch(&self, id: &RedirectId) -> ApiResult<RemoteRedirect>;

    /// Replaces a redirect wholesale. Succeeds only on `200 OK`.
    async fn replace(&self, id: &RedirectId, body: Vec<u8>) -> ApiResult<RemoteRedirect>;

    /// Deletes a redirect. Succeeds only on `204 No Content`.
    async fn delete(&self, id: &RedirectId) -> ApiResult<()>;
}

/// Connection settings for one deployment of the API.
#[derive(Clone)]
pub struct ClientConfig {
    /// Bearer token. Never logged.
    token: String,
    /// Base URL, always ending in `/`.
    base_url: String,
    /// User-Agent header value.
    user_agent: String,
    /// Transport-level timeout.
    timeout: Duration,
}

// Custom Debug implementation that hides the token
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Creates a configuration targeting the production endpoint.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: default_user_agent(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Overrides the base URL, e.g. for a staging environment.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    /// Overrides the User-Agent header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Overrides the transport timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the User-Agent header value.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

/// Builds the default User-Agent from the crate version.
#[must_use]
pub fn default_user_agent() -> String {
    format!("redirectpizza/{}", env!("CARGO_PKG_VERSION"))
}

/// redirect.pizza API client.
#[derive(Debug, Clone)]
pub struct RedirectClient {
    /// HTTP client.
    client: Client,
    /// Connection settings.
    config: ClientConfig,
}

impl RedirectClient {
    /// Creates a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.token.is_empty() {
            return Err(RedirectError::Config(ConfigError::MissingEnvVar {
                name: String::from(TOKEN_ENV),
            }));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Returns the connection settings.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn collection_url(&self) -> String {
        format!("{}v1/redirects", self.config.base_url)
    }

    fn resource_url(&self, id: &RedirectId) -> String {
        format!("{}v1/redirects/{id}", self.config.base_url)
    }

    /// Starts a request carrying the credential and client identifier.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.token))
            .header(header::USER_AGENT, &self.config.user_agent)
            .header(header::ACCEPT, "application/json")
    }

    /// Sends a request and returns the body if the status is exactly `expected`.
    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> ApiResult<Vec<u8>> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::transport(e.to_string()))?;

        let status = response.status();
        trace!("{operation} answered with {status}");

        if status != expected {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from(UNREADABLE_BODY));
            return Err(ApiError::UnexpectedStatus {
                operation,
                expected: expected.as_u16(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::transport(format!("Cannot read response body: {e}")))?;

        Ok(body.to_vec())
    }
}

#[async_trait]
impl RedirectApi for RedirectClient {
    async fn create(&self, body: Vec<u8>) -> ApiResult<RemoteRedirect> {
        debug!("POST {}", self.collection_url());
        let request = self
            .request(Method::POST, &self.collection_url())
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);

        let body = self.execute("create", request, StatusCode::CREATED).await?;
        Ok(codec::decode(&body)?)
    }

    async fn fetch(&self, id: &RedirectId) -> ApiResult<RemoteRedirect> {
        debug!("GET {}", self.resource_url(id));
        let request = self.request(Method::GET, &self.resource_url(id));

        let body = self.execute("fetch", request, StatusCode::OK).await?;
        Ok(codec::decode(&body)?)
    }

    async fn replace(&self, id: &RedirectId, body: Vec<u8>) -> ApiResult<RemoteRedirect> {
        debug!("PUT {}", self.resource_url(id));
        let request = self
            .request(Method::PUT, &self.resource_url(id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);

        let body = self.execute("replace", request, StatusCode::OK).await?;
        Ok(codec::decode(&body)?)
    }

    async fn delete(&self, id: &RedirectId) -> ApiResult<()> {
        debug!("DELETE {}", self.resource_url(id));
        let request = self.request(Method::DELETE, &self.resource_url(id));

        self.execute("delete", request, StatusCode::NO_CONTENT)
            .await
            .map(|_| ())
    }
}
