//! DevTrack API client

pub mod auth;
pub mod contact;
pub mod courses;
pub mod error;
pub mod messaging;
pub mod notifications;
pub mod refresh;
pub mod reports;
pub mod request;
pub mod token;

use devtrack_core::{ClientConfig, CredentialVault, MemoryStore};
use error::ClientError;
use refresh::HttpTokenRefresher;
use request::ApiRequest;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use token::{TokenManager, TokenRefresher};
use tracing::debug;

const DEFAULT_USER_AGENT: &str = concat!("devtrack-client/", env!("CARGO_PKG_VERSION"));
const DEFAULT_REFRESH_PATH: &str = "/api/auth/token/refresh/";

/// DevTrack API client
///
/// Cheap to clone; clones share the connection pool and the
/// [`TokenManager`], so a refresh triggered through one clone serves
/// requests made through all of them.
#[derive(Clone)]
pub struct DevTrackClient {
    client: Client,
    base_url: String,
    tokens: Arc<TokenManager>,
    captcha_site_key: Option<String>,
}

impl std::fmt::Debug for DevTrackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevTrackClient")
            .field("base_url", &self.base_url)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl DevTrackClient {
    /// Create a new client with default configuration and in-memory credentials
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> DevTrackClientBuilder {
        DevTrackClientBuilder::default()
    }

    /// Create a client from loaded configuration
    pub fn from_config(
        config: &ClientConfig,
        vault: Arc<CredentialVault>,
    ) -> Result<Self, ClientError> {
        Self::builder()
            .base_url(&config.api_base_url)
            .timeout(config.request_timeout())
            .refresh_path(&config.refresh_path)
            .captcha_site_key(config.captcha_site_key.clone())
            .vault(vault)
            .build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub fn vault(&self) -> &Arc<CredentialVault> {
        self.tokens.vault()
    }

    /// Captcha site key from configuration, for front ends that render the widget
    pub fn captcha_site_key(&self) -> Option<&str> {
        self.captcha_site_key.as_deref()
    }

    /// Create a request builder for `path`. Authentication is attached when
    /// the request is sent, not here.
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// Send a request with the stored bearer token, refreshing it once on 401.
    ///
    /// Returns the final response whatever its status; use
    /// [`DevTrackClient::execute`] to map error statuses. A request whose
    /// body cannot be cloned gets its 401 back unchanged; build those with
    /// [`DevTrackClient::send_with`] instead.
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let mut request = ApiRequest::new(request.build()?);
        self.tokens.attach_auth_header(&mut request);

        let replay = request.try_clone();
        let response = self.dispatch(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(replay) = replay else {
            debug!("Request body cannot be replayed, returning 401");
            return Ok(response);
        };
        self.refresh_and_replay(response, replay).await
    }

    /// Like [`DevTrackClient::send`], for requests whose body is not
    /// clonable (multipart uploads). `build` is called once more to produce
    /// the replay after a refresh, so it must yield the same request each time.
    pub async fn send_with<F>(&self, build: F) -> Result<reqwest::Response, ClientError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut request = ApiRequest::new(build().build()?);
        self.tokens.attach_auth_header(&mut request);

        let response = self.dispatch(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let replay = ApiRequest::new(build().build()?);
        self.refresh_and_replay(response, replay).await
    }

    async fn refresh_and_replay(
        &self,
        response: reqwest::Response,
        mut replay: ApiRequest,
    ) -> Result<reqwest::Response, ClientError> {
        if replay.is_retried() {
            return Ok(response);
        }
        replay.mark_retried();

        let unauthorized = Self::error_from(response).await;
        let access = self.tokens.handle_unauthorized(unauthorized).await?;
        replay.set_bearer(&access);
        debug!(method = %replay.method(), path = replay.url().path(), "Replaying request with refreshed token");
        self.dispatch(replay).await
    }

    /// Execute a request and handle common errors
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// [`DevTrackClient::execute`] for requests built by [`DevTrackClient::send_with`]
    pub async fn execute_with<T, F>(&self, build: F) -> Result<T, ClientError>
    where
        T: serde::de::DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let response = self.send_with(build).await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// Execute a request whose response body is not needed
    pub async fn execute_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ClientError> {
        let response = self.send(request).await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Execute a request without credentials and without refresh handling.
    ///
    /// Used for login and the other anonymous endpoints, where a stale
    /// bearer token must not be sent.
    pub async fn execute_public<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<reqwest::Response, ClientError> {
        Ok(self.client.execute(request.into_inner()).await?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn error_from(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let message = response.text().await.unwrap_or_else(|_| status.to_string());
        ClientError::from_status(status, message)
    }
}

/// Builder for DevTrackClient
#[derive(Default)]
pub struct DevTrackClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    refresh_path: Option<String>,
    captcha_site_key: Option<String>,
    vault: Option<Arc<CredentialVault>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl DevTrackClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout, applied to refresh calls as well
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Path of the token refresh endpoint
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = Some(path.into());
        self
    }

    pub fn captcha_site_key(mut self, key: Option<String>) -> Self {
        self.captcha_site_key = key;
        self
    }

    /// Credential vault to read tokens from. Defaults to an empty in-memory one.
    pub fn vault(mut self, vault: Arc<CredentialVault>) -> Self {
        self.vault = Some(vault);
        self
    }

    /// Replace the HTTP refresher, mainly for tests
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<DevTrackClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new()
            .user_agent(self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()));
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        let client = client_builder.build()?;

        let vault = match self.vault {
            Some(vault) => vault,
            None => Arc::new(CredentialVault::open(Arc::new(MemoryStore::new()))?),
        };

        let refresher = match self.refresher {
            Some(refresher) => refresher,
            None => {
                let path = self
                    .refresh_path
                    .unwrap_or_else(|| DEFAULT_REFRESH_PATH.to_string());
                Arc::new(HttpTokenRefresher::new(
                    client.clone(),
                    format!("{base_url}{path}"),
                ))
            }
        };

        Ok(DevTrackClient {
            client,
            base_url,
            tokens: Arc::new(TokenManager::new(vault, refresher)),
            captcha_site_key: self.captcha_site_key,
        })
    }
}
