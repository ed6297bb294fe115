//! Outbound request wrapper

use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::warn;

/// A built request plus the bookkeeping the token manager needs.
///
/// `retried` is set once the request has been replayed after a token
/// refresh; a second 401 on a retried request is returned to the caller
/// instead of triggering another refresh.
#[derive(Debug)]
pub struct ApiRequest {
    inner: reqwest::Request,
    retried: bool,
}

impl ApiRequest {
    pub fn new(inner: reqwest::Request) -> Self {
        Self {
            inner,
            retried: false,
        }
    }

    pub fn method(&self) -> &reqwest::Method {
        self.inner.method()
    }

    pub fn url(&self) -> &reqwest::Url {
        self.inner.url()
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Bearer token currently attached, if any
    pub fn bearer(&self) -> Option<&str> {
        self.inner
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
    }

    /// Set `Authorization: Bearer <token>`, replacing any previous value
    pub fn set_bearer(&mut self, token: &str) {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.inner.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(_) => warn!("Access token is not a valid header value, sending without it"),
        }
    }

    /// Copy of this request for replaying. `None` for streaming bodies.
    pub fn try_clone(&self) -> Option<Self> {
        self.inner.try_clone().map(|inner| Self {
            inner,
            retried: self.retried,
        })
    }

    pub(crate) fn into_inner(self) -> reqwest::Request {
        self.inner
    }
}
