//! Client error types

use devtrack_core::StoreError;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The access token could not be refreshed; credentials have been cleared
    #[error("Session refresh failed: {0}")]
    RefreshFailed(RefreshFailure),

    /// The session ended (logout or new login) while a refresh was in flight
    #[error("Session ended while the request was waiting for a token refresh")]
    SessionEnded,

    /// Input rejected before it was sent
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Reading or writing persisted credentials failed
    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether this error means the user has to sign in again
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_) | Self::RefreshFailed(_) | Self::SessionEnded
        )
    }
}

/// Why a token refresh failed.
///
/// Cloneable so that one failure can be handed to every request that was
/// queued behind the refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshFailure {
    /// The refresh endpoint answered with an error status
    #[error("refresh endpoint returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The refresh endpoint could not be reached
    #[error("refresh request failed: {0}")]
    Transport(String),

    /// The refresh endpoint answered 2xx without a usable token
    #[error("refresh response was invalid: {0}")]
    InvalidResponse(String),

    /// The new token could not be persisted
    #[error("could not persist refreshed token: {0}")]
    Store(String),
}

impl RefreshFailure {
    /// HTTP status returned by the refresh endpoint, if it answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
