//! DevTrack HTTP client
//!
//! [`DevTrackClient`] wraps `reqwest` with the session handling every view of
//! the application relies on: bearer tokens are attached from the
//! [`CredentialVault`](devtrack_core::CredentialVault), and an expired access
//! token is refreshed once, transparently, no matter how many requests hit
//! the 401 at the same time.

pub mod client;
pub mod types;

pub use client::error::{ClientError, RefreshFailure};
pub use client::token::{AuthEvent, TokenManager, TokenRefresher};
pub use client::{DevTrackClient, DevTrackClientBuilder};
