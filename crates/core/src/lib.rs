//! DevTrack core types and utilities
//!
//! Holds everything the HTTP client and the session monitor share: the user
//! and credential data model, the versioned on-disk auth record, credential
//! stores, the [`CredentialVault`] that mirrors the persisted record in
//! memory, and client configuration.

pub mod config;
pub mod error;
pub mod record;
pub mod store;
pub mod types;
pub mod vault;

pub use config::ClientConfig;
pub use error::{CoreError, CoreResult, StoreError};
pub use record::{AUTH_RECORD_VERSION, AuthRecord};
pub use store::{AUTH_STORAGE_KEY, CredentialStore, FileStore, MemoryStore};
pub use types::{CredentialPair, Role, SessionTimeout, User, UserId};
pub use vault::{CredentialVault, SessionEpoch};
