//! Persisted authentication record

use crate::error::StoreError;
use crate::types::{CredentialPair, User};
use serde::{Deserialize, Serialize};

/// Schema version written by this build
pub const AUTH_RECORD_VERSION: u32 = 1;

fn legacy_version() -> u32 {
    1
}

/// Everything the client persists about the signed-in user.
///
/// Records written before versioning existed have no `version` field and are
/// read as version 1. Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthRecord {
    #[serde(default = "legacy_version")]
    pub version: u32,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}

impl AuthRecord {
    /// Record for a freshly authenticated session
    pub fn new(user: User, credentials: CredentialPair) -> Self {
        Self {
            version: AUTH_RECORD_VERSION,
            user: Some(user),
            access: Some(credentials.access),
            refresh: Some(credentials.refresh),
        }
    }

    /// Decode a stored record, refusing versions this build does not know
    pub fn from_json(raw: &str) -> Result<Self, StoreError> {
        let record: Self = serde_json::from_str(raw)?;
        if record.version > AUTH_RECORD_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: record.version,
                supported: AUTH_RECORD_VERSION,
            });
        }
        Ok(record)
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }
}
