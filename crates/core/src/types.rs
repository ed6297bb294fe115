use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Backend primary key for users
pub type UserId = u64;

/// Account role as assigned by the backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    Student,
    Teacher,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Student => "STUDENT",
            Self::Teacher => "TEACHER",
            Self::Admin => "ADMIN",
        };
        f.write_str(label)
    }
}

/// Authenticated user profile, as returned by login and `/me`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    /// Idle timeout in minutes. Older backends omit it.
    #[serde(default, rename = "session_timeout", skip_serializing_if = "Option::is_none")]
    pub session_timeout_minutes: Option<u32>,
}

impl User {
    /// Full display name, falling back to the email when no name is set
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }

    /// Effective idle timeout for this user
    pub fn session_timeout(&self) -> SessionTimeout {
        self.session_timeout_minutes
            .map(SessionTimeout::from_minutes)
            .unwrap_or_default()
    }
}

/// Access/refresh token pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialPair {
    pub access: String,
    pub refresh: String,
}

/// Per-user idle timeout in minutes.
///
/// The monitor honours whatever value it is given. Range checks only apply
/// when a user edits their profile, see [`SessionTimeout::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionTimeout(u32);

impl SessionTimeout {
    pub const MIN_MINUTES: u32 = 5;
    pub const MAX_MINUTES: u32 = 120;
    pub const DEFAULT_MINUTES: u32 = 30;

    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    pub const fn minutes(self) -> u32 {
        self.0
    }

    pub const fn as_duration(self) -> Duration {
        Duration::from_secs(self.0 as u64 * 60)
    }

    /// Check a user-supplied timeout against the accepted range
    pub fn validate(minutes: u32) -> Result<Self, String> {
        if (Self::MIN_MINUTES..=Self::MAX_MINUTES).contains(&minutes) {
            Ok(Self(minutes))
        } else {
            Err(format!(
                "session timeout must be between {} and {} minutes, got {minutes}",
                Self::MIN_MINUTES,
                Self::MAX_MINUTES
            ))
        }
    }
}

impl Default for SessionTimeout {
    fn default() -> Self {
        Self(Self::DEFAULT_MINUTES)
    }
}
