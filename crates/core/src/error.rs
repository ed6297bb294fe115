//! Common error types shared across DevTrack crates

/// Standard result type for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Core error types that can be shared across crates
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Errors raised while reading or writing the persisted auth record
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored auth record is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Stored auth record has version {found}, newest supported is {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Credential store lock poisoned")]
    Poisoned,
}
