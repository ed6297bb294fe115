use devtrack_core::{StoreError, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// `start` was called while another session is being monitored
    #[error("a session for user {user_id} is already being monitored")]
    AlreadyActive { user_id: UserId },

    /// Credentials could not be cleared on logout
    #[error("failed to clear credentials: {0}")]
    Store(#[from] StoreError),
}
