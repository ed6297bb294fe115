//! Bearer token attachment and single-flight refresh
//!
//! Every [`DevTrackClient`](super::DevTrackClient) owns one [`TokenManager`],
//! shared by its clones. When a request comes back 401 the client hands the
//! error to [`TokenManager::handle_unauthorized`]:
//!
//! - without a stored refresh token the 401 is returned as is;
//! - the first caller becomes the leader and performs the refresh;
//! - callers arriving while a refresh is in flight are queued and receive the
//!   leader's result, in the order they arrived.
//!
//! The in-progress flag is checked and set under a lock that is never held
//! across an await, so two callers can never both become leader.
//!
//! On failure the stored credentials are cleared and every queued caller is
//! rejected with the same [`RefreshFailure`]. A refresh that completes after
//! its session ended (logout, or a new login) is discarded and everyone gets
//! [`ClientError::SessionEnded`].

use super::error::{ClientError, RefreshFailure};
use super::request::ApiRequest;
use async_trait::async_trait;
use devtrack_core::CredentialVault;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, warn};

/// Exchanges a refresh token for a new access token
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshFailure>;
}

/// Session-level notifications emitted by the token manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A new access token was stored
    TokenRefreshed,
    /// Refresh failed and credentials were cleared; the user must sign in again
    SessionExpired(RefreshFailure),
}

#[derive(Debug, Clone)]
enum Rejection {
    Failed(RefreshFailure),
    SessionEnded,
}

impl From<Rejection> for ClientError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Failed(failure) => ClientError::RefreshFailed(failure),
            Rejection::SessionEnded => ClientError::SessionEnded,
        }
    }
}

type Settled = Result<String, Rejection>;

#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    waiters: Vec<oneshot::Sender<Settled>>,
}

/// Resets the in-progress flag if the leader's future is dropped mid-refresh
struct LeaderGuard<'a> {
    manager: &'a TokenManager,
    settled: bool,
}

impl LeaderGuard<'_> {
    fn settle(mut self, outcome: &Settled) {
        self.settled = true;
        let waiters = self.manager.finish_refresh();
        if !waiters.is_empty() {
            debug!(count = waiters.len(), "Resuming queued requests");
        }
        for waiter in waiters {
            // A waiter whose caller gave up has dropped its receiver
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let waiters = self.manager.finish_refresh();
            warn!(
                queued = waiters.len(),
                "Token refresh cancelled before completion"
            );
        }
    }
}

pub struct TokenManager {
    vault: Arc<CredentialVault>,
    refresher: Arc<dyn TokenRefresher>,
    state: Mutex<RefreshState>,
    events: broadcast::Sender<AuthEvent>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("refreshing", &self.is_refreshing())
            .field("pending", &self.pending_requests())
            .finish()
    }
}

impl TokenManager {
    pub fn new(vault: Arc<CredentialVault>, refresher: Arc<dyn TokenRefresher>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            vault,
            refresher,
            state: Mutex::new(RefreshState::default()),
            events,
        }
    }

    pub fn vault(&self) -> &Arc<CredentialVault> {
        &self.vault
    }

    /// Subscribe to refresh outcomes
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().in_progress
    }

    /// Number of requests waiting on the in-flight refresh
    pub fn pending_requests(&self) -> usize {
        self.lock().waiters.len()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn finish_refresh(&self) -> Vec<oneshot::Sender<Settled>> {
        let mut state = self.lock();
        state.in_progress = false;
        std::mem::take(&mut state.waiters)
    }

    /// Attach the stored access token, if there is one
    pub fn attach_auth_header(&self, request: &mut ApiRequest) {
        if let Some(access) = self.vault.access_token() {
            request.set_bearer(&access);
        }
    }

    /// Obtain a fresh access token after `unauthorized` came back for a
    /// request that has not been retried yet.
    ///
    /// # Errors
    ///
    /// Returns `unauthorized` unchanged when no refresh token is stored,
    /// [`ClientError::RefreshFailed`] when the refresh endpoint fails, and
    /// [`ClientError::SessionEnded`] when the session was replaced or logged
    /// out while the refresh was running.
    pub async fn handle_unauthorized(&self, unauthorized: ClientError) -> Result<String, ClientError> {
        let Some(refresh_token) = self.vault.refresh_token() else {
            debug!("No refresh token stored, passing 401 through");
            return Err(unauthorized);
        };

        let queued = {
            let mut state = self.lock();
            if state.in_progress {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Some(rx)
            } else {
                state.in_progress = true;
                None
            }
        };

        match queued {
            Some(rx) => {
                debug!("Refresh already in flight, queueing request");
                match rx.await {
                    Ok(settled) => settled.map_err(ClientError::from),
                    Err(_) => Err(ClientError::RefreshFailed(RefreshFailure::Transport(
                        "refresh was cancelled".to_string(),
                    ))),
                }
            }
            None => self.lead_refresh(&refresh_token).await,
        }
    }

    async fn lead_refresh(&self, refresh_token: &str) -> Result<String, ClientError> {
        let guard = LeaderGuard {
            manager: self,
            settled: false,
        };
        let epoch = self.vault.epoch();
        info!(epoch, "Access token rejected, refreshing");

        let outcome: Settled = match self.refresher.refresh(refresh_token).await {
            Ok(access) => match self.vault.update_access(epoch, &access) {
                Ok(true) => Ok(access),
                Ok(false) => Err(Rejection::SessionEnded),
                Err(e) => Err(Rejection::Failed(RefreshFailure::Store(e.to_string()))),
            },
            Err(failure) => Err(Rejection::Failed(failure)),
        };

        match &outcome {
            Ok(_) => {
                info!(epoch, "Access token refreshed");
                let _ = self.events.send(AuthEvent::TokenRefreshed);
            }
            Err(Rejection::Failed(failure)) => match self.vault.clear_if_current(epoch) {
                Ok(true) => {
                    warn!(epoch, error = %failure, "Token refresh failed, credentials cleared");
                    let _ = self.events.send(AuthEvent::SessionExpired(failure.clone()));
                }
                Ok(false) => {
                    info!(epoch, error = %failure, "Token refresh failed for a session that already ended");
                }
                Err(e) => {
                    error!(error = %e, "Failed to clear credentials after refresh failure");
                    let _ = self.events.send(AuthEvent::SessionExpired(failure.clone()));
                }
            },
            Err(Rejection::SessionEnded) => {
                info!(epoch, "Session ended during refresh, discarding token");
            }
        }

        guard.settle(&outcome);
        outcome.map_err(ClientError::from)
    }
}
