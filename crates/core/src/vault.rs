//! In-memory mirror of the persisted auth record
//!
//! The vault is the single owner of credential state inside a process. Every
//! mutation is written to the backing [`CredentialStore`] first and then to
//! the mirror, both under one lock, so nothing observes a mirror that is
//! ahead of (or behind) disk.
//!
//! Each login and each clear starts a new [`SessionEpoch`]. Long-running work
//! that belongs to one session (a token refresh, say) captures the epoch up
//! front and uses [`CredentialVault::update_access`] to commit its result,
//! which is refused once the session has ended.

use crate::error::StoreError;
use crate::record::AuthRecord;
use crate::store::CredentialStore;
use crate::types::{CredentialPair, User};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Identifies one login session within a vault
pub type SessionEpoch = u64;

struct VaultState {
    record: Option<AuthRecord>,
    epoch: SessionEpoch,
}

pub struct CredentialVault {
    store: Arc<dyn CredentialStore>,
    state: Mutex<VaultState>,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("epoch", &self.epoch())
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl CredentialVault {
    /// Open a vault, loading whatever record the store already holds
    pub fn open(store: Arc<dyn CredentialStore>) -> Result<Self, StoreError> {
        let record = store.load()?;
        if record.is_some() {
            debug!("Loaded persisted auth record");
        }
        Ok(Self {
            store,
            state: Mutex::new(VaultState { record, epoch: 0 }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, VaultState> {
        // The state is plain data, a panic mid-update cannot leave it torn
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn epoch(&self) -> SessionEpoch {
        self.lock().epoch
    }

    pub fn snapshot(&self) -> Option<AuthRecord> {
        self.lock().record.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().record.as_ref().and_then(|r| r.access.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.lock().record.as_ref().and_then(|r| r.refresh.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.lock().record.as_ref().and_then(|r| r.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock()
            .record
            .as_ref()
            .is_some_and(|r| r.user.is_some() && r.access.is_some())
    }

    /// Persist a new session and start a new epoch
    pub fn login(&self, user: User, credentials: CredentialPair) -> Result<SessionEpoch, StoreError> {
        let record = AuthRecord::new(user, credentials);
        let mut state = self.lock();
        self.store.save(&record)?;
        state.record = Some(record);
        state.epoch += 1;
        info!(epoch = state.epoch, "Session started");
        Ok(state.epoch)
    }

    /// Replace the access token if `epoch` is still the live session.
    ///
    /// Returns `false` without touching storage when the session has ended or
    /// been replaced since the caller captured `epoch`.
    pub fn update_access(&self, epoch: SessionEpoch, access: &str) -> Result<bool, StoreError> {
        let mut state = self.lock();
        if state.epoch != epoch {
            warn!(
                expected = epoch,
                current = state.epoch,
                "Discarding access token from a stale session"
            );
            return Ok(false);
        }
        let Some(current) = state.record.as_ref() else {
            warn!(epoch, "Discarding access token, no session is stored");
            return Ok(false);
        };
        let mut next = current.clone();
        next.access = Some(access.to_string());
        self.store.save(&next)?;
        state.record = Some(next);
        debug!(epoch, "Access token updated");
        Ok(true)
    }

    /// Replace the stored user profile, keeping the tokens
    pub fn update_user(&self, user: User) -> Result<(), StoreError> {
        let mut state = self.lock();
        let Some(current) = state.record.as_ref() else {
            return Ok(());
        };
        let mut next = current.clone();
        next.user = Some(user);
        self.store.save(&next)?;
        state.record = Some(next);
        Ok(())
    }

    /// Clear credentials only if `epoch` is still the live session.
    ///
    /// Returns `false` when a newer session has already replaced it.
    pub fn clear_if_current(&self, epoch: SessionEpoch) -> Result<bool, StoreError> {
        let mut state = self.lock();
        if state.epoch != epoch {
            debug!(expected = epoch, current = state.epoch, "Not clearing a newer session");
            return Ok(false);
        }
        self.store.clear()?;
        state.record = None;
        state.epoch += 1;
        info!(epoch = state.epoch, "Credentials cleared");
        Ok(true)
    }

    /// Drop all credentials and end the current epoch
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        self.store.clear()?;
        let had_session = state.record.take().is_some();
        state.epoch += 1;
        if had_session {
            info!(epoch = state.epoch, "Credentials cleared");
        }
        Ok(())
    }
}
