//! Idle-timeout session monitor
//!
//! [`ActivityMonitor::start`] begins monitoring a signed-in user and hands
//! back an [`InteractionListener`] for the front end to feed. A background
//! task calls [`ActivityMonitor::check`] every check interval; once the time
//! since the last recorded interaction reaches the user's session timeout the
//! stored credentials are cleared and [`SessionEvent::LoggedOut`] is
//! broadcast.
//!
//! A session ends exactly once, whichever of the idle check or an explicit
//! [`ActivityMonitor::logout`] gets there first. Listeners handed out for an
//! ended session stay inert even after a new session starts.
//!
//! Each monitored session is bound to the vault's [`SessionEpoch`] at
//! `start`. When the credentials are cleared or replaced behind the
//! monitor's back (a client logout, a failed token refresh, a new login) the
//! session is dropped without touching the vault, so an old idle timer can
//! never clear somebody else's credentials.

use crate::clock::{Clock, SystemClock};
use crate::error::SessionError;
use devtrack_core::{CredentialVault, SessionEpoch, User, UserId};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

/// How often the background task checks for idleness
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Inactive,
    Active,
}

/// User interactions that count as activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    PointerDown,
    KeyDown,
    Scroll,
    TouchStart,
    Click,
}

impl InteractionKind {
    pub const ALL: [Self; 5] = [
        Self::PointerDown,
        Self::KeyDown,
        Self::Scroll,
        Self::TouchStart,
        Self::Click,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    IdleTimeout,
    UserRequested,
}

impl std::fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdleTimeout => f.write_str("idle timeout"),
            Self::UserRequested => f.write_str("user requested"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedOut {
        user_id: UserId,
        reason: LogoutReason,
    },
}

/// Result of a single idle check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Nothing is being monitored
    Inactive,
    /// Still within the timeout
    Active { remaining: Duration },
    /// This check ended the session
    LoggedOut,
}

struct ActiveSession {
    generation: u64,
    epoch: SessionEpoch,
    user_id: UserId,
    last_activity: Instant,
    timeout: Duration,
    cancel: CancellationToken,
}

#[derive(Default)]
struct MonitorInner {
    session: Option<ActiveSession>,
    generation: u64,
}

struct Shared {
    vault: Arc<CredentialVault>,
    clock: Arc<dyn Clock>,
    check_interval: Duration,
    inner: Mutex<MonitorInner>,
    events: broadcast::Sender<SessionEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, MonitorInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Forget a session whose vault epoch has moved on
    fn prune_stale(&self, inner: &mut MonitorInner) {
        let current = self.vault.epoch();
        if let Some(session) = inner.session.take_if(|s| s.epoch != current) {
            session.cancel.cancel();
            debug!(
                user_id = session.user_id,
                epoch = session.epoch,
                current,
                "Credentials changed outside the monitor, no longer tracking session"
            );
        }
    }

    /// Run one idle check. With `generation` set, only that session is checked.
    fn check(&self, generation: Option<u64>) -> Result<CheckOutcome, SessionError> {
        let mut inner = self.lock();
        self.prune_stale(&mut inner);
        let Some(session) = inner.session.as_ref() else {
            return Ok(CheckOutcome::Inactive);
        };
        if generation.is_some_and(|g| g != session.generation) {
            return Ok(CheckOutcome::Inactive);
        }

        let idle = self.clock.now().saturating_duration_since(session.last_activity);
        if idle < session.timeout {
            return Ok(CheckOutcome::Active {
                remaining: session.timeout - idle,
            });
        }

        info!(
            user_id = session.user_id,
            idle_secs = idle.as_secs(),
            timeout_secs = session.timeout.as_secs(),
            "Session idle for too long, logging out"
        );
        self.end(&mut inner, LogoutReason::IdleTimeout)?;
        Ok(CheckOutcome::LoggedOut)
    }

    /// Tear down the current session, if any. Returns whether one was ended.
    fn end(&self, inner: &mut MonitorInner, reason: LogoutReason) -> Result<bool, SessionError> {
        self.prune_stale(inner);
        let Some(session) = inner.session.take() else {
            return Ok(false);
        };
        session.cancel.cancel();
        let cleared = self.vault.clear_if_current(session.epoch);

        // No subscribers is fine
        let _ = self.events.send(SessionEvent::LoggedOut {
            user_id: session.user_id,
            reason,
        });
        debug!(user_id = session.user_id, %reason, "Session ended");

        cleared?;
        Ok(true)
    }
}

/// Watches a signed-in session for inactivity
///
/// Cheap to clone; clones observe the same session.
#[derive(Clone)]
pub struct ActivityMonitor {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ActivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityMonitor")
            .field("state", &self.state())
            .field("check_interval", &self.shared.check_interval)
            .finish_non_exhaustive()
    }
}

impl ActivityMonitor {
    pub fn new(vault: Arc<CredentialVault>) -> Self {
        Self::with_clock(vault, Arc::new(SystemClock), DEFAULT_CHECK_INTERVAL)
    }

    /// Build a monitor with an explicit clock and check interval.
    /// A zero interval falls back to [`DEFAULT_CHECK_INTERVAL`].
    pub fn with_clock(
        vault: Arc<CredentialVault>,
        clock: Arc<dyn Clock>,
        check_interval: Duration,
    ) -> Self {
        let check_interval = if check_interval.is_zero() {
            DEFAULT_CHECK_INTERVAL
        } else {
            check_interval
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                vault,
                clock,
                check_interval,
                inner: Mutex::new(MonitorInner::default()),
                events,
            }),
        }
    }

    pub fn state(&self) -> MonitorState {
        let mut inner = self.shared.lock();
        self.shared.prune_stale(&mut inner);
        if inner.session.is_some() {
            MonitorState::Active
        } else {
            MonitorState::Inactive
        }
    }

    pub fn check_interval(&self) -> Duration {
        self.shared.check_interval
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Time since the last recorded interaction, while active
    pub fn idle_for(&self) -> Option<Duration> {
        let now = self.shared.clock.now();
        let mut inner = self.shared.lock();
        self.shared.prune_stale(&mut inner);
        inner
            .session
            .as_ref()
            .map(|session| now.saturating_duration_since(session.last_activity))
    }

    /// Start monitoring `user` with their configured session timeout.
    ///
    /// The session is bound to the vault's current epoch. A previous session
    /// whose credentials have since been cleared or replaced is dropped
    /// first; one that is still current makes this fail.
    ///
    /// The periodic check runs on the current tokio runtime. Outside a
    /// runtime no task is spawned and the caller drives [`Self::check`].
    pub fn start(&self, user: &User) -> Result<InteractionListener, SessionError> {
        let mut inner = self.shared.lock();
        self.shared.prune_stale(&mut inner);
        if let Some(session) = inner.session.as_ref() {
            return Err(SessionError::AlreadyActive {
                user_id: session.user_id,
            });
        }

        inner.generation += 1;
        let generation = inner.generation;
        let timeout = user.session_timeout().as_duration();
        let cancel = CancellationToken::new();
        inner.session = Some(ActiveSession {
            generation,
            epoch: self.shared.vault.epoch(),
            user_id: user.id,
            last_activity: self.shared.clock.now(),
            timeout,
            cancel: cancel.clone(),
        });
        drop(inner);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(run_checks(
                    Arc::downgrade(&self.shared),
                    generation,
                    cancel,
                    self.shared.check_interval,
                ));
            }
            Err(_) => debug!("No tokio runtime, idle checks are driven by the caller"),
        }

        info!(
            user_id = user.id,
            timeout_mins = timeout.as_secs() / 60,
            "Monitoring session activity"
        );
        Ok(InteractionListener {
            shared: Arc::downgrade(&self.shared),
            generation,
        })
    }

    /// Check idleness now, logging out if the timeout has been reached
    pub fn check(&self) -> Result<CheckOutcome, SessionError> {
        self.shared.check(None)
    }

    /// End the session at the user's request. A no-op when inactive.
    pub fn logout(&self) -> Result<bool, SessionError> {
        let mut inner = self.shared.lock();
        self.shared.end(&mut inner, LogoutReason::UserRequested)
    }
}

async fn run_checks(
    shared: Weak<Shared>,
    generation: u64,
    cancel: CancellationToken,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(shared) = shared.upgrade() else { break };
                match shared.check(Some(generation)) {
                    Ok(CheckOutcome::Active { .. }) => {}
                    Ok(_) => break,
                    Err(e) => {
                        error!(error = %e, "Idle logout could not clear credentials");
                        break;
                    }
                }
            }
        }
    }
    debug!(generation, "Idle check task stopped");
}

/// Records user interactions for one monitored session
///
/// Becomes inert when that session ends.
#[derive(Clone)]
pub struct InteractionListener {
    shared: Weak<Shared>,
    generation: u64,
}

impl std::fmt::Debug for InteractionListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionListener")
            .field("generation", &self.generation)
            .field("live", &self.is_live())
            .finish()
    }
}

impl InteractionListener {
    /// Mark the session as active now. Returns false if the session is over.
    pub fn record(&self, kind: InteractionKind) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let now = shared.clock.now();
        let mut inner = shared.lock();
        shared.prune_stale(&mut inner);
        match inner.session.as_mut() {
            Some(session) if session.generation == self.generation => {
                session.last_activity = now;
                trace!(?kind, "Activity recorded");
                true
            }
            _ => false,
        }
    }

    pub fn is_live(&self) -> bool {
        self.shared.upgrade().is_some_and(|shared| {
            let mut inner = shared.lock();
            shared.prune_stale(&mut inner);
            inner
                .session
                .as_ref()
                .is_some_and(|session| session.generation == self.generation)
        })
    }
}
