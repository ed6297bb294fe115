//! Background idle checks driven by tokio's paused clock

use devtrack_core::{CredentialPair, CredentialStore, CredentialVault, MemoryStore, Role, User};
use devtrack_session::{
    ActivityMonitor, InteractionKind, LogoutReason, MonitorState, SessionEvent, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::{Instant, sleep, timeout};

const MINUTE: Duration = Duration::from_secs(60);

fn signed_in(session_timeout: u32) -> (Arc<CredentialVault>, Arc<MemoryStore>, User) {
    let store = Arc::new(MemoryStore::new());
    let vault = Arc::new(CredentialVault::open(store.clone()).unwrap());
    let user = User {
        id: 11,
        email: "marta@devtrack.test".into(),
        first_name: "Marta".into(),
        last_name: "Ruiz".into(),
        role: Role::Student,
        session_timeout_minutes: Some(session_timeout),
    };
    vault
        .login(
            user.clone(),
            CredentialPair {
                access: "access".into(),
                refresh: "refresh".into(),
            },
        )
        .unwrap();
    (vault, store, user)
}

#[tokio::test(start_paused = true)]
async fn idle_session_is_logged_out_on_a_check_tick() {
    let (vault, store, user) = signed_in(5);
    let monitor = ActivityMonitor::with_clock(vault, Arc::new(SystemClock), MINUTE);
    let mut events = monitor.subscribe();
    let started = Instant::now();
    let listener = monitor.start(&user).unwrap();

    sleep(4 * MINUTE).await;
    assert!(listener.record(InteractionKind::Click));

    sleep(4 * MINUTE).await;
    assert_eq!(monitor.state(), MonitorState::Active);

    let event = timeout(5 * MINUTE, events.recv())
        .await
        .expect("idle logout within five minutes")
        .unwrap();
    assert_eq!(
        event,
        SessionEvent::LoggedOut {
            user_id: 11,
            reason: LogoutReason::IdleTimeout
        }
    );

    // Last activity at 4 min, timeout 5 min, checks every minute
    let at = started.elapsed();
    assert!(at >= 9 * MINUTE && at <= 10 * MINUTE, "logged out after {at:?}");
    assert!(store.load().unwrap().is_none());
    assert!(!listener.is_live());
}

#[tokio::test(start_paused = true)]
async fn explicit_logout_stops_the_check_task() {
    let (vault, store, user) = signed_in(5);
    let monitor = ActivityMonitor::with_clock(vault.clone(), Arc::new(SystemClock), MINUTE);
    let mut events = monitor.subscribe();
    monitor.start(&user).unwrap();

    sleep(2 * MINUTE).await;
    assert!(monitor.logout().unwrap());
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedOut {
            reason: LogoutReason::UserRequested,
            ..
        }
    ));

    // A new login outside the monitor must not be cleared by a leftover task
    vault
        .login(
            user.clone(),
            CredentialPair {
                access: "second".into(),
                refresh: "refresh".into(),
            },
        )
        .unwrap();
    sleep(30 * MINUTE).await;

    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert!(store.load().unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn restarted_session_gets_a_fresh_timer() {
    let (vault, _store, user) = signed_in(5);
    let monitor = ActivityMonitor::with_clock(vault, Arc::new(SystemClock), MINUTE);
    let mut events = monitor.subscribe();

    monitor.start(&user).unwrap();
    sleep(3 * MINUTE).await;
    monitor.logout().unwrap();
    events.recv().await.unwrap();

    let started = Instant::now();
    monitor.start(&user).unwrap();
    let event = timeout(10 * MINUTE, events.recv()).await.unwrap().unwrap();

    assert!(matches!(
        event,
        SessionEvent::LoggedOut {
            reason: LogoutReason::IdleTimeout,
            ..
        }
    ));
    assert!(started.elapsed() >= 5 * MINUTE);
}

#[tokio::test(start_paused = true)]
async fn timer_of_a_replaced_session_leaves_the_new_login_alone() {
    let (vault, store, user) = signed_in(5);
    let monitor = ActivityMonitor::with_clock(vault.clone(), Arc::new(SystemClock), MINUTE);
    let mut events = monitor.subscribe();
    monitor.start(&user).unwrap();

    // Signed out and back in through the HTTP client, never through the monitor
    sleep(2 * MINUTE).await;
    vault.clear().unwrap();
    vault
        .login(
            user.clone(),
            CredentialPair {
                access: "second".into(),
                refresh: "refresh-2".into(),
            },
        )
        .unwrap();

    sleep(10 * MINUTE).await;
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(monitor.state(), MonitorState::Inactive);
    let record = store.load().unwrap().unwrap();
    assert_eq!(record.access.as_deref(), Some("second"));

    // Monitoring the new login works as usual
    monitor.start(&user).unwrap();
    let event = timeout(10 * MINUTE, events.recv()).await.unwrap().unwrap();
    assert!(matches!(
        event,
        SessionEvent::LoggedOut {
            reason: LogoutReason::IdleTimeout,
            ..
        }
    ));
    assert!(store.load().unwrap().is_none());
}
