//! `devtrack watch`: keeps a session open under the idle monitor

use anyhow::{Context, Result};
use devtrack_http::{AuthEvent, DevTrackClient};
use devtrack_session::{ActivityMonitor, InteractionKind, SessionEvent};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

pub async fn run(client: DevTrackClient, monitor: ActivityMonitor, poll_every: Duration) -> Result<()> {
    let user = client.vault().user().context("Not signed in")?;
    let mut session_events = monitor.subscribe();
    let mut auth_events = client.tokens().subscribe();
    let listener = monitor.start(&user)?;

    println!(
        "Watching session of {} (signs out after {} idle minutes).",
        user.display_name(),
        user.session_timeout().minutes()
    );
    println!("Press Enter to register activity, Ctrl-C to sign out.");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut poll = tokio::time::interval(poll_every);
    let mut last_unread = None;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                monitor.logout()?;
                println!("Signed out");
                break;
            }
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(_)) => {
                    listener.record(InteractionKind::KeyDown);
                }
                Ok(None) => {
                    debug!("stdin closed, activity can no longer be recorded");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    stdin_open = false;
                }
            },
            _ = poll.tick() => match client.unread_notifications().await {
                Ok(unread) => {
                    if last_unread != Some(unread) {
                        println!("{unread} unread notifications");
                        last_unread = Some(unread);
                    }
                }
                Err(e) if e.is_auth_expired() => {
                    debug!(error = %e, "Notification poll rejected");
                }
                Err(e) => {
                    warn!(error = %e, "Failed to poll notifications");
                }
            },
            event = session_events.recv() => match event {
                Ok(SessionEvent::LoggedOut { reason, .. }) => {
                    println!("Session ended ({reason})");
                    break;
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            event = auth_events.recv() => match event {
                Ok(AuthEvent::SessionExpired(failure)) => {
                    println!("Session expired: {failure}");
                    monitor.logout()?;
                    break;
                }
                Ok(AuthEvent::TokenRefreshed) => {
                    debug!("Access token refreshed");
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}
