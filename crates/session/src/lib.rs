//! Session activity monitoring for the DevTrack client
//!
//! Ends a signed-in session once the user has been idle for longer than
//! their configured timeout.

pub mod clock;
pub mod error;
pub mod monitor;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::SessionError;
pub use monitor::{
    ActivityMonitor, CheckOutcome, DEFAULT_CHECK_INTERVAL, InteractionKind, InteractionListener,
    LogoutReason, MonitorState, SessionEvent,
};
