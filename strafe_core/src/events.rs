use chrono::{DateTime, Utc};
use std::sync::mpsc::Receiver;
use thiserror::Error;

/// Errors in the crash-event subscription.
///
/// A lost or unavailable feed is fatal to the correlation subsystem: the
/// fuzzing loop may keep sending, but crash attribution is unavailable
/// until a new subscription is established.
#[derive(Error, Debug)]
pub enum EventFeedError {
    #[error("crash-event subscription could not be established: {0}")]
    SubscriptionFailed(String),
    #[error("crash-event feed disconnected")]
    Disconnected,
}

/// One discrete "target process terminated" observation from the external
/// feed. The core filters on `target` and ignores non-matching events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashEvent {
    /// Identifier of the process/container the event refers to.
    pub target: String,
    /// When the termination was observed.
    pub timestamp: DateTime<Utc>,
}

/// A subscribable source of crash events.
///
/// Subscribing hands back a channel receiver; the producing side lives in
/// the implementation (a container-runtime watcher, a liveness probe, a
/// test fixture). Decoupling through a channel keeps correlation logic a
/// pure function of buffer state plus a timestamp.
pub trait CrashEventSource {
    fn subscribe(&mut self) -> Result<Receiver<CrashEvent>, EventFeedError>;
}
