//! In-process session event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`SessionBus`] is shared via `Arc<SessionBus>`. Listeners such as the
//! account reconciler subscribe once at startup and react to every
//! transition independently of the request that published it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sleuth_core::account::{upgrade_target, Principal, Upgrade};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// The principal changed from `previous` to `current`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    /// `None` when there was no session before (first visit).
    pub previous: Option<Principal>,
    pub current: Principal,
    pub occurred_at: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(previous: Option<Principal>, current: Principal) -> Self {
        Self {
            previous,
            current,
            occurred_at: Utc::now(),
        }
    }

    /// The anonymous → permanent upgrade this transition represents, if any.
    pub fn upgrade(&self) -> Option<Upgrade> {
        upgrade_target(self.previous.map(|p| p.state()), self.current.state())
    }
}

// ---------------------------------------------------------------------------
// SessionBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out bus for [`SessionEvent`]s.
pub struct SessionBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that will see it; zero means the
    /// event was dropped.
    pub fn publish(&self, event: SessionEvent) -> usize {
        match self.sender.send(event) {
            Ok(n) => n,
            Err(_) => {
                tracing::debug!("Session event published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for SessionBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
