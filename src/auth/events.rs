use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    SignedIn {
        user_id: String,
    },
    /// `active_sessions` is what the user still has open elsewhere.
    SignedOut {
        user_id: String,
        active_sessions: usize,
    },
}

/// Fan-out of sign-in / sign-out notifications.
#[derive(Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionChange>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.tx.subscribe()
    }

    pub fn publish(&self, change: SessionChange) {
        tracing::debug!(?change, "Session changed");
        // Nobody listening is fine.
        let _ = self.tx.send(change);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}
