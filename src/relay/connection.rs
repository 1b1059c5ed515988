use crate::relay::messages::ServerEvent;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque identifier of one transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Outbound side of a connection as seen by the core.
///
/// Cheap to clone; every clone shares the same liveness flag. Sends are
/// best effort and never block.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<ServerEvent>,
    live: Arc<AtomicBool>,
}

impl ConnectionHandle {
    /// New live handle plus the receiver the transport drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: ConnectionId::new(),
            outbound: tx,
            live: Arc::new(AtomicBool::new(true)),
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Live until the transport reports a disconnect or drops its receiver
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire) && !self.outbound.is_closed()
    }

    pub fn mark_closed(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Deliver an event. Returns false when the connection is gone; the
    /// event is dropped, never queued for later.
    pub fn send(&self, event: ServerEvent) -> bool {
        if !self.is_live() {
            return false;
        }
        self.outbound.send(event).is_ok()
    }
}
