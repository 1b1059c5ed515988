use crate::errors::SessionError;
use crate::relay::{ConnectionHandle, ConnectionId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Shortest and longest identifiers the registry will hand out
pub const MIN_ID_LENGTH: usize = 4;
pub const MAX_ID_LENGTH: usize = 32;

struct Session {
    host: Option<ConnectionHandle>,
    guest: Option<ConnectionHandle>,
    created_at: Instant,
    created_at_utc: chrono::DateTime<chrono::Utc>,
}

/// Connections bound to a session at the moment of an operation
#[derive(Debug, Clone, Default)]
pub struct SessionPeers {
    pub host: Option<ConnectionHandle>,
    pub guest: Option<ConnectionHandle>,
}

impl SessionPeers {
    pub fn live_host(&self) -> Option<&ConnectionHandle> {
        self.host.as_ref().filter(|h| h.is_live())
    }

    pub fn live_guest(&self) -> Option<&ConnectionHandle> {
        self.guest.as_ref().filter(|g| g.is_live())
    }
}

/// Read-only view of one session for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub host_connection: Option<ConnectionId>,
    pub guest_connection: Option<ConnectionId>,
    pub guest_live: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub age_secs: u64,
}

/// Owns every live session, keyed by identifier.
///
/// Other components hold session identifiers only. Every slot transition
/// takes the write lock, so host teardown, guest binding and the expiry
/// sweep never interleave on the same session. No I/O happens under the lock.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    id_length: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(8)
    }
}

impl SessionRegistry {
    /// `id_length` is clamped to [`MIN_ID_LENGTH`]..=[`MAX_ID_LENGTH`]
    pub fn new(id_length: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            id_length: id_length.clamp(MIN_ID_LENGTH, MAX_ID_LENGTH),
        }
    }

    /// Create a session owned by `host` and return its identifier.
    ///
    /// Identifiers are regenerated until they differ from every live
    /// session, so a collision can never overwrite an active entry.
    pub async fn create_session(&self, host: ConnectionHandle) -> String {
        let mut sessions = self.sessions.write().await;

        let mut session_id = self.generate_id();
        while sessions.contains_key(&session_id) {
            log::warn!("Session id collision on {}, regenerating", session_id);
            session_id = self.generate_id();
        }

        sessions.insert(
            session_id.clone(),
            Session {
                host: Some(host),
                guest: None,
                created_at: Instant::now(),
                created_at_utc: chrono::Utc::now(),
            },
        );
        session_id
    }

    fn generate_id(&self) -> String {
        let hex = Uuid::new_v4().simple().to_string();
        hex[..self.id_length].to_string()
    }

    /// Bind `guest` to the session's guest slot.
    ///
    /// Succeeds when the slot is empty or holds a connection that is no
    /// longer live. Returns the session's host handle on success.
    pub async fn bind_guest(
        &self,
        session_id: &str,
        guest: ConnectionHandle,
    ) -> Result<Option<ConnectionHandle>, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;

        if session.guest.as_ref().is_some_and(|g| g.is_live()) {
            return Err(SessionError::SessionFull(session_id.to_string()));
        }

        session.guest = Some(guest);
        Ok(session.host.clone())
    }

    /// Clear the guest slot. No-op when the session is absent.
    pub async fn unbind_guest(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.guest = None;
        }
    }

    /// Clear the guest slot only if it still holds `guest`.
    ///
    /// Returns the peers as they were before the slot was cleared, or `None`
    /// when nothing was released (session gone or slot rebound since).
    pub async fn unbind_guest_connection(
        &self,
        session_id: &str,
        guest: ConnectionId,
    ) -> Option<SessionPeers> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(session_id)?;
        if session.guest.as_ref().map(|g| g.id()) != Some(guest) {
            return None;
        }

        let peers = SessionPeers {
            host: session.host.clone(),
            guest: session.guest.take(),
        };
        Some(peers)
    }

    /// Remove the session entirely. Idempotent.
    pub async fn destroy_session(&self, session_id: &str) -> Option<SessionPeers> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id).map(|s| SessionPeers {
            host: s.host,
            guest: s.guest,
        })
    }

    /// Remove the session only if `host` owns it
    pub async fn destroy_hosted_session(
        &self,
        session_id: &str,
        host: ConnectionId,
    ) -> Option<SessionPeers> {
        let mut sessions = self.sessions.write().await;
        let owned = sessions
            .get(session_id)
            .and_then(|s| s.host.as_ref())
            .is_some_and(|h| h.id() == host);
        if !owned {
            return None;
        }
        sessions.remove(session_id).map(|s| SessionPeers {
            host: s.host,
            guest: s.guest,
        })
    }

    /// Evict every session created `timeout` or more before `now`.
    ///
    /// Age counts from creation, not last activity: a connected call is
    /// dropped at the boundary like an idle one.
    pub async fn sweep_expired(&self, now: Instant, timeout: Duration) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| now.saturating_duration_since(s.created_at) >= timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for session_id in &expired {
            sessions.remove(session_id);
            log::info!("[{}] Session expired", session_id);
        }
        expired
    }

    /// Host and guest handles currently bound, for forwarding
    pub async fn peers(&self, session_id: &str) -> Option<SessionPeers> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|s| SessionPeers {
            host: s.host.clone(),
            guest: s.guest.clone(),
        })
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Hold the registry lock for `duration`, like a long sweep would
    #[cfg(test)]
    pub(crate) async fn stall_for(&self, duration: Duration) {
        let _sessions = self.sessions.write().await;
        tokio::time::sleep(duration).await;
    }

    pub async fn snapshot(&self, session_id: &str) -> Option<SessionInfo> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|s| SessionInfo {
            session_id: session_id.to_string(),
            host_connection: s.host.as_ref().map(|h| h.id()),
            guest_connection: s.guest.as_ref().map(|g| g.id()),
            guest_live: s.guest.as_ref().is_some_and(|g| g.is_live()),
            created_at: s.created_at_utc,
            age_secs: s.created_at.elapsed().as_secs(),
        })
    }
}
