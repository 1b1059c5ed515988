use crate::relay::connection::{ConnectionHandle, ConnectionId};
use crate::relay::messages::{ClientEvent, ServerEvent};
use crate::session::{SessionPeers, SessionRegistry};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Per-connection relay state.
///
/// `Unassigned` moves to `Host` or `Guest` at most once; any state moves to
/// `Closed` on transport disconnect. Nothing returns to `Unassigned`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", content = "sessionId", rename_all = "lowercase")]
pub enum RelayState {
    Unassigned,
    Host(String),
    Guest(String),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Host,
    Guest,
}

struct ConnectionRecord {
    handle: ConnectionHandle,
    state: RelayState,
}

/// Pairs connections into sessions and forwards handshake payloads
/// between the two ends without looking inside them.
///
/// Forwarding is at most once: a payload whose target is absent or no
/// longer live is dropped and the sender is not told.
#[derive(Clone)]
pub struct SignalingRelay {
    registry: SessionRegistry,
    connections: Arc<RwLock<HashMap<ConnectionId, ConnectionRecord>>>,
}

impl SignalingRelay {
    pub fn new(registry: SessionRegistry) -> Self {
        Self {
            registry,
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Register a new transport connection in the `Unassigned` state.
    ///
    /// The transport drains the returned receiver and writes each event to
    /// the wire.
    pub async fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let (handle, rx) = ConnectionHandle::new();
        let id = handle.id();
        self.connections.write().await.insert(
            id,
            ConnectionRecord {
                handle,
                state: RelayState::Unassigned,
            },
        );
        log::info!("[{}] New connection: {}", chrono::Local::now().format("%H:%M:%S"), id);
        (id, rx)
    }

    /// State of a connection; unknown and disconnected ids report `Closed`
    pub async fn state_of(&self, conn: ConnectionId) -> RelayState {
        self.connections
            .read()
            .await
            .get(&conn)
            .map(|r| r.state.clone())
            .unwrap_or(RelayState::Closed)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Dispatch one inbound event. Events from closed connections are ignored.
    pub async fn handle_event(&self, conn: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::HostJoin => self.host_join(conn).await,
            ClientEvent::GuestJoin { session_id } => self.guest_join(conn, &session_id).await,
            ClientEvent::GuestOffer { session_id, offer } => {
                if let Some(host) = self.target(conn, &session_id, Side::Guest).await {
                    log::info!("[SIGNAL] Guest offer → Host ({})", session_id);
                    host.send(ServerEvent::GuestOffer {
                        offer,
                        guest_id: conn,
                    });
                }
            }
            ClientEvent::HostAnswer { session_id, answer } => {
                if let Some(guest) = self.target(conn, &session_id, Side::Host).await {
                    log::info!("[SIGNAL] Host answer → Guest ({})", session_id);
                    guest.send(ServerEvent::HostAnswer { answer });
                }
            }
            ClientEvent::GuestIceCandidate {
                session_id,
                candidate,
            } => {
                if let Some(host) = self.target(conn, &session_id, Side::Guest).await {
                    log::debug!("[SIGNAL] Guest ICE candidate → Host ({})", session_id);
                    host.send(ServerEvent::GuestIceCandidate {
                        candidate,
                        guest_id: conn,
                    });
                }
            }
            ClientEvent::HostIceCandidate {
                session_id,
                candidate,
            } => {
                if let Some(guest) = self.target(conn, &session_id, Side::Host).await {
                    log::debug!("[SIGNAL] Host ICE candidate → Guest ({})", session_id);
                    guest.send(ServerEvent::HostIceCandidate { candidate });
                }
            }
            ClientEvent::RequestCameraSwitch { session_id, camera } => {
                if let Some(guest) = self.target(conn, &session_id, Side::Host).await {
                    log::info!("[CONTROL] Host requested camera switch to: {} ({})", camera, session_id);
                    guest.send(ServerEvent::RequestCameraSwitch { camera });
                }
            }
            ClientEvent::GuestDisconnect { session_id } => {
                // slot stays bound until the transport actually goes away
                if let Some(host) = self.target(conn, &session_id, Side::Guest).await {
                    log::info!("[GUEST] {} disconnected from session: {}", conn, session_id);
                    host.send(ServerEvent::GuestDisconnected);
                }
            }
        }
    }

    async fn host_join(&self, conn: ConnectionId) {
        let mut connections = self.connections.write().await;
        let Some(handle) = claimable(&connections, conn, "hostJoin") else {
            return;
        };

        // registry work happens under the connections lock so the role
        // check and the role change cannot be split by another event
        let session_id = self.registry.create_session(handle.clone()).await;
        if let Some(record) = connections.get_mut(&conn) {
            record.state = RelayState::Host(session_id.clone());
        }
        drop(connections);

        log::info!("[HOST] {} created session: {}", conn, session_id);
        handle.send(ServerEvent::HostSessionCreated { session_id });
    }

    async fn guest_join(&self, conn: ConnectionId, session_id: &str) {
        let mut connections = self.connections.write().await;
        let Some(handle) = claimable(&connections, conn, "guestJoin") else {
            return;
        };

        let bound = self.registry.bind_guest(session_id, handle.clone()).await;
        if bound.is_ok() {
            if let Some(record) = connections.get_mut(&conn) {
                record.state = RelayState::Guest(session_id.to_string());
            }
        }
        drop(connections);

        match bound {
            Ok(host) => {
                log::info!("[GUEST] {} joined session: {}", conn, session_id);
                if let Some(host) = host.filter(|h| h.is_live()) {
                    host.send(ServerEvent::GuestJoined { guest_id: conn });
                }
            }
            Err(e) => {
                log::info!("[GUEST] {} rejected for session {}: {}", conn, session_id, e);
                handle.send(ServerEvent::error(e.to_string()));
            }
        }
    }

    /// Log a transport error. A failing host's live guest gets a notice.
    ///
    /// Does not tear anything down; the transport follows up with
    /// [`disconnect`](Self::disconnect).
    pub async fn handle_transport_error(&self, conn: ConnectionId, error: &str) {
        log::error!("[ERROR] Socket error [{}]: {}", conn, error);

        if let RelayState::Host(session_id) = self.state_of(conn).await {
            let peers = self.registry.peers(&session_id).await.unwrap_or_default();
            if let Some(guest) = peers.live_guest() {
                guest.send(ServerEvent::error("Host connection error"));
            }
        }
    }

    /// Transport-level disconnect.
    ///
    /// A host takes its session down with it and the live guest is told; a
    /// guest frees the guest slot and the live host is told. Either way the
    /// connection is `Closed` afterwards.
    pub async fn disconnect(&self, conn: ConnectionId) {
        let Some(record) = self.connections.write().await.remove(&conn) else {
            return;
        };
        record.handle.mark_closed();

        match record.state {
            RelayState::Host(session_id) => {
                log::info!("[HOST] {} disconnected", conn);
                if let Some(peers) = self.registry.destroy_hosted_session(&session_id, conn).await {
                    if let Some(guest) = peers.live_guest() {
                        guest.send(ServerEvent::HostDisconnected);
                    }
                    log::info!("[{}] Session closed by host", session_id);
                }
            }
            RelayState::Guest(session_id) => {
                log::info!("[GUEST] {} disconnected", conn);
                if let Some(peers) = self.registry.unbind_guest_connection(&session_id, conn).await {
                    if let Some(host) = peers.live_host() {
                        host.send(ServerEvent::GuestDisconnected);
                    }
                }
            }
            RelayState::Unassigned | RelayState::Closed => {}
        }

        log::info!("[{}] Disconnected: {}", chrono::Local::now().format("%H:%M:%S"), conn);
    }

    /// Live connection on the other side of `session_id`, provided `conn`
    /// is the connection bound on `side`.
    ///
    /// The sender check is intentional: a connection that is not the current
    /// host or guest of the session (a stranger, or a guest whose slot was
    /// since rebound) cannot inject handshake payloads or disconnect notices.
    async fn target(
        &self,
        conn: ConnectionId,
        session_id: &str,
        side: Side,
    ) -> Option<ConnectionHandle> {
        let state = self.state_of(conn).await;
        let role_matches = match (&state, side) {
            (RelayState::Host(s), Side::Host) | (RelayState::Guest(s), Side::Guest) => s == session_id,
            _ => false,
        };
        if !role_matches {
            log::debug!(
                "Dropping {:?}-side message for {} from {} in state {:?}",
                side,
                session_id,
                conn,
                state
            );
            return None;
        }

        let SessionPeers { host, guest } = self.registry.peers(session_id).await?;
        let (own, other) = match side {
            Side::Host => (host, guest),
            Side::Guest => (guest, host),
        };
        if own.map(|h| h.id()) != Some(conn) {
            return None;
        }
        other.filter(|h| h.is_live())
    }
}

/// Handle of `conn` if it may still take a role
fn claimable(
    connections: &HashMap<ConnectionId, ConnectionRecord>,
    conn: ConnectionId,
    event: &str,
) -> Option<ConnectionHandle> {
    let record = connections.get(&conn)?;
    if record.state != RelayState::Unassigned {
        log::debug!("Ignoring {} from {} in state {:?}", event, conn, record.state);
        return None;
    }
    Some(record.handle.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn host(relay: &SignalingRelay) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>, String) {
        let (id, mut rx) = relay.connect().await;
        relay.handle_event(id, ClientEvent::HostJoin).await;
        let session_id = match rx.try_recv().unwrap() {
            ServerEvent::HostSessionCreated { session_id } => session_id,
            other => panic!("unexpected {:?}", other),
        };
        (id, rx, session_id)
    }

    #[tokio::test]
    async fn test_host_join_assigns_role() {
        let relay = SignalingRelay::new(SessionRegistry::default());
        let (id, _rx, session_id) = host(&relay).await;
        assert_eq!(relay.state_of(id).await, RelayState::Host(session_id.clone()));
        assert!(relay.registry().contains(&session_id).await);
    }

    #[tokio::test]
    async fn test_duplicate_host_join_ignored() {
        let relay = SignalingRelay::new(SessionRegistry::default());
        let (id, mut rx, _session_id) = host(&relay).await;
        relay.handle_event(id, ClientEvent::HostJoin).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(relay.registry().session_count().await, 1);
    }

    #[tokio::test]
    async fn test_guest_join_notifies_host() {
        let relay = SignalingRelay::new(SessionRegistry::default());
        let (_host_id, mut host_rx, session_id) = host(&relay).await;
        let (guest_id, _guest_rx) = relay.connect().await;

        relay
            .handle_event(guest_id, ClientEvent::GuestJoin { session_id: session_id.clone() })
            .await;
        assert_eq!(relay.state_of(guest_id).await, RelayState::Guest(session_id));
        assert_eq!(host_rx.try_recv().unwrap(), ServerEvent::GuestJoined { guest_id });
    }

    #[tokio::test]
    async fn test_rejected_guest_stays_unassigned() {
        let relay = SignalingRelay::new(SessionRegistry::default());
        let (guest_id, mut guest_rx) = relay.connect().await;

        relay
            .handle_event(guest_id, ClientEvent::GuestJoin { session_id: "zz99zz99".into() })
            .await;
        assert_eq!(guest_rx.try_recv().unwrap(), ServerEvent::error("Invalid or expired session"));
        assert_eq!(relay.state_of(guest_id).await, RelayState::Unassigned);
    }

    #[tokio::test]
    async fn test_offer_answer_and_candidates_forwarded() {
        let relay = SignalingRelay::new(SessionRegistry::default());
        let (host_id, mut host_rx, sid) = host(&relay).await;
        let (guest_id, mut guest_rx) = relay.connect().await;
        relay.handle_event(guest_id, ClientEvent::GuestJoin { session_id: sid.clone() }).await;
        let _joined = host_rx.try_recv().unwrap();

        let offer = json!({"type": "offer", "sdp": "v=0..."});
        relay
            .handle_event(guest_id, ClientEvent::GuestOffer { session_id: sid.clone(), offer: offer.clone() })
            .await;
        assert_eq!(host_rx.try_recv().unwrap(), ServerEvent::GuestOffer { offer, guest_id });

        let answer = json!({"type": "answer", "sdp": "v=0..."});
        relay
            .handle_event(host_id, ClientEvent::HostAnswer { session_id: sid.clone(), answer: answer.clone() })
            .await;
        assert_eq!(guest_rx.try_recv().unwrap(), ServerEvent::HostAnswer { answer });

        let candidate = json!({"candidate": "candidate:1 1 UDP 1 10.0.0.1 9 typ host"});
        relay
            .handle_event(
                guest_id,
                ClientEvent::GuestIceCandidate { session_id: sid.clone(), candidate: candidate.clone() },
            )
            .await;
        assert_eq!(
            host_rx.try_recv().unwrap(),
            ServerEvent::GuestIceCandidate { candidate: candidate.clone(), guest_id }
        );

        relay
            .handle_event(host_id, ClientEvent::HostIceCandidate { session_id: sid, candidate: candidate.clone() })
            .await;
        assert_eq!(guest_rx.try_recv().unwrap(), ServerEvent::HostIceCandidate { candidate });
    }

    #[tokio::test]
    async fn test_wrong_role_messages_dropped() {
        let relay = SignalingRelay::new(SessionRegistry::default());
        let (host_id, mut host_rx, sid) = host(&relay).await;
        let (guest_id, mut guest_rx) = relay.connect().await;
        relay.handle_event(guest_id, ClientEvent::GuestJoin { session_id: sid.clone() }).await;
        let _joined = host_rx.try_recv().unwrap();

        // guest may not ask for a camera switch, host may not send an offer
        relay
            .handle_event(guest_id, ClientEvent::RequestCameraSwitch { session_id: sid.clone(), camera: "user".into() })
            .await;
        relay
            .handle_event(host_id, ClientEvent::GuestOffer { session_id: sid.clone(), offer: json!({}) })
            .await;
        assert!(host_rx.try_recv().is_err());
        assert!(guest_rx.try_recv().is_err());

        // an unassigned stranger cannot inject into the session
        let (stranger, _rx) = relay.connect().await;
        relay
            .handle_event(stranger, ClientEvent::HostAnswer { session_id: sid, answer: json!({}) })
            .await;
        assert!(guest_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_camera_switch_forwarded_to_guest() {
        let relay = SignalingRelay::new(SessionRegistry::default());
        let (host_id, _host_rx, sid) = host(&relay).await;
        let (guest_id, mut guest_rx) = relay.connect().await;
        relay.handle_event(guest_id, ClientEvent::GuestJoin { session_id: sid.clone() }).await;

        relay
            .handle_event(host_id, ClientEvent::RequestCameraSwitch { session_id: sid, camera: "environment".into() })
            .await;
        assert_eq!(
            guest_rx.try_recv().unwrap(),
            ServerEvent::RequestCameraSwitch { camera: "environment".into() }
        );
    }

    #[tokio::test]
    async fn test_explicit_guest_disconnect_keeps_slot() {
        let relay = SignalingRelay::new(SessionRegistry::default());
        let (_host_id, mut host_rx, sid) = host(&relay).await;
        let (guest_id, _guest_rx) = relay.connect().await;
        relay.handle_event(guest_id, ClientEvent::GuestJoin { session_id: sid.clone() }).await;
        let _joined = host_rx.try_recv().unwrap();

        relay.handle_event(guest_id, ClientEvent::GuestDisconnect { session_id: sid.clone() }).await;
        assert_eq!(host_rx.try_recv().unwrap(), ServerEvent::GuestDisconnected);
        let info = relay.registry().snapshot(&sid).await.unwrap();
        assert_eq!(info.guest_connection, Some(guest_id));
    }

    #[tokio::test]
    async fn test_host_disconnect_destroys_session() {
        let relay = SignalingRelay::new(SessionRegistry::default());
        let (host_id, _host_rx, sid) = host(&relay).await;
        let (guest_id, mut guest_rx) = relay.connect().await;
        relay.handle_event(guest_id, ClientEvent::GuestJoin { session_id: sid.clone() }).await;

        relay.disconnect(host_id).await;
        assert_eq!(guest_rx.try_recv().unwrap(), ServerEvent::HostDisconnected);
        assert!(!relay.registry().contains(&sid).await);
        assert_eq!(relay.state_of(host_id).await, RelayState::Closed);

        // closed connections are ignored
        relay.handle_event(host_id, ClientEvent::HostJoin).await;
        assert_eq!(relay.registry().session_count().await, 0);
    }

    #[tokio::test]
    async fn test_guest_disconnect_frees_slot() {
        let relay = SignalingRelay::new(SessionRegistry::default());
        let (_host_id, mut host_rx, sid) = host(&relay).await;
        let (guest_id, _guest_rx) = relay.connect().await;
        relay.handle_event(guest_id, ClientEvent::GuestJoin { session_id: sid.clone() }).await;
        let _joined = host_rx.try_recv().unwrap();

        relay.disconnect(guest_id).await;
        assert_eq!(host_rx.try_recv().unwrap(), ServerEvent::GuestDisconnected);
        assert!(relay.registry().contains(&sid).await);

        let (next_guest, _rx) = relay.connect().await;
        relay.handle_event(next_guest, ClientEvent::GuestJoin { session_id: sid.clone() }).await;
        assert_eq!(relay.state_of(next_guest).await, RelayState::Guest(sid));
    }

    #[tokio::test]
    async fn test_transport_error_on_host_warns_guest() {
        let relay = SignalingRelay::new(SessionRegistry::default());
        let (host_id, _host_rx, sid) = host(&relay).await;
        let (guest_id, mut guest_rx) = relay.connect().await;
        relay.handle_event(guest_id, ClientEvent::GuestJoin { session_id: sid }).await;

        relay.handle_transport_error(host_id, "connection reset").await;
        assert_eq!(guest_rx.try_recv().unwrap(), ServerEvent::error("Host connection error"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_host_joins_create_one_session() {
        let relay = SignalingRelay::new(SessionRegistry::default());
        let (id, mut rx) = relay.connect().await;

        let registry = relay.registry().clone();
        let stall = tokio::spawn(async move {
            registry.stall_for(std::time::Duration::from_millis(100)).await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let joins: Vec<_> = (0..2)
            .map(|_| {
                let relay = relay.clone();
                tokio::spawn(async move { relay.handle_event(id, ClientEvent::HostJoin).await })
            })
            .collect();
        stall.await.unwrap();
        for join in joins {
            join.await.unwrap();
        }

        assert_eq!(relay.registry().session_count().await, 1);
        assert!(matches!(rx.try_recv(), Ok(ServerEvent::HostSessionCreated { .. })));
        assert!(rx.try_recv().is_err());

        relay.disconnect(id).await;
        assert_eq!(relay.registry().session_count().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_host_join_racing_disconnect_leaves_no_session() {
        let relay = SignalingRelay::new(SessionRegistry::default());
        let (id, _rx) = relay.connect().await;

        let registry = relay.registry().clone();
        let stall = tokio::spawn(async move {
            registry.stall_for(std::time::Duration::from_millis(50)).await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let join = {
            let relay = relay.clone();
            tokio::spawn(async move { relay.handle_event(id, ClientEvent::HostJoin).await })
        };
        let leave = {
            let relay = relay.clone();
            tokio::spawn(async move { relay.disconnect(id).await })
        };
        stall.await.unwrap();
        join.await.unwrap();
        leave.await.unwrap();

        assert_eq!(relay.registry().session_count().await, 0);
        assert_eq!(relay.state_of(id).await, RelayState::Closed);
    }
}
