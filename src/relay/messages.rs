//! Message surface exchanged over a connection.
//!
//! JSON objects tagged by `"event"`; payload fields are camelCase. Offer,
//! answer and candidate payloads are opaque and passed through untouched.

use crate::relay::connection::ConnectionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Connection → server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    HostJoin,
    GuestJoin {
        session_id: String,
    },
    GuestOffer {
        session_id: String,
        #[serde(default)]
        offer: Value,
    },
    HostAnswer {
        session_id: String,
        #[serde(default)]
        answer: Value,
    },
    GuestIceCandidate {
        session_id: String,
        #[serde(default)]
        candidate: Value,
    },
    HostIceCandidate {
        session_id: String,
        #[serde(default)]
        candidate: Value,
    },
    RequestCameraSwitch {
        session_id: String,
        camera: String,
    },
    GuestDisconnect {
        session_id: String,
    },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::HostJoin => "hostJoin",
            ClientEvent::GuestJoin { .. } => "guestJoin",
            ClientEvent::GuestOffer { .. } => "guestOffer",
            ClientEvent::HostAnswer { .. } => "hostAnswer",
            ClientEvent::GuestIceCandidate { .. } => "guestIceCandidate",
            ClientEvent::HostIceCandidate { .. } => "hostIceCandidate",
            ClientEvent::RequestCameraSwitch { .. } => "requestCameraSwitch",
            ClientEvent::GuestDisconnect { .. } => "guestDisconnect",
        }
    }
}

/// Server → connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    HostSessionCreated {
        session_id: String,
    },
    GuestJoined {
        guest_id: ConnectionId,
    },
    Error {
        message: String,
    },
    GuestOffer {
        offer: Value,
        guest_id: ConnectionId,
    },
    HostAnswer {
        answer: Value,
    },
    GuestIceCandidate {
        candidate: Value,
        guest_id: ConnectionId,
    },
    HostIceCandidate {
        candidate: Value,
    },
    RequestCameraSwitch {
        camera: String,
    },
    HostDisconnected,
    GuestDisconnected,
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}
