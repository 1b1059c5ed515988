//! Signaling relay
//!
//! Pairs one host and at most one guest per session and passes the
//! WebRTC handshake between them. The relay never inspects offer, answer
//! or candidate payloads.

pub mod connection;
pub mod messages;
pub mod signaling;

pub use connection::{ConnectionHandle, ConnectionId};
pub use messages::{ClientEvent, ServerEvent};
pub use signaling::{RelayState, SignalingRelay};
