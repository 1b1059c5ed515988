//! Session registry and expiry sweep
//!
//! A session pairs exactly one host connection with at most one guest.

pub mod registry;
pub mod sweeper;

pub use registry::{SessionInfo, SessionPeers, SessionRegistry, MAX_ID_LENGTH, MIN_ID_LENGTH};
pub use sweeper::spawn_expiry_sweep;
