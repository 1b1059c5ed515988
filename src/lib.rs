//! CrabRelay: one-host, one-guest WebRTC signaling relay
//!
//! Pairs a host and a guest into a session and forwards the offer, answer
//! and ICE candidates between them so the two browsers can open a direct
//! media path. Media never passes through the relay.
//!
//! # Features
//! - Session registry with exclusive host/guest slots and an absolute lifetime cap
//! - Per-connection relay state machine with best-effort forwarding
//! - Guest-side camera switch coordinator that guarantees a different device
//! - axum WebSocket transport with ICE configuration endpoint
//!
//! # Usage
//! ```rust,no_run
//! use crabrelay::config::RelayConfig;
//! use crabrelay::relay::SignalingRelay;
//! use crabrelay::server::{self, ServerState};
//! use crabrelay::session::SessionRegistry;
//!
//! # async fn run() -> std::io::Result<()> {
//! let config = RelayConfig::default();
//! let relay = SignalingRelay::new(SessionRegistry::new(config.sessions.id_length));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! server::serve(listener, ServerState::new(relay, config), std::future::pending()).await
//! # }
//! ```
pub mod camera;
pub mod config;
pub mod errors;
pub mod relay;
pub mod server;
pub mod session;

// Testing utilities - synthetic capture devices for offline testing
pub mod testing;

pub use config::RelayConfig;
pub use errors::{CaptureError, ConfigError, SessionError, SwitchError};
pub use relay::{ClientEvent, ServerEvent, SignalingRelay};
pub use session::SessionRegistry;

/// Initialize logging for the relay
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabrelay=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}
