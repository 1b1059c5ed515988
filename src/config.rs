//! Configuration management for CrabRelay
//!
//! Listen address, session lifetime, ICE servers handed to browsers and
//! the capture profile used by guests. Stored as TOML; a handful of
//! environment variables override the file.

use crate::camera::CaptureProfile;
use crate::errors::ConfigError;
use crate::session::{MAX_ID_LENGTH, MIN_ID_LENGTH};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "CRABRELAY_CONFIG";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub sessions: SessionConfig,
    pub ice: IceConfig,
    pub capture: CaptureConfig,
}

/// Listen address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Session lifetime and identifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Absolute lifetime cap, counted from creation
    pub timeout_secs: u64,
    /// How often the expiry sweep runs
    pub sweep_interval_secs: u64,
    /// Characters in a generated session id
    pub id_length: usize,
}

/// ICE servers and peer connection policy handed to browsers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IceConfig {
    pub servers: Vec<IceServer>,
    pub ice_candidate_pool_size: u8,
    pub bundle_policy: String,
    pub rtcp_mux_policy: String,
}

/// One STUN or TURN server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    pub fn stun(url: &str) -> Self {
        Self {
            urls: vec![url.to_string()],
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub profile: CaptureProfile,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30 * 60,
            sweep_interval_secs: 60,
            id_length: 8,
        }
    }
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            servers: vec![
                IceServer::stun("stun:stun.l.google.com:19302"),
                IceServer::stun("stun:stun1.l.google.com:19302"),
                IceServer::stun("stun:stun2.l.google.com:19302"),
            ],
            ice_candidate_pool_size: 10,
            bundle_policy: "max-bundle".to_string(),
            rtcp_mux_policy: "require".to_string(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            sessions: SessionConfig::default(),
            ice: IceConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl RelayConfig {
    /// Load configuration from TOML file; a missing file yields defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(ConfigError::Read)?;
        let config: RelayConfig = toml::from_str(&contents)?;
        config.validate().map_err(ConfigError::Invalid)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string).map_err(ConfigError::Write)?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// `$CRABRELAY_CONFIG`, else `crabrelay.toml` in the working directory
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("crabrelay.toml"))
    }

    /// Apply `PORT`, `HOST` and `CRABRELAY_SESSION_TIMEOUT_SECS`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Unparseable values are
    /// logged and skipped.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST").filter(|h| !h.is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => log::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Some(secs) = lookup("CRABRELAY_SESSION_TIMEOUT_SECS") {
            match secs.parse() {
                Ok(secs) => self.sessions.timeout_secs = secs,
                Err(_) => log::warn!("Ignoring invalid CRABRELAY_SESSION_TIMEOUT_SECS value: {}", secs),
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.server.host.parse::<IpAddr>().is_err() {
            return Err(format!("Invalid listen host: {}", self.server.host));
        }

        if self.sessions.timeout_secs == 0 {
            return Err("Session timeout must be greater than zero".to_string());
        }
        if self.sessions.sweep_interval_secs == 0 {
            return Err("Sweep interval must be greater than zero".to_string());
        }
        if !(MIN_ID_LENGTH..=MAX_ID_LENGTH).contains(&self.sessions.id_length) {
            return Err(format!(
                "Session id length must be between {} and {}",
                MIN_ID_LENGTH, MAX_ID_LENGTH
            ));
        }

        for server in &self.ice.servers {
            if server.urls.is_empty() {
                return Err("ICE server entry has no urls".to_string());
            }
            let is_turn = server
                .urls
                .iter()
                .any(|u| u.starts_with("turn:") || u.starts_with("turns:"));
            if is_turn && (server.username.is_none() || server.credential.is_none()) {
                return Err(format!("TURN server {:?} needs username and credential", server.urls));
            }
        }
        if !matches!(self.ice.bundle_policy.as_str(), "balanced" | "max-compat" | "max-bundle") {
            return Err(format!("Unknown bundle policy: {}", self.ice.bundle_policy));
        }
        if !matches!(self.ice.rtcp_mux_policy.as_str(), "negotiate" | "require") {
            return Err(format!("Unknown rtcp mux policy: {}", self.ice.rtcp_mux_policy));
        }

        Ok(())
    }

    /// Socket address to bind
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("Invalid listen host: {}", self.server.host)))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// `[ice]` in the shape `new RTCPeerConnection(..)` accepts
    pub fn ice_client_config(&self) -> serde_json::Value {
        serde_json::json!({
            "iceServers": self.ice.servers,
            "iceCandidatePoolSize": self.ice.ice_candidate_pool_size,
            "bundlePolicy": self.ice.bundle_policy,
            "rtcpMuxPolicy": self.ice.rtcp_mux_policy,
        })
    }
}
