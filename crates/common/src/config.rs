use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Directory protocol constants
pub mod protocol {
    /// Current protocol generation
    pub const VERSION: u32 = 1;

    /// Default port for the directory service
    pub const DEFAULT_PORT: u16 = 9600;

    /// Maximum wire frame size (1 MB); directory traffic is small
    pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

    /// Default bounded wait for a directory reply.
    ///
    /// The wire protocol carries no timeout field; this is a
    /// client-side policy so a lost reply does not block its caller
    /// forever.
    pub const REPLY_TIMEOUT_SECS: u64 = 30;

    /// Logon handshake timeout
    pub const LOGON_TIMEOUT_SECS: u64 = 10;
}

/// Node configuration for a directory server or client process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Listen address for the directory service
    pub listen_addr: String,

    /// Listen port for the directory service
    pub listen_port: u16,

    /// Directory server address for client processes ("host:port")
    pub server_addr: Option<String>,

    /// Bounded wait for directory replies, in seconds
    pub reply_timeout_secs: u64,

    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: protocol::DEFAULT_PORT,
            server_addr: None,
            reply_timeout_secs: protocol::REPLY_TIMEOUT_SECS,
            verbose: false,
        }
    }
}

impl NodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    pub fn with_server_addr(mut self, addr: impl Into<String>) -> Self {
        self.server_addr = Some(addr.into());
        self
    }

    pub fn with_reply_timeout(mut self, secs: u64) -> Self {
        self.reply_timeout_secs = secs;
        self
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }

    pub fn logon_timeout(&self) -> Duration {
        Duration::from_secs(protocol::LOGON_TIMEOUT_SECS)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Failed to serialize config: {0}")]
    SerializeError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),
}
