//! Configuration management for LineCrypt peers.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/linecrypt/config.toml`.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use protocol::{DhParameters, Role, SecurityLevel, DEFAULT_GENERATOR, DEFAULT_MODULUS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tick_ms must be between 1 and 60000, got {0}")]
    InvalidTick(u64),

    #[error("send_interval_ms must be greater than 0, got {0}")]
    InvalidSendInterval(u64),

    #[error("invalid handshake parameters: {0}")]
    InvalidParameters(String),

    #[error("drop_rate must be between 0.0 and 1.0, got {0}")]
    InvalidDropRate(f64),

    #[error("{field} is not a socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("security level {0} cannot be selected; use cleartext or secured")]
    UnsupportedLevel(SecurityLevel),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for a LineCrypt peer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Device identity and loop timing.
    pub node: NodeConfig,

    /// Diffie-Hellman group offered by the initiator.
    pub handshake: HandshakeConfig,

    /// Outbound traffic pacing.
    pub traffic: TrafficConfig,

    /// UDP link endpoints and loss model.
    pub link: LinkConfig,

    /// In-process two-peer simulation.
    pub simulation: SimulationConfig,
}

/// Device identity and loop timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    /// Fixed role of this device.
    pub role: Role,

    /// Security level at start-up.
    pub level: SecurityLevel,

    /// Poll period of the main loop in milliseconds.
    pub tick_ms: u64,

    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

/// Diffie-Hellman group offered by the initiator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Prime modulus `p`.
    pub modulus: u64,

    /// Generator `g`.
    pub generator: u64,

    /// Seed for the private-scalar generator. Unset means OS entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Outbound traffic pacing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrafficConfig {
    /// Interval between periodic messages in milliseconds.
    pub send_interval_ms: u64,
}

/// UDP link endpoints and loss model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LinkConfig {
    /// Local socket address.
    pub bind: String,

    /// Remote socket address.
    pub peer: String,

    /// Probability that a line is lost in the simulated link.
    pub drop_rate: f64,
}

/// In-process two-peer simulation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of ticks to run.
    pub ticks: u64,

    /// Tick numbers at which both simulated buttons are pressed.
    pub toggle_at: Vec<u64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            role: Role::Initiator,
            level: SecurityLevel::Cleartext,
            tick_ms: 50,
            log_level: "info".to_string(),
        }
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            modulus: DEFAULT_MODULUS,
            generator: DEFAULT_GENERATOR,
            seed: None,
        }
    }
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            send_interval_ms: 2000,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7001".to_string(),
            peer: "127.0.0.1:7002".to_string(),
            drop_rate: 0.0,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks: 400,
            toggle_at: vec![40],
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("linecrypt")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - LINECRYPT_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - LINECRYPT_ROLE: Override device role (initiator, responder)
    /// - LINECRYPT_PEER: Override remote socket address
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("LINECRYPT_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.node.log_level = level;
            }
        }

        if let Ok(role) = std::env::var("LINECRYPT_ROLE") {
            match role.parse::<Role>() {
                Ok(role) => {
                    tracing::info!("Overriding role from environment: {}", role);
                    self.node.role = role;
                }
                Err(e) if !role.is_empty() => {
                    tracing::warn!("Ignoring LINECRYPT_ROLE: {}", e);
                }
                Err(_) => {}
            }
        }

        if let Ok(peer) = std::env::var("LINECRYPT_PEER") {
            if !peer.is_empty() {
                tracing::info!("Overriding peer address from environment: {}", peer);
                self.link.peer = peer;
            }
        }
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.tick_ms == 0 || self.node.tick_ms > 60_000 {
            return Err(ConfigError::InvalidTick(self.node.tick_ms));
        }

        if self.traffic.send_interval_ms == 0 {
            return Err(ConfigError::InvalidSendInterval(
                self.traffic.send_interval_ms,
            ));
        }

        if self.node.level == SecurityLevel::Enhanced {
            return Err(ConfigError::UnsupportedLevel(self.node.level));
        }

        self.dh_parameters()?;

        if !(0.0..=1.0).contains(&self.link.drop_rate) {
            return Err(ConfigError::InvalidDropRate(self.link.drop_rate));
        }

        for (field, value) in [("bind", &self.link.bind), ("peer", &self.link.peer)] {
            if value.parse::<SocketAddr>().is_err() {
                return Err(ConfigError::InvalidAddress {
                    field,
                    value: value.clone(),
                });
            }
        }

        let level = self.node.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.node.log_level.clone()));
        }

        Ok(())
    }

    /// Group parameters the initiator offers.
    pub fn dh_parameters(&self) -> Result<DhParameters, ConfigError> {
        DhParameters::new(self.handshake.modulus, self.handshake.generator)
            .map_err(|e| ConfigError::InvalidParameters(e.to_string()))
    }

    /// Poll period of the main loop.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.node.tick_ms)
    }

    /// Interval between periodic messages.
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.traffic.send_interval_ms)
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
