//! TOML-based configuration for the scanner.
//!
//! Reads and writes [`ScannerConfig`] to a file given on the command line or,
//! failing that, to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Beacon\scanner.toml`
//! - Linux:    `~/.config/beacon/scanner.toml`
//! - macOS:    `~/Library/Application Support/Beacon/scanner.toml`
//!
//! ```toml
//! log_level = "info"
//!
//! [discovery]
//! port = 9080
//! kind = "server_game"
//! protocol_version = 2
//!
//! [blocking]
//! retries = 2
//! timeout_ms = 3000
//!
//! [cooperative]
//! max_polls = 10
//! poll_delay_ms = 200
//! max_rounds = 3
//!
//! [monitor]
//! strategy = "blocking"
//! tick_interval_ms = 4000
//!
//! [candidates]
//! broadcast_addresses = []   # empty = ask the network interfaces
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]` and every section is
//! `#[serde(default)]`, so missing sections or fields fall back to the values
//! shown above.  Leaving `max_rounds` out of `[cooperative]` is different:
//! the field is optional and absent means "cycle until found".

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use beacon_core::{
    protocol::messages::{DEFAULT_DISCOVERY_PORT, DEFAULT_PROTOCOL_VERSION},
    Kind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The config parsed but a value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema ─────────────────────────────────────────────────────────────

/// Which scanner implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Blocking,
    Cooperative,
}

/// Top-level scanner configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScannerConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub blocking: BlockingConfig,
    #[serde(default)]
    pub cooperative: CooperativeConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub candidates: CandidatesConfig,
}

/// What to look for and where.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryConfig {
    /// UDP port responders listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_kind")]
    pub kind: Kind,
    /// Version announced in ServerGame requests; from 2 on the agent
    /// endpoint is mandatory.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u8,
}

/// Settings of the blocking scanner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockingConfig {
    /// Attempts per broadcast group.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Read timeout of one attempt.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Settings of the cooperative scanner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CooperativeConfig {
    /// Non-blocking receive polls per attempt.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,
    /// Full rotations per search; absent = until found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
}

/// Settings of the discovery monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Pause between two monitor ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Static override of interface enumeration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CandidatesConfig {
    /// Broadcast addresses to probe in order; empty = use the interfaces.
    #[serde(default)]
    pub broadcast_addresses: Vec<Ipv4Addr>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_port() -> u16 {
    DEFAULT_DISCOVERY_PORT
}
fn default_kind() -> Kind {
    Kind::ServerGame
}
fn default_protocol_version() -> u8 {
    DEFAULT_PROTOCOL_VERSION
}
fn default_retries() -> u32 {
    2
}
fn default_timeout_ms() -> u64 {
    3000
}
fn default_max_polls() -> u32 {
    10
}
fn default_poll_delay_ms() -> u64 {
    200
}
fn default_max_rounds() -> Option<u32> {
    Some(3)
}
fn default_tick_interval_ms() -> u64 {
    4000
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            discovery: DiscoveryConfig::default(),
            blocking: BlockingConfig::default(),
            cooperative: CooperativeConfig::default(),
            monitor: MonitorConfig::default(),
            candidates: CandidatesConfig::default(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            kind: default_kind(),
            protocol_version: default_protocol_version(),
        }
    }
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for CooperativeConfig {
    fn default() -> Self {
        Self {
            max_polls: default_max_polls(),
            poll_delay_ms: default_poll_delay_ms(),
            max_rounds: default_max_rounds(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl ScannerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.tick_interval_ms)
    }

    /// Checks values that parse fine but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero retries, a zero timeout
    /// (the OS rejects it) or zero polls.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blocking.retries == 0 {
            return Err(ConfigError::Invalid("blocking.retries must be at least 1".to_string()));
        }
        if self.blocking.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "blocking.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.cooperative.max_polls == 0 {
            return Err(ConfigError::Invalid(
                "cooperative.max_polls must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path for the scanner.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("scanner.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config from `path` (or the platform default), returning
/// `ScannerConfig::default()` if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed and
/// [`ConfigError::Invalid`] if validation fails.
pub fn load_config(path: Option<&Path>) -> Result<ScannerConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };

    let cfg = match std::fs::read_to_string(&path) {
        Ok(content) => toml::from_str::<ScannerConfig>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ScannerConfig::default(),
        Err(e) => return Err(ConfigError::Io { path, source: e }),
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &ScannerConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Beacon"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("beacon"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Beacon")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
