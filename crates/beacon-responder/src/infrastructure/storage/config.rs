//! TOML-based configuration for the responder.
//!
//! Reads and writes [`ResponderConfig`] to a file given on the command line
//! or, failing that, to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Beacon\responder.toml`
//! - Linux:    `~/.config/beacon/responder.toml`
//! - macOS:    `~/Library/Application Support/Beacon/responder.toml`
//!
//! Example:
//!
//! ```toml
//! log_level = "info"
//! bind_address = "0.0.0.0"
//! bind_port = 9080
//! admin_port = 9082
//! ports = [9012, 9013]
//! read_timeout_ms = 500
//!
//! [roles]
//! fallback = "robot"
//!
//! [[roles.rules]]
//! prefix = "admin"
//! policy = "admin"
//!
//! [advertise]
//! push = "tcp://*:9000"
//! subscribe = "tcp://*:9001"
//! reply = "tcp://*:9002"
//! ```
//!
//! Every field has a `#[serde(default = "...")]` helper, so an empty file (or
//! no file at all) yields a responder that a default scanner can reach.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::time::Duration;

use beacon_core::{
    protocol::messages::{DEFAULT_ADMIN_PORT, DEFAULT_DISCOVERY_PORT},
    ServerGameEndpoints,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::answer_query::{Policy, RoleTable};

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

    /// The config parsed but describes a responder that cannot run.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema ─────────────────────────────────────────────────────────────

/// Top-level responder configuration.
///
/// Scalar fields come before the `roles` and `advertise` tables so the
/// struct serializes to valid TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponderConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: Ipv4Addr,
    /// UDP port the responder listens on.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
    /// Port returned to `admin` queries.
    #[serde(default = "default_admin_port")]
    pub admin_port: u16,
    /// Ports handed out to robots, in order.
    #[serde(default = "default_ports")]
    pub ports: Vec<u16>,
    /// How long one receive waits before the loop re-checks for shutdown.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default)]
    pub roles: RoleTable,
    /// ServerGame endpoints returned by the `endpoints` policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertise: Option<ServerGameEndpoints>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind_address() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}
fn default_bind_port() -> u16 {
    DEFAULT_DISCOVERY_PORT
}
fn default_admin_port() -> u16 {
    DEFAULT_ADMIN_PORT
}
fn default_ports() -> Vec<u16> {
    vec![9012]
}
fn default_read_timeout_ms() -> u64 {
    500
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            admin_port: default_admin_port(),
            ports: default_ports(),
            read_timeout_ms: default_read_timeout_ms(),
            roles: RoleTable::default(),
            advertise: None,
        }
    }
}

impl ResponderConfig {
    /// The socket address the responder binds.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.bind_address, self.bind_port))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Checks settings that parse fine but cannot run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the read timeout is zero (a zero
    /// socket timeout is rejected by the OS) or when a role uses the
    /// `endpoints` policy without an `[advertise]` table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "read_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.roles.uses(Policy::Endpoints) && self.advertise.is_none() {
            return Err(ConfigError::Invalid(
                "the endpoints policy requires an [advertise] table".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path for the responder.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("responder.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config from `path` (or the platform default), returning
/// `ResponderConfig::default()` if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed and
/// [`ConfigError::Invalid`] if validation fails.
pub fn load_config(path: Option<&Path>) -> Result<ResponderConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };

    let cfg = match std::fs::read_to_string(&path) {
        Ok(content) => toml::from_str::<ResponderConfig>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ResponderConfig::default(),
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
pub fn save_config(config: &ResponderConfig, path: &Path) -> Result<(), ConfigError> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::answer_query::RoleRule;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("beacon_responder_test_{}", Uuid::new_v4()))
    }

    #[test]
    fn test_default_config_is_reachable_by_default_scanner() {
        // Arrange / Act
        let cfg = ResponderConfig::default();

        // Assert
        assert_eq!(cfg.bind_port, 9080);
        assert_eq!(cfg.admin_port, 9082);
        assert_eq!(cfg.ports, vec![9012]);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9080".parse().unwrap());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: ResponderConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, ResponderConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_given_fields() {
        // Arrange
        let text = r#"
bind_port = 9999
ports = [1, 2, 3]
"#;

        // Act
        let cfg: ResponderConfig = toml::from_str(text).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.bind_port, 9999);
        assert_eq!(cfg.ports, vec![1, 2, 3]);
        assert_eq!(cfg.admin_port, 9082);
        assert_eq!(cfg.roles, RoleTable::default());
    }

    #[test]
    fn test_config_with_roles_and_advertise_round_trips() {
        // Arrange
        let mut cfg = ResponderConfig::default();
        cfg.roles.rules.push(RoleRule::new("2", Policy::Endpoints));
        cfg.advertise = Some(ServerGameEndpoints {
            push: "tcp://*:9000".to_string(),
            subscribe: "tcp://*:9001".to_string(),
            reply: "tcp://*:9002".to_string(),
            agent: None,
        });

        // Act
        let text = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: ResponderConfig = toml::from_str(&text).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
        assert!(!text.contains("agent"), "None agent must be omitted");
    }

    #[test]
    fn test_validate_rejects_endpoints_policy_without_advertise() {
        let mut cfg = ResponderConfig::default();
        cfg.roles.fallback = Policy::Endpoints;

        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_read_timeout() {
        let cfg = ResponderConfig {
            read_timeout_ms: 0,
            ..ResponderConfig::default()
        };

        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let path = temp_dir().join("responder.toml");

        let cfg = load_config(Some(&path)).expect("missing file is not an error");

        assert_eq!(cfg, ResponderConfig::default());
    }

    #[test]
    fn test_load_config_reports_parse_error() {
        // Arrange
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("responder.toml");
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        // Act
        let result = load_config(Some(&path));

        // Assert
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_and_load_config_round_trip_via_temp_dir() {
        // Arrange: nested path exercises directory creation
        let dir = temp_dir();
        let path = dir.join("nested").join("responder.toml");
        let cfg = ResponderConfig {
            bind_port: 12345,
            log_level: "debug".to_string(),
            ..ResponderConfig::default()
        };

        // Act
        save_config(&cfg, &path).expect("save");
        let loaded = load_config(Some(&path)).expect("load");

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_responder_toml() {
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("responder.toml"), "got {path:?}");
        }
    }
}
