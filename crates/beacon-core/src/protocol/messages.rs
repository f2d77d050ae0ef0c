//! Discovery request and reply types.
//!
//! Every value that crosses the wire is ASCII except the ServerGame reply,
//! which is the tag-length-value chain handled by [`crate::protocol::codec`].

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::protocol::codec::{encode_server_game, EncodeError};

// ── Protocol constants ────────────────────────────────────────────────────────

/// UDP port the scanner broadcasts requests to.
pub const DEFAULT_DISCOVERY_PORT: u16 = 9080;

/// Port returned to callers whose request starts with [`ADMIN_TAG`].
pub const DEFAULT_ADMIN_PORT: u16 = 9082;

/// ServerGame protocol version announced in requests when none is configured.
pub const DEFAULT_PROTOCOL_VERSION: u8 = 2;

/// First ServerGame protocol version whose replies must carry the agent field.
pub const AGENT_MIN_PROTOCOL_VERSION: u8 = 2;

/// Request payload sent by ProxyRobots scanners.
pub const ROBOT_TAG: &[u8] = b"robot";

/// Request prefix selecting the administrative reply.
pub const ADMIN_TAG: &[u8] = b"admin";

/// Terminal reply sent once a responder has no ports left.
pub const GOODBYE: &[u8] = b"Goodbye";

/// Receive buffer size used by scanners; replies are far smaller.
pub const MAX_REPLY_SIZE: usize = 512;

/// ServerGame field tags, in the order they must appear on the wire.
pub const TAG_PUSH: u8 = 0xA0;
pub const TAG_SUBSCRIBE: u8 = 0xA1;
pub const TAG_REPLY: u8 = 0xA2;
pub const TAG_AGENT: u8 = 0xA3;

/// Character replaced by the responder's IP address in ServerGame endpoints.
pub const WILDCARD: char = '*';

// ── Kind ──────────────────────────────────────────────────────────────────────

/// The discovery protocol variant.
///
/// Determines both the request payload a scanner sends and the way the
/// reply is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// Locate a message-bus server (push/subscribe/reply endpoints).
    ServerGame,
    /// Obtain a port allocated by a robot proxy.
    ProxyRobots,
}

impl Kind {
    /// Stable lowercase name used in logs and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::ServerGame => "server_game",
            Kind::ProxyRobots => "proxy_robots",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Request / response ────────────────────────────────────────────────────────

/// The ASCII payload a scanner broadcasts.
///
/// Built once per scanner and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    payload: Vec<u8>,
}

impl DiscoveryRequest {
    /// Builds the request announcing `kind`.
    ///
    /// ServerGame requests carry the decimal protocol version (e.g. `"2"`);
    /// ProxyRobots requests carry the literal `"robot"`.
    pub fn new(kind: Kind, protocol_version: u8) -> Self {
        let payload = match kind {
            Kind::ServerGame => protocol_version.to_string().into_bytes(),
            Kind::ProxyRobots => ROBOT_TAG.to_vec(),
        };
        Self { payload }
    }

    /// Raw bytes to put on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }
}

/// A datagram received in answer to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResponse {
    /// Address the reply came from.
    pub sender: SocketAddr,
    /// Raw reply bytes.
    pub payload: Vec<u8>,
}

// ── Decoded endpoints ─────────────────────────────────────────────────────────

/// Endpoint URIs advertised by a ServerGame responder.
///
/// After decoding, every [`WILDCARD`] has already been replaced by the
/// sender's IP address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerGameEndpoints {
    pub push: String,
    pub subscribe: String,
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// Result of decoding a reply; the shape follows the [`Kind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEndpoints {
    ServerGame(ServerGameEndpoints),
    ProxyRobots { port: u16 },
}

impl DecodedEndpoints {
    /// The kind of reply this value was decoded from.
    pub fn kind(&self) -> Kind {
        match self {
            DecodedEndpoints::ServerGame(_) => Kind::ServerGame,
            DecodedEndpoints::ProxyRobots { .. } => Kind::ProxyRobots,
        }
    }
}

impl fmt::Display for DecodedEndpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedEndpoints::ServerGame(e) => write!(
                f,
                "push = {} ; sub = {} ; rep = {} ; agt = {}",
                e.push,
                e.subscribe,
                e.reply,
                e.agent.as_deref().unwrap_or("-")
            ),
            DecodedEndpoints::ProxyRobots { port } => write!(f, "port = {port}"),
        }
    }
}

// ── Replies ───────────────────────────────────────────────────────────────────

/// A reply a responder can send back to a scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A port popped from the responder's pool.
    Port(u16),
    /// The pool is exhausted.
    Goodbye,
    /// The fixed administrative port.
    Admin(u16),
    /// A ServerGame endpoint advertisement.
    Endpoints(ServerGameEndpoints),
}

impl Reply {
    /// Encodes the reply into the bytes a scanner expects.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when an advertised endpoint cannot be
    /// represented in the tag-length-value format.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        match self {
            Reply::Port(port) | Reply::Admin(port) => Ok(port.to_string().into_bytes()),
            Reply::Goodbye => Ok(GOODBYE.to_vec()),
            Reply::Endpoints(endpoints) => encode_server_game(endpoints),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_game_request_is_protocol_version_digits() {
        let request = DiscoveryRequest::new(Kind::ServerGame, 2);
        assert_eq!(request.as_bytes(), b"2");
    }

    #[test]
    fn test_proxy_robots_request_is_robot_literal() {
        // The protocol version is irrelevant for ProxyRobots.
        let request = DiscoveryRequest::new(Kind::ProxyRobots, 7);
        assert_eq!(request.as_bytes(), b"robot");
    }

    #[test]
    fn test_port_reply_encodes_as_decimal_ascii() {
        assert_eq!(Reply::Port(9012).encode().unwrap(), b"9012");
        assert_eq!(Reply::Admin(9082).encode().unwrap(), b"9082");
    }

    #[test]
    fn test_goodbye_reply_encodes_sentinel() {
        assert_eq!(Reply::Goodbye.encode().unwrap(), b"Goodbye");
    }

    #[test]
    fn test_kind_serializes_as_snake_case() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            kind: Kind,
        }

        let text = toml::to_string(&Wrapper {
            kind: Kind::ProxyRobots,
        })
        .unwrap();
        assert!(text.contains("proxy_robots"));

        let parsed: Wrapper = toml::from_str("kind = \"server_game\"").unwrap();
        assert_eq!(parsed.kind, Kind::ServerGame);
    }

    #[test]
    fn test_decoded_endpoints_display_lists_all_fields() {
        let decoded = DecodedEndpoints::ServerGame(ServerGameEndpoints {
            push: "tcp://10.0.0.1:9000".to_string(),
            subscribe: "tcp://10.0.0.1:9001".to_string(),
            reply: "tcp://10.0.0.1:9002".to_string(),
            agent: None,
        });

        let text = decoded.to_string();

        assert!(text.contains("push = tcp://10.0.0.1:9000"));
        assert!(text.contains("agt = -"));
        assert_eq!(decoded.kind(), Kind::ServerGame);
    }
}
