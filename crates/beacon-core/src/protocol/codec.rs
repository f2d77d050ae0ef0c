//! Reply codec for Beacon discovery.
//!
//! ServerGame wire format (no padding, no overall length prefix):
//! ```text
//! 0xA0 <len:1> <push address>
//! 0xA1 <len:1> <subscribe address>
//! 0xA2 <len:1> <reply address>
//! [0xA3 <len:1> <agent address>]      mandatory from protocol version 2
//! ```
//! Addresses are ASCII.  A `*` inside an address stands for "the IP you
//! received this reply from" and is expanded during decoding.
//!
//! ProxyRobots replies are a bare ASCII decimal port.
//!
//! # Fatal versus recoverable failures
//!
//! A ServerGame reply that breaks the tag sequence means the responder speaks
//! a different protocol version: retrying will not help, so those errors are
//! *fatal* ([`DecodeError::is_fatal`]).  A ProxyRobots reply that is not a
//! number (typically `"Goodbye"`) only means "no usable answer yet".

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;
use tracing::{debug, warn};

use crate::protocol::messages::{
    DecodedEndpoints, DiscoveryRequest, Kind, ServerGameEndpoints, AGENT_MIN_PROTOCOL_VERSION,
    DEFAULT_PROTOCOL_VERSION, TAG_AGENT, TAG_PUSH, TAG_REPLY, TAG_SUBSCRIBE, WILDCARD,
};

/// Errors that can occur while decoding a reply.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A tag byte did not match the next expected field.
    #[error("unexpected tag at offset {offset}: expected 0x{expected:02X}, found 0x{found:02X}")]
    UnexpectedTag { offset: usize, expected: u8, found: u8 },

    /// The reply ended in the middle of a field.
    #[error("truncated reply in field 0x{tag:02X}: need {needed} bytes, got {available}")]
    Truncated {
        tag: u8,
        needed: usize,
        available: usize,
    },

    /// An address contained non-ASCII bytes.
    #[error("field 0x{tag:02X} is not ASCII")]
    NonAscii { tag: u8 },

    /// The agent field is mandatory for this protocol version but absent.
    #[error("agent endpoint missing (required from protocol version 2, decoder is version {protocol_version})")]
    MissingAgent { protocol_version: u8 },

    /// A ProxyRobots reply was not a base-10 port number.
    #[error("invalid port reply: {0:?}")]
    InvalidPort(String),
}

impl DecodeError {
    /// Returns `true` for protocol violations that must not be retried.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DecodeError::InvalidPort(_))
    }
}

/// Errors that can occur while encoding a ServerGame advertisement.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// An address does not fit the single length byte.
    #[error("field 0x{tag:02X} is {len} bytes long; at most 255 are allowed")]
    FieldTooLong { tag: u8, len: usize },

    /// An address contained non-ASCII characters.
    #[error("field 0x{tag:02X} is not ASCII")]
    NonAscii { tag: u8 },
}

// ── Decoder ───────────────────────────────────────────────────────────────────

/// Declares which reply format to expect and which protocol version to
/// announce.
///
/// A `Decoder` holds no per-attempt state: every call to [`Decoder::decode`]
/// returns a fresh result, so the outcome of one attempt can never leak into
/// the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoder {
    pub kind: Kind,
    pub protocol_version: u8,
}

impl Decoder {
    pub fn new(kind: Kind, protocol_version: u8) -> Self {
        Self {
            kind,
            protocol_version,
        }
    }

    /// A ServerGame decoder for `protocol_version`.
    pub fn server_game(protocol_version: u8) -> Self {
        Self::new(Kind::ServerGame, protocol_version)
    }

    /// A ProxyRobots decoder.
    pub fn proxy_robots() -> Self {
        Self::new(Kind::ProxyRobots, DEFAULT_PROTOCOL_VERSION)
    }

    /// The request a scanner using this decoder broadcasts.
    pub fn request(&self) -> DiscoveryRequest {
        DiscoveryRequest::new(self.kind, self.protocol_version)
    }

    /// Decodes a reply received from `sender`.
    ///
    /// # Errors
    ///
    /// See [`decode`].
    pub fn decode(&self, sender: SocketAddr, bytes: &[u8]) -> Result<DecodedEndpoints, DecodeError> {
        decode(self, sender.ip(), bytes)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::server_game(DEFAULT_PROTOCOL_VERSION)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes `bytes` received from `sender_ip` according to `decoder`.
///
/// # Errors
///
/// Returns a fatal [`DecodeError`] when a ServerGame reply breaks the tag
/// sequence, and [`DecodeError::InvalidPort`] when a ProxyRobots reply is not
/// a port number.
///
/// # Examples
///
/// ```rust
/// use beacon_core::{decode, Decoder, DecodedEndpoints};
///
/// let ip = "192.168.1.20".parse().unwrap();
/// let decoded = decode(&Decoder::proxy_robots(), ip, b"9012").unwrap();
/// assert_eq!(decoded, DecodedEndpoints::ProxyRobots { port: 9012 });
/// ```
pub fn decode(
    decoder: &Decoder,
    sender_ip: IpAddr,
    bytes: &[u8],
) -> Result<DecodedEndpoints, DecodeError> {
    match decoder.kind {
        Kind::ServerGame => decode_server_game(decoder.protocol_version, sender_ip, bytes)
            .map(DecodedEndpoints::ServerGame),
        Kind::ProxyRobots => decode_proxy_robots(bytes),
    }
}

/// Encodes a ServerGame advertisement.
///
/// The agent field is written only when present.  Wildcards are left as is;
/// they are expanded by the receiving scanner.
///
/// # Errors
///
/// Returns [`EncodeError`] if an address is longer than 255 bytes or is not
/// ASCII.
///
/// # Examples
///
/// ```rust
/// use beacon_core::{decode, encode_server_game, DecodedEndpoints, Decoder, ServerGameEndpoints};
///
/// let advertised = ServerGameEndpoints {
///     push: "tcp://*:9000".to_string(),
///     subscribe: "tcp://*:9001".to_string(),
///     reply: "tcp://*:9002".to_string(),
///     agent: Some("tcp://*:9003".to_string()),
/// };
/// let bytes = encode_server_game(&advertised).unwrap();
/// let decoded = decode(&Decoder::server_game(2), "10.0.0.7".parse().unwrap(), &bytes).unwrap();
/// match decoded {
///     DecodedEndpoints::ServerGame(e) => assert_eq!(e.push, "tcp://10.0.0.7:9000"),
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
pub fn encode_server_game(endpoints: &ServerGameEndpoints) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::with_capacity(
        8 + endpoints.push.len()
            + endpoints.subscribe.len()
            + endpoints.reply.len()
            + endpoints.agent.as_ref().map_or(0, String::len),
    );
    write_field(&mut buf, TAG_PUSH, &endpoints.push)?;
    write_field(&mut buf, TAG_SUBSCRIBE, &endpoints.subscribe)?;
    write_field(&mut buf, TAG_REPLY, &endpoints.reply)?;
    if let Some(agent) = &endpoints.agent {
        write_field(&mut buf, TAG_AGENT, agent)?;
    }
    Ok(buf)
}

// ── ServerGame ────────────────────────────────────────────────────────────────

fn decode_server_game(
    protocol_version: u8,
    sender_ip: IpAddr,
    bytes: &[u8],
) -> Result<ServerGameEndpoints, DecodeError> {
    let (push, offset) = read_field(bytes, 0, TAG_PUSH)?;
    let (subscribe, offset) = read_field(bytes, offset, TAG_SUBSCRIBE)?;
    let (reply, offset) = read_field(bytes, offset, TAG_REPLY)?;

    let agent_required = protocol_version >= AGENT_MIN_PROTOCOL_VERSION;
    let agent = match bytes.get(offset) {
        Some(&TAG_AGENT) => Some(read_field(bytes, offset, TAG_AGENT)?.0),
        Some(&found) if agent_required => {
            return Err(DecodeError::UnexpectedTag {
                offset,
                expected: TAG_AGENT,
                found,
            })
        }
        None if agent_required => return Err(DecodeError::MissingAgent { protocol_version }),
        // Older protocol versions may end here or carry a terminator.
        _ => None,
    };

    let sender = sender_ip.to_string();
    let endpoints = ServerGameEndpoints {
        push: expand_wildcard(&push, &sender),
        subscribe: expand_wildcard(&subscribe, &sender),
        reply: expand_wildcard(&reply, &sender),
        agent: agent.map(|a| expand_wildcard(&a, &sender)),
    };
    debug!(
        push = %endpoints.push,
        subscribe = %endpoints.subscribe,
        reply = %endpoints.reply,
        "decoded server game reply"
    );
    Ok(endpoints)
}

/// Reads one `tag len value` field starting at `offset`.
///
/// Returns the value and the offset just past it.
fn read_field(bytes: &[u8], offset: usize, tag: u8) -> Result<(String, usize), DecodeError> {
    let found = *bytes.get(offset).ok_or(DecodeError::Truncated {
        tag,
        needed: offset + 1,
        available: bytes.len(),
    })?;
    if found != tag {
        return Err(DecodeError::UnexpectedTag {
            offset,
            expected: tag,
            found,
        });
    }

    let len = *bytes.get(offset + 1).ok_or(DecodeError::Truncated {
        tag,
        needed: offset + 2,
        available: bytes.len(),
    })? as usize;

    let start = offset + 2;
    let end = start + len;
    let value = bytes.get(start..end).ok_or(DecodeError::Truncated {
        tag,
        needed: end,
        available: bytes.len(),
    })?;
    if !value.is_ascii() {
        return Err(DecodeError::NonAscii { tag });
    }
    // ASCII is always valid UTF-8.
    let text = String::from_utf8(value.to_vec()).map_err(|_| DecodeError::NonAscii { tag })?;
    Ok((text, end))
}

fn write_field(buf: &mut Vec<u8>, tag: u8, value: &str) -> Result<(), EncodeError> {
    if !value.is_ascii() {
        return Err(EncodeError::NonAscii { tag });
    }
    let len = u8::try_from(value.len()).map_err(|_| EncodeError::FieldTooLong {
        tag,
        len: value.len(),
    })?;
    buf.push(tag);
    buf.push(len);
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

fn expand_wildcard(address: &str, sender: &str) -> String {
    address.replace(WILDCARD, sender)
}

// ── ProxyRobots ───────────────────────────────────────────────────────────────

fn decode_proxy_robots(bytes: &[u8]) -> Result<DecodedEndpoints, DecodeError> {
    let port = std::str::from_utf8(bytes)
        .ok()
        .map(|text| text.trim_matches(|c: char| c.is_ascii_whitespace()))
        .and_then(|text| text.parse::<u16>().ok());

    match port {
        Some(port) => Ok(DecodedEndpoints::ProxyRobots { port }),
        None => {
            let shown = String::from_utf8_lossy(bytes).into_owned();
            warn!(payload = ?shown, "could not decode broadcast reply as a port");
            Err(DecodeError::InvalidPort(shown))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
