//! # beacon-core
//!
//! Shared library for Beacon, a UDP broadcast service discovery toolkit,
//! containing the reply codec, the request/reply vocabulary, and the
//! broadcast group model.
//!
//! This crate is used by both the scanner and the responder applications.
//! It has zero dependencies on sockets or async runtimes.
//!
//! # Architecture overview (for beginners)
//!
//! A client that does not know where its server lives sends a small UDP
//! datagram (the *request*) to the broadcast address of every local network
//! it is attached to.  Any server listening on the discovery port answers
//! with a unicast *reply* that describes where to reach it.
//!
//! Two flavours of reply exist, selected by the discovery [`Kind`]:
//!
//! - **ServerGame** – a tag-length-value chain carrying the push, subscribe,
//!   reply (and optionally agent) endpoint URIs of a message-bus server.
//! - **ProxyRobots** – a single ASCII decimal port allocated for the caller.
//!
//! This crate defines:
//!
//! - **`protocol`** – How bytes travel over the network: request payloads,
//!   reply encoding, and the decoder that turns a reply into typed endpoints.
//!
//! - **`domain`** – Pure data with no I/O: broadcast groups, the candidate
//!   pool/rotation that orders them, and the events a discovery monitor
//!   publishes.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `beacon_core::Decoder` instead of `beacon_core::protocol::codec::Decoder`.
pub use domain::event::DiscoveryEvent;
pub use domain::group::{BroadcastGroup, CandidatePool, CandidateRotation};
pub use protocol::codec::{decode, encode_server_game, DecodeError, Decoder, EncodeError};
pub use protocol::messages::{
    DecodedEndpoints, DiscoveryRequest, DiscoveryResponse, Kind, Reply, ServerGameEndpoints,
};
