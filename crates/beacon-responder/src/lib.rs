//! beacon-responder library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the responder do? (for beginners)
//!
//! The responder is the *server* half of Beacon.  It listens on a UDP port
//! for discovery requests that scanners broadcast, decides what kind of
//! caller sent each one (by looking at the request's prefix), and sends back
//! a unicast reply:
//!
//! - robots get the next port from a finite pool, then `"Goodbye"` forever;
//! - administrators get a fixed admin port;
//! - optionally, ServerGame scanners get an endpoint advertisement.

/// Application layer: port allocation and query classification.
pub mod application;

/// Infrastructure layer: the UDP socket loop and configuration files.
pub mod infrastructure;
