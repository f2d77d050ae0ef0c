//! beacon-scanner library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the scanner do? (for beginners)
//!
//! The scanner is the *client* half of Beacon.  It knows the discovery port
//! but not the address of any server.  To find one it:
//!
//! 1. Lists the broadcast address of every local IPv4 network
//!    (e.g. `192.168.1.255`).  Each one, paired with the discovery port, is
//!    a *broadcast group*.
//! 2. Sends a tiny request datagram to one group and waits briefly for a
//!    unicast reply.
//! 3. Moves on to the next group if nothing comes back, retrying a few times
//!    per group.
//! 4. Decodes the first reply into endpoint addresses (ServerGame) or a port
//!    (ProxyRobots).
//!
//! On top of single searches, the [`application::monitor`] keeps checking
//! that the server is still there and publishes *found* / *lost* events on
//! a channel.

/// Application layer: the scan abstraction and the discovery monitor.
pub mod application;

/// Infrastructure layer: candidate enumeration, UDP scanners, and config.
pub mod infrastructure;
