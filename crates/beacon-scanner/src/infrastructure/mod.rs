//! Infrastructure layer for the scanner.
//!
//! Contains OS-facing adapters: network interface enumeration, the two UDP
//! scanners, and config file storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `beacon_core`, but MUST NOT be imported by the `application` layer.

pub mod candidates;
pub mod network;
pub mod storage;
