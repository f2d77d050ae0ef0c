//! Infrastructure layer for the responder.
//!
//! Contains OS-facing adapters: the UDP socket loop and config file storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `beacon_core`, but MUST NOT be imported by the `application` layer.

pub mod network;
pub mod storage;
