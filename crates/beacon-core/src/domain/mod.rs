//! Domain layer: pure discovery data with no I/O dependencies.
//!
//! # Sub-modules
//!
//! - **`group`** – [`group::BroadcastGroup`] is the `(ip, port)` destination
//!   of one scan attempt.  [`group::CandidatePool`] hands groups out once
//!   each (the blocking scanner gives up after the last one), while
//!   [`group::CandidateRotation`] cycles through them forever (the
//!   cooperative scanner keeps going until its caller stops it).
//!
//! - **`event`** – [`event::DiscoveryEvent`] is what a discovery monitor
//!   publishes on its output channel when a server is found or lost.

pub mod event;
pub mod group;
