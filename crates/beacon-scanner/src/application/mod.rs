//! Application layer for the scanner.
//!
//! - **`scan`** – the [`scan::ScanStrategy`] trait every scanner implements,
//!   the [`scan::Discovery`] result, and the rule for turning a raw reply
//!   into either a discovery, a retry, or a protocol error.
//!
//! - **`monitor`** – the found/lost state machine that drives a strategy on
//!   a fixed tick and publishes [`beacon_core::DiscoveryEvent`]s.
//!
//! **Dependency rule**: this layer depends only on `beacon_core` and its own
//! traits.  The UDP implementations live in `infrastructure` and are
//! injected at construction time.

pub mod monitor;
pub mod scan;
